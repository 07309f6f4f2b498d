//! Concrete streaming tasks.
//!
//! A mesh request runs as a [`PrefetchTask`] followed by an
//! [`ExtractionTask`]; a plain prefetch request is a [`PrefetchTask`] without
//! a follow-up.

pub mod extraction_task;
pub mod prefetch_task;

pub use extraction_task::ExtractionTask;
pub use prefetch_task::PrefetchTask;
