//! # Task System Core Traits
//!
//! This module defines the building blocks of the streaming task system.
//!
//! ## Core Components
//! - `Task`: A unit of work that runs on a worker thread
//! - `TaskResult`: The outcome of a completed task, handled on the calling thread
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and scheduled via `TaskManager::publish_task()`
//! 2. The task's `process()` method is called on a worker thread
//! 3. The task returns a boxed `TaskResult`
//! 4. The result's `handle_result()` is called on the thread driving the streamer
//! 5. The result can spawn follow-up tasks and report stream events
//!
//! ## Thread Safety
//! - `Task` must be `Send` to be transferred to a worker
//! - `TaskResult` must be `Send` to be transferred back
//! - Shared state lives in the `StreamingContext`, which synchronises itself

use std::sync::Arc;

use crate::error::TerrainError;
use crate::streaming::{StreamEvent, StreamingContext};

/// A unit of work executed on a worker thread.
///
/// Tasks own everything they need, including a handle to the shared
/// [`StreamingContext`], so they can be moved across threads freely.
pub trait Task: Send {
    /// Performs the work and returns a result to be handled by the streamer.
    ///
    /// Errors are not propagated from here; they are carried inside the
    /// result so `handle_result` can clean up and report them.
    fn process(&self) -> Box<dyn TaskResult>;

    /// The result reported in place of `process` when it panicked, so the
    /// task's request still releases its resources and reports `error`.
    fn fail(&self, error: TerrainError) -> Box<dyn TaskResult>;
}

/// The outcome of a processed [`Task`].
pub trait TaskResult: Send {
    /// Handles the result on the thread driving the streamer.
    ///
    /// # Returns
    /// A tuple containing:
    /// 1. Follow-up tasks to schedule (can be empty)
    /// 2. Events to report to the caller (can be empty)
    fn handle_result(
        self: Box<Self>,
        context: &Arc<StreamingContext>,
    ) -> (Vec<Box<dyn Task>>, Vec<StreamEvent>);
}
