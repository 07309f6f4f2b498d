//! # Voxel Terrain Demo Entry Point
//!
//! Streams a column of procedural terrain and logs the results. It simply
//! calls into the library's `run()` function.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release
//! ```

fn main() {
    if let Err(e) = voxel_terrain::run() {
        log::error!("Streaming demo failed: {}", e);
        std::process::exit(1);
    }
}
