//! Shared utilities for the tutorial programs.

/// Frame timing and periodic FPS logging.
pub mod frame_timing;

pub use frame_timing::FrameTiming;
