//! The recompression pipeline.
//!
//! Everything with decision logic lives here: classification and priority
//! heuristics ([`classify`]), option resolution ([`options`]), texture
//! recompression ([`recompress`]), and the per-entry orchestration that
//! ties them to the zip layer ([`pipeline`]). All of it is request-scoped;
//! nothing is shared between runs.

pub mod classify;
pub mod options;
pub mod pipeline;
pub mod recompress;
pub mod stats;

pub use classify::{EntryCategory, PriorityTier, classify_entry, priority_for_path};
pub use options::{DeviceMode, OutputFormat, ProcessingOptions};
pub use pipeline::{OptimizedPack, optimize_archive};
pub use stats::OptimizationStats;
