//! # packpress
//!
//! An HTTP service that shrinks Minecraft resource packs.
//!
//! A pack is uploaded as a zip archive; packpress walks its entries,
//! recompresses the textures it can safely touch and re-serializes the
//! archive under maximum deflate compression, returning the result
//! together with per-category savings statistics. Pack metadata, models,
//! fonts and sounds are passed through byte-identical.
//!
//! ## Features
//!
//! - Classification of entries into critical / sound / image / other
//! - Path-based priority tiers driving per-texture resolution caps
//! - PNG (truecolor or 128-color indexed) and lossy WebP re-encoding
//! - Device-mode profiles (potato / balanced / quality)
//! - Per-texture failure isolation: a broken image is copied through,
//!   never aborts the upload
//!
//! ## Example
//!
//! ```no_run
//! use packpress::optimize::{ProcessingOptions, optimize_archive};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pack = std::fs::read("my-pack.zip")?;
//!     let result = optimize_archive(pack, &ProcessingOptions::default()).await?;
//!     println!(
//!         "{} -> {} bytes ({:.1}% saved)",
//!         result.stats.original_size,
//!         result.stats.final_zip_size,
//!         result.stats.saved_percent
//!     );
//!     std::fs::write("my-pack-optimized.zip", result.archive)?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod io;
pub mod optimize;
pub mod server;
pub mod zip;

pub use cli::Cli;
pub use io::{MemoryReader, ReadAt};
pub use optimize::{OptimizationStats, OptimizedPack, ProcessingOptions, optimize_archive};
pub use zip::{ArchiveReader, ArchiveWriter, ZipEntry};
