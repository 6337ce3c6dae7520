//! Per-entry orchestration and archive assembly.
//!
//! Entries are processed strictly sequentially in the archive's directory
//! order. A failure on one entry never aborts the run: the entry is copied
//! through unmodified and counted as skipped. Only container-level
//! failures (unparseable upload, serialization) abort the request.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::io::MemoryReader;
use crate::zip::{ArchiveReader, ArchiveWriter, ZipEntry};

use super::classify::{EntryCategory, classify_entry, priority_for_path, target_resolution};
use super::options::{OutputFormat, ProcessingOptions};
use super::recompress::{HD_THRESHOLD, probe_dimensions, recompress_image};
use super::stats::OptimizationStats;

/// Result of one optimization run.
pub struct OptimizedPack {
    pub archive: Vec<u8>,
    pub stats: OptimizationStats,
}

/// Optimize an uploaded resource-pack archive.
///
/// Reads every entry, recompresses image entries according to the
/// classification and priority heuristics, and serializes a fresh archive
/// under maximum deflate compression. Statistics are finalized against the
/// serialized container size.
pub async fn optimize_archive(input: Vec<u8>, options: &ProcessingOptions) -> Result<OptimizedPack> {
    let reader = ArchiveReader::new(Arc::new(MemoryReader::new(input)));
    let entries = reader
        .entries()
        .await
        .context("invalid zip archive in upload")?;

    let mut writer = ArchiveWriter::new();
    let mut stats = OptimizationStats::new();

    for entry in &entries {
        if entry.is_directory {
            writer.add_directory(&entry.file_name)?;
            continue;
        }

        let data = reader
            .read_entry(entry)
            .await
            .with_context(|| format!("failed to extract '{}'", entry.file_name))?;
        let size = data.len() as u64;

        match classify_entry(&entry.file_name) {
            EntryCategory::Critical => {
                stats.record_critical(size);
                writer.add_file(&entry.file_name, &data)?;
            }
            EntryCategory::Sound => {
                stats.record_sound(size);
                writer.add_file(&entry.file_name, &data)?;
            }
            EntryCategory::Other => {
                stats.record_passthrough(size);
                writer.add_file(&entry.file_name, &data)?;
            }
            EntryCategory::Image => match process_image(entry, &data, options, &mut stats) {
                Ok((name, optimized)) => {
                    stats.record_image(&entry.file_name, size, optimized.len() as u64);
                    writer.add_file(&name, &optimized)?;
                }
                Err(e) => {
                    warn!(name = %entry.file_name, error = %e, "entry skipped, copying original");
                    stats.record_skipped(size);
                    writer.add_file(&entry.file_name, &data)?;
                }
            },
        }
    }

    let archive = writer.finish().context("failed to serialize archive")?;
    stats.finalize(archive.len() as u64);

    info!(
        files = stats.total_files,
        images = stats.image_files,
        skipped = stats.skipped_files,
        original = stats.original_size,
        final_size = stats.final_zip_size,
        saved_percent = format!("{:.1}", stats.saved_percent),
        "pack optimized"
    );

    Ok(OptimizedPack { archive, stats })
}

/// Process one image entry, returning its output name and bytes.
///
/// An error here is recoverable by the caller; in practice it means the
/// image metadata could not be read at all.
fn process_image(
    entry: &ZipEntry,
    data: &[u8],
    options: &ProcessingOptions,
    stats: &mut OptimizationStats,
) -> Result<(String, Vec<u8>)> {
    let (width, height) = probe_dimensions(data)?;
    if width >= HD_THRESHOLD || height >= HD_THRESHOLD {
        stats.record_hd_texture();
    }

    let tier = priority_for_path(&entry.file_name);
    let cap = target_resolution(tier, options.target_resolution);
    let effective = options.effective(cap);

    let optimized = recompress_image(data, &entry.file_name, &effective);

    // Rename only when the encode was accepted; a declined recompression
    // keeps PNG bytes and must keep the .png name.
    let converted = optimized.len() < data.len();
    let name = if converted
        && effective.format == OutputFormat::Webp
        && entry.file_name.to_lowercase().ends_with(".png")
    {
        let stem = &entry.file_name[..entry.file_name.len() - 4];
        format!("{stem}.webp")
    } else {
        entry.file_name.clone()
    };

    Ok((name, optimized))
}
