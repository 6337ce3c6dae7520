//! Request-scoped optimization statistics.
//!
//! One accumulator per request, threaded through the pipeline and
//! finalized once the output container has been serialized (the final
//! archive size depends on container-level compression, not on the sum of
//! per-entry sizes). Serialized as camelCase JSON into the
//! `X-Optimization-Stats` response header.

use serde::Serialize;

/// Output size target: packs at or under this are considered "done".
pub const SIZE_TARGET_BYTES: u64 = 13 * 1024 * 1024;

/// Per-category file count and cumulative savings.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CategoryBucket {
    pub count: u64,
    #[serde(rename = "savedBytes")]
    pub saved_bytes: u64,
}

impl CategoryBucket {
    fn record(&mut self, saved: u64) {
        self.count += 1;
        self.saved_bytes += saved;
    }
}

/// Named buckets savings are attributed to, by original-path substring.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CategoryBuckets {
    pub modelengine: CategoryBucket,
    pub items: CategoryBucket,
    pub vanilla: CategoryBucket,
    pub sounds: CategoryBucket,
}

/// Savings and classification counters for one optimization run.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationStats {
    pub total_files: u64,
    pub image_files: u64,
    pub sound_files: u64,
    pub optimized_images: u64,
    pub skipped_files: u64,
    pub critical_files: u64,
    pub hd_textures_found: u64,

    pub original_size: u64,
    pub optimized_size: u64,
    pub final_zip_size: u64,
    pub saved_bytes: u64,
    pub saved_percent: f64,
    pub target_achieved: bool,

    pub categories: CategoryBuckets,
}

impl OptimizationStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pass-through entry (critical, sound, other, or skipped).
    pub fn record_passthrough(&mut self, size: u64) {
        self.total_files += 1;
        self.original_size += size;
        self.optimized_size += size;
    }

    pub fn record_critical(&mut self, size: u64) {
        self.record_passthrough(size);
        self.critical_files += 1;
    }

    pub fn record_sound(&mut self, size: u64) {
        self.record_passthrough(size);
        self.sound_files += 1;
        // Audio compression is deferred, so sounds always save zero.
        self.categories.sounds.record(0);
    }

    pub fn record_skipped(&mut self, size: u64) {
        self.record_passthrough(size);
        self.skipped_files += 1;
    }

    /// Record a processed image entry.
    ///
    /// Savings are attributed against the original (pre-rename) path, so a
    /// texture converted to WebP still lands in the bucket its source path
    /// selects.
    pub fn record_image(&mut self, original_path: &str, original: u64, optimized: u64) {
        self.total_files += 1;
        self.image_files += 1;
        self.original_size += original;
        self.optimized_size += optimized;

        let saved = original.saturating_sub(optimized);
        if saved > 0 {
            self.optimized_images += 1;
        }

        let lower = original_path.to_lowercase();
        if lower.contains("modelengine") {
            self.categories.modelengine.record(saved);
        } else if lower.contains("items") || lower.contains("weapons") {
            self.categories.items.record(saved);
        } else if lower.contains("assets/minecraft") {
            self.categories.vanilla.record(saved);
        }
        // Anything else counts in the totals but in no named bucket.
    }

    pub fn record_hd_texture(&mut self) {
        self.hd_textures_found += 1;
    }

    /// Finalize against the serialized archive size.
    ///
    /// `saved_percent` is intentionally computed against the container
    /// size while `optimized_size` remains the pre-container sum; the two
    /// denominators differ and existing consumers rely on both.
    pub fn finalize(&mut self, final_zip_size: u64) {
        self.final_zip_size = final_zip_size;
        self.saved_bytes = self.original_size.saturating_sub(final_zip_size);
        self.saved_percent = if self.original_size > 0 {
            (self.original_size as f64 - final_zip_size as f64) / self.original_size as f64 * 100.0
        } else {
            0.0
        };
        self.target_achieved = final_zip_size <= SIZE_TARGET_BYTES;
    }
}
