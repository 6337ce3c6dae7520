//! Caller-supplied processing options and device-mode resolution.

use serde::{Deserialize, Serialize};

/// Output format for recompressed images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Webp,
}

impl OutputFormat {
    /// Parse a multipart text field; anything unrecognized keeps the default.
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "webp" => OutputFormat::Webp,
            _ => OutputFormat::Png,
        }
    }
}

/// Quality/performance trade-off profile selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceMode {
    /// Most aggressive: capped resolution, reduced quality, forced aggressive.
    Potato,
    Balanced,
    Quality,
}

impl DeviceMode {
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "balanced" => DeviceMode::Balanced,
            "quality" => DeviceMode::Quality,
            _ => DeviceMode::Potato,
        }
    }
}

/// As-requested processing options, before device-mode overrides.
#[derive(Debug, Clone)]
pub struct ProcessingOptions {
    /// Base resolution cap fed into the priority heuristic.
    pub target_resolution: u32,
    /// Encoder quality, 1-100.
    pub quality: u8,
    pub output_format: OutputFormat,
    pub aggressive: bool,
    pub device_mode: DeviceMode,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            target_resolution: 256,
            quality: 85,
            output_format: OutputFormat::Png,
            aggressive: false,
            device_mode: DeviceMode::Potato,
        }
    }
}

/// Options after device-mode overrides, as handed to the recompressor.
#[derive(Debug, Clone, Copy)]
pub struct EffectiveOptions {
    pub resolution: u32,
    pub quality: u8,
    pub format: OutputFormat,
    pub aggressive: bool,
}

impl ProcessingOptions {
    /// Resolve device-mode overrides for one image.
    ///
    /// `resolution` is the per-file cap already derived from the priority
    /// tier. Potato mode caps it at 256, drops quality by 10 and forces
    /// aggressive encoding regardless of the caller's flag.
    pub fn effective(&self, resolution: u32) -> EffectiveOptions {
        match self.device_mode {
            DeviceMode::Potato => EffectiveOptions {
                resolution: resolution.min(256),
                quality: self.quality.saturating_sub(10).max(1),
                format: self.output_format,
                aggressive: true,
            },
            DeviceMode::Balanced | DeviceMode::Quality => EffectiveOptions {
                resolution,
                quality: self.quality,
                format: self.output_format,
                aggressive: self.aggressive,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_api_contract() {
        let opts = ProcessingOptions::default();
        assert_eq!(opts.target_resolution, 256);
        assert_eq!(opts.quality, 85);
        assert_eq!(opts.output_format, OutputFormat::Png);
        assert!(!opts.aggressive);
        assert_eq!(opts.device_mode, DeviceMode::Potato);
    }

    #[test]
    fn potato_mode_overrides_everything() {
        let opts = ProcessingOptions {
            aggressive: false,
            ..ProcessingOptions::default()
        };
        let eff = opts.effective(512);
        assert_eq!(eff.resolution, 256);
        assert_eq!(eff.quality, 75);
        assert!(eff.aggressive);
    }

    #[test]
    fn balanced_mode_passes_through() {
        let opts = ProcessingOptions {
            device_mode: DeviceMode::Balanced,
            quality: 90,
            ..ProcessingOptions::default()
        };
        let eff = opts.effective(384);
        assert_eq!(eff.resolution, 384);
        assert_eq!(eff.quality, 90);
        assert!(!eff.aggressive);
    }

    #[test]
    fn potato_quality_floor_is_one() {
        let opts = ProcessingOptions {
            quality: 5,
            ..ProcessingOptions::default()
        };
        assert_eq!(opts.effective(100).quality, 1);
    }

    #[test]
    fn parses_field_values_with_fallbacks() {
        assert_eq!(OutputFormat::parse("webp"), OutputFormat::Webp);
        assert_eq!(OutputFormat::parse("WEBP"), OutputFormat::Webp);
        assert_eq!(OutputFormat::parse("gif"), OutputFormat::Png);
        assert_eq!(DeviceMode::parse("quality"), DeviceMode::Quality);
        assert_eq!(DeviceMode::parse("nonsense"), DeviceMode::Potato);
    }
}
