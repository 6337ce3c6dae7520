//! Entry classification and priority heuristics.
//!
//! Both functions here are pure over the entry path so they can be tested
//! table-style without any archive or image I/O. Classification decides
//! whether an entry is touched at all; the priority tier only picks the
//! resolution cap applied to images.

/// What the pipeline does with an archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryCategory {
    /// Pack metadata, models, fonts - copied through untouched.
    Critical,
    /// Audio files - copied through untouched (no audio compression yet).
    Sound,
    /// Raster textures - candidates for recompression.
    Image,
    /// Anything else - copied through untouched.
    Other,
}

/// Resolution-cap tier for an image entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityTier {
    High,
    Medium,
    Low,
}

/// Substrings that mark custom character/mob content. Packs built around
/// these almost always ship oversized HD textures, so they downscale hard.
const HD_CONTENT_KEYWORDS: &[&str] = &[
    "ninja",
    "samurai",
    "warrior",
    "mage",
    "assassin",
    "paladin",
    "reaper",
    "dragon",
    "awakened",
];

const SOUND_EXTENSIONS: &[&str] = &[".ogg", ".wav", ".mp3"];
const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg"];
const CRITICAL_EXTENSIONS: &[&str] = &[".mcmeta", ".json", ".bbmodel", ".txt", ".properties"];

/// Classify an entry by name.
///
/// Total over all strings, and checked in fixed precedence order:
/// critical, then sound, then image, then other. A name matching a
/// critical pattern is never treated as an image even if it carries an
/// image extension (pack.png being the canonical case).
pub fn classify_entry(name: &str) -> EntryCategory {
    let lower = name.to_lowercase();

    if lower == "pack.mcmeta"
        || lower == "pack.png"
        || CRITICAL_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        || has_font_segment(&lower)
    {
        return EntryCategory::Critical;
    }

    if SOUND_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return EntryCategory::Sound;
    }

    if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return EntryCategory::Image;
    }

    EntryCategory::Other
}

/// A path segment named "font", e.g. `assets/minecraft/font/ascii.png`.
fn has_font_segment(lower: &str) -> bool {
    lower.split('/').any(|segment| segment == "font")
}

/// Derive the priority tier from a path, first-match-wins.
pub fn priority_for_path(name: &str) -> PriorityTier {
    let lower = name.to_lowercase();

    if lower.contains("modelengine") {
        return PriorityTier::High;
    }
    if HD_CONTENT_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return PriorityTier::High;
    }
    if lower.contains("items") || lower.contains("weapons") {
        return PriorityTier::Medium;
    }
    if lower.contains("assets/minecraft/textures/") {
        return PriorityTier::Low;
    }
    PriorityTier::Medium
}

/// Resolution cap for a tier, given the caller's base resolution.
///
/// High tier forces an aggressive downscale for presumed HD custom
/// content; Low tier loosens the cap for vanilla-classified textures that
/// are assumed near-optimal already.
pub fn target_resolution(tier: PriorityTier, base: u32) -> u32 {
    match tier {
        PriorityTier::High => base.min(256),
        PriorityTier::Medium => base,
        PriorityTier::Low => ((base as f64 * 1.5).round() as u32).min(512),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_critical_entries() {
        for name in [
            "pack.mcmeta",
            "PACK.PNG",
            "assets/thing/animation.mcmeta",
            "assets/models/sword.bbmodel",
            "credits.TXT",
            "optifine/emissive.properties",
            "assets/minecraft/font/glyphs.png",
            "data/config.json",
        ] {
            assert_eq!(classify_entry(name), EntryCategory::Critical, "{name}");
        }
    }

    #[test]
    fn critical_takes_precedence_over_image() {
        // pack.png has an image extension but is pack metadata
        assert_eq!(classify_entry("pack.png"), EntryCategory::Critical);
        // font textures stay untouched even as .png
        assert_eq!(
            classify_entry("assets/minecraft/font/ascii.png"),
            EntryCategory::Critical
        );
    }

    #[test]
    fn classifies_sounds_and_images() {
        assert_eq!(classify_entry("sounds/boom.OGG"), EntryCategory::Sound);
        assert_eq!(classify_entry("sounds/music.wav"), EntryCategory::Sound);
        assert_eq!(classify_entry("a/b/c.mp3"), EntryCategory::Sound);
        assert_eq!(classify_entry("textures/stone.png"), EntryCategory::Image);
        assert_eq!(classify_entry("photo.JPEG"), EntryCategory::Image);
        assert_eq!(classify_entry("photo.jpg"), EntryCategory::Image);
    }

    #[test]
    fn everything_else_is_other() {
        assert_eq!(classify_entry("shader.fsh"), EntryCategory::Other);
        assert_eq!(classify_entry(""), EntryCategory::Other);
        assert_eq!(classify_entry("no_extension"), EntryCategory::Other);
    }

    #[test]
    fn fontlike_substrings_are_not_font_segments() {
        // "fonts/" and "font2/" are not the segment "font/"
        assert_eq!(classify_entry("fonts/a.png"), EntryCategory::Image);
        assert_eq!(classify_entry("font2/a.png"), EntryCategory::Image);
    }

    #[test]
    fn priority_rules_first_match_wins() {
        assert_eq!(
            priority_for_path("assets/modelengine/mob/slime.png"),
            PriorityTier::High
        );
        // "dragon" keyword beats the items rule by order
        assert_eq!(
            priority_for_path("items/dragon_sword.png"),
            PriorityTier::High
        );
        assert_eq!(priority_for_path("pack/WEAPONS/axe.png"), PriorityTier::Medium);
        assert_eq!(
            priority_for_path("assets/minecraft/textures/block/stone.png"),
            PriorityTier::Low
        );
        assert_eq!(priority_for_path("misc/banner.png"), PriorityTier::Medium);
    }

    #[test]
    fn resolution_caps_per_tier() {
        assert_eq!(target_resolution(PriorityTier::High, 512), 256);
        assert_eq!(target_resolution(PriorityTier::High, 128), 128);
        assert_eq!(target_resolution(PriorityTier::Medium, 300), 300);
        assert_eq!(target_resolution(PriorityTier::Low, 256), 384);
        assert_eq!(target_resolution(PriorityTier::Low, 512), 512);
    }
}
