//! Texture recompression.
//!
//! One texture in, one texture out, and the output is never larger than
//! the input: every failure path and every unprofitable encode falls back
//! to the original bytes. The pipeline relies on this to keep a single bad
//! texture from poisoning a whole pack.

use anyhow::{Context, Result, bail};
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader, imageops};
use std::io::Cursor;
use tracing::{debug, warn};

use super::options::{EffectiveOptions, OutputFormat};

/// Images with both dimensions at or below this are already minimal.
const SIZE_FLOOR: u32 = 32;

/// Images with either dimension at or above this count as HD and get resized.
pub const HD_THRESHOLD: u32 = 512;

/// Palette size for aggressive PNG encoding.
const AGGRESSIVE_PALETTE_COLORS: usize = 128;

/// Read image dimensions without a full decode.
pub fn probe_dimensions(data: &[u8]) -> Result<(u32, u32)> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .context("unrecognized image container")?;
    Ok(reader.into_dimensions()?)
}

/// Recompress a texture, returning the smaller of the encode and the input.
///
/// All errors are recoverable by contract: a texture that cannot be
/// decoded or encoded is logged and passed through byte-identical.
pub fn recompress_image(data: &[u8], name: &str, opts: &EffectiveOptions) -> Vec<u8> {
    match try_recompress(data, opts) {
        Ok(Some(encoded)) if encoded.len() < data.len() => {
            debug!(
                name,
                original = data.len(),
                optimized = encoded.len(),
                "texture recompressed"
            );
            encoded
        }
        Ok(Some(_)) => {
            debug!(name, "recompression did not shrink, keeping original");
            data.to_vec()
        }
        Ok(None) => data.to_vec(),
        Err(e) => {
            warn!(name, error = %e, "texture recompression failed, keeping original");
            data.to_vec()
        }
    }
}

/// The fallible part of recompression.
///
/// `Ok(None)` means the image is below the size floor and is deliberately
/// left alone. `Ok(Some(bytes))` is an encode the caller still has to
/// size-check against the input.
fn try_recompress(data: &[u8], opts: &EffectiveOptions) -> Result<Option<Vec<u8>>> {
    if data.is_empty() {
        bail!("empty image buffer");
    }

    let mut img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .context("unrecognized image container")?
        .decode()
        .context("image decode failed")?;

    let (width, height) = img.dimensions();
    if width <= SIZE_FLOOR && height <= SIZE_FLOOR {
        return Ok(None);
    }

    if width >= HD_THRESHOLD || height >= HD_THRESHOLD {
        let (target_w, target_h) = fit_dimensions(width, height, opts.resolution);
        if (target_w, target_h) != (width, height) {
            img = resize_contain(&img, target_w, target_h);
        }
    }

    let encoded = match opts.format {
        OutputFormat::Png if opts.aggressive => {
            encode_indexed_png(&img.to_rgba8(), opts.quality.saturating_sub(5).max(1))?
        }
        OutputFormat::Png => encode_truecolor_png(&img)?,
        OutputFormat::Webp => encode_webp(&img, opts.quality)?,
    };

    Ok(Some(encoded))
}

/// Compute the post-resize canvas size for an HD image.
///
/// Square images scale both dimensions to min(target, original).
/// Non-square images scale the longer dimension to min(target, longer)
/// and derive the other from the aspect ratio, rounded to nearest.
fn fit_dimensions(width: u32, height: u32, target: u32) -> (u32, u32) {
    if width == height {
        let side = target.min(width);
        return (side, side);
    }

    let longer = width.max(height);
    let new_longer = target.min(longer);
    let scale = new_longer as f64 / longer as f64;

    if width > height {
        (new_longer, ((height as f64 * scale).round() as u32).max(1))
    } else {
        (((width as f64 * scale).round() as u32).max(1), new_longer)
    }
}

/// Contain-resize onto a transparent canvas of exactly the given size.
///
/// The source is never upscaled: `resize` only shrinks here because the
/// target never exceeds the original dimensions.
fn resize_contain(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let resized = img.resize(width, height, FilterType::Lanczos3).to_rgba8();
    let mut canvas = image::RgbaImage::new(width, height);
    let x = ((width - resized.width()) / 2) as i64;
    let y = ((height - resized.height()) / 2) as i64;
    imageops::overlay(&mut canvas, &resized, x, y);
    DynamicImage::ImageRgba8(canvas)
}

/// Truecolor PNG at maximum compression with adaptive filtering.
fn encode_truecolor_png(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(
        Cursor::new(&mut out),
        CompressionType::Best,
        PngFilterType::Adaptive,
    );
    img.write_with_encoder(encoder)
        .context("png encode failed")?;
    Ok(out)
}

/// Indexed-palette PNG for the aggressive path.
///
/// NeuQuant quantizes to at most 128 colors; quality steers the sampling
/// factor (higher quality samples more of the image).
fn encode_indexed_png(rgba: &image::RgbaImage, quality: u8) -> Result<Vec<u8>> {
    // NeuQuant sample factor: 1 = slowest/best, 30 = fastest/worst.
    let samplefac = ((100 - quality as i32) / 10 + 1).clamp(1, 30);
    let quantizer = color_quant::NeuQuant::new(samplefac, AGGRESSIVE_PALETTE_COLORS, rgba.as_raw());

    let map = quantizer.color_map_rgba();
    let mut palette = Vec::with_capacity(AGGRESSIVE_PALETTE_COLORS * 3);
    let mut trns = Vec::with_capacity(AGGRESSIVE_PALETTE_COLORS);
    for entry in map.chunks_exact(4) {
        palette.extend_from_slice(&entry[..3]);
        trns.push(entry[3]);
    }

    let indices: Vec<u8> = rgba
        .pixels()
        .map(|p| quantizer.index_of(&p.0) as u8)
        .collect();

    let mut out = Vec::new();
    let mut encoder = png::Encoder::new(Cursor::new(&mut out), rgba.width(), rgba.height());
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Best);
    encoder.set_palette(palette);
    encoder.set_trns(trns);
    let mut writer = encoder.write_header().context("png header failed")?;
    writer
        .write_image_data(&indices)
        .context("png encode failed")?;
    writer.finish().context("png finish failed")?;
    Ok(out)
}

/// Lossy WebP at high encoder effort with near-lossless alpha.
fn encode_webp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgba = img.to_rgba8();
    let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());

    let mut config =
        webp::WebPConfig::new().map_err(|_| anyhow::anyhow!("webp config init failed"))?;
    config.quality = quality as f32;
    config.method = 6; // highest effort
    config.alpha_quality = 95;

    let memory = encoder
        .encode_advanced(&config)
        .map_err(|e| anyhow::anyhow!("webp encode failed: {e:?}"))?;
    Ok(memory.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::test_images::{flat_png, noise_png};

    fn opts(resolution: u32, format: OutputFormat, aggressive: bool) -> EffectiveOptions {
        EffectiveOptions {
            resolution,
            quality: 85,
            format,
            aggressive,
        }
    }

    #[test]
    fn tiny_images_pass_through_byte_identical() {
        let input = noise_png(16, 16);
        let output = recompress_image(&input, "tiny.png", &opts(256, OutputFormat::Png, false));
        assert_eq!(output, input);
    }

    #[test]
    fn empty_and_corrupt_inputs_fall_back() {
        let o = opts(256, OutputFormat::Png, false);
        assert_eq!(recompress_image(&[], "empty.png", &o), Vec::<u8>::new());

        let garbage = vec![0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x11];
        assert_eq!(recompress_image(&garbage, "bad.png", &o), garbage);
    }

    #[test]
    fn output_never_exceeds_input() {
        // A flat 64x64 PNG is already near-minimal; any re-encode that
        // grows it must be discarded in favor of the original.
        let input = flat_png(64, 64);
        let output = recompress_image(&input, "flat.png", &opts(256, OutputFormat::Png, false));
        assert!(output.len() <= input.len());
    }

    #[test]
    fn hd_square_resizes_to_cap() {
        let input = noise_png(1024, 1024);
        let output = recompress_image(&input, "hd.png", &opts(256, OutputFormat::Png, false));
        assert!(output.len() < input.len());
        let img = image::load_from_memory(&output).unwrap();
        assert_eq!(img.dimensions(), (256, 256));
    }

    #[test]
    fn hd_non_square_keeps_aspect_ratio() {
        let input = noise_png(1024, 512);
        let output = recompress_image(&input, "wide.png", &opts(256, OutputFormat::Png, false));
        let img = image::load_from_memory(&output).unwrap();
        assert_eq!(img.dimensions(), (256, 128));
    }

    #[test]
    fn sub_hd_images_are_not_resized() {
        let input = noise_png(300, 300);
        let output = recompress_image(&input, "mid.png", &opts(64, OutputFormat::Png, false));
        let img = image::load_from_memory(&output).unwrap();
        assert_eq!(img.dimensions(), (300, 300));
    }

    #[test]
    fn aggressive_png_is_indexed_and_smaller_on_noise() {
        let input = noise_png(512, 512);
        let output = recompress_image(&input, "noisy.png", &opts(256, OutputFormat::Png, true));
        assert!(output.len() < input.len());
        // Still decodable after palette quantization
        let img = image::load_from_memory(&output).unwrap();
        assert_eq!(img.dimensions(), (256, 256));
    }

    #[test]
    fn webp_output_is_webp_container() {
        let input = noise_png(512, 512);
        let output = recompress_image(&input, "tex.png", &opts(256, OutputFormat::Webp, false));
        assert!(output.len() < input.len());
        assert_eq!(&output[0..4], b"RIFF");
        assert_eq!(&output[8..12], b"WEBP");
    }

    #[test]
    fn fit_dimensions_table() {
        assert_eq!(fit_dimensions(1024, 1024, 256), (256, 256));
        assert_eq!(fit_dimensions(128, 128, 256), (128, 128));
        assert_eq!(fit_dimensions(1024, 512, 256), (256, 128));
        assert_eq!(fit_dimensions(512, 1024, 256), (128, 256));
        assert_eq!(fit_dimensions(1000, 600, 2000), (1000, 600));
    }

    #[test]
    fn probe_reads_dimensions() {
        let input = flat_png(48, 96);
        assert_eq!(probe_dimensions(&input).unwrap(), (48, 96));
        assert!(probe_dimensions(b"not an image").is_err());
    }
}
