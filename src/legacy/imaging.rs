//! Bitmap post-processing for rasterized formulas
//!
//! Trimming, OCR enhancement and OCR preparation. Enhancement follows the
//! usual blend-with-degenerate formulation: contrast blends against the mean
//! gray level, sharpness against a 3×3 smoothed copy.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};

use super::error::LegacyError;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Composite any alpha channel onto white and drop it
pub fn flatten_on_white(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u32::from(a);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

fn luma(pixel: &Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0;
    ((u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114) / 1000) as u8
}

/// Bounding box `(x1, y1, x2, y2)` (exclusive end) of pixels darker than
/// `threshold`
pub fn ink_bounds(image: &RgbImage, threshold: u8) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if luma(pixel) >= threshold {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x + 1, y + 1),
            Some((x1, y1, x2, y2)) => (x1.min(x), y1.min(y), x2.max(x + 1), y2.max(y + 1)),
        });
    }
    bounds
}

/// Crop the near-white border around the ink, keeping `padding` pixels.
///
/// Returns `false` without touching the file when there is no ink or the
/// padded box already covers the whole image.
pub fn trim_whitespace(path: &Path, padding: u32, threshold: u8) -> Result<bool, LegacyError> {
    let image = flatten_on_white(image::open(path)?);
    let (width, height) = image.dimensions();
    let Some((x1, y1, x2, y2)) = ink_bounds(&image, threshold) else {
        return Ok(false);
    };
    let x1 = x1.saturating_sub(padding);
    let y1 = y1.saturating_sub(padding);
    let x2 = (x2 + padding).min(width);
    let y2 = (y2 + padding).min(height);
    if x1 == 0 && y1 == 0 && x2 == width && y2 == height {
        return Ok(false);
    }
    let cropped = imageops::crop_imm(&image, x1, y1, x2 - x1, y2 - y1).to_image();
    cropped.save(path)?;
    Ok(true)
}

/// Raise contrast and sharpness in place, for OCR
pub fn enhance_for_ocr(path: &Path, contrast: f32, sharpness: f32) -> Result<(), LegacyError> {
    let image = flatten_on_white(image::open(path)?);
    let image = adjust_sharpness(&adjust_contrast(&image, contrast), sharpness);
    image.save(path)?;
    Ok(())
}

fn blend(degenerate: f32, value: u8, factor: f32) -> u8 {
    (degenerate + factor * (f32::from(value) - degenerate))
        .round()
        .clamp(0.0, 255.0) as u8
}

pub fn adjust_contrast(image: &RgbImage, factor: f32) -> RgbImage {
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return image.clone();
    }
    let total: u64 = image.pixels().map(|p| u64::from(luma(p))).sum();
    let mean = (total as f64 / count as f64 + 0.5).floor() as f32;

    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = blend(mean, *channel, factor);
        }
    }
    out
}

/// Sharpen against a smoothed copy; kernel `[1 1 1; 1 5 1; 1 1 1] / 13`,
/// border pixels unchanged
pub fn adjust_sharpness(image: &RgbImage, factor: f32) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut out = image.clone();
    if width < 3 || height < 3 {
        return out;
    }
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut sums = [0u32; 3];
            for dy in 0..3 {
                for dx in 0..3 {
                    let weight = if dx == 1 && dy == 1 { 5 } else { 1 };
                    let p = image.get_pixel(x + dx - 1, y + dy - 1);
                    for (sum, c) in sums.iter_mut().zip(p.0) {
                        *sum += weight * u32::from(c);
                    }
                }
            }
            let original = image.get_pixel(x, y).0;
            let mut sharpened = [0u8; 3];
            for i in 0..3 {
                let smooth = ((sums[i] + 6) / 13) as f32;
                sharpened[i] = blend(smooth, original[i], factor);
            }
            out.put_pixel(x, y, Rgb(sharpened));
        }
    }
    out
}

/// Bitmap handed to the formula recognizer: flattened, upscaled so both
/// sides reach `min_dimension`, and framed by a white `border`
pub fn prepare_for_ocr(image: DynamicImage, min_dimension: u32, border: u32) -> RgbImage {
    let mut image = flatten_on_white(image);
    let (width, height) = image.dimensions();
    if width > 0 && height > 0 && (width < min_dimension || height < min_dimension) {
        let scale = (min_dimension as f32 / width as f32)
            .max(min_dimension as f32 / height as f32)
            .max(1.0);
        let new_width = (width as f32 * scale).round() as u32;
        let new_height = (height as f32 * scale).round() as u32;
        image = imageops::resize(&image, new_width, new_height, FilterType::Lanczos3);
    }
    if border == 0 {
        return image;
    }
    let mut framed = RgbImage::from_pixel(
        image.width() + 2 * border,
        image.height() + 2 * border,
        WHITE,
    );
    imageops::overlay(&mut framed, &image, i64::from(border), i64::from(border));
    framed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas_with_dot(width: u32, height: u32, x: u32, y: u32) -> RgbImage {
        let mut image = RgbImage::from_pixel(width, height, WHITE);
        image.put_pixel(x, y, Rgb([0, 0, 0]));
        image
    }

    #[test]
    fn test_ink_bounds_ignores_near_white() {
        let mut image = canvas_with_dot(50, 40, 10, 20);
        image.put_pixel(2, 2, Rgb([250, 250, 250]));
        assert_eq!(ink_bounds(&image, 248), Some((10, 20, 11, 21)));
        assert_eq!(ink_bounds(&RgbImage::from_pixel(5, 5, WHITE), 248), None);
    }

    #[test]
    fn test_trim_crops_with_padding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.png");
        canvas_with_dot(100, 100, 50, 50).save(&path).unwrap();

        assert!(trim_whitespace(&path, 5, 248).unwrap());
        let trimmed = image::open(&path).unwrap();
        assert_eq!((trimmed.width(), trimmed.height()), (11, 11));

        // Already tight: a second pass is a no-op
        assert!(!trim_whitespace(&path, 5, 248).unwrap());
    }

    #[test]
    fn test_flatten_transparent_to_white() {
        let rgba = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 0]));
        let flat = flatten_on_white(DynamicImage::ImageRgba8(rgba));
        assert_eq!(flat.get_pixel(0, 0), &WHITE);
    }

    #[test]
    fn test_prepare_upscales_and_frames() {
        let small = DynamicImage::ImageRgb8(canvas_with_dot(40, 20, 5, 5));
        let prepared = prepare_for_ocr(small, 80, 25);
        assert_eq!(prepared.dimensions(), (160 + 50, 80 + 50));
        assert_eq!(prepared.get_pixel(0, 0), &WHITE);
    }

    #[test]
    fn test_contrast_pushes_away_from_mean() {
        let mut image = RgbImage::from_pixel(2, 1, Rgb([100, 100, 100]));
        image.put_pixel(1, 0, Rgb([200, 200, 200]));
        let out = adjust_contrast(&image, 1.4);
        assert!(out.get_pixel(0, 0).0[0] < 100);
        assert!(out.get_pixel(1, 0).0[0] > 200);
    }
}
