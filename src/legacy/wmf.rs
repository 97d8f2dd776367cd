//! Display size of placeable Windows Metafiles

use std::path::Path;

const PLACEABLE_MAGIC: u32 = 0x9AC6_CDD7;
const SCREEN_DPI: f64 = 96.0;

/// Size in pixels at 96 DPI from the placeable header, when there is one.
///
/// Header layout (little endian): magic `u32`, handle `u16`, bounding box
/// `i16 × 4` (left, top, right, bottom), units per inch `i16`.
pub fn placeable_size(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 22 {
        return None;
    }
    let magic = u32::from_le_bytes(data[0..4].try_into().ok()?);
    if magic != PLACEABLE_MAGIC {
        return None;
    }
    let word = |offset: usize| -> Option<i16> {
        Some(i16::from_le_bytes(data[offset..offset + 2].try_into().ok()?))
    };
    let (left, top, right, bottom) = (word(6)?, word(8)?, word(10)?, word(12)?);
    let inch = word(14)?;
    if inch <= 0 {
        return None;
    }
    let to_pixels = |extent: i32| -> u32 {
        let pixels = (f64::from(extent) * SCREEN_DPI / f64::from(inch)).round();
        pixels.max(1.0) as u32
    };
    Some((
        to_pixels(i32::from(right) - i32::from(left)),
        to_pixels(i32::from(bottom) - i32::from(top)),
    ))
}

/// [`placeable_size`] of a file; unreadable files have no known size
pub fn metafile_size(path: &Path) -> Option<(u32, u32)> {
    std::fs::read(path)
        .ok()
        .and_then(|data| placeable_size(&data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeable_header(right: i16, bottom: i16, inch: i16) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&PLACEABLE_MAGIC.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        for v in [0i16, 0, right, bottom, inch] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&[0u8; 6]);
        data
    }

    #[test]
    fn test_placeable_header_size() {
        // 1440 units per inch: 2880 × 720 units is 2 × 0.5 inches
        assert_eq!(placeable_size(&placeable_header(2880, 720, 1440)), Some((192, 48)));
    }

    #[test]
    fn test_invalid_headers_have_no_size() {
        assert_eq!(placeable_size(&[0u8; 10]), None);
        let mut data = placeable_header(100, 100, 1440);
        data[0] = 0;
        assert_eq!(placeable_size(&data), None);
        assert_eq!(placeable_size(&placeable_header(100, 100, 0)), None);
    }

    #[test]
    fn test_tiny_extent_is_at_least_one_pixel() {
        assert_eq!(placeable_size(&placeable_header(1, 0, 1440)), Some((1, 1)));
    }
}
