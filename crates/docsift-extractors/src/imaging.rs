//! Image transformations applied before recognition.

use docsift_core::Rotation;
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::Path;

use crate::error::{ExtractError, ExtractResult};

/// Images whose shorter side is below this many pixels are upsampled.
pub const MIN_SHORT_SIDE: u32 = 600;

/// Rotate clockwise by the requested amount.
pub fn rotate(image: DynamicImage, rotation: Rotation) -> DynamicImage {
    match rotation {
        Rotation::None => image,
        Rotation::Cw90 => image.rotate90(),
        Rotation::Cw270 => image.rotate270(),
    }
}

/// Upsample 2x in place when the image is small. Returns whether it was resized.
pub fn upsample_if_small(path: &Path) -> ExtractResult<bool> {
    let img = image::open(path).map_err(|e| ExtractError::Image(e.to_string()))?;
    if img.width().min(img.height()) >= MIN_SHORT_SIDE {
        return Ok(false);
    }
    let resized = img.resize_exact(img.width() * 2, img.height() * 2, FilterType::CatmullRom);
    resized
        .save(path)
        .map_err(|e| ExtractError::Image(e.to_string()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_rotate_swaps_dimensions() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(40, 10));
        let rotated = rotate(img.clone(), Rotation::Cw90);
        assert_eq!((rotated.width(), rotated.height()), (10, 40));
        let same = rotate(img, Rotation::None);
        assert_eq!((same.width(), same.height()), (40, 10));
    }

    #[test]
    fn test_upsample_small_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        GrayImage::from_pixel(100, 50, Luma([255u8])).save(&path).unwrap();

        assert!(upsample_if_small(&path).unwrap());
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (200, 100));
    }

    #[test]
    fn test_large_image_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        GrayImage::new(800, 600).save(&path).unwrap();
        assert!(!upsample_if_small(&path).unwrap());
    }
}
