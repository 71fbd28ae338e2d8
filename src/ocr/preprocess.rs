use anyhow::{Result, anyhow};
use image::{DynamicImage, GrayImage};

use crate::automation::config::PixelRect;

/// Crops a region from an image and converts it to grayscale for recognition.
///
/// The rect is clamped to the image bounds. Returns `None` when nothing of the
/// region lies inside the image.
pub fn crop_region(img: &DynamicImage, region: &PixelRect) -> Option<GrayImage> {
    let (w, h) = (img.width(), img.height());

    let x0 = region.left.min(w);
    let y0 = region.top.min(h);
    let x1 = region.right.min(w);
    let y1 = region.bottom.min(h);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(img.crop_imm(x0, y0, x1 - x0, y1 - y0).to_luma8())
}

/// Rotates an image clockwise by a multiple of 90 degrees.
///
/// Negative angles rotate counter-clockwise. Anything that is not a multiple
/// of 90 is rejected.
pub fn rotate_quarter_turns(img: &DynamicImage, degrees: i32) -> Result<DynamicImage> {
    if degrees % 90 != 0 {
        return Err(anyhow!("Rotation must be a multiple of 90 degrees, got {}", degrees));
    }

    Ok(match degrees.rem_euclid(360) {
        90 => img.rotate90(),
        180 => img.rotate180(),
        270 => img.rotate270(),
        _ => img.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([x as u8, y as u8, 0])
        }))
    }

    #[test]
    fn test_crop_region() {
        let img = gradient(100, 200);
        let cropped = crop_region(&img, &PixelRect::new(10, 50, 60, 70)).unwrap();

        assert_eq!(cropped.dimensions(), (50, 20));
        // Red grows left to right, so luma does too
        assert!(cropped.get_pixel(0, 0)[0] < cropped.get_pixel(49, 0)[0]);
    }

    #[test]
    fn test_crop_region_clamps() {
        let img = gradient(100, 100);
        let cropped = crop_region(&img, &PixelRect::new(90, 90, 150, 150)).unwrap();

        // Should clamp to 10x10 (remaining pixels)
        assert_eq!(cropped.dimensions(), (10, 10));
    }

    #[test]
    fn test_crop_region_outside_image() {
        let img = gradient(200, 200);
        assert!(crop_region(&img, &PixelRect::new(300, 400, 650, 600)).is_none());
        assert!(crop_region(&img, &PixelRect::new(50, 50, 50, 80)).is_none());
    }

    #[test]
    fn test_rotate_quarter_turns() {
        let img = gradient(40, 10);

        assert_eq!(rotate_quarter_turns(&img, 90).unwrap().width(), 10);
        assert_eq!(rotate_quarter_turns(&img, -90).unwrap().width(), 10);
        assert_eq!(rotate_quarter_turns(&img, 180).unwrap().width(), 40);
        assert_eq!(rotate_quarter_turns(&img, 360).unwrap().width(), 40);
        assert!(rotate_quarter_turns(&img, 45).is_err());
    }

    #[test]
    fn test_rotate_180_moves_corner() {
        let img = gradient(4, 3);
        let rotated = rotate_quarter_turns(&img, 180).unwrap().to_rgb8();
        // Original bottom-right (3, 2) lands at top-left
        assert_eq!(rotated.get_pixel(0, 0), &Rgb([3, 2, 0]));
    }
}
