use crate::error::RollError;
use image::{DynamicImage, GrayImage, Luma};

/// Contrast gain applied around the mean intensity
pub const CONTRAST_FACTOR: f32 = 1.5;

/// Boost contrast by scaling each pixel's distance from the image mean
/// Faint scans gain ink density without shifting the background
pub fn apply(image: DynamicImage) -> Result<DynamicImage, RollError> {
    Ok(DynamicImage::ImageLuma8(enhance(
        &image.to_luma8(),
        CONTRAST_FACTOR,
    )))
}

fn enhance(gray: &GrayImage, factor: f32) -> GrayImage {
    let mean = mean_intensity(gray);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let pixel = gray.get_pixel(x, y).0[0] as f32;
        let stretched = mean + factor * (pixel - mean);
        Luma([stretched.round().clamp(0.0, 255.0) as u8])
    })
}

fn mean_intensity(gray: &GrayImage) -> f32 {
    let count = gray.width() as u64 * gray.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    sum as f32 / count as f32
}
