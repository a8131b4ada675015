use crate::error::RollError;
use image::DynamicImage;
use imageproc::filter::median_filter;

/// Apply median filter to remove scanner speckle
/// Speckle between lines would otherwise show up as spurious line bands
pub fn apply(image: DynamicImage) -> Result<DynamicImage, RollError> {
    let gray = image.to_luma8();
    // 3x3 median filter (radius 1)
    let denoised = median_filter(&gray, 1, 1);
    Ok(DynamicImage::ImageLuma8(denoised))
}
