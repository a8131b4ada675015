use crate::error::RollError;
use crate::layout::lines::{reconstruct_lines, LineSpacing};
use image::DynamicImage;

/// Re-render the column with uniform spacing between detected text lines
pub fn apply(image: DynamicImage, params: &LineSpacing) -> Result<DynamicImage, RollError> {
    Ok(DynamicImage::ImageLuma8(reconstruct_lines(&image, params)))
}
