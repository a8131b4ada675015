use crate::error::RollError;
use image::DynamicImage;

/// Convert image to grayscale
/// Line detection and Tesseract both work on a single intensity channel
pub fn apply(image: DynamicImage) -> Result<DynamicImage, RollError> {
    Ok(DynamicImage::ImageLuma8(image.to_luma8()))
}
