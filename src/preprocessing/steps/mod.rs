//! Individual preprocessing steps

pub mod contrast;
pub mod denoise;
pub mod grayscale;
pub mod line_spacing;
