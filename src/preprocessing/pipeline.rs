use crate::error::RollError;
use crate::layout::lines::LineSpacing;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Instant;

use super::steps;

/// Preprocessing preset names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Hand the raw crop to OCR
    None,
    /// Grayscale only, no line reconstruction
    Minimal,
    /// Steps: grayscale, line reconstruction
    #[default]
    Default,
    /// Steps: grayscale, contrast, line reconstruction
    Enhanced,
    /// For faint or speckled scans
    /// Steps: grayscale, contrast, denoise, line reconstruction
    Aggressive,
}

impl Preset {
    /// Get the preset name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Minimal => "minimal",
            Self::Default => "default",
            Self::Enhanced => "enhanced",
            Self::Aggressive => "aggressive",
        }
    }

    /// Whether the preset re-renders text lines
    pub fn reconstructs_lines(&self) -> bool {
        !matches!(self, Self::None | Self::Minimal)
    }
}

impl FromStr for Preset {
    type Err = RollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "minimal" => Ok(Self::Minimal),
            "default" => Ok(Self::Default),
            "enhanced" => Ok(Self::Enhanced),
            "aggressive" => Ok(Self::Aggressive),
            other => Err(RollError::InvalidRequest(format!(
                "Unknown preprocessing preset: {}",
                other
            ))),
        }
    }
}

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingResult {
    /// Preprocessed image (not serialized)
    #[serde(skip)]
    pub image: DynamicImage,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Preset used
    pub preset: String,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Preprocessing pipeline applied to each column crop before OCR
#[derive(Debug, Clone)]
pub struct Pipeline {
    preset: Preset,
    line_spacing: LineSpacing,
}

impl Pipeline {
    pub fn new(preset: Preset, line_spacing: LineSpacing) -> Self {
        Self {
            preset,
            line_spacing,
        }
    }

    /// Process a column crop according to the configured preset
    pub fn process(&self, image: DynamicImage) -> Result<PreprocessingResult, RollError> {
        let start = Instant::now();
        let mut steps_timing = Vec::new();

        if self.preset == Preset::None {
            return Ok(PreprocessingResult {
                image,
                total_time_ms: 0,
                preset: "none".to_string(),
                steps: vec![],
            });
        }

        let mut img = image;

        // All presets except None do grayscale
        img = self.run_step("grayscale", img, &mut steps_timing, steps::grayscale::apply)?;

        if matches!(self.preset, Preset::Enhanced | Preset::Aggressive) {
            img = self.run_step("contrast", img, &mut steps_timing, steps::contrast::apply)?;
        }

        if self.preset == Preset::Aggressive {
            img = self.run_step("denoise", img, &mut steps_timing, steps::denoise::apply)?;
        }

        if self.preset.reconstructs_lines() {
            let params = self.line_spacing;
            img = self.run_step("line_spacing", img, &mut steps_timing, |img| {
                steps::line_spacing::apply(img, &params)
            })?;
        }

        Ok(PreprocessingResult {
            image: img,
            total_time_ms: start.elapsed().as_millis() as u64,
            preset: self.preset.as_str().to_string(),
            steps: steps_timing,
        })
    }

    fn run_step<F>(
        &self,
        name: &str,
        img: DynamicImage,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<DynamicImage, RollError>
    where
        F: FnOnce(DynamicImage) -> Result<DynamicImage, RollError>,
    {
        let step_start = Instant::now();
        let result = step_fn(img)?;
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms: step_start.elapsed().as_millis() as u64,
        });
        Ok(result)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(Preset::default(), LineSpacing::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn step_names(result: &PreprocessingResult) -> Vec<&str> {
        result.steps.iter().map(|s| s.name.as_str()).collect()
    }

    fn column() -> DynamicImage {
        let img = GrayImage::from_fn(30, 60, |_, y| {
            if (10..15).contains(&y) || (40..44).contains(&y) {
                Luma([0])
            } else {
                Luma([255])
            }
        });
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn test_none_preset_passes_image_through() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([10, 20, 30])));
        let result = Pipeline::new(Preset::None, LineSpacing::default())
            .process(img)
            .unwrap();
        assert!(result.steps.is_empty());
        assert!(matches!(result.image, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn test_minimal_preset_keeps_geometry() {
        let result = Pipeline::new(Preset::Minimal, LineSpacing::default())
            .process(column())
            .unwrap();
        assert_eq!(step_names(&result), vec!["grayscale"]);
        assert_eq!(result.image.height(), 60);
    }

    #[test]
    fn test_default_preset_reconstructs_lines() {
        let result = Pipeline::default().process(column()).unwrap();
        assert_eq!(step_names(&result), vec!["grayscale", "line_spacing"]);
        // two lines of 5 and 4 rows, each with 2x10 padding and 12 spacing
        assert_eq!(result.image.height(), (5 + 32) + (4 + 32));
    }

    #[test]
    fn test_aggressive_preset_step_order() {
        let result = Pipeline::new(Preset::Aggressive, LineSpacing::default())
            .process(column())
            .unwrap();
        assert_eq!(
            step_names(&result),
            vec!["grayscale", "contrast", "denoise", "line_spacing"]
        );
        assert_eq!(result.preset, "aggressive");
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!("Enhanced".parse::<Preset>().unwrap(), Preset::Enhanced);
        assert!("sharp".parse::<Preset>().is_err());
    }
}
