//! Leptess/Tesseract engine implementation
//!
//! Uses tesseract-static crate for static linking (no system dependencies).
//! Traineddata for each language of a script profile is fetched from
//! `tessdata_fast` on first use unless a tessdata directory is configured.

use super::{cache_dir, ensure_downloaded};
use crate::config::Config;
use crate::engine::{OcrEngine, OcrResult, ScriptProfile};
use crate::error::RollError;
use image::DynamicImage;
use std::path::PathBuf;
use tesseract_static::tesseract::Tesseract;

/// Tesseract OCR Engine
pub struct LeptessEngine {
    tessdata_dir: PathBuf,
    /// Models are only fetched into our own cache, never into a user-provided directory
    downloads: bool,
}

impl LeptessEngine {
    pub fn new(config: &Config) -> Result<Self, RollError> {
        let (tessdata_dir, downloads) = match &config.tessdata_path {
            Some(dir) => (dir.clone(), false),
            None => (cache_dir("tessdata")?, true),
        };

        let engine = Self {
            tessdata_dir,
            downloads,
        };

        // Validate that tessdata is usable for the built-in templates
        let profile = ScriptProfile::default();
        engine.ensure_profile(&profile)?;
        engine.open(&profile).map_err(|e| {
            RollError::InitializationError(format!("Failed to initialize Tesseract: {}", e))
        })?;

        tracing::info!(
            "Leptess engine initialized (tessdata: {:?}, profile: {})",
            engine.tessdata_dir,
            profile
        );

        Ok(engine)
    }

    /// Make sure a traineddata file exists for every language of the profile
    fn ensure_profile(&self, profile: &ScriptProfile) -> Result<(), RollError> {
        for language in profile.languages() {
            let path = self.tessdata_dir.join(format!("{}.traineddata", language));
            if path.exists() {
                continue;
            }
            if !self.downloads {
                return Err(RollError::InitializationError(format!(
                    "Missing {:?} for language '{}'",
                    path, language
                )));
            }
            ensure_downloaded(&tessdata_url(language), &path)?;
        }
        Ok(())
    }

    fn open(&self, profile: &ScriptProfile) -> Result<Tesseract, String> {
        let dir = self
            .tessdata_dir
            .to_str()
            .ok_or_else(|| "Invalid tessdata path".to_string())?;
        Tesseract::new(Some(dir), Some(profile.as_str())).map_err(|e| e.to_string())
    }
}

impl OcrEngine for LeptessEngine {
    fn name(&self) -> &'static str {
        "leptess"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine - Devanagari and other scripts via tessdata_fast models"
    }

    fn recognize(
        &self,
        image: &DynamicImage,
        profile: &ScriptProfile,
    ) -> Result<OcrResult, RollError> {
        self.ensure_profile(profile)?;

        let rgb_img = image.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        // Convert to BMP in memory (BMP is always supported by leptonica)
        let mut bmp_data = Vec::new();
        rgb_img
            .write_to(&mut std::io::Cursor::new(&mut bmp_data), image::ImageFormat::Bmp)
            .map_err(|e| RollError::ProcessingError(format!("Failed to convert to BMP: {}", e)))?;

        tracing::debug!(
            "Recognizing {}x{} region with profile {}, BMP size: {} bytes",
            width,
            height,
            profile,
            bmp_data.len()
        );

        let tess = self
            .open(profile)
            .map_err(|e| RollError::ProcessingError(format!("Failed to create Tesseract: {}", e)))?;

        let mut tess = tess
            .set_image_from_mem(&bmp_data)
            .map_err(|e| {
                RollError::ProcessingError(format!(
                    "Failed to set image ({}x{}, {} bytes): {}",
                    width,
                    height,
                    bmp_data.len(),
                    e
                ))
            })?
            .recognize()
            .map_err(|e| RollError::ProcessingError(format!("Failed to recognize text: {}", e)))?;

        let text = tess
            .get_text()
            .map_err(|e| RollError::ProcessingError(format!("Failed to get text: {}", e)))?;

        // 0-100 scale
        let confidence = tess.mean_text_conf() as f32 / 100.0;

        Ok(OcrResult {
            text: text.trim_end().to_string(),
            confidence: Some(confidence),
            warnings: Vec::new(),
        })
    }

    fn supported_languages(&self) -> Vec<String> {
        // anything with a tessdata_fast model works; these are the ones rolls use
        ["mar", "hin", "eng", "guj", "kan", "tel", "tam", "ben", "pan", "ori"]
            .iter()
            .map(|l| l.to_string())
            .collect()
    }
}

/// Get tessdata download URL for a language
fn tessdata_url(language: &str) -> String {
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tessdata_url_per_language() {
        assert!(tessdata_url("mar").ends_with("/mar.traineddata"));
    }

    #[test]
    fn test_configured_dir_is_never_downloaded_into() {
        let dir = tempfile::tempdir().unwrap();
        let engine = LeptessEngine {
            tessdata_dir: dir.path().to_path_buf(),
            downloads: false,
        };
        let err = engine
            .ensure_profile(&ScriptProfile::new("mar+eng"))
            .unwrap_err();
        assert!(err.to_string().contains("mar"));
    }
}
