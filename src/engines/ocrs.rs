//! OCRS engine implementation
//!
//! Pure Rust OCR engine using the ocrs library. No system dependencies required.
//! Downloads neural network models automatically on first use. The published
//! models only cover the Latin alphabet, so Devanagari profiles produce a
//! warning and usually little text.

use super::{cache_dir, ensure_downloaded};
use crate::config::Config;
use crate::engine::{OcrEngine, OcrResult, ScriptProfile};
use crate::error::RollError;
use image::DynamicImage;
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams};
use rten::Model;

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

const LATIN_LANGUAGES: &[&str] = &["eng"];

/// OCR Engine wrapping the ocrs library
pub struct OcrsEngine {
    engine: OcrsOcrEngine,
}

impl OcrsEngine {
    /// Create a new OCR processor, downloading models if needed
    pub fn new(_config: &Config) -> Result<Self, RollError> {
        let models = cache_dir("ocrs")?;
        let detection_model_path = models.join("text-detection.rten");
        let recognition_model_path = models.join("text-recognition.rten");
        ensure_downloaded(DETECTION_MODEL_URL, &detection_model_path)?;
        ensure_downloaded(RECOGNITION_MODEL_URL, &recognition_model_path)?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            RollError::InitializationError(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            RollError::InitializationError(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            RollError::InitializationError(format!("Failed to create OCR engine: {}", e))
        })?;

        tracing::info!("ocrs engine initialized successfully");

        Ok(Self { engine })
    }
}

impl OcrEngine for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - no system dependencies, Latin script only"
    }

    fn recognize(
        &self,
        image: &DynamicImage,
        profile: &ScriptProfile,
    ) -> Result<OcrResult, RollError> {
        let mut warnings = Vec::new();
        let unsupported: Vec<&str> = profile
            .languages()
            .filter(|lang| !LATIN_LANGUAGES.contains(lang))
            .collect();
        if !unsupported.is_empty() {
            tracing::warn!(
                "ocrs has no model for {:?}, recognizing as Latin text",
                unsupported
            );
            warnings.push(format!(
                "ocrs cannot recognize '{}', use the leptess engine for this script",
                unsupported.join("+")
            ));
        }

        // ImageSource::from_bytes expects packed RGB (HWC)
        let rgb_img = image.to_rgb8();
        let dimensions = rgb_img.dimensions();

        let img_source = ImageSource::from_bytes(rgb_img.as_raw(), dimensions).map_err(|e| {
            RollError::ProcessingError(format!("Failed to create image source: {}", e))
        })?;

        let ocr_input = self
            .engine
            .prepare_input(img_source)
            .map_err(|e| RollError::ProcessingError(format!("Failed to prepare input: {}", e)))?;

        let word_rects = self
            .engine
            .detect_words(&ocr_input)
            .map_err(|e| RollError::ProcessingError(format!("Failed to detect words: {}", e)))?;

        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| RollError::ProcessingError(format!("Failed to recognize text: {}", e)))?;

        let text = line_texts
            .iter()
            .flatten()
            .map(|line| {
                line.words()
                    .map(|word| word.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(OcrResult {
            text,
            // ocrs reports no per-line confidence
            confidence: None,
            warnings,
        })
    }

    fn supported_languages(&self) -> Vec<String> {
        LATIN_LANGUAGES.iter().map(|l| l.to_string()).collect()
    }
}
