use crate::error::RollError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tesseract-style language selector, e.g. `mar` or `mar+eng`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptProfile(String);

impl ScriptProfile {
    pub fn new(profile: impl Into<String>) -> Self {
        Self(profile.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Individual language codes of a `+`-joined profile
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.0.split('+').map(str::trim).filter(|l| !l.is_empty())
    }
}

impl Default for ScriptProfile {
    fn default() -> Self {
        Self::new("mar")
    }
}

impl fmt::Display for ScriptProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// OCR processing result
#[derive(Debug, Clone)]
pub struct OcrResult {
    pub text: String,
    /// Mean confidence in 0.0-1.0 when the engine reports one
    pub confidence: Option<f32>,
    pub warnings: Vec<String>,
}

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs", "leptess")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize the text of one cropped region
    fn recognize(&self, image: &DynamicImage, profile: &ScriptProfile)
        -> Result<OcrResult, RollError>;

    /// Get supported languages
    fn supported_languages(&self) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_splits_languages() {
        let profile = ScriptProfile::new("mar+eng");
        assert_eq!(profile.languages().collect::<Vec<_>>(), vec!["mar", "eng"]);
    }

    #[test]
    fn test_profile_deserializes_from_plain_string() {
        let profile: ScriptProfile = serde_json::from_str("\"hin\"").unwrap();
        assert_eq!(profile.as_str(), "hin");
    }
}
