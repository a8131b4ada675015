//! OCR engine implementations
//!
//! Engines are conditionally compiled based on feature flags.

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

#[cfg(feature = "engine-leptess")]
pub mod leptess;

use crate::config::Config;
use crate::engine::OcrEngine;
use crate::error::RollError;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Information about an available engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub supported_languages: Vec<String>,
}

/// Registry of available OCR engines
pub struct EngineRegistry {
    engines: Vec<Arc<dyn OcrEngine>>,
    default_engine: String,
}

impl EngineRegistry {
    /// Create a new engine registry with all compiled-in engines initialized
    #[allow(unused_mut, unused_variables)]
    pub fn new(config: &Config) -> Result<Self, RollError> {
        let mut engines: Vec<Arc<dyn OcrEngine>> = Vec::new();

        #[cfg(feature = "engine-ocrs")]
        {
            tracing::info!("Initializing ocrs engine...");
            engines.push(Arc::new(ocrs::OcrsEngine::new(config)?));
        }

        #[cfg(feature = "engine-leptess")]
        {
            tracing::info!("Initializing leptess engine...");
            engines.push(Arc::new(leptess::LeptessEngine::new(config)?));
        }

        if engines.is_empty() {
            return Err(RollError::InitializationError(
                "No OCR engines available. Build with --features engine-ocrs or --features engine-leptess".to_string()
            ));
        }

        // only Tesseract ships Devanagari models
        let fallback = engines
            .iter()
            .find(|e| e.name() == "leptess")
            .unwrap_or(&engines[0])
            .name();
        let default_engine = config.engine.as_deref().unwrap_or(fallback).to_string();

        Self::from_engines(engines, &default_engine)
    }

    /// Build a registry from already constructed engines
    pub fn from_engines(
        engines: Vec<Arc<dyn OcrEngine>>,
        default_engine: &str,
    ) -> Result<Self, RollError> {
        if !engines.iter().any(|e| e.name() == default_engine) {
            return Err(RollError::UnknownEngine(default_engine.to_string()));
        }
        Ok(Self {
            engines,
            default_engine: default_engine.to_string(),
        })
    }

    /// Get an engine by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn OcrEngine>> {
        self.engines.iter().find(|e| e.name() == name).cloned()
    }

    /// Resolve an optional engine name, falling back to the default
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn OcrEngine>, RollError> {
        let name = name.unwrap_or(&self.default_engine);
        self.get(name)
            .ok_or_else(|| RollError::UnknownEngine(name.to_string()))
    }

    /// Get the default engine name
    pub fn default_name(&self) -> &str {
        &self.default_engine
    }

    /// Get info about all available engines
    pub fn info(&self) -> Vec<EngineInfo> {
        self.engines
            .iter()
            .map(|e| EngineInfo {
                name: e.name(),
                description: e.description(),
                supported_languages: e.supported_languages(),
            })
            .collect()
    }
}

/// Per-user cache directory for downloaded models
#[allow(dead_code)]
pub(crate) fn cache_dir(sub: &str) -> Result<PathBuf, RollError> {
    let dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("voter-roll-extract")
        .join(sub);

    std::fs::create_dir_all(&dir).map_err(|e| {
        RollError::InitializationError(format!("Failed to create cache directory {:?}: {}", dir, e))
    })?;
    Ok(dir)
}

/// Download `url` to `path` unless it is already cached
#[allow(dead_code)]
pub(crate) fn ensure_downloaded(url: &str, path: &Path) -> Result<(), RollError> {
    if path.exists() {
        tracing::debug!("Using cached {:?}", path);
        return Ok(());
    }

    tracing::info!("Downloading {} (this may take a moment)...", url);
    let response = ureq::get(url)
        .call()
        .map_err(|e| RollError::InitializationError(format!("Failed to download {}: {}", url, e)))?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        RollError::InitializationError(format!("Failed to read response body: {}", e))
    })?;

    // an interrupted download must not leave a cached file behind
    let partial = path.with_extension("partial");
    let mut file = File::create(&partial).map_err(|e| {
        RollError::InitializationError(format!("Failed to create {:?}: {}", partial, e))
    })?;
    file.write_all(&buffer)
        .and_then(|_| std::fs::rename(&partial, path))
        .map_err(|e| RollError::InitializationError(format!("Failed to write {:?}: {}", path, e)))?;

    tracing::info!("Downloaded {:?}", path);
    Ok(())
}
