use crate::extract::ExtractOptions;
use crate::output::{LayoutChoice, OutputFormat};
use std::path::PathBuf;

/// Default `serve` upload limit (100 MiB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 100 * 1024 * 1024;

/// OCR engine settings
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Engine used when a run does not name one
    pub engine: Option<String>,
    /// Tessdata directory; models are downloaded to the user cache when unset
    pub tessdata_path: Option<PathBuf>,
}

/// One `extract` run over a single input document
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub template: String,
    pub template_file: Option<PathBuf>,
    pub dpi: u32,
    pub layout: LayoutChoice,
    pub format: OutputFormat,
    pub options: ExtractOptions,
}

/// HTTP service settings
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub template_file: Option<PathBuf>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9393,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            template_file: None,
        }
    }
}
