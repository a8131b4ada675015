use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which crop of a page a recognition call was made for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Header,
    Column(usize),
    Card { column: usize, card: usize },
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Header => write!(f, "header"),
            Region::Column(i) => write!(f, "column {}", i + 1),
            Region::Card { column, card } => write!(f, "column {} card {}", column + 1, card + 1),
        }
    }
}

#[derive(Error, Debug)]
pub enum RollError {
    #[error("Invalid template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Unknown OCR engine: {0}")]
    UnknownEngine(String),

    #[error("Failed to initialize OCR engine: {0}")]
    InitializationError(String),

    #[error("Failed to rasterize {} (page {page}): {reason}", path.display())]
    Rasterize {
        path: PathBuf,
        page: usize,
        reason: String,
    },

    #[error("Recognition failed in {} (page {page}, {region}): {reason}", path.display())]
    Recognition {
        path: PathBuf,
        page: usize,
        region: Region,
        reason: String,
    },

    #[error("Failed to process image: {0}")]
    ProcessingError(String),

    #[error("Failed to write output: {0}")]
    Output(String),

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RollError {
    pub(crate) fn invalid_template(template: &str, reason: impl Into<String>) -> Self {
        RollError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for RollError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            RollError::InvalidTemplate { .. } => (StatusCode::BAD_REQUEST, "INVALID_TEMPLATE"),
            RollError::UnknownTemplate(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_TEMPLATE"),
            RollError::UnknownEngine(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_ENGINE"),
            RollError::InitializationError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INIT_ERROR"),
            RollError::Rasterize { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "RASTERIZE_ERROR"),
            RollError::Recognition { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "RECOGNITION_ERROR")
            }
            RollError::ProcessingError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PROCESSING_ERROR"),
            RollError::Output(_) => (StatusCode::INTERNAL_SERVER_ERROR, "OUTPUT_ERROR"),
            RollError::FileTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "FILE_TOO_LARGE"),
            RollError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            RollError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            RollError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
