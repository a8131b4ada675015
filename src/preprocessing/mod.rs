//! Column image preprocessing ahead of OCR
//!
//! Provides preset pipelines; all but `none`/`minimal` end with line reconstruction.

pub mod pipeline;
pub mod steps;

pub use pipeline::{Pipeline, PreprocessingResult, Preset, StepTiming};
