//! Structured voter records from scanned multi-column voter-roll pages.
//!
//! A page is cut into a header and card columns by a [`layout::Template`],
//! each column is re-rendered with uniform line spacing, recognized by an
//! [`engine::OcrEngine`], normalized, and split into [`record::VoterRecord`]s
//! that carry the page's header fields.

pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod extract;
pub mod layout;
pub mod output;
pub mod preprocessing;
pub mod rasterize;
pub mod record;
pub mod server;
pub mod text;

pub use error::{Region, RollError};
pub use extract::{ExtractOptions, ExtractionReport, RollExtractor, Segmentation};
pub use record::{HeaderFields, VoterRecord};
