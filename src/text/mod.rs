//! Recognized-text handling: normalization, header parsing and entry extraction

pub mod entries;
pub mod header;
pub mod normalize;

pub use entries::EntryExtractor;
pub use header::{parse_header, HeaderParser};
pub use normalize::Normalizer;
