//! Page geometry: templates, region cropping and line reconstruction

pub mod cropper;
pub mod lines;
pub mod template;

pub use cropper::{crop_cards, crop_page, extract_header, PageRegions, Rect};
pub use lines::{reconstruct_lines, LineBand, LineSpacing};
pub use template::{CardGrid, FieldLabels, HeaderRegion, Template, TemplateSet};
