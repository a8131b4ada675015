//! Run driver: pages -> regions -> preprocessing -> OCR -> normalization -> records
//!
//! Pages are handled one at a time and regions within a page in order, so
//! only one page worth of crops is ever resident. A failing region aborts
//! the run with its page and region attached, unless column isolation is
//! switched on, in which case it is skipped with a warning.

use crate::engine::{OcrEngine, ScriptProfile};
use crate::error::{Region, RollError};
use crate::layout::{crop_cards, crop_page, extract_header, LineSpacing, Template};
use crate::preprocessing::{Pipeline, Preset};
use crate::rasterize::{PageRange, PageSource};
use crate::record::{HeaderFields, VoterRecord};
use crate::text::{EntryExtractor, HeaderParser, Normalizer};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

/// How a page is cut into OCR regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segmentation {
    /// One region per retained column
    #[default]
    Columns,
    /// One region per entry card of the template's card grid
    Cards,
}

impl FromStr for Segmentation {
    type Err = RollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "columns" => Ok(Self::Columns),
            "cards" => Ok(Self::Cards),
            other => Err(RollError::InvalidRequest(format!(
                "Unknown segmentation: {}",
                other
            ))),
        }
    }
}

/// Per-run knobs that are not part of the page template
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub pages: PageRange,
    pub preset: Preset,
    pub line_spacing: LineSpacing,
    pub segmentation: Segmentation,
    /// Skip failing regions instead of aborting the run
    pub isolate_columns: bool,
    /// Save reconstructed region images and normalized text here
    pub debug_dir: Option<PathBuf>,
}

/// Outcome of one run over a document
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    pub records: Vec<VoterRecord>,
    pub pages_processed: usize,
    pub columns_processed: usize,
    pub columns_skipped: usize,
    pub warnings: Vec<String>,
}

impl ExtractionReport {
    fn warn(&mut self, warning: String) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }
}

struct RunState {
    document: PathBuf,
    report: ExtractionReport,
    /// 1-based region counter across the run, names debug artifacts
    region_index: usize,
}

impl RunState {
    fn new(document: &Path) -> Self {
        Self {
            document: document.to_path_buf(),
            report: ExtractionReport::default(),
            region_index: 0,
        }
    }
}

pub struct RollExtractor {
    template: Template,
    engine: Arc<dyn OcrEngine>,
    pipeline: Pipeline,
    normalizer: Normalizer,
    header_parser: HeaderParser,
    entries: EntryExtractor,
    options: ExtractOptions,
}

impl RollExtractor {
    pub fn new(
        template: Template,
        engine: Arc<dyn OcrEngine>,
        options: ExtractOptions,
    ) -> Result<Self, RollError> {
        template.validate()?;
        if options.segmentation == Segmentation::Cards && template.cards.is_none() {
            return Err(RollError::invalid_template(
                &template.name,
                "card segmentation needs a card grid",
            ));
        }
        if let Some(dir) = &options.debug_dir {
            std::fs::create_dir_all(dir).map_err(|e| {
                RollError::Output(format!("Failed to create debug directory {:?}: {}", dir, e))
            })?;
        }

        Ok(Self {
            pipeline: Pipeline::new(options.preset, options.line_spacing),
            normalizer: Normalizer::for_template(&template)?,
            header_parser: HeaderParser::new(&template.roll_part_marker),
            entries: EntryExtractor::for_template(&template),
            template,
            engine,
            options,
        })
    }

    /// Process the selected pages of `source` in document order
    pub fn run(&self, source: &PageSource) -> Result<ExtractionReport, RollError> {
        let start = Instant::now();
        let pages = self.options.pages.pages(source.page_count());
        tracing::info!(
            "Extracting {:?} with template '{}', engine {}, pages {:?}",
            source.path(),
            self.template.name,
            self.engine.name(),
            pages
        );

        let mut state = RunState::new(source.path());
        if pages.is_empty() {
            state.report.warn(format!(
                "No pages selected (document has {} pages)",
                source.page_count()
            ));
        }

        for number in pages {
            state.document = source.page_path(number).to_path_buf();
            let page = source.render_page(number)?;
            self.process_page(&mut state, number, &page)?;
        }

        let report = state.report;
        tracing::info!(
            "Extracted {} records from {} pages ({} regions, {} skipped) in {}ms",
            report.records.len(),
            report.pages_processed,
            report.columns_processed,
            report.columns_skipped,
            start.elapsed().as_millis()
        );
        Ok(report)
    }

    /// Process a single already rendered page of `document`
    pub fn extract_page(
        &self,
        document: &Path,
        page_number: usize,
        page: &DynamicImage,
    ) -> Result<ExtractionReport, RollError> {
        let mut state = RunState::new(document);
        self.process_page(&mut state, page_number, page)?;
        Ok(state.report)
    }

    fn process_page(
        &self,
        state: &mut RunState,
        number: usize,
        page: &DynamicImage,
    ) -> Result<(), RollError> {
        tracing::info!("Page {}: {}x{}", number, page.width(), page.height());

        let (header_crop, regions) = match self.options.segmentation {
            Segmentation::Columns => {
                let cropped = crop_page(page, &self.template)?;
                let regions: Vec<(Region, DynamicImage)> = cropped
                    .columns
                    .into_iter()
                    .enumerate()
                    .map(|(i, column)| (Region::Column(i), column))
                    .collect();
                (cropped.header, regions)
            }
            Segmentation::Cards => {
                let regions: Vec<(Region, DynamicImage)> = crop_cards(page, &self.template)?
                    .into_iter()
                    .enumerate()
                    .flat_map(|(column, cards)| {
                        cards
                            .into_iter()
                            .enumerate()
                            .map(move |(card, image)| (Region::Card { column, card }, image))
                    })
                    .collect();
                (extract_header(page, &self.template)?, regions)
            }
        };

        let header = match header_crop {
            Some(crop) => self.read_header(state, number, &crop)?,
            None => HeaderFields::default(),
        };

        for (region, image) in regions {
            state.region_index += 1;
            match self.read_region(state, number, region, image, &header) {
                Ok(records) => {
                    tracing::debug!("Page {}, {}: {} records", number, region, records.len());
                    state.report.records.extend(records);
                    state.report.columns_processed += 1;
                }
                Err(e) if self.options.isolate_columns => {
                    tracing::warn!("Skipping page {}, {}: {}", number, region, e);
                    state.report.columns_skipped += 1;
                    state.report.warnings.push(e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        state.report.pages_processed += 1;
        Ok(())
    }

    fn read_header(
        &self,
        state: &mut RunState,
        number: usize,
        crop: &DynamicImage,
    ) -> Result<HeaderFields, RollError> {
        let text = match self.recognize(state, number, Region::Header, crop, &self.template.header_profile) {
            Ok(text) => text,
            Err(e) if self.options.isolate_columns => {
                tracing::warn!("Page {}: header unreadable, fields left empty: {}", number, e);
                state.report.warnings.push(e.to_string());
                return Ok(HeaderFields::default());
            }
            Err(e) => return Err(e),
        };

        self.save_debug_text(&format!("header_{}.txt", number), &text);
        let fields = self.header_parser.parse(&text);
        tracing::debug!("Page {} header: {:?}", number, fields);
        Ok(fields)
    }

    fn read_region(
        &self,
        state: &mut RunState,
        number: usize,
        region: Region,
        image: DynamicImage,
        header: &HeaderFields,
    ) -> Result<Vec<VoterRecord>, RollError> {
        let processed = self.pipeline.process(image).map_err(|e| {
            RollError::ProcessingError(format!("page {}, {}: {}", number, region, e))
        })?;
        tracing::debug!(
            "Page {}, {}: preprocessed to {}x{} in {}ms",
            number,
            region,
            processed.image.width(),
            processed.image.height(),
            processed.total_time_ms
        );

        if processed.image.height() == 0 {
            tracing::debug!("Page {}, {}: no text lines, nothing to recognize", number, region);
            return Ok(Vec::new());
        }

        let index = state.region_index;
        self.save_debug_image(&format!("column_{}.png", index), &processed.image);

        let text = self.recognize(state, number, region, &processed.image, &self.template.body_profile)?;
        self.save_debug_text(&format!("column_{}.txt", index), &text);

        Ok(self.entries.extract(&text, header))
    }

    /// OCR one crop and normalize the text
    fn recognize(
        &self,
        state: &mut RunState,
        number: usize,
        region: Region,
        image: &DynamicImage,
        profile: &ScriptProfile,
    ) -> Result<String, RollError> {
        let result = self
            .engine
            .recognize(image, profile)
            .map_err(|e| RollError::Recognition {
                path: state.document.clone(),
                page: number,
                region,
                reason: e.to_string(),
            })?;

        tracing::debug!(
            "Page {}, {}: {} chars, confidence {:?}",
            number,
            region,
            result.text.chars().count(),
            result.confidence
        );
        for warning in result.warnings {
            state.report.warn(warning);
        }

        Ok(self.normalizer.normalize(&result.text))
    }

    fn save_debug_image(&self, name: &str, image: &DynamicImage) {
        let Some(dir) = &self.options.debug_dir else {
            return;
        };
        let path = dir.join(name);
        if let Err(e) = image.save(&path) {
            tracing::warn!("Failed to save debug image {:?}: {}", path, e);
        }
    }

    fn save_debug_text(&self, name: &str, text: &str) {
        let Some(dir) = &self.options.debug_dir else {
            return;
        };
        let path = dir.join(name);
        if let Err(e) = std::fs::write(&path, text) {
            tracing::warn!("Failed to save debug text {:?}: {}", path, e);
        }
    }
}
