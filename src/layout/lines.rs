//! Text-line reconstruction by horizontal ink projection
//!
//! Rows of a column crop are scored by how much ink they carry. Runs of
//! text-bearing rows become line bands, bands separated by less than
//! `min_gap` rows are merged (diacritics above a line, a label split from
//! its value), and the bands are re-stitched onto a blank canvas with a
//! uniform gap between them.

use image::{imageops, DynamicImage, GrayImage, Luma};
use serde::{Deserialize, Serialize};

/// Share of the strongest row's ink a row needs to count as text
const INK_THRESHOLD_RATIO: f64 = 0.1;

const BACKGROUND: Luma<u8> = Luma([255]);

/// Parameters of the re-rendered column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpacing {
    /// Blank rows inserted after every line
    pub spacing: u32,
    /// Context rows copied above and below each band
    pub line_padding: u32,
    /// Bands closer than this are treated as one line
    pub min_gap: u32,
}

impl Default for LineSpacing {
    fn default() -> Self {
        Self {
            spacing: 12,
            line_padding: 10,
            min_gap: 10,
        }
    }
}

/// Inclusive row range holding ink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineBand {
    pub start: u32,
    pub end: u32,
}

impl LineBand {
    pub fn height(&self) -> u32 {
        self.end - self.start + 1
    }
}

/// Re-render a column with uniform spacing between its text lines.
///
/// A column without ink yields an image of zero height.
pub fn reconstruct_lines(image: &DynamicImage, params: &LineSpacing) -> GrayImage {
    let gray = image.to_luma8();
    let bands = merge_bands(&detect_line_bands(&gray), params.min_gap);
    render_bands(&gray, &bands, params)
}

/// Per-row ink score: sum of `255 - intensity` over the row
pub fn row_ink_scores(gray: &GrayImage) -> Vec<u64> {
    gray.rows()
        .map(|row| row.map(|p| u64::from(255 - p.0[0])).sum::<u64>())
        .collect()
}

/// Maximal runs of rows scoring above 10% of the inkiest row
pub fn detect_line_bands(gray: &GrayImage) -> Vec<LineBand> {
    let scores = row_ink_scores(gray);
    let max = scores.iter().copied().max().unwrap_or(0);
    let threshold = max as f64 * INK_THRESHOLD_RATIO;

    let mut bands = Vec::new();
    let mut current_start: Option<u32> = None;
    for (row, &score) in scores.iter().enumerate() {
        let row = row as u32;
        let is_text = score as f64 > threshold;
        match (is_text, current_start) {
            (true, None) => current_start = Some(row),
            (false, Some(start)) => {
                bands.push(LineBand {
                    start,
                    end: row - 1,
                });
                current_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = current_start {
        bands.push(LineBand {
            start,
            end: scores.len() as u32 - 1,
        });
    }

    bands
}

/// Fold each band into its predecessor when the gap between them is below `min_gap`.
/// Overlapping bands count as a zero gap.
pub fn merge_bands(bands: &[LineBand], min_gap: u32) -> Vec<LineBand> {
    let mut merged: Vec<LineBand> = Vec::with_capacity(bands.len());
    for band in bands {
        match merged.last_mut() {
            Some(prev) if band.start.saturating_sub(prev.end) < min_gap => {
                prev.end = prev.end.max(band.end)
            }
            _ => merged.push(*band),
        }
    }
    merged
}

fn render_bands(gray: &GrayImage, bands: &[LineBand], params: &LineSpacing) -> GrayImage {
    let (width, height) = gray.dimensions();
    let new_height: u32 = bands
        .iter()
        .map(|b| b.height() + params.spacing + 2 * params.line_padding)
        .sum();

    let mut canvas = GrayImage::from_pixel(width, new_height, BACKGROUND);
    let mut cursor = 0u32;
    for band in bands {
        let top = band.start.saturating_sub(params.line_padding);
        let bottom = (band.end + params.line_padding + 1).min(height);
        let line = imageops::crop_imm(gray, 0, top, width, bottom - top).to_image();
        imageops::replace(&mut canvas, &line, 0, i64::from(cursor));
        cursor += line.height() + params.spacing;
    }

    tracing::debug!(
        "Reconstructed {} line(s): {}px -> {}px",
        bands.len(),
        height,
        new_height
    );

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    /// White column with black bars over the given inclusive row ranges
    fn column_with_bars(height: u32, bars: &[(u32, u32)]) -> GrayImage {
        GrayImage::from_fn(40, height, |x, y| {
            let inked = bars.iter().any(|&(s, e)| y >= s && y <= e) && (5..35).contains(&x);
            if inked {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    #[test]
    fn test_detects_separate_bands() {
        let img = column_with_bars(100, &[(10, 14), (40, 44), (80, 83)]);
        let bands = detect_line_bands(&img);
        assert_eq!(
            bands,
            vec![
                LineBand { start: 10, end: 14 },
                LineBand { start: 40, end: 44 },
                LineBand { start: 80, end: 83 },
            ]
        );
    }

    #[test]
    fn test_band_running_to_bottom_is_closed() {
        let img = column_with_bars(20, &[(15, 19)]);
        assert_eq!(detect_line_bands(&img), vec![LineBand { start: 15, end: 19 }]);
    }

    #[test]
    fn test_faint_rows_fall_below_adaptive_threshold() {
        let mut img = column_with_bars(50, &[(10, 14)]);
        // a single light-grey speck: far below 10% of a full black row
        img.put_pixel(20, 30, Luma([200]));
        assert_eq!(detect_line_bands(&img).len(), 1);
    }

    #[test]
    fn test_close_bands_are_merged() {
        let bands = [
            LineBand { start: 10, end: 14 },
            LineBand { start: 18, end: 25 },
            LineBand { start: 60, end: 65 },
        ];
        assert_eq!(
            merge_bands(&bands, 10),
            vec![
                LineBand { start: 10, end: 25 },
                LineBand { start: 60, end: 65 },
            ]
        );
    }

    #[test]
    fn test_overlapping_bands_merge_without_shrinking() {
        let bands = [
            LineBand { start: 10, end: 40 },
            LineBand { start: 20, end: 30 },
            LineBand { start: 5, end: 8 },
        ];
        assert_eq!(merge_bands(&bands, 10), vec![LineBand { start: 10, end: 40 }]);
    }

    #[test]
    fn test_merge_of_no_bands_is_empty() {
        assert!(merge_bands(&[], 10).is_empty());
    }

    #[test]
    fn test_blank_column_yields_empty_image() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 100, Luma([255])));
        let out = reconstruct_lines(&img, &LineSpacing::default());
        assert_eq!(out.width(), 40);
        assert_eq!(out.height(), 0);
    }

    #[test]
    fn test_output_height_accounts_for_padding_and_spacing() {
        let params = LineSpacing::default();
        let img = column_with_bars(200, &[(50, 54), (120, 129)]);
        let out = reconstruct_lines(&DynamicImage::ImageLuma8(img), &params);
        assert_eq!(out.height(), (5 + 12 + 20) + (10 + 12 + 20));
    }

    #[test]
    fn test_padding_is_clipped_at_source_edges() {
        let params = LineSpacing::default();
        let img = column_with_bars(10, &[(0, 3)]);
        let out = reconstruct_lines(&DynamicImage::ImageLuma8(img), &params);
        // copied rows 0..10 (clipped), canvas is still sized for full padding
        assert_eq!(out.height(), 4 + 12 + 20);
        assert_eq!(out.get_pixel(10, 0).0[0], 0);
        assert_eq!(out.get_pixel(10, 5).0[0], 255);
    }

    #[test]
    fn test_cramped_lines_get_uniform_gaps() {
        let params = LineSpacing::default();
        let img = column_with_bars(100, &[(10, 14), (26, 30), (42, 46)]);
        let out = reconstruct_lines(&DynamicImage::ImageLuma8(img), &params);
        let bands = detect_line_bands(&out);
        assert_eq!(bands.len(), 3);
        for pair in bands.windows(2) {
            assert!(pair[1].start - pair[0].end > params.min_gap);
        }
    }

    #[test]
    fn test_reconstruction_keeps_line_count_when_repeated() {
        let params = LineSpacing::default();
        let img = column_with_bars(300, &[(20, 29), (70, 79), (150, 152), (200, 215)]);
        let once = reconstruct_lines(&DynamicImage::ImageLuma8(img), &params);
        let twice = reconstruct_lines(&DynamicImage::ImageLuma8(once.clone()), &params);

        let count_once = merge_bands(&detect_line_bands(&once), params.min_gap).len();
        let count_twice = merge_bands(&detect_line_bands(&twice), params.min_gap).len();
        assert_eq!(count_once, 4);
        assert_eq!(count_once, count_twice);
    }
}
