//! Region cropping: page header and card columns from fixed template geometry

use super::template::Template;
use crate::error::RollError;
use image::{DynamicImage, GenericImageView};

/// Pixel rectangle inside a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    fn crop(&self, image: &DynamicImage) -> DynamicImage {
        image.crop_imm(self.x, self.y, self.width, self.height)
    }
}

/// Crops of one page, columns ordered left to right
#[derive(Debug, Clone)]
pub struct PageRegions {
    pub header: Option<DynamicImage>,
    pub columns: Vec<DynamicImage>,
}

/// Crop the header (when the template has one) and every retained column
pub fn crop_page(page: &DynamicImage, template: &Template) -> Result<PageRegions, RollError> {
    let (width, height) = page.dimensions();
    let content = content_rect(width, height, template, template.bottom_margin)?;
    let columns = retained_columns(content, template)?
        .iter()
        .map(|rect| rect.crop(page))
        .collect();

    Ok(PageRegions {
        header: extract_header(page, template)?,
        columns,
    })
}

/// Crop the header rectangle; `None` if the template does not define one
pub fn extract_header(
    page: &DynamicImage,
    template: &Template,
) -> Result<Option<DynamicImage>, RollError> {
    match header_rect(page.width(), page.height(), template)? {
        Some(rect) => Ok(Some(rect.crop(page))),
        None => Ok(None),
    }
}

/// Cut every retained column into its entry cards, column by column
pub fn crop_cards(
    page: &DynamicImage,
    template: &Template,
) -> Result<Vec<Vec<DynamicImage>>, RollError> {
    let grid = template
        .cards
        .ok_or_else(|| RollError::invalid_template(&template.name, "no card grid defined"))?;

    let (width, height) = page.dimensions();
    let content = content_rect(width, height, template, grid.bottom_margin)?;

    let mut columns = Vec::new();
    for column in retained_columns(content, template)? {
        let card_height = column.height / grid.cards_per_column;
        if card_height <= grid.card_top_trim {
            return Err(RollError::invalid_template(
                &template.name,
                format!(
                    "card height {}px leaves nothing after a {}px top trim",
                    card_height, grid.card_top_trim
                ),
            ));
        }

        let cards = (0..grid.cards_per_column)
            .map(|j| {
                Rect {
                    x: column.x,
                    y: column.y + j * card_height + grid.card_top_trim,
                    width: column.width,
                    height: card_height - grid.card_top_trim,
                }
                .crop(page)
            })
            .collect();
        columns.push(cards);
    }

    Ok(columns)
}

/// Page bounds minus the four margins
pub fn content_rect(
    width: u32,
    height: u32,
    template: &Template,
    bottom_margin: u32,
) -> Result<Rect, RollError> {
    let right = width.checked_sub(template.right_margin);
    let bottom = height.checked_sub(bottom_margin);

    match (right, bottom) {
        (Some(right), Some(bottom)) if right > template.left_margin && bottom > template.top_margin => {
            Ok(Rect {
                x: template.left_margin,
                y: template.top_margin,
                width: right - template.left_margin,
                height: bottom - template.top_margin,
            })
        }
        _ => Err(RollError::invalid_template(
            &template.name,
            format!("margins leave no content area on a {}x{} page", width, height),
        )),
    }
}

/// Equal-width slices of the content rectangle; remainder pixels are dropped
pub fn column_slices(content: Rect, column_count: u32) -> Vec<Rect> {
    let column_width = content.width / column_count.max(1);
    (0..column_count)
        .map(|i| Rect {
            x: content.x + i * column_width,
            y: content.y,
            width: column_width,
            height: content.height,
        })
        .collect()
}

/// Keep the left `column_retain_fraction` of a slice, then trim its left border
pub fn retain_column(slice: Rect, template: &Template) -> Result<Rect, RollError> {
    let retained = (template.column_retain_fraction * slice.width as f32) as u32;
    if retained <= template.column_left_trim {
        return Err(RollError::invalid_template(
            &template.name,
            format!(
                "column slice of {}px keeps {}px, not more than the {}px left trim",
                slice.width, retained, template.column_left_trim
            ),
        ));
    }

    Ok(Rect {
        x: slice.x + template.column_left_trim,
        y: slice.y,
        width: retained - template.column_left_trim,
        height: slice.height,
    })
}

fn retained_columns(content: Rect, template: &Template) -> Result<Vec<Rect>, RollError> {
    column_slices(content, template.column_count)
        .into_iter()
        .map(|slice| retain_column(slice, template))
        .collect()
}

fn header_rect(width: u32, height: u32, template: &Template) -> Result<Option<Rect>, RollError> {
    let Some(region) = template.header else {
        return Ok(None);
    };

    let right = width / 2;
    let bottom = height.checked_sub(region.bottom_margin);
    match bottom {
        Some(bottom) if right > region.left_margin && bottom > region.top_margin => Ok(Some(Rect {
            x: region.left_margin,
            y: region.top_margin,
            width: right - region.left_margin,
            height: bottom - region.top_margin,
        })),
        _ => Err(RollError::invalid_template(
            &template.name,
            format!("header region is empty on a {}x{} page", width, height),
        )),
    }
}
