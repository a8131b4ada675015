//! Page images from a scanned PDF, a single page image, or a directory of pages
//!
//! Scanned rolls carry one full-page raster per PDF page. That raster is
//! decoded directly from the page's image XObject and scaled to the
//! requested DPI using the page MediaBox, so template margins expressed in
//! pixels at that DPI line up regardless of the scan resolution.

use crate::error::RollError;
use image::{imageops::FilterType, DynamicImage, GenericImageView, GrayImage, ImageReader, Luma};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::fs::File;
use std::io::Read;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// Resolution the built-in templates are measured at
pub const DEFAULT_DPI: u32 = 300;

/// PDF user-space units per inch
const POINTS_PER_INCH: f32 = 72.0;

/// Skip rescaling when the raster is within this ratio of the target size
const SCALE_TOLERANCE: f32 = 0.01;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "webp", "gif"];

/// 1-based inclusive page selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRange {
    pub first: Option<usize>,
    pub last: Option<usize>,
}

impl PageRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(first: Option<usize>, last: Option<usize>) -> Result<Self, RollError> {
        if first == Some(0) || last == Some(0) {
            return Err(RollError::InvalidRequest(
                "Page numbers start at 1".to_string(),
            ));
        }
        if let (Some(first), Some(last)) = (first, last) {
            if first > last {
                return Err(RollError::InvalidRequest(format!(
                    "First page {} is after last page {}",
                    first, last
                )));
            }
        }
        Ok(Self { first, last })
    }

    /// The selected page numbers of a document with `page_count` pages
    pub fn pages(&self, page_count: usize) -> RangeInclusive<usize> {
        let first = self.first.unwrap_or(1);
        let last = self.last.unwrap_or(page_count).min(page_count);
        // an empty range when the selection starts past the end
        first..=last
    }
}

enum Backing {
    Pdf {
        document: Document,
        pages: Vec<ObjectId>,
    },
    Images(Vec<PathBuf>),
}

/// An opened input document whose pages render one at a time
pub struct PageSource {
    path: PathBuf,
    dpi: u32,
    backing: Backing,
}

impl PageSource {
    pub fn open(path: &Path, dpi: u32) -> Result<Self, RollError> {
        let fail = |reason: String| RollError::Rasterize {
            path: path.to_path_buf(),
            page: 0,
            reason,
        };

        let backing = if path.is_dir() {
            Backing::Images(list_page_images(path).map_err(fail)?)
        } else if is_pdf(path).map_err(fail)? {
            let document =
                Document::load(path).map_err(|e| fail(format!("Failed to load PDF: {}", e)))?;
            let pages = document.get_pages().into_values().collect();
            Backing::Pdf { document, pages }
        } else {
            Backing::Images(vec![path.to_path_buf()])
        };

        let source = Self {
            path: path.to_path_buf(),
            dpi,
            backing,
        };
        tracing::info!(
            "Opened {:?}: {} page(s) at {} DPI",
            source.path,
            source.page_count(),
            dpi
        );
        Ok(source)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File a page comes from: the page image for directories, the document otherwise
    pub fn page_path(&self, number: usize) -> &Path {
        match &self.backing {
            Backing::Images(paths) => number
                .checked_sub(1)
                .and_then(|i| paths.get(i))
                .map_or(self.path.as_path(), |p| p.as_path()),
            Backing::Pdf { .. } => &self.path,
        }
    }

    pub fn page_count(&self) -> usize {
        match &self.backing {
            Backing::Pdf { pages, .. } => pages.len(),
            Backing::Images(paths) => paths.len(),
        }
    }

    /// Render page `number` (1-based)
    pub fn render_page(&self, number: usize) -> Result<DynamicImage, RollError> {
        let fail = |reason: String| RollError::Rasterize {
            path: self.path.clone(),
            page: number,
            reason,
        };
        if number == 0 || number > self.page_count() {
            return Err(fail(format!(
                "page out of range (document has {} pages)",
                self.page_count()
            )));
        }

        match &self.backing {
            Backing::Images(paths) => {
                let path = &paths[number - 1];
                // temp uploads carry no reliable extension
                ImageReader::open(path)
                    .and_then(|reader| reader.with_guessed_format())
                    .map_err(|e| fail(format!("Failed to open {:?}: {}", path, e)))?
                    .decode()
                    .map_err(|e| fail(format!("Failed to decode {:?}: {}", path, e)))
            }
            Backing::Pdf { document, pages } => {
                let page_id = pages[number - 1];
                let raster = page_raster(document, page_id).map_err(fail)?;
                let (width, height) = raster.dimensions();
                tracing::debug!("Page {}: embedded raster {}x{}", number, width, height);

                match media_box(document, page_id) {
                    Some((width_pt, height_pt)) => {
                        Ok(scale_to_dpi(raster, width_pt, height_pt, self.dpi))
                    }
                    None => {
                        tracing::warn!("Page {} has no MediaBox, using raster as-is", number);
                        Ok(raster)
                    }
                }
            }
        }
    }
}

/// Resize a page raster to the pixel size of the page at `dpi`
pub fn scale_to_dpi(image: DynamicImage, width_pt: f32, height_pt: f32, dpi: u32) -> DynamicImage {
    let target_width = (width_pt / POINTS_PER_INCH * dpi as f32).round() as u32;
    let target_height = (height_pt / POINTS_PER_INCH * dpi as f32).round() as u32;
    if target_width == 0 || target_height == 0 {
        return image;
    }

    let (width, height) = image.dimensions();
    let width_ratio = target_width as f32 / width as f32;
    let height_ratio = target_height as f32 / height as f32;
    let close = |r: f32| (r - 1.0).abs() <= SCALE_TOLERANCE;
    if close(width_ratio) && close(height_ratio) {
        return image;
    }

    tracing::debug!(
        "Rescaling page raster {}x{} -> {}x{}",
        width,
        height,
        target_width,
        target_height
    );
    image.resize_exact(target_width, target_height, FilterType::Lanczos3)
}

fn list_page_images(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| format!("Failed to read directory: {}", e))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err("No page images found in directory".to_string());
    }
    Ok(paths)
}

/// Check if a file is a PDF by extension or magic bytes
fn is_pdf(path: &Path) -> Result<bool, String> {
    if let Some(ext) = path.extension() {
        if ext.to_string_lossy().to_lowercase() == "pdf" {
            return Ok(true);
        }
    }

    let mut file = File::open(path).map_err(|e| format!("Failed to open file: {}", e))?;

    let mut magic = [0u8; 5];
    if file.read_exact(&mut magic).is_ok() {
        return Ok(&magic == b"%PDF-");
    }

    Ok(false)
}

/// Follow a reference to its object, or return the object itself
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object.as_reference() {
        Ok(id) => doc.get_object(id).ok(),
        Err(_) => Some(object),
    }
}

/// Look up a page attribute, walking up the page tree for inherited keys
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    loop {
        if let Ok(value) = node.get(key) {
            return resolve(doc, value);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
}

fn media_box(doc: &Document, page_id: ObjectId) -> Option<(f32, f32)> {
    let values: Vec<f32> = inherited(doc, page_id, b"MediaBox")?
        .as_array()
        .ok()?
        .iter()
        .filter_map(|v| resolve(doc, v)?.as_float().ok())
        .collect();
    match values.as_slice() {
        [x0, y0, x1, y1] => Some(((x1 - x0).abs(), (y1 - y0).abs())),
        _ => None,
    }
}

/// Decode the largest image XObject on the page
fn page_raster(doc: &Document, page_id: ObjectId) -> Result<DynamicImage, String> {
    let resources = inherited(doc, page_id, b"Resources")
        .and_then(|r| r.as_dict().ok())
        .ok_or("Page has no resources")?;
    let xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|x| resolve(doc, x))
        .and_then(|x| x.as_dict().ok())
        .ok_or("Page has no image XObjects")?;

    let mut best: Option<(u64, &Stream)> = None;
    for (_, object) in xobjects.iter() {
        let Some(stream) = resolve(doc, object).and_then(|o| o.as_stream().ok()) else {
            continue;
        };
        if !is_image(&stream.dict) {
            continue;
        }
        let area = dimension(&stream.dict, b"Width").unwrap_or(0) as u64
            * dimension(&stream.dict, b"Height").unwrap_or(0) as u64;
        if best.map_or(true, |(best_area, _)| area > best_area) {
            best = Some((area, stream));
        }
    }

    let (_, stream) = best.ok_or("Page has no image XObjects")?;
    decode_image_stream(doc, stream)
}

fn is_image(dict: &Dictionary) -> bool {
    dict.get(b"Subtype")
        .and_then(Object::as_name)
        .is_ok_and(|name| name == b"Image")
}

fn dimension(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    dict.get(key)
        .ok()
        .and_then(|v| v.as_i64().ok())
        .and_then(|v| u32::try_from(v).ok())
}

fn filters(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

fn decode_image_stream(doc: &Document, stream: &Stream) -> Result<DynamicImage, String> {
    let width = dimension(&stream.dict, b"Width").ok_or("Missing image width")?;
    let height = dimension(&stream.dict, b"Height").ok_or("Missing image height")?;

    let filters = filters(&stream.dict);
    match filters.last().map(Vec::as_slice) {
        Some(b"DCTDecode") if filters.len() == 1 => {
            return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
                .map_err(|e| format!("Failed to decode JPEG page image: {}", e));
        }
        Some(b"DCTDecode") | Some(b"JPXDecode") | Some(b"JBIG2Decode") | Some(b"CCITTFaxDecode") => {
            return Err(format!(
                "Unsupported image filter chain: {:?}",
                filters
                    .iter()
                    .map(|f| String::from_utf8_lossy(f).to_string())
                    .collect::<Vec<_>>()
            ));
        }
        _ => {}
    }

    let data = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream
            .decompressed_content()
            .map_err(|e| format!("Failed to decompress image: {}", e))?
    };

    let bits_per_component = stream
        .dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|b| b.as_i64().ok())
        .unwrap_or(8);

    let pixels = width as usize * height as usize;
    match (color_space(doc, stream).as_str(), bits_per_component) {
        ("DeviceGray", 1) => Ok(DynamicImage::ImageLuma8(unpack_bilevel(&data, width, height)?)),
        ("DeviceGray", 8) if data.len() >= pixels => {
            let img = GrayImage::from_raw(width, height, data[..pixels].to_vec())
                .ok_or("Invalid grayscale image data")?;
            Ok(DynamicImage::ImageLuma8(img))
        }
        ("DeviceRGB" | "ICCBased", 8) if data.len() >= pixels * 3 => {
            let img = image::RgbImage::from_raw(width, height, data[..pixels * 3].to_vec())
                .ok_or("Invalid RGB image data")?;
            Ok(DynamicImage::ImageRgb8(img))
        }
        ("DeviceCMYK", 8) if data.len() >= pixels * 4 => {
            let rgb_data: Vec<u8> = data[..pixels * 4]
                .chunks_exact(4)
                .flat_map(|cmyk| {
                    let k = 1.0 - cmyk[3] as f32 / 255.0;
                    [0, 1, 2].map(|i| ((1.0 - cmyk[i] as f32 / 255.0) * k * 255.0) as u8)
                })
                .collect();
            let img = image::RgbImage::from_raw(width, height, rgb_data)
                .ok_or("Invalid CMYK->RGB conversion")?;
            Ok(DynamicImage::ImageRgb8(img))
        }
        (space, bits) => Err(format!(
            "Unsupported image format: {} at {} bits, data_len={}",
            space,
            bits,
            data.len()
        )),
    }
}

/// Expand 1-bit rows (padded to whole bytes, 1 = white) to 8-bit gray
fn unpack_bilevel(data: &[u8], width: u32, height: u32) -> Result<GrayImage, String> {
    let stride = (width as usize).div_ceil(8);
    if data.len() < stride * height as usize {
        return Err(format!(
            "Bilevel image data too short: {} < {}",
            data.len(),
            stride * height as usize
        ));
    }
    Ok(GrayImage::from_fn(width, height, |x, y| {
        let byte = data[y as usize * stride + x as usize / 8];
        let bit = (byte >> (7 - (x % 8))) & 1;
        Luma([if bit == 1 { 255 } else { 0 }])
    }))
}

/// Get the color space name from a PDF stream, resolving indirect references
fn color_space(doc: &Document, stream: &Stream) -> String {
    let Some(cs) = stream
        .dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|obj| resolve(doc, obj))
    else {
        return "DeviceRGB".to_string();
    };

    // Direct name, or an array like [/ICCBased ref]
    let name = cs.as_name().ok().or_else(|| {
        cs.as_array()
            .ok()
            .and_then(|array| array.first())
            .and_then(|first| first.as_name().ok())
    });

    name.map(|n| String::from_utf8_lossy(n).to_string())
        .unwrap_or_else(|| "DeviceRGB".to_string())
}
