//! XObject creation for normalized pages
//!
//! Source PDF pages are wrapped as Form XObjects and JPEG files become Image
//! XObjects; both are then drawn onto output pages with a placement matrix.

use super::matrix::Matrix;
use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::types::{PageSize, Result};
use image::ImageDecoder;
use image::codecs::jpeg::JpegDecoder;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::io::Cursor;

/// Guard against malformed page trees whose `/Parent` chain loops
const MAX_INHERITANCE_DEPTH: usize = 32;

// =============================================================================
// Page Geometry
// =============================================================================

/// Visible box and rotation of a source page, inheritance resolved
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// `[x0, y0, x1, y1]` of the CropBox (or MediaBox when there is none)
    pub bbox: [f32; 4],
    /// `/Rotate` normalized to 0, 90, 180 or 270
    pub rotate: i64,
}

impl PageGeometry {
    pub fn width(&self) -> f32 {
        self.bbox[2] - self.bbox[0]
    }

    pub fn height(&self) -> f32 {
        self.bbox[3] - self.bbox[1]
    }

    /// Size as a viewer shows the page, with `/Rotate` applied
    pub fn displayed(&self) -> PageSize {
        match self.rotate {
            90 | 270 => PageSize::new(self.height(), self.width()),
            _ => PageSize::new(self.width(), self.height()),
        }
    }

    /// Matrix from the page's own coordinates to the displayed box at the origin
    pub fn to_displayed(&self) -> Matrix {
        Matrix::translate(-self.bbox[0], -self.bbox[1]).then(Matrix::page_rotation(
            self.rotate,
            self.width(),
            self.height(),
        ))
    }
}

/// Read the effective geometry of a page, following `/Parent` for
/// inherited `/MediaBox`, `/CropBox` and `/Rotate`.
pub fn page_geometry(doc: &Document, page_id: ObjectId) -> Result<PageGeometry> {
    let media_box = inherited(doc, page_id, b"MediaBox")?
        .and_then(|obj| read_box(doc, obj))
        .unwrap_or([
            0.0,
            0.0,
            DEFAULT_PAGE_DIMENSIONS.0,
            DEFAULT_PAGE_DIMENSIONS.1,
        ]);
    let bbox = inherited(doc, page_id, b"CropBox")?
        .and_then(|obj| read_box(doc, obj))
        .map(|crop| intersect(crop, media_box))
        .filter(|b| b[2] > b[0] && b[3] > b[1])
        .unwrap_or(media_box);

    let rotate = inherited(doc, page_id, b"Rotate")?
        .map(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_i64().ok())
        .unwrap_or(0);
    // Only quarter turns are meaningful; anything else is treated as 0
    let rotate = match rotate.rem_euclid(360) {
        r @ (90 | 180 | 270) => r,
        _ => 0,
    };

    Ok(PageGeometry { bbox, rotate })
}

/// Look up a page attribute on the page or the nearest ancestor carrying it
pub(crate) fn inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>> {
    let mut dict = doc.get_dictionary(page_id)?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Ok(Some(value));
        }
        match dict.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => dict = doc.get_dictionary(parent)?,
            Err(_) => break,
        }
    }
    Ok(None)
}

pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Parse a rectangle array, normalizing so that x0 < x1 and y0 < y1
pub(crate) fn read_box(doc: &Document, obj: &Object) -> Option<[f32; 4]> {
    let values: Vec<f32> = resolve(doc, obj)
        .as_array()
        .ok()?
        .iter()
        .filter_map(|item| extract_number(resolve(doc, item)))
        .collect();
    let [x0, y0, x1, y1] = <[f32; 4]>::try_from(values).ok()?;
    let rect = [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)];
    (rect[2] > rect[0] && rect[3] > rect[1]).then_some(rect)
}

fn intersect(a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
    [a[0].max(b[0]), a[1].max(b[1]), a[2].min(b[2]), a[3].min(b[3])]
}

/// Extract numeric value from a PDF object
pub(crate) fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

// =============================================================================
// Form XObjects
// =============================================================================

/// Wrap a source page as a Form XObject in the output document.
///
/// The XObject's BBox is the page's visible box in its own coordinates;
/// callers combine [`PageGeometry::to_displayed`] with their placement.
/// `cache` maps source object ids to copies already made in `output` and
/// must only be shared between pages of the same source document.
pub fn create_page_xobject(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    geometry: &PageGeometry,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<ObjectId> {
    let page_dict = source.get_dictionary(page_id)?;

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set("FormType", Object::Integer(1));
    xobject_dict.set(
        "BBox",
        Object::Array(geometry.bbox.iter().copied().map(Object::Real).collect()),
    );

    if let Some(resources) = inherited(source, page_id, b"Resources")? {
        xobject_dict.set(
            "Resources",
            copy_object_deep(output, source, resources, cache)?,
        );
    }

    let stream = page_content_stream(source, page_dict, xobject_dict)?;
    Ok(output.add_object(stream))
}

/// Build the XObject stream from the page's content.
///
/// A single content stream is carried over still encoded, with its filter;
/// an array of streams is decoded and joined.
fn page_content_stream(
    doc: &Document,
    page_dict: &Dictionary,
    mut xobject_dict: Dictionary,
) -> Result<Stream> {
    let contents = match page_dict.get(b"Contents") {
        Ok(contents) => resolve(doc, contents),
        Err(_) => return Ok(Stream::new(xobject_dict, Vec::new())),
    };

    match contents {
        Object::Stream(stream) => {
            for key in [b"Filter".as_slice(), b"DecodeParms".as_slice()] {
                if let Ok(value) = stream.dict.get(key) {
                    xobject_dict.set(key.to_vec(), resolve(doc, value).clone());
                }
            }
            let encoded = stream.dict.has(b"Filter");
            Ok(Stream::new(xobject_dict, stream.content.clone()).with_compression(!encoded))
        }
        Object::Array(parts) => {
            let mut content = Vec::new();
            for part in parts {
                if let Ok(stream) = resolve(doc, part).as_stream() {
                    content.extend_from_slice(&stream_bytes(stream)?);
                    content.push(b'\n');
                }
            }
            Ok(Stream::new(xobject_dict, content))
        }
        _ => Ok(Stream::new(xobject_dict, Vec::new())),
    }
}

/// Decoded bytes of a stream; unfiltered streams are returned as stored
fn stream_bytes(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        Ok(stream.decompressed_content()?)
    } else {
        Ok(stream.content.clone())
    }
}

// =============================================================================
// Image XObjects
// =============================================================================

/// An embedded JPEG and its pixel dimensions
#[derive(Debug, Clone, Copy)]
pub struct ImageXObject {
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
}

/// Embed a JPEG unchanged as a DCTDecode Image XObject.
///
/// Only the header is decoded, to learn the dimensions and colour space.
pub fn create_jpeg_xobject(
    output: &mut Document,
    bytes: &[u8],
) -> image::ImageResult<ImageXObject> {
    let decoder = JpegDecoder::new(Cursor::new(bytes))?;
    let (width, height) = decoder.dimensions();

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));

    match decoder.original_color_type() {
        image::ExtendedColorType::L8 => {
            dict.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
        }
        image::ExtendedColorType::Cmyk8 => {
            dict.set("ColorSpace", Object::Name(b"DeviceCMYK".to_vec()));
            // Adobe CMYK JPEGs store inverted components
            dict.set(
                "Decode",
                Object::Array(
                    [1, 0, 1, 0, 1, 0, 1, 0]
                        .into_iter()
                        .map(Object::Integer)
                        .collect(),
                ),
            );
        }
        _ => {
            dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
        }
    }

    let stream = Stream::new(dict, bytes.to_vec()).with_compression(false);
    Ok(ImageXObject {
        id: output.add_object(stream),
        width,
        height,
    })
}

// =============================================================================
// Deep Copy
// =============================================================================

/// Deep copy an object from source to output document, following references.
///
/// The target id is reserved before descending, so reference cycles in the
/// source resolve to the same copy.
pub fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }

            let new_id = output.new_object_id();
            cache.insert(*id, new_id);

            let copied = match source.get_object(*id) {
                Ok(referenced) => copy_object_deep(output, source, referenced, cache)?,
                // Dangling references read as null
                Err(_) => Object::Null,
            };
            output.objects.insert(new_id, copied);

            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => Ok(Object::Dictionary(copy_dictionary(
            output, source, dict, cache,
        )?)),
        Object::Array(arr) => {
            let new_arr: Result<Vec<_>> = arr
                .iter()
                .map(|item| copy_object_deep(output, source, item, cache))
                .collect();
            Ok(Object::Array(new_arr?))
        }
        Object::Stream(stream) => Ok(Object::Stream(Stream {
            dict: copy_dictionary(output, source, &stream.dict, cache)?,
            content: stream.content.clone(),
            allows_compression: stream.allows_compression,
            start_position: None,
        })),
        _ => Ok(obj.clone()),
    }
}

fn copy_dictionary(
    output: &mut Document,
    source: &Document,
    dict: &Dictionary,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Dictionary> {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        // Back links into the source page tree would drag in every page
        if key.as_slice() == b"Parent" || key.as_slice() == b"P" {
            continue;
        }
        new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
    }
    Ok(new_dict)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_doc(page: Dictionary) -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut page = page;
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        let page_id = doc.add_object(page);
        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ("Count", Object::Integer(1)),
            (
                "MediaBox",
                Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(842), Object::Integer(595)]),
            ),
            ("Rotate", Object::Integer(90)),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        (doc, page_id)
    }

    #[test]
    fn geometry_inherits_media_box_and_rotation() {
        let (doc, page_id) = page_doc(Dictionary::new());
        let geometry = page_geometry(&doc, page_id).unwrap();
        assert_eq!(geometry.bbox, [0.0, 0.0, 842.0, 595.0]);
        assert_eq!(geometry.rotate, 90);
        assert_eq!(geometry.displayed(), PageSize::new(595.0, 842.0));
    }

    #[test]
    fn crop_box_wins_over_media_box() {
        let mut page = Dictionary::new();
        page.set(
            "CropBox",
            Object::Array(vec![Object::Integer(10), Object::Integer(20), Object::Integer(410), Object::Integer(320)]),
        );
        page.set("Rotate", Object::Integer(0));
        let (doc, page_id) = page_doc(page);
        let geometry = page_geometry(&doc, page_id).unwrap();
        assert_eq!(geometry.bbox, [10.0, 20.0, 410.0, 320.0]);
        assert_eq!(geometry.displayed(), PageSize::new(400.0, 300.0));
        assert_eq!(geometry.to_displayed().apply(10.0, 20.0), (0.0, 0.0));
    }

    #[test]
    fn copy_handles_reference_cycles() {
        let mut source = Document::with_version("1.7");
        let a = source.new_object_id();
        let b = source.new_object_id();
        source.objects.insert(
            a,
            Object::Dictionary(Dictionary::from_iter(vec![("Next", Object::Reference(b))])),
        );
        source.objects.insert(
            b,
            Object::Dictionary(Dictionary::from_iter(vec![("Next", Object::Reference(a))])),
        );

        let mut output = Document::with_version("1.7");
        let mut cache = HashMap::new();
        let copied = copy_object_deep(&mut output, &source, &Object::Reference(a), &mut cache)
            .unwrap();
        assert!(matches!(copied, Object::Reference(_)));
        assert_eq!(output.objects.len(), 2);
    }
}
