//! Standard cover: fill the `unitname` and `date` form fields, then flatten
//!
//! Flattening draws every widget into its page's content and removes the
//! interactive form. The two known fields are drawn from their new values,
//! centered in the widget; all other widgets are drawn from their normal
//! appearance stream.

use crate::constants::{COVER_FIELD_DATE, COVER_FIELD_UNIT_NAME, UNIT_NAME_SUFFIX};
use crate::render::xobject::{extract_number, inherited, read_box, resolve};
use crate::render::{Font, Matrix, show_text, text_width};
use crate::types::{AssembleError, Phase, Result};
use chrono::NaiveDate;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Name used for the cover in error messages
pub const COVER_LABEL: &str = "standard cover";

/// Font size used when a field's default appearance asks for auto sizing
const AUTO_FONT_SIZE: f32 = 12.0;

/// Horizontal padding kept inside a widget when text is shrunk to fit
const FIELD_PADDING: f32 = 2.0;

const MAX_FIELD_DEPTH: usize = 16;

/// Annotation flags that keep a widget off the page
const FLAG_HIDDEN: i64 = 1 << 1;
const FLAG_NO_VIEW: i64 = 1 << 5;

/// Values written into the standard cover
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverFields {
    pub unit_name: String,
    pub date: String,
}

impl CoverFields {
    pub fn new(output_name: &str, date: NaiveDate) -> Self {
        Self {
            unit_name: unit_name(output_name),
            date: format_cover_date(date),
        }
    }

    fn value_for(&self, field: &str) -> Option<&str> {
        match field {
            COVER_FIELD_UNIT_NAME => Some(&self.unit_name),
            COVER_FIELD_DATE => Some(&self.date),
            _ => None,
        }
    }
}

/// The output name without its trailing " SQP"
pub fn unit_name(output_name: &str) -> String {
    output_name
        .strip_suffix(UNIT_NAME_SUFFIX)
        .unwrap_or(output_name)
        .to_string()
}

/// `YYYY.MM.DD`
pub fn format_cover_date(date: NaiveDate) -> String {
    date.format("%Y.%m.%d").to_string()
}

/// Load the template, fill and flatten its form
pub fn fill_and_flatten(template: &[u8], fields: &CoverFields) -> Result<Document> {
    let malformed = |e: AssembleError| AssembleError::malformed(Phase::Cover, COVER_LABEL, e);
    let mut doc = Document::load_mem(template).map_err(|e| malformed(e.into()))?;
    flatten_form(&mut doc, fields).map_err(malformed)?;
    Ok(doc)
}

/// A widget annotation of a terminal form field
#[derive(Debug, Clone)]
struct Widget {
    id: ObjectId,
    /// Fully qualified field name
    name: String,
    rect: [f32; 4],
    font_size: f32,
    appearance: Option<ObjectId>,
    page_hint: Option<ObjectId>,
    hidden: bool,
}

/// Content to draw onto one page
#[derive(Debug, Default)]
struct Overlay {
    texts: Vec<([f32; 4], String, f32)>,
    appearances: Vec<([f32; 4], ObjectId)>,
}

fn flatten_form(doc: &mut Document, fields: &CoverFields) -> Result<()> {
    let catalog_id = doc.trailer.get(b"Root")?.as_reference()?;
    let acroform = match doc.get_dictionary(catalog_id)?.get(b"AcroForm") {
        Ok(obj) => resolve(doc, obj).as_dict()?.clone(),
        Err(_) => {
            log::debug!("Standard cover has no form fields");
            return Ok(());
        }
    };

    let default_da = acroform.get(b"DA").ok().and_then(string_value);
    let mut widgets = Vec::new();
    if let Ok(roots) = acroform.get(b"Fields").map(|o| resolve(doc, o)) {
        for root in roots.as_array().map(Vec::as_slice).unwrap_or_default() {
            collect_widgets(doc, root, "", default_da.as_deref(), &mut widgets, 0);
        }
    }

    for expected in [COVER_FIELD_UNIT_NAME, COVER_FIELD_DATE] {
        if !widgets.iter().any(|w| w.name == expected) {
            log::warn!("Standard cover has no '{}' field", expected);
        }
    }

    let page_of = widget_pages(doc);
    let mut overlays: BTreeMap<ObjectId, Overlay> = BTreeMap::new();
    for widget in &widgets {
        if widget.hidden {
            continue;
        }
        let Some(page_id) = page_of.get(&widget.id).copied().or(widget.page_hint) else {
            log::warn!("Form field '{}' is not on any page", widget.name);
            continue;
        };
        let overlay = overlays.entry(page_id).or_default();
        match fields.value_for(&widget.name) {
            Some(value) => {
                log::debug!("Filling cover field '{}' with '{}'", widget.name, value);
                overlay
                    .texts
                    .push((widget.rect, value.to_string(), widget.font_size));
            }
            None => {
                if let Some(appearance) = widget.appearance {
                    overlay.appearances.push((widget.rect, appearance));
                }
            }
        }
    }

    for (page_id, overlay) in overlays {
        draw_overlay(doc, page_id, overlay)?;
    }

    let widget_ids: HashSet<ObjectId> = widgets.iter().map(|w| w.id).collect();
    remove_annotations(doc, &widget_ids)?;
    doc.get_dictionary_mut(catalog_id)?.remove(b"AcroForm");
    Ok(())
}

/// Walk the field tree, recording the widgets of terminal fields
fn collect_widgets(
    doc: &Document,
    node: &Object,
    parent_name: &str,
    parent_da: Option<&str>,
    out: &mut Vec<Widget>,
    depth: usize,
) {
    if depth > MAX_FIELD_DEPTH {
        return;
    }
    let Object::Reference(id) = node else {
        return;
    };
    let Ok(dict) = doc.get_dictionary(*id) else {
        return;
    };

    let name = match dict.get(b"T").ok().and_then(string_value) {
        Some(partial) if parent_name.is_empty() => partial,
        Some(partial) => format!("{}.{}", parent_name, partial),
        None => parent_name.to_string(),
    };
    let da = dict.get(b"DA").ok().and_then(string_value);
    let da = da.as_deref().or(parent_da);

    if let Ok(kids) = dict.get(b"Kids").map(|k| resolve(doc, k)).and_then(Object::as_array) {
        if !kids.is_empty() {
            for kid in kids {
                collect_widgets(doc, kid, &name, da, out, depth + 1);
            }
            return;
        }
    }

    let Some(rect) = dict.get(b"Rect").ok().and_then(|r| read_box(doc, r)) else {
        return;
    };
    let flags = dict
        .get(b"F")
        .ok()
        .and_then(|f| resolve(doc, f).as_i64().ok())
        .unwrap_or(0);

    out.push(Widget {
        id: *id,
        name,
        rect,
        font_size: da.and_then(font_size_from_da).unwrap_or(0.0),
        appearance: normal_appearance(doc, dict),
        page_hint: dict.get(b"P").and_then(Object::as_reference).ok(),
        hidden: flags & (FLAG_HIDDEN | FLAG_NO_VIEW) != 0,
    });
}

/// The `/AP /N` stream, choosing the `/AS` state when there are several
fn normal_appearance(doc: &Document, widget: &Dictionary) -> Option<ObjectId> {
    let ap = resolve(doc, widget.get(b"AP").ok()?).as_dict().ok()?;
    match ap.get(b"N").ok()? {
        Object::Reference(id) => match doc.get_object(*id).ok()? {
            Object::Stream(_) => Some(*id),
            Object::Dictionary(states) => state_appearance(widget, states),
            _ => None,
        },
        Object::Dictionary(states) => state_appearance(widget, states),
        _ => None,
    }
}

fn state_appearance(widget: &Dictionary, states: &Dictionary) -> Option<ObjectId> {
    let state = widget.get(b"AS").and_then(Object::as_name).ok()?;
    states.get(state).and_then(Object::as_reference).ok()
}

/// Map every annotation id to the page that lists it
fn widget_pages(doc: &Document) -> HashMap<ObjectId, ObjectId> {
    let mut page_of = HashMap::new();
    for page_id in doc.get_pages().into_values() {
        let Ok(page) = doc.get_dictionary(page_id) else {
            continue;
        };
        let Ok(annots) = page.get(b"Annots").map(|a| resolve(doc, a)).and_then(Object::as_array)
        else {
            continue;
        };
        for annot in annots {
            if let Object::Reference(id) = annot {
                page_of.insert(*id, page_id);
            }
        }
    }
    page_of
}

/// Draw the overlay after the page's existing content
fn draw_overlay(doc: &mut Document, page_id: ObjectId, overlay: Overlay) -> Result<()> {
    let mut operations = Vec::new();
    let mut xobjects = Vec::new();

    for (index, (rect, appearance)) in overlay.appearances.iter().enumerate() {
        let name = format!("BnField{}", index);
        let (bbox, form_matrix) = match doc.get_object_mut(*appearance)? {
            Object::Stream(stream) => {
                stream.dict.set("Type", Object::Name(b"XObject".to_vec()));
                stream.dict.set("Subtype", Object::Name(b"Form".to_vec()));
                (
                    stream.dict.get(b"BBox").ok().cloned(),
                    stream.dict.get(b"Matrix").ok().cloned(),
                )
            }
            _ => continue,
        };
        let bbox = bbox.and_then(|b| read_box(doc, &b)).unwrap_or(*rect);
        let form_matrix = form_matrix
            .and_then(|m| read_matrix(doc, &m))
            .unwrap_or(Matrix::IDENTITY);
        let matrix = appearance_placement(bbox, form_matrix, *rect);

        operations.push(Operation::new("q", vec![]));
        operations.push(Operation::new("cm", matrix.operands()));
        operations.push(Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]));
        operations.push(Operation::new("Q", vec![]));
        xobjects.push((name, *appearance));
    }

    let font_id = if overlay.texts.is_empty() {
        None
    } else {
        Some(doc.add_object(Font::Regular.dictionary()))
    };
    for (rect, value, size) in &overlay.texts {
        operations.extend(centered_text(*rect, value, *size));
    }

    // Resources become an inline dictionary on the page itself
    let mut resources = match inherited(doc, page_id, b"Resources")? {
        Some(obj) => resolve(doc, obj).as_dict().cloned().unwrap_or_default(),
        None => Dictionary::new(),
    };
    if let Some(font_id) = font_id {
        let mut fonts = subdictionary(doc, &resources, b"Font");
        fonts.set(Font::Regular.resource_name(), Object::Reference(font_id));
        resources.set("Font", fonts);
    }
    if !xobjects.is_empty() {
        let mut dict = subdictionary(doc, &resources, b"XObject");
        for (name, id) in xobjects {
            dict.set(name, Object::Reference(id));
        }
        resources.set("XObject", dict);
    }

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(
        Dictionary::new(),
        Content { operations }.encode()?,
    ));

    let page = doc.get_dictionary_mut(page_id)?;
    let mut contents = vec![Object::Reference(save_id)];
    match page.get(b"Contents") {
        Ok(Object::Array(existing)) => contents.extend(existing.iter().cloned()),
        Ok(existing @ Object::Reference(_)) => contents.push(existing.clone()),
        _ => {}
    }
    contents.push(Object::Reference(restore_id));
    contents.push(Object::Reference(overlay_id));
    page.set("Contents", Object::Array(contents));
    page.set("Resources", resources);
    Ok(())
}

/// Map an appearance's BBox, as transformed by its own `/Matrix`, onto the
/// widget rectangle. The form matrix itself is applied by `Do`.
fn appearance_placement(bbox: [f32; 4], form_matrix: Matrix, rect: [f32; 4]) -> Matrix {
    let corners = [
        form_matrix.apply(bbox[0], bbox[1]),
        form_matrix.apply(bbox[2], bbox[1]),
        form_matrix.apply(bbox[0], bbox[3]),
        form_matrix.apply(bbox[2], bbox[3]),
    ];
    let min_x = corners.iter().map(|c| c.0).fold(f32::INFINITY, f32::min);
    let min_y = corners.iter().map(|c| c.1).fold(f32::INFINITY, f32::min);
    let max_x = corners.iter().map(|c| c.0).fold(f32::NEG_INFINITY, f32::max);
    let max_y = corners.iter().map(|c| c.1).fold(f32::NEG_INFINITY, f32::max);

    let ratio = |target: f32, source: f32| if source > 0.0 { target / source } else { 1.0 };
    let sx = ratio(rect[2] - rect[0], max_x - min_x);
    let sy = ratio(rect[3] - rect[1], max_y - min_y);
    Matrix::translate(-min_x, -min_y)
        .then(Matrix::scale(sx, sy))
        .then(Matrix::translate(rect[0], rect[1]))
}

/// A six-number `/Matrix` array
fn read_matrix(doc: &Document, obj: &Object) -> Option<Matrix> {
    let values: Vec<f32> = resolve(doc, obj)
        .as_array()
        .ok()?
        .iter()
        .filter_map(|item| extract_number(resolve(doc, item)))
        .collect();
    let [a, b, c, d, e, f] = <[f32; 6]>::try_from(values).ok()?;
    Some(Matrix { a, b, c, d, e, f })
}

/// Operations drawing `value` centered in `rect`
fn centered_text(rect: [f32; 4], value: &str, size: f32) -> Vec<Operation> {
    let width = rect[2] - rect[0];
    let height = rect[3] - rect[1];
    let mut size = if size > 0.0 {
        size
    } else {
        AUTO_FONT_SIZE.min(height * 0.7)
    };
    let text_w = text_width(value, Font::Regular, size);
    let room = width - 2.0 * FIELD_PADDING;
    if text_w > room && text_w > 0.0 {
        size *= room / text_w;
    }
    let text_w = text_width(value, Font::Regular, size);

    // Center the cap height vertically
    let x = rect[0] + (width - text_w) / 2.0;
    let y = rect[1] + (height - size * 0.7) / 2.0;
    show_text(Font::Regular, size, Matrix::translate(x, y), value)
}

/// A resource sub-dictionary (`/Font`, `/XObject`) as an owned dictionary
fn subdictionary(doc: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    resources
        .get(key)
        .ok()
        .and_then(|obj| resolve(doc, obj).as_dict().ok())
        .cloned()
        .unwrap_or_default()
}

/// Drop the flattened widgets from every page's `/Annots`
fn remove_annotations(doc: &mut Document, widgets: &HashSet<ObjectId>) -> Result<()> {
    for page_id in doc.get_pages().into_values() {
        let annots = match doc.get_dictionary(page_id)?.get(b"Annots") {
            Ok(obj) => match resolve(doc, obj).as_array() {
                Ok(items) => items.clone(),
                Err(_) => continue,
            },
            Err(_) => continue,
        };
        let kept: Vec<Object> = annots
            .into_iter()
            .filter(|annot| !matches!(annot, Object::Reference(id) if widgets.contains(id)))
            .collect();

        let page = doc.get_dictionary_mut(page_id)?;
        if kept.is_empty() {
            page.remove(b"Annots");
        } else {
            page.set("Annots", Object::Array(kept));
        }
    }
    Ok(())
}

/// Decode a PDF text string (UTF-16BE with BOM, otherwise Latin-1)
fn string_value(obj: &Object) -> Option<String> {
    let Object::String(bytes, _) = obj else {
        return None;
    };
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&units));
    }
    Some(bytes.iter().map(|&b| b as char).collect())
}

/// Font size from a default appearance string such as `/Helv 12 Tf 0 g`
fn font_size_from_da(da: &str) -> Option<f32> {
    let tokens: Vec<&str> = da.split_whitespace().collect();
    let tf = tokens.iter().position(|t| *t == "Tf")?;
    tokens.get(tf.checked_sub(1)?)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_name_strips_suffix_only_at_the_end() {
        assert_eq!(unit_name("Skolen HVAC SQP"), "Skolen HVAC");
        assert_eq!(unit_name("SQP Skolen"), "SQP Skolen");
        assert_eq!(unit_name("Skolen"), "Skolen");
    }

    #[test]
    fn date_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(format_cover_date(date), "2024.03.09");
    }

    #[test]
    fn default_appearance_font_size() {
        assert_eq!(font_size_from_da("/Helv 12 Tf 0 g"), Some(12.0));
        assert_eq!(font_size_from_da("0 g /Helv 0 Tf"), Some(0.0));
        assert_eq!(font_size_from_da("0 g"), None);
    }

    #[test]
    fn text_strings_decode() {
        let latin = Object::String(vec![b'd', 0xE5, b't', b'e'], lopdf::StringFormat::Literal);
        assert_eq!(string_value(&latin).as_deref(), Some("dåte"));
        let utf16 = Object::String(
            vec![0xFE, 0xFF, 0x00, b'u', 0x00, b'n'],
            lopdf::StringFormat::Hexadecimal,
        );
        assert_eq!(string_value(&utf16).as_deref(), Some("un"));
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn appearance_fills_the_widget() {
        let rect = [300.0, 600.0, 400.0, 640.0];
        let placement = appearance_placement([10.0, 10.0, 60.0, 30.0], Matrix::IDENTITY, rect);
        assert_eq!(placement.apply(10.0, 10.0), (300.0, 600.0));
        let (x, y) = placement.apply(60.0, 30.0);
        assert!(close(x, 400.0) && close(y, 640.0));
    }

    #[test]
    fn rotated_appearance_matrix_is_honoured() {
        // Appearance drawn upright in a 50x20 box, turned a quarter by its /Matrix
        let form_matrix = Matrix {
            a: 0.0,
            b: 1.0,
            c: -1.0,
            d: 0.0,
            e: 0.0,
            f: 0.0,
        };
        let rect = [300.0, 600.0, 400.0, 640.0];
        let placement = appearance_placement([0.0, 0.0, 50.0, 20.0], form_matrix, rect);
        let combined = form_matrix.then(placement);

        let corners = [(0.0, 0.0), (50.0, 0.0), (0.0, 20.0), (50.0, 20.0)]
            .map(|(x, y)| combined.apply(x, y));
        let min_x = corners.iter().map(|c| c.0).fold(f32::INFINITY, f32::min);
        let max_x = corners.iter().map(|c| c.0).fold(f32::NEG_INFINITY, f32::max);
        let min_y = corners.iter().map(|c| c.1).fold(f32::INFINITY, f32::min);
        let max_y = corners.iter().map(|c| c.1).fold(f32::NEG_INFINITY, f32::max);
        assert!(close(min_x, 300.0) && close(max_x, 400.0));
        assert!(close(min_y, 600.0) && close(max_y, 640.0));
    }

    #[test]
    fn long_values_shrink_to_the_widget() {
        let rect = [100.0, 100.0, 160.0, 120.0];
        let ops = centered_text(rect, "A rather long unit name", 12.0);
        let tf = ops.iter().find(|op| op.operator == "Tf").unwrap();
        let size = match tf.operands[1] {
            Object::Real(size) => size,
            _ => panic!("font size operand"),
        };
        assert!(size < 12.0);
        assert!(text_width("A rather long unit name", Font::Regular, size) <= 56.0 + 1e-3);
    }
}
