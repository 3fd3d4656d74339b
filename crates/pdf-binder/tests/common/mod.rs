#![allow(dead_code)]

use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pdf_binder::UploadedFile;

/// Build a PDF whose pages each show one marker string
pub fn create_test_pdf(markers: &[&str], width: i64, height: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));

    let mut kids = Vec::new();
    for marker in markers {
        let content = format!("BT /F1 12 Tf 72 72 Td ({}) Tj ET", marker);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width),
                    Object::Integer(height),
                ]),
            ),
            (
                "Resources",
                Object::Dictionary(Dictionary::from_iter(vec![(
                    "Font",
                    Object::Dictionary(Dictionary::from_iter(vec![(
                        "F1",
                        Object::Reference(font_id),
                    )])),
                )])),
            ),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(markers.len() as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    let mut writer = Vec::new();
    doc.save_to(&mut writer).unwrap();
    writer
}

/// A4 portrait PDF with the given page markers
pub fn a4_pdf(markers: &[&str]) -> Vec<u8> {
    create_test_pdf(markers, 595, 842)
}

/// Encode a small solid-colour RGB JPEG
pub fn tiny_jpeg(width: u32, height: u32) -> Vec<u8> {
    let pixels = vec![200u8; (width * height * 3) as usize];
    let mut buf = Vec::new();
    JpegEncoder::new(&mut buf)
        .encode(&pixels, width, height, ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

pub fn pdf_upload(path: &str, markers: &[&str]) -> UploadedFile {
    UploadedFile::new(path, "application/pdf", a4_pdf(markers))
}

pub fn jpeg_upload(path: &str, width: u32, height: u32) -> UploadedFile {
    UploadedFile::new(path, "image/jpeg", tiny_jpeg(width, height))
}

pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

fn stream_bytes(stream: &Stream) -> Vec<u8> {
    if stream.dict.has(b"Filter") {
        stream.decompressed_content().unwrap()
    } else {
        stream.content.clone()
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap(),
        _ => obj,
    }
}

/// Decoded content streams drawn directly on a page
pub fn page_contents(doc: &Document, page_id: ObjectId) -> Vec<Vec<u8>> {
    let page = doc.get_dictionary(page_id).unwrap();
    match resolve(doc, page.get(b"Contents").unwrap()) {
        Object::Array(parts) => parts
            .iter()
            .map(|part| stream_bytes(resolve(doc, part).as_stream().unwrap()))
            .collect(),
        Object::Stream(stream) => vec![stream_bytes(stream)],
        _ => Vec::new(),
    }
}

/// Every string shown with `Tj` on the page itself, in drawing order
pub fn page_strings(doc: &Document, page_id: ObjectId) -> Vec<String> {
    let mut strings = Vec::new();
    for bytes in page_contents(doc, page_id) {
        let content = Content::decode(&bytes).unwrap();
        for op in content.operations {
            if op.operator == "Tj" {
                if let Some(Object::String(text, _)) = op.operands.first() {
                    strings.push(text.iter().map(|&b| b as char).collect());
                }
            }
        }
    }
    strings
}

/// The `Tm` operands used for the string `text` on a page
pub fn text_matrix(doc: &Document, page_id: ObjectId, text: &str) -> Option<Vec<f32>> {
    for bytes in page_contents(doc, page_id) {
        let content = Content::decode(&bytes).unwrap();
        let mut matrix = None;
        for op in content.operations {
            match op.operator.as_str() {
                "Tm" => {
                    matrix = Some(
                        op.operands
                            .iter()
                            .map(|o| match o {
                                Object::Integer(i) => *i as f32,
                                Object::Real(r) => *r,
                                _ => f32::NAN,
                            })
                            .collect(),
                    )
                }
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = op.operands.first() {
                        let shown: String = bytes.iter().map(|&b| b as char).collect();
                        if shown == text {
                            return matrix;
                        }
                    }
                }
                _ => {}
            }
        }
    }
    None
}

/// The XObject drawn as the page body, if any
pub fn body_xobject(doc: &Document, page_id: ObjectId) -> Option<&Stream> {
    let page = doc.get_dictionary(page_id).ok()?;
    let resources = resolve(doc, page.get(b"Resources").ok()?).as_dict().ok()?;
    let xobjects = resolve(doc, resources.get(b"XObject").ok()?).as_dict().ok()?;
    resolve(doc, xobjects.get(b"P0").ok()?).as_stream().ok()
}

/// Marker text of a page built by [`create_test_pdf`], or the pixel size of an image page
pub fn body_marker(doc: &Document, page_id: ObjectId) -> Option<String> {
    let xobject = body_xobject(doc, page_id)?;
    let subtype = xobject.dict.get(b"Subtype").ok()?.as_name().ok()?;
    if subtype == b"Image" {
        let width = xobject.dict.get(b"Width").ok()?.as_i64().ok()?;
        let height = xobject.dict.get(b"Height").ok()?.as_i64().ok()?;
        return Some(format!("image {}x{}", width, height));
    }
    let content = Content::decode(&stream_bytes(xobject)).ok()?;
    content.operations.iter().find_map(|op| match op.operands.first() {
        Some(Object::String(bytes, _)) if op.operator == "Tj" => {
            Some(bytes.iter().map(|&b| b as char).collect())
        }
        _ => None,
    })
}

/// `[width, height]` of a page's MediaBox
pub fn page_size(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let page = doc.get_dictionary(page_id).unwrap();
    let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
    let number = |o: &Object| match o {
        Object::Integer(i) => *i as f32,
        Object::Real(r) => *r,
        _ => panic!("not a number"),
    };
    (
        number(&media_box[2]) - number(&media_box[0]),
        number(&media_box[3]) - number(&media_box[1]),
    )
}
