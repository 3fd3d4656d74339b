//! PDF rendering for the output document
//!
//! - Wrapping source pages and JPEG files as XObjects
//! - The output page list, shared fonts and serialization
//! - Text metrics and encoding for generated text
//! - Transformation matrices

mod matrix;
mod page;
mod text;
pub(crate) mod xobject;

pub use matrix::Matrix;
pub use page::{OutputDocument, OutputPage};
pub use text::{Font, encode_win_ansi, show_text, text_string, text_width, truncate_to_width};
pub use xobject::{
    ImageXObject, PageGeometry, copy_object_deep, create_jpeg_xobject, create_page_xobject,
    page_geometry,
};
