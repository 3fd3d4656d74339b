mod assemble;
pub mod constants;
mod cover;
pub mod hierarchy;
mod io;
pub mod normalize;
mod options;
pub mod render;
pub mod stamp;
mod stats;
pub mod toc;
mod types;

pub use assemble::{FrontMatter, assemble, assemble_sync};
pub use cover::{CoverFields, fill_and_flatten, format_cover_date, unit_name};
pub use hierarchy::{
    Container, ContainerId, Hierarchy, IngestReport, SiblingGroup, Visit, natural_cmp,
};
pub use io::{load_bytes, load_directory, mime_type_for, save_document};
pub use options::*;
pub use stats::calculate_statistics;
pub use types::*;
