//! Folder-derived section model
//!
//! - Path classification of uploaded files into containers
//! - The container tree and its caller-facing mutations

mod classify;
mod container;

pub use classify::{IngestReport, natural_cmp};
pub use container::{Container, ContainerId, Hierarchy, SiblingGroup, Visit, Walk};
