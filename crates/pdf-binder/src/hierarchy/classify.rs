//! Path classification: uploaded files → container tree
//!
//! Every folder component of a file's relative path becomes a container at
//! the matching depth; the file is attached to the deepest one. Files
//! without a folder land in a shared fallback section.

use super::container::{Container, ContainerId, Hierarchy};
use crate::constants::DEFAULT_SECTION_TITLE;
use crate::types::{SourceFile, SourceKind, UploadedFile};
use std::cmp::Ordering;

/// What happened to a batch of uploaded files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Files attached to a container
    pub accepted: usize,
    /// Paths of files dropped because they are neither PDF nor JPEG
    pub rejected: Vec<String>,
    /// Containers created by this batch
    pub containers_created: usize,
}

impl Hierarchy {
    /// Build a hierarchy from one batch of uploaded files
    pub fn classify(files: impl IntoIterator<Item = UploadedFile>) -> Self {
        let mut hierarchy = Hierarchy::new();
        hierarchy.ingest(files);
        hierarchy
    }

    /// Merge a batch of uploaded files into this hierarchy.
    ///
    /// Folders whose path matches an existing container are reused, so
    /// repeated uploads of the same folder concatenate their files in upload
    /// order. Sibling containers are sorted by title afterwards.
    pub fn ingest(&mut self, files: impl IntoIterator<Item = UploadedFile>) -> IngestReport {
        let mut report = IngestReport::default();

        for file in files {
            if SourceKind::from_mime(&file.mime_type).is_none() {
                log::warn!(
                    "File ignored (not PDF/JPEG): {} ({})",
                    file.path,
                    file.mime_type
                );
                report.rejected.push(file.path);
                continue;
            }

            let components = split_path(&file.path);
            let folders: Vec<&str> = match components.split_last() {
                Some((_, folders)) if !folders.is_empty() => folders.to_vec(),
                _ => vec![DEFAULT_SECTION_TITLE],
            };

            let path = components.join("/");
            let source = SourceFile::new(path, file.mime_type, file.bytes);
            log::debug!("Attaching {} under {}", source.path, folders.join("/"));

            let created = self.attach(&folders, source);
            report.containers_created += created;
            report.accepted += 1;
        }

        sort_containers(&mut self.sections);
        report
    }

    /// Walk (creating as needed) the container chain for `folders` and attach
    /// the file to the last one. Returns the number of containers created.
    fn attach(&mut self, folders: &[&str], file: SourceFile) -> usize {
        let Some((last, parents)) = folders.split_last() else {
            return 0;
        };

        let mut created = 0;
        let Hierarchy { sections, next_id } = self;
        let mut level = sections;
        for folder in parents {
            let index = find_or_create(level, folder, next_id, &mut created);
            level = &mut level[index].children;
        }
        let index = find_or_create(level, last, next_id, &mut created);
        level[index].files.push(file);
        created
    }
}

/// Index of the sibling titled `title`, creating it at the end when missing
fn find_or_create(
    level: &mut Vec<Container>,
    title: &str,
    next_id: &mut u64,
    created: &mut usize,
) -> usize {
    if let Some(index) = level.iter().position(|c| c.title == title) {
        return index;
    }
    *next_id += 1;
    level.push(Container::new(ContainerId(*next_id), title));
    *created += 1;
    level.len() - 1
}

/// Split a relative path into non-empty components, accepting `\` as separator
fn split_path(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != ".")
        .collect()
}

/// Sort siblings by title at every level
fn sort_containers(containers: &mut [Container]) {
    containers.sort_by(|a, b| natural_cmp(&a.title, &b.title));
    for container in containers.iter_mut() {
        sort_containers(&mut container.children);
    }
}

/// Case-insensitive comparison that orders digit runs by numeric value,
/// so "2" sorts before "10" and "Unit 9" before "Unit 10".
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_digits = take_digits(&mut left);
                let r_digits = take_digits(&mut right);
                let ordering = compare_digit_runs(&l_digits, &r_digits);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(l), Some(r)) => {
                let ordering = collation_key(l).cmp(&collation_key(r));
                if ordering != Ordering::Equal {
                    return ordering;
                }
                left.next();
                right.next();
            }
        }
    }

    // Equal ignoring case and leading zeros; fall back to a total order
    a.cmp(b)
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    digits
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Sort key for a single character: case and common accents are ignored,
/// and the Danish letters follow 'z' in the order Æ, Ø, Å.
fn collation_key(c: char) -> u32 {
    let lower = c.to_lowercase().next().unwrap_or(c);
    let base = match lower {
        'æ' | 'ä' => return 'z' as u32 + 1,
        'ø' | 'ö' => return 'z' as u32 + 2,
        'å' => return 'z' as u32 + 3,
        'à' | 'á' | 'â' | 'ã' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    };
    base as u32
}
