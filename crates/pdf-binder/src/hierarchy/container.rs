//! Container tree and the caller-facing mutations on it

use crate::types::{AssembleError, Result, SourceFile};
use std::collections::HashSet;
use std::fmt;

/// Handle to a container, unique within its hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(pub u64);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A section or subsection derived from a folder
#[derive(Debug, Clone)]
pub struct Container {
    pub id: ContainerId,
    /// Folder name; also the key used to merge repeated uploads
    pub title: String,
    /// Files directly inside this folder, in upload order
    pub files: Vec<SourceFile>,
    /// Nested folders
    pub children: Vec<Container>,
    /// Print the page number for this container in the table of contents
    pub show_in_toc: bool,
}

impl Container {
    pub fn new(id: ContainerId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            files: Vec::new(),
            children: Vec::new(),
            show_in_toc: true,
        }
    }

    /// Number of containers in this subtree, including self
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Container::subtree_len).sum::<usize>()
    }

    fn find(&self, id: ContainerId) -> Option<&Container> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    fn find_mut(&mut self, id: ContainerId) -> Option<&mut Container> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }
}

/// Which sibling list a reorder applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiblingGroup {
    /// The top-level sections
    Root,
    /// The direct children of a top-level section
    Children(ContainerId),
}

/// A container visited during a depth-first walk
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub container: &'a Container,
    /// Depth from the top of the hierarchy (top-level = 0)
    pub level: usize,
}

/// The folder-derived section tree, owned by one session
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    pub(crate) sections: Vec<Container>,
    pub(crate) next_id: u64,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level containers in traversal order
    pub fn sections(&self) -> &[Container] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Total number of containers at every level
    pub fn container_count(&self) -> usize {
        self.sections.iter().map(Container::subtree_len).sum()
    }

    /// Total number of files at every level
    pub fn file_count(&self) -> usize {
        self.walk().map(|visit| visit.container.files.len()).sum()
    }

    /// Depth-first pre-order walk: a container is yielded before its children
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: self
                .sections
                .iter()
                .rev()
                .map(|container| (container, 0))
                .collect(),
        }
    }

    pub fn find(&self, id: ContainerId) -> Option<&Container> {
        self.sections.iter().find_map(|section| section.find(id))
    }

    pub fn find_mut(&mut self, id: ContainerId) -> Option<&mut Container> {
        self.sections
            .iter_mut()
            .find_map(|section| section.find_mut(id))
    }

    #[cfg(test)]
    pub(crate) fn allocate_id(&mut self) -> ContainerId {
        self.next_id += 1;
        ContainerId(self.next_id)
    }

    /// Set whether the container's page number is shown in the table of contents.
    ///
    /// Returns `false` (and changes nothing) when no container has this id.
    pub fn set_visibility(&mut self, id: ContainerId, visible: bool) -> bool {
        match self.find_mut(id) {
            Some(container) => {
                container.show_in_toc = visible;
                true
            }
            None => {
                log::debug!("Visibility change for unknown container {}", id);
                false
            }
        }
    }

    /// Replace a sibling list with a permutation of itself.
    ///
    /// Only the top-level list and the children of top-level sections can be
    /// reordered; deeper levels keep the classifier's order. A `new_order`
    /// that is not a permutation of the current ids is rejected and the
    /// hierarchy is left unchanged.
    pub fn reorder(&mut self, group: SiblingGroup, new_order: &[ContainerId]) -> Result<()> {
        let siblings = match group {
            SiblingGroup::Root => &mut self.sections,
            SiblingGroup::Children(parent) => {
                let section = self
                    .sections
                    .iter_mut()
                    .find(|section| section.id == parent)
                    .ok_or_else(|| {
                        AssembleError::Structure(format!(
                            "Container {} is not a top-level section",
                            parent
                        ))
                    })?;
                &mut section.children
            }
        };

        let current: Vec<ContainerId> = siblings.iter().map(|c| c.id).collect();
        let order = permutation_indices(&current, new_order)?;
        apply_permutation(siblings, &order);
        Ok(())
    }

    /// Reorder the files of a container; `new_order[i]` is the current index
    /// of the file that should end up at position `i`.
    pub fn reorder_files(&mut self, id: ContainerId, new_order: &[usize]) -> Result<()> {
        let container = self
            .find_mut(id)
            .ok_or_else(|| AssembleError::Structure(format!("Unknown container {}", id)))?;

        let len = container.files.len();
        let mut seen = vec![false; len];
        if new_order.len() != len {
            return Err(AssembleError::Structure(format!(
                "File order for {} has {} entries, expected {}",
                id,
                new_order.len(),
                len
            )));
        }
        for &index in new_order {
            if index >= len || seen[index] {
                return Err(AssembleError::Structure(format!(
                    "File order for {} is not a permutation",
                    id
                )));
            }
            seen[index] = true;
        }

        apply_permutation(&mut container.files, new_order);
        Ok(())
    }
}

/// Map a proposed id order onto indices of the current list
fn permutation_indices(current: &[ContainerId], proposed: &[ContainerId]) -> Result<Vec<usize>> {
    if current.len() != proposed.len() {
        return Err(AssembleError::Structure(format!(
            "Reorder lists {} ids but the group has {}",
            proposed.len(),
            current.len()
        )));
    }

    let mut used = HashSet::with_capacity(proposed.len());
    proposed
        .iter()
        .map(|id| {
            if !used.insert(*id) {
                return Err(AssembleError::Structure(format!(
                    "Container {} appears twice in the new order",
                    id
                )));
            }
            current.iter().position(|c| c == id).ok_or_else(|| {
                AssembleError::Structure(format!("Container {} is not in this group", id))
            })
        })
        .collect()
}

/// Rebuild `items` so that position `i` holds the element previously at `order[i]`
fn apply_permutation<T>(items: &mut Vec<T>, order: &[usize]) {
    let mut slots: Vec<Option<T>> = items.drain(..).map(Some).collect();
    items.extend(order.iter().filter_map(|&index| slots[index].take()));
}

/// Iterator returned by [`Hierarchy::walk`]
pub struct Walk<'a> {
    stack: Vec<(&'a Container, usize)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (container, level) = self.stack.pop()?;
        self.stack
            .extend(container.children.iter().rev().map(|child| (child, level + 1)));
        Some(Visit { container, level })
    }
}
