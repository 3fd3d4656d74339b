//! Table of contents: page estimate, row layout and rendering
//!
//! The number of TOC pages has to be known before any body page is written,
//! because every recorded start page depends on it. [`estimate_toc_pages`]
//! runs the row simulation on the hierarchy alone; [`layout`] runs the same
//! simulation on the recorded entries when it is time to draw them.

use crate::constants::{
    TOC_BOTTOM_MARGIN, TOC_CONTINUATION_OFFSET, TOC_ENTRY_FONT_SIZE, TOC_FIRST_ROW_OFFSET,
    TOC_HEADING_FONT_SIZE, TOC_HEADING_OFFSET, TOC_INDENT_PER_LEVEL, TOC_LEADER_GAP,
    TOC_NUMBER_GAP, TOC_ROW_HEIGHT_NESTED, TOC_ROW_HEIGHT_TOP, TOC_SIDE_MARGIN,
};
use crate::hierarchy::Hierarchy;
use crate::render::{Font, Matrix, OutputDocument, show_text, text_width, truncate_to_width};
use crate::types::{PageSize, Result, TocEntry};
use lopdf::content::Operation;
use std::ops::Range;

/// Vertical space consumed by a row at `level`
pub fn row_height(level: usize) -> f32 {
    if level == 0 {
        TOC_ROW_HEIGHT_TOP
    } else {
        TOC_ROW_HEIGHT_NESTED
    }
}

/// Where one entry lands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TocRow {
    /// Index into the entry list
    pub entry: usize,
    /// TOC page the row is drawn on (0 = first TOC page)
    pub page: usize,
    /// Baseline of the row
    pub y: f32,
}

/// Result of simulating row placement
#[derive(Debug, Clone, PartialEq)]
pub struct TocLayout {
    /// Number of TOC pages, at least 1
    pub pages: usize,
    pub rows: Vec<TocRow>,
}

/// Place rows of the given levels top to bottom, breaking to a new page
/// when a baseline would fall below the bottom margin.
pub fn layout_levels(levels: impl IntoIterator<Item = usize>, page_height: f32) -> TocLayout {
    let mut page = 0;
    let mut y = page_height - TOC_FIRST_ROW_OFFSET;
    let mut rows = Vec::new();

    for (entry, level) in levels.into_iter().enumerate() {
        if y < TOC_BOTTOM_MARGIN {
            page += 1;
            y = page_height - TOC_CONTINUATION_OFFSET;
        }
        rows.push(TocRow { entry, page, y });
        y -= row_height(level);
    }

    TocLayout {
        pages: page + 1,
        rows,
    }
}

/// Number of TOC pages needed for `hierarchy`, computed from its structure
/// alone. Every container is listed, so every container is one row.
pub fn estimate_toc_pages(hierarchy: &Hierarchy, page: PageSize) -> usize {
    layout_levels(hierarchy.walk().map(|visit| visit.level), page.height).pages
}

/// Row layout for recorded entries
pub fn layout(entries: &[TocEntry], page: PageSize) -> TocLayout {
    layout_levels(entries.iter().map(|entry| entry.level), page.height)
}

/// Draw the table of contents onto the reserved pages starting at `first_page`.
///
/// When the entries need more pages than `reserved`, the missing pages are
/// inserted right after the reserved block and every entry starting at or
/// after the insertion point is shifted before any number is drawn.
/// Returns the page range the table of contents finally occupies.
pub(crate) fn render_toc(
    output: &mut OutputDocument,
    first_page: usize,
    reserved: usize,
    entries: &mut [TocEntry],
    page: PageSize,
    heading: &str,
) -> Result<Range<usize>> {
    let toc_layout = layout(entries, page);

    if toc_layout.pages > reserved {
        let extra = toc_layout.pages - reserved;
        let insert_at = first_page + reserved;
        log::warn!(
            "Table of contents needs {} pages but {} were reserved; inserting {}",
            toc_layout.pages,
            reserved,
            extra
        );
        output.insert_blank_pages(insert_at, extra, page);
        for entry in entries.iter_mut() {
            if entry.start_page >= insert_at {
                entry.start_page += extra;
            }
        }
    }
    let pages = toc_layout.pages.max(reserved);

    let mut operations: Vec<Vec<Operation>> = vec![Vec::new(); pages];
    operations[0].extend(show_text(
        Font::Bold,
        TOC_HEADING_FONT_SIZE,
        Matrix::translate(TOC_SIDE_MARGIN, page.height - TOC_HEADING_OFFSET),
        heading,
    ));

    for row in &toc_layout.rows {
        let entry = &entries[row.entry];
        operations[row.page].extend(entry_operations(entry, row.y, page.width));
    }

    for (offset, ops) in operations.into_iter().enumerate() {
        output.append_content(first_page + offset, ops)?;
    }

    log::debug!(
        "Rendered {} table of contents entries on {} pages",
        entries.len(),
        pages
    );
    Ok(first_page..first_page + pages)
}

/// Title, dot leader and page number for one row
fn entry_operations(entry: &TocEntry, y: f32, page_width: f32) -> Vec<Operation> {
    let size = TOC_ENTRY_FONT_SIZE;
    let title_font = if entry.level == 0 {
        Font::Bold
    } else {
        Font::Regular
    };
    let title_x = TOC_SIDE_MARGIN + TOC_INDENT_PER_LEVEL * entry.level as f32;
    let right_edge = page_width - TOC_SIDE_MARGIN;

    let mut ops = Vec::new();

    if !entry.show_page {
        let title = truncate_to_width(&entry.title, title_font, size, right_edge - title_x);
        ops.extend(show_text(
            title_font,
            size,
            Matrix::translate(title_x, y),
            &title,
        ));
        return ops;
    }

    let number = entry.printed_page().to_string();
    let number_x = right_edge - text_width(&number, Font::Regular, size);
    let title_room = number_x - TOC_NUMBER_GAP - TOC_LEADER_GAP - title_x;
    let title = truncate_to_width(&entry.title, title_font, size, title_room);
    ops.extend(show_text(
        title_font,
        size,
        Matrix::translate(title_x, y),
        &title,
    ));

    let leader_x = title_x + text_width(&title, title_font, size) + TOC_LEADER_GAP;
    let dot_width = text_width(".", Font::Regular, size);
    let dots = ((number_x - TOC_NUMBER_GAP - leader_x) / dot_width).floor();
    if dots >= 1.0 {
        ops.extend(show_text(
            Font::Regular,
            size,
            Matrix::translate(leader_x, y),
            &".".repeat(dots as usize),
        ));
    }

    ops.extend(show_text(
        Font::Regular,
        size,
        Matrix::translate(number_x, y),
        &number,
    ));
    ops
}
