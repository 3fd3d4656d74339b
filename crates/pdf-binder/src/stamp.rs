//! Header and footer stamps
//!
//! Every stamped page gets a "Page X of Y" footer and up to two header
//! document numbers. With smart placement, pages wider than tall get the
//! text rotated a quarter turn counter-clockwise so it reads upright once
//! the page is turned to portrait.

use crate::constants::{FOOTER_OFFSET, HEADER_OFFSET, STAMP_FONT_SIZE, STAMP_SIDE_MARGIN};
use crate::options::AssemblyOptions;
use crate::render::{Font, Matrix, OutputDocument, show_text, text_width};
use crate::types::{HeaderAlignment, PageSize, Result};
use std::ops::Range;

/// One piece of stamped text and where its baseline starts
#[derive(Debug, Clone, PartialEq)]
pub struct StampText {
    pub text: String,
    pub matrix: Matrix,
}

/// What gets stamped, independent of the page
#[derive(Debug, Clone, Copy)]
pub struct StampSettings<'a> {
    pub document_number_left: &'a str,
    pub document_number_center: &'a str,
    pub alignment: HeaderAlignment,
    pub smart_placement: bool,
}

impl<'a> StampSettings<'a> {
    pub fn from_options(options: &'a AssemblyOptions) -> Self {
        Self {
            document_number_left: &options.document_number_left,
            document_number_center: &options.document_number_center,
            alignment: options.header_alignment,
            smart_placement: options.smart_placement,
        }
    }
}

/// Footer text for the 0-indexed page `index`
pub fn footer_text(index: usize, total: usize) -> String {
    format!("Page {} of {}", index + 1, total)
}

/// Position the footer and headers of one page.
///
/// Upright pages put the footer at the bottom left and the headers along the
/// top. Rotated placement measures along the page height instead: the
/// footer runs up the right edge and the headers up the left edge.
pub fn stamp_layout(
    page: PageSize,
    index: usize,
    total: usize,
    settings: &StampSettings<'_>,
) -> Vec<StampText> {
    let rotated = settings.smart_placement && page.is_landscape();
    let size = STAMP_FONT_SIZE;

    // Reading-direction extent and the two edge positions
    let run = if rotated { page.height } else { page.width };
    let place = |along: f32, across: f32| {
        if rotated {
            Matrix::rotate_ccw_90().then(Matrix::translate(across, along))
        } else {
            Matrix::translate(along, across)
        }
    };
    let (footer_across, header_across) = if rotated {
        (page.width - FOOTER_OFFSET, HEADER_OFFSET)
    } else {
        (FOOTER_OFFSET, page.height - HEADER_OFFSET)
    };

    let mut stamps = vec![StampText {
        text: footer_text(index, total),
        matrix: place(STAMP_SIDE_MARGIN, footer_across),
    }];

    if !settings.document_number_left.is_empty() {
        stamps.push(StampText {
            text: settings.document_number_left.to_string(),
            matrix: place(STAMP_SIDE_MARGIN, header_across),
        });
    }

    if !settings.document_number_center.is_empty() {
        let width = text_width(settings.document_number_center, Font::Regular, size);
        let along = match settings.alignment {
            HeaderAlignment::Right => run - width - STAMP_SIDE_MARGIN,
            HeaderAlignment::Center => (run - width) / 2.0,
        };
        stamps.push(StampText {
            text: settings.document_number_center.to_string(),
            matrix: place(along, header_across),
        });
    }

    stamps
}

/// Stamp every page of `output` except those in `skip`; `total` counts all pages
pub(crate) fn stamp_pages(
    output: &mut OutputDocument,
    settings: &StampSettings<'_>,
    skip: Range<usize>,
) -> Result<()> {
    let total = output.page_count();
    let sizes: Vec<PageSize> = output.pages().iter().map(|page| page.size).collect();

    for (index, size) in sizes.into_iter().enumerate() {
        if skip.contains(&index) {
            continue;
        }
        let operations = stamp_layout(size, index, total, settings)
            .into_iter()
            .flat_map(|stamp| show_text(Font::Regular, STAMP_FONT_SIZE, stamp.matrix, &stamp.text))
            .collect();
        output.append_content(index, operations)?;
    }

    log::debug!(
        "Stamped {} of {} pages",
        total - skip.len().min(total),
        total
    );
    Ok(())
}
