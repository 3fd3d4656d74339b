//! Shared constants for document assembly
//!
//! Layout numbers for the table of contents and the header/footer stamps
//! live here so the estimate and the renderer cannot drift apart.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f32 = 72.0 / 25.4; // ≈ 2.83465

/// Convert millimeters to points
#[inline]
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

// =============================================================================
// Classification
// =============================================================================

/// Title of the top-level container that collects files uploaded without a folder
pub const DEFAULT_SECTION_TITLE: &str = "Uploadede filer";

// =============================================================================
// Normalization
// =============================================================================

/// Relative size difference under which a source page counts as "already target size"
pub const SIZE_TOLERANCE: f32 = 0.10;

/// Share of the target page that scaled content may occupy
pub const CONTENT_FILL_RATIO: f32 = 0.90;

/// Default page dimensions for pages without a usable MediaBox (US Letter)
pub const DEFAULT_PAGE_DIMENSIONS: (f32, f32) = (612.0, 792.0);

// =============================================================================
// Table of Contents
// =============================================================================

/// Default heading printed on the first table-of-contents page
pub const TOC_HEADING: &str = "Indholdsfortegnelse";

/// Heading font size (points)
pub const TOC_HEADING_FONT_SIZE: f32 = 18.0;

/// Entry font size (points)
pub const TOC_ENTRY_FONT_SIZE: f32 = 12.0;

/// Distance from the top edge to the heading baseline
pub const TOC_HEADING_OFFSET: f32 = 50.0;

/// Distance from the top edge to the first entry on the first page
pub const TOC_FIRST_ROW_OFFSET: f32 = 80.0;

/// Distance from the top edge to the first entry on continuation pages
pub const TOC_CONTINUATION_OFFSET: f32 = 50.0;

/// Rows whose baseline would fall below this line move to the next page
pub const TOC_BOTTOM_MARGIN: f32 = 50.0;

/// Left and right margin of the entry area
pub const TOC_SIDE_MARGIN: f32 = 50.0;

/// Row height after a top-level entry
pub const TOC_ROW_HEIGHT_TOP: f32 = 25.0;

/// Row height after a nested entry
pub const TOC_ROW_HEIGHT_NESTED: f32 = 20.0;

/// Indent per nesting level
pub const TOC_INDENT_PER_LEVEL: f32 = 15.0;

/// Gap between a title and its dot leader
pub const TOC_LEADER_GAP: f32 = 5.0;

/// Minimum gap kept between the dot leader and the page number
pub const TOC_NUMBER_GAP: f32 = 5.0;

// =============================================================================
// Header / Footer
// =============================================================================

/// Font size of the footer and header stamps
pub const STAMP_FONT_SIZE: f32 = 10.0;

/// Horizontal margin of the stamps
pub const STAMP_SIDE_MARGIN: f32 = 50.0;

/// Distance of the footer baseline from the bottom edge
pub const FOOTER_OFFSET: f32 = 15.0;

/// Distance of the header baseline from the top edge
pub const HEADER_OFFSET: f32 = 15.0;

// =============================================================================
// Fonts
// =============================================================================

/// Resource names of the shared fonts on generated content
pub const FONT_REGULAR: &str = "BnRegular";
pub const FONT_BOLD: &str = "BnBold";

// =============================================================================
// Standard cover
// =============================================================================

/// Form field receiving the unit name
pub const COVER_FIELD_UNIT_NAME: &str = "unitname";

/// Form field receiving the generation date
pub const COVER_FIELD_DATE: &str = "date";

/// Suffix stripped from the output name before it is used as unit name
pub const UNIT_NAME_SUFFIX: &str = " SQP";
