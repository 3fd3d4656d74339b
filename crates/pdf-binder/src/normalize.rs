//! Page normalization: every source page becomes one fixed-size output page
//!
//! PDF pages are wrapped as Form XObjects, JPEG files as Image XObjects. The
//! content is scaled uniformly and centered; pages that are already close to
//! the target size are fitted to the whole page instead.

use crate::constants::{CONTENT_FILL_RATIO, SIZE_TOLERANCE};
use crate::render::{
    Matrix, OutputDocument, create_jpeg_xobject, create_page_xobject, page_geometry,
};
use crate::types::{
    AssembleError, Orientation, PageSize, PaperSize, Phase, Result, SourceFile, SourceKind,
};
use lopdf::Document;
use std::collections::HashMap;

/// Uniform scale and offset that puts content of a given size on a target page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Placement {
    /// Matrix mapping content anchored at the origin onto the target page
    pub fn matrix(&self) -> Matrix {
        Matrix::scale(self.scale, self.scale).then(Matrix::translate(self.offset_x, self.offset_y))
    }
}

/// Whether `source` is within the size tolerance of `target` on both axes
pub fn within_tolerance(source: PageSize, target: PageSize) -> bool {
    let close = |s: f32, t: f32| (s - t).abs() <= t * SIZE_TOLERANCE;
    close(source.width, target.width) && close(source.height, target.height)
}

/// Place a PDF page of `source` size on a `target` page.
///
/// Near-target pages fill the page; everything else is scaled by the largest
/// factor that fits within the fill ratio and centered.
pub fn plan_placement(source: PageSize, target: PageSize) -> Placement {
    let fill = if within_tolerance(source, target) {
        1.0
    } else {
        CONTENT_FILL_RATIO
    };
    centered(source, target, fill)
}

/// Place an image of `source` size (in points) on a `target` page
pub fn plan_image_placement(source: PageSize, target: PageSize) -> Placement {
    centered(source, target, CONTENT_FILL_RATIO)
}

fn centered(source: PageSize, target: PageSize, fill: f32) -> Placement {
    if source.width <= 0.0 || source.height <= 0.0 {
        return Placement {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        };
    }
    let scale = (target.width * fill / source.width).min(target.height * fill / source.height);
    Placement {
        scale,
        offset_x: (target.width - source.width * scale) / 2.0,
        offset_y: (target.height - source.height * scale) / 2.0,
    }
}

/// How sources are mapped onto output pages
#[derive(Debug, Clone, Copy)]
pub struct NormalizeSettings {
    pub paper_size: PaperSize,
    /// Use the landscape variant of the paper for landscape sources
    pub match_source_orientation: bool,
}

impl NormalizeSettings {
    /// Output page size for a source of the given displayed size
    pub fn target_for(&self, source: PageSize) -> PageSize {
        let orientation = if self.match_source_orientation {
            source.orientation()
        } else {
            Orientation::Portrait
        };
        self.paper_size.page_size(orientation)
    }

    /// Page size for generated pages (table of contents)
    pub fn portrait(&self) -> PageSize {
        self.paper_size.page_size(Orientation::Portrait)
    }
}

/// Append the normalized pages of `file` to `output`; returns the page count added
pub fn normalize_file(
    output: &mut OutputDocument,
    file: &SourceFile,
    settings: &NormalizeSettings,
) -> Result<usize> {
    match file.kind() {
        Some(SourceKind::Pdf) => normalize_pdf(output, file, settings),
        Some(SourceKind::Jpeg) => normalize_jpeg(output, file, settings),
        None => Err(AssembleError::Unsupported {
            file: file.path.clone(),
            mime_type: file.mime_type.clone(),
        }),
    }
}

fn normalize_pdf(
    output: &mut OutputDocument,
    file: &SourceFile,
    settings: &NormalizeSettings,
) -> Result<usize> {
    let malformed = |e: AssembleError| AssembleError::malformed(Phase::Normalize, &file.path, e);
    let source = Document::load_mem(&file.bytes)
        .map_err(|e| AssembleError::malformed(Phase::Normalize, &file.path, e))?;

    let page_ids: Vec<_> = source.get_pages().into_values().collect();
    let mut cache = HashMap::new();

    for &page_id in &page_ids {
        let geometry = page_geometry(&source, page_id).map_err(malformed)?;
        let displayed = geometry.displayed();
        let target = settings.target_for(displayed);
        let placement = plan_placement(displayed, target);

        let xobject_id = create_page_xobject(
            output.document_mut(),
            &source,
            page_id,
            &geometry,
            &mut cache,
        )
        .map_err(malformed)?;

        output.push_xobject_page(
            target,
            xobject_id,
            geometry.to_displayed().then(placement.matrix()),
        )?;
    }

    log::debug!("Normalized {} ({} pages)", file.path, page_ids.len());
    Ok(page_ids.len())
}

fn normalize_jpeg(
    output: &mut OutputDocument,
    file: &SourceFile,
    settings: &NormalizeSettings,
) -> Result<usize> {
    let image = create_jpeg_xobject(output.document_mut(), &file.bytes)
        .map_err(|e| AssembleError::malformed(Phase::Normalize, &file.path, e))?;

    // One pixel is drawn as one point before scaling
    let natural = PageSize::new(image.width as f32, image.height as f32);
    let target = settings.target_for(natural);
    let placement = plan_image_placement(natural, target);

    // Image XObjects occupy the unit square
    let matrix = Matrix::scale(natural.width, natural.height).then(placement.matrix());
    output.push_xobject_page(target, image.id, matrix)?;

    log::debug!(
        "Normalized {} ({}x{} image)",
        file.path,
        image.width,
        image.height
    );
    Ok(1)
}

/// Append every page of a front-matter document at its own size, unscaled
pub fn append_as_is(
    output: &mut OutputDocument,
    source: &Document,
    label: &str,
    phase: Phase,
) -> Result<usize> {
    let malformed = |e: AssembleError| AssembleError::malformed(phase, label, e);
    let page_ids: Vec<_> = source.get_pages().into_values().collect();
    let mut cache = HashMap::new();

    for &page_id in &page_ids {
        let geometry = page_geometry(source, page_id).map_err(malformed)?;
        let xobject_id = create_page_xobject(
            output.document_mut(),
            source,
            page_id,
            &geometry,
            &mut cache,
        )
        .map_err(malformed)?;
        output.push_xobject_page(geometry.displayed(), xobject_id, geometry.to_displayed())?;
    }

    Ok(page_ids.len())
}
