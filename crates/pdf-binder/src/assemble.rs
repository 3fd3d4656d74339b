//! Document assembly
//!
//! One run produces the whole output in a fixed order:
//! 1. Standard cover (form filled and flattened) and extra front page
//! 2. Blank pages reserved for the table of contents
//! 3. Body: a depth-first walk of the hierarchy, normalizing every file
//! 4. Table of contents drawn onto the reserved pages
//! 5. Header and footer stamps on every page outside the table of contents

use crate::cover::{COVER_LABEL, CoverFields, fill_and_flatten};
use crate::hierarchy::Hierarchy;
use crate::normalize::{NormalizeSettings, append_as_is, normalize_file};
use crate::options::AssemblyOptions;
use crate::render::OutputDocument;
use crate::stamp::{StampSettings, stamp_pages};
use crate::toc::{estimate_toc_pages, render_toc};
use crate::types::*;
use lopdf::Document;
use std::sync::Arc;

/// Name used for the extra front page in error messages
const FRONT_PAGE_LABEL: &str = "front page";

/// Optional documents placed before the table of contents
#[derive(Debug, Clone, Default)]
pub struct FrontMatter {
    /// Template whose `unitname`/`date` form fields get filled
    pub standard_cover: Option<Arc<[u8]>>,
    /// PDF prepended as-is after the standard cover
    pub extra_front_page: Option<Arc<[u8]>>,
}

/// Assemble the hierarchy into one PDF
pub async fn assemble(
    hierarchy: &Hierarchy,
    front_matter: &FrontMatter,
    options: &AssemblyOptions,
) -> Result<AssembledDocument> {
    options.validate()?;

    let hierarchy = hierarchy.clone();
    let front_matter = front_matter.clone();
    let options = options.clone();

    tokio::task::spawn_blocking(move || assemble_sync(&hierarchy, &front_matter, &options)).await?
}

/// Blocking assembly, for callers that already run off the async executor
pub fn assemble_sync(
    hierarchy: &Hierarchy,
    front_matter: &FrontMatter,
    options: &AssemblyOptions,
) -> Result<AssembledDocument> {
    let settings = NormalizeSettings {
        paper_size: options.paper_size,
        match_source_orientation: options.match_source_orientation,
    };
    let toc_size = settings.portrait();

    // Must be known before any body page is placed
    let reserved = estimate_toc_pages(hierarchy, toc_size);

    let mut output = OutputDocument::new();
    add_front_matter(&mut output, front_matter, options)?;
    let front_matter_pages = output.page_count();

    let toc_first = output.page_count();
    for _ in 0..reserved {
        output.push_blank_page(toc_size);
    }

    let mut entries = Vec::with_capacity(hierarchy.container_count());
    for visit in hierarchy.walk() {
        let container = visit.container;
        entries.push(TocEntry {
            title: container.title.clone(),
            level: visit.level,
            start_page: output.page_count(),
            show_page: container.show_in_toc,
        });
        for file in &container.files {
            normalize_file(&mut output, file, &settings)?;
        }
    }

    let toc_pages = render_toc(
        &mut output,
        toc_first,
        reserved,
        &mut entries,
        toc_size,
        &options.toc_heading,
    )
    .map_err(|e| AssembleError::malformed(Phase::TocRender, &options.output_name, e))?;

    let skip = if options.stamp_toc_pages {
        0..0
    } else {
        toc_pages.clone()
    };
    stamp_pages(&mut output, &StampSettings::from_options(options), skip)
        .map_err(|e| AssembleError::malformed(Phase::Stamp, &options.output_name, e))?;

    let page_count = output.page_count();
    let file_name = options.file_name();
    let bytes = output
        .finish(&options.output_name)
        .map_err(|e| AssembleError::malformed(Phase::Serialize, &file_name, e))?;

    log::info!(
        "Assembled {}: {} pages ({} front matter, {} table of contents, {} sections)",
        file_name,
        page_count,
        front_matter_pages,
        toc_pages.len(),
        entries.len()
    );

    Ok(AssembledDocument {
        file_name,
        bytes,
        page_count,
        toc_entries: entries,
        toc_pages,
        front_matter_pages,
    })
}

/// Standard cover first, then the extra front page
fn add_front_matter(
    output: &mut OutputDocument,
    front_matter: &FrontMatter,
    options: &AssemblyOptions,
) -> Result<()> {
    if let Some(template) = &front_matter.standard_cover {
        let date = options
            .cover_date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let fields = CoverFields::new(&options.output_name, date);
        let cover = fill_and_flatten(template, &fields)?;
        let pages = append_as_is(output, &cover, COVER_LABEL, Phase::Cover)?;
        log::debug!("Added standard cover ({} pages)", pages);
    }

    if let Some(bytes) = &front_matter.extra_front_page {
        let front = Document::load_mem(bytes)
            .map_err(|e| AssembleError::malformed(Phase::FrontMatter, FRONT_PAGE_LABEL, e))?;
        let pages = append_as_is(output, &front, FRONT_PAGE_LABEL, Phase::FrontMatter)?;
        log::debug!("Added front page ({} pages)", pages);
    }

    Ok(())
}
