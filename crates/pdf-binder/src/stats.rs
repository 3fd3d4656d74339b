use crate::hierarchy::Hierarchy;
use crate::normalize::NormalizeSettings;
use crate::options::AssemblyOptions;
use crate::toc::estimate_toc_pages;
use crate::types::*;

/// Calculate statistics for a hierarchy before it is assembled
pub fn calculate_statistics(
    hierarchy: &Hierarchy,
    options: &AssemblyOptions,
) -> AssemblyStatistics {
    let mut stats = AssemblyStatistics {
        containers: 0,
        sections: hierarchy.sections().len(),
        pdf_files: 0,
        jpeg_files: 0,
        max_level: None,
        toc_pages: 0,
        hidden_page_numbers: 0,
    };

    for visit in hierarchy.walk() {
        stats.containers += 1;
        stats.max_level = stats.max_level.max(Some(visit.level));
        if !visit.container.show_in_toc {
            stats.hidden_page_numbers += 1;
        }
        for file in &visit.container.files {
            match file.kind() {
                Some(SourceKind::Pdf) => stats.pdf_files += 1,
                Some(SourceKind::Jpeg) => stats.jpeg_files += 1,
                None => {}
            }
        }
    }

    let settings = NormalizeSettings {
        paper_size: options.paper_size,
        match_source_orientation: options.match_source_orientation,
    };
    stats.toc_pages = estimate_toc_pages(hierarchy, settings.portrait());
    stats
}
