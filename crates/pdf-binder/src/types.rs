use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("{phase} failed for '{file}': {reason}")]
    Source {
        phase: Phase,
        file: String,
        reason: String,
    },
    #[error("Unsupported content type '{mime_type}' for '{file}'")]
    Unsupported { file: String, mime_type: String },
    #[error("Invalid hierarchy operation: {0}")]
    Structure(String),
}

impl AssembleError {
    /// A source document that could not be read in the given phase
    pub(crate) fn malformed(
        phase: Phase,
        file: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        AssembleError::Source {
            phase,
            file: file.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AssembleError>;

/// Stage of an assembly run, reported with source failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Cover,
    FrontMatter,
    Normalize,
    TocRender,
    Stamp,
    Serialize,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Cover => "standard cover",
            Phase::FrontMatter => "front matter",
            Phase::Normalize => "page normalization",
            Phase::TocRender => "table of contents",
            Phase::Stamp => "header/footer stamping",
            Phase::Serialize => "serialization",
        };
        f.write_str(name)
    }
}

/// Paper orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    /// Portrait: height > width
    #[default]
    Portrait,
    /// Landscape: width > height
    Landscape,
}

impl Orientation {
    pub fn of(width: f32, height: f32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

/// Standard paper sizes for normalized output pages
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaperSize {
    A3,
    #[default]
    A4,
    A5,
    Letter,
    Legal,
    Custom { width_mm: f32, height_mm: f32 },
}

impl PaperSize {
    /// Get base dimensions (portrait for the standard sizes)
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PaperSize::A3 => (297.0, 420.0),
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::A5 => (148.0, 210.0),
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::Legal => (215.9, 355.6),
            PaperSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }

    /// Page size in points with orientation applied
    pub fn page_size(self, orientation: Orientation) -> PageSize {
        let (w, h) = self.dimensions_mm();
        let (short, long) = if w <= h { (w, h) } else { (h, w) };
        match orientation {
            Orientation::Portrait => PageSize::from_mm(short, long),
            Orientation::Landscape => PageSize::from_mm(long, short),
        }
    }
}

/// Width and height of a page in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn from_mm(width_mm: f32, height_mm: f32) -> Self {
        Self::new(
            crate::constants::mm_to_pt(width_mm),
            crate::constants::mm_to_pt(height_mm),
        )
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::of(self.width, self.height)
    }

    pub fn is_landscape(&self) -> bool {
        self.orientation() == Orientation::Landscape
    }
}

/// Where the second header document number is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HeaderAlignment {
    /// Right-aligned against the right margin
    #[default]
    Right,
    /// Horizontally centered on the page
    Center,
}

/// Content types the binder accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Jpeg,
}

impl SourceKind {
    /// Classify a MIME type; anything other than PDF or JPEG is rejected
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(SourceKind::Pdf),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(SourceKind::Jpeg),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            SourceKind::Pdf => "application/pdf",
            SourceKind::Jpeg => "image/jpeg",
        }
    }
}

/// A file as handed over by the host: relative path, declared type, content
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Slash-delimited path relative to the upload root
    pub path: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl UploadedFile {
    pub fn new(
        path: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            path: path.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// An accepted source file attached to a container
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File name (last path component)
    pub name: String,
    /// Full relative path it was uploaded under
    pub path: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(
        path: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        Self {
            name,
            path,
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn pdf(path: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::new(path, SourceKind::Pdf.mime_type(), bytes)
    }

    pub fn jpeg(path: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::new(path, SourceKind::Jpeg.mime_type(), bytes)
    }

    pub fn kind(&self) -> Option<SourceKind> {
        SourceKind::from_mime(&self.mime_type)
    }
}

/// One table-of-contents row, recorded when the assembler enters a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub title: String,
    /// Depth from the top of the hierarchy (top-level = 0)
    pub level: usize,
    /// 0-indexed position of the container's first page in the final document
    pub start_page: usize,
    /// Whether the page number is printed for this entry
    pub show_page: bool,
}

impl TocEntry {
    /// The number printed in the table of contents
    pub fn printed_page(&self) -> usize {
        self.start_page + 1
    }
}

/// Result of an assembly run
#[derive(Debug, Clone)]
pub struct AssembledDocument {
    /// `{output_name}.pdf`
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub toc_entries: Vec<TocEntry>,
    /// Page indices occupied by the table of contents
    pub toc_pages: Range<usize>,
    /// Number of cover and extra front pages before the table of contents
    pub front_matter_pages: usize,
}

/// Statistics about a hierarchy before assembly
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyStatistics {
    /// Total number of containers (sections and all nested subsections)
    pub containers: usize,
    /// Number of top-level sections
    pub sections: usize,
    pub pdf_files: usize,
    pub jpeg_files: usize,
    /// Deepest nesting level (top-level = 0), `None` for an empty hierarchy
    pub max_level: Option<usize>,
    /// Table-of-contents pages that will be reserved
    pub toc_pages: usize,
    /// Containers whose page number is hidden in the table of contents
    pub hidden_page_numbers: usize,
}
