use crate::constants::TOC_HEADING;
use crate::types::*;
use chrono::NaiveDate;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Everything that controls one assembly run besides the inputs themselves
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AssemblyOptions {
    /// File name of the result, without extension
    pub output_name: String,

    // Header document numbers
    pub document_number_left: String,
    pub document_number_center: String,
    pub header_alignment: HeaderAlignment,

    /// Rotate header/footer text on landscape pages
    pub smart_placement: bool,

    // Page normalization
    pub paper_size: PaperSize,
    pub match_source_orientation: bool,

    /// Also draw headers and footers on the table-of-contents pages
    pub stamp_toc_pages: bool,

    /// Date written into the standard cover; today when unset
    pub cover_date: Option<NaiveDate>,

    pub toc_heading: String,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            output_name: "document".to_string(),
            document_number_left: String::new(),
            document_number_center: String::new(),
            header_alignment: HeaderAlignment::Right,
            smart_placement: false,
            paper_size: PaperSize::A4,
            match_source_orientation: true,
            stamp_toc_pages: false,
            cover_date: None,
            toc_heading: TOC_HEADING.to_string(),
        }
    }
}

impl AssemblyOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| AssembleError::Config(format!("Failed to parse options: {}", e)))?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AssembleError::Config(format!("Failed to serialize options: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// `{output_name}.pdf`
    pub fn file_name(&self) -> String {
        format!("{}.pdf", self.output_name)
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        let name = self.output_name.trim();
        if name.is_empty() {
            return Err(AssembleError::Config("Output name is empty".to_string()));
        }
        if name.contains(['/', '\\']) {
            return Err(AssembleError::Config(format!(
                "Output name '{}' must not contain path separators",
                self.output_name
            )));
        }

        let (width_mm, height_mm) = self.paper_size.dimensions_mm();
        if !(width_mm > 0.0 && height_mm > 0.0) {
            return Err(AssembleError::Config(format!(
                "Paper size must be positive, got {}x{}mm",
                width_mm, height_mm
            )));
        }
        // Table of contents and stamps need room for their margins
        let portrait = self.paper_size.page_size(Orientation::Portrait);
        if portrait.width < 200.0 || portrait.height < 200.0 {
            return Err(AssembleError::Config(format!(
                "Paper size {:.0}x{:.0}mm is too small",
                width_mm, height_mm
            )));
        }

        Ok(())
    }
}

/// Kind of building project a profile describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProjectType {
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "HVAC"))]
    Hvac,
    #[cfg_attr(feature = "serde", serde(rename = "BU"))]
    Bu,
}

impl ProjectType {
    pub fn label(self) -> &'static str {
        match self {
            ProjectType::Hvac => "HVAC",
            ProjectType::Bu => "BU",
        }
    }
}

/// Saved metadata of a building project, applied to the options as-is
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct ProjectProfile {
    pub name: String,
    /// Output name; derived from `name` and `project_type` when empty
    pub pdf_name: String,
    pub document_number_left: String,
    pub document_number_center: String,
    pub project_type: ProjectType,
}

impl ProjectProfile {
    /// Load a profile from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let profile = serde_json::from_slice(&bytes)
            .map_err(|e| AssembleError::Config(format!("Failed to parse profile: {}", e)))?;
        Ok(profile)
    }

    /// The output name: `pdf_name`, or `"{name} {type} SQP"` with any
    /// project-type prefix removed from the name.
    pub fn output_name(&self) -> String {
        if !self.pdf_name.trim().is_empty() {
            return self.pdf_name.clone();
        }
        let base = ["HVAC ", "BU "]
            .iter()
            .find_map(|prefix| self.name.strip_prefix(prefix))
            .unwrap_or(&self.name);
        format!("{} {} SQP", base, self.project_type.label())
    }

    /// Copy the profile's output name and document numbers onto `options`
    pub fn apply(&self, options: &mut AssemblyOptions) {
        options.output_name = self.output_name();
        options.document_number_left = self.document_number_left.clone();
        options.document_number_center = self.document_number_center.clone();
    }
}
