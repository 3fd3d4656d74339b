use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

mod worker;

pub use worker::{SessionState, worker_task};

// Re-export types from the engine crate
pub use pdf_binder::{
    AssembledDocument, AssemblyOptions, AssemblyStatistics, ContainerId, Hierarchy,
    IngestReport, ProjectProfile, SiblingGroup, UploadedFile,
};

/// Commands sent from a host to the session worker
#[derive(Debug)]
pub enum SessionCommand {
    /// Merge uploaded files into the hierarchy
    Ingest {
        files: Vec<UploadedFile>,
    },
    /// Read a folder from disk and merge it like an upload
    LoadDirectory {
        path: PathBuf,
    },
    SetVisibility {
        id: ContainerId,
        visible: bool,
    },
    Reorder {
        group: SiblingGroup,
        order: Vec<ContainerId>,
    },
    ReorderFiles {
        id: ContainerId,
        order: Vec<usize>,
    },
    /// Replace (or with `None` clear) the extra front page
    SetFrontPage {
        bytes: Option<Arc<[u8]>>,
    },
    /// Replace (or with `None` clear) the standard cover template
    SetStandardCover {
        bytes: Option<Arc<[u8]>>,
    },
    SetOptions {
        options: AssemblyOptions,
    },
    /// Load a project profile and apply it to the current options
    LoadProfile {
        path: PathBuf,
    },
    CalculateStats,
    /// Assemble the current hierarchy; writes into `output_dir` when given
    Assemble {
        output_dir: Option<PathBuf>,
    },
    /// Drop every container and file
    Clear,
}

/// Updates sent from the session worker to the host
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    Ingested {
        report: IngestReport,
        hierarchy: Hierarchy,
    },
    HierarchyChanged {
        hierarchy: Hierarchy,
    },
    FrontMatterChanged {
        front_page: bool,
        standard_cover: bool,
    },
    OptionsChanged {
        options: AssemblyOptions,
    },
    StatsCalculated {
        stats: AssemblyStatistics,
    },
    Assembled {
        document: AssembledDocument,
        path: Option<PathBuf>,
    },
    Error {
        message: String,
    },
}

/// Start a worker on the current runtime and return its channel ends
pub fn spawn() -> (
    mpsc::UnboundedSender<SessionCommand>,
    mpsc::UnboundedReceiver<SessionUpdate>,
) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    tokio::spawn(worker_task(command_rx, update_tx));
    (command_tx, update_rx)
}
