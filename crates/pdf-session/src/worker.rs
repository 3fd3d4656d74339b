use crate::{SessionCommand, SessionUpdate};
use pdf_binder::{
    AssemblyOptions, FrontMatter, Hierarchy, ProjectProfile, assemble, calculate_statistics,
    load_directory, save_document,
};
use std::collections::VecDeque;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Everything one session owns between commands
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub hierarchy: Hierarchy,
    pub front_matter: FrontMatter,
    pub options: AssemblyOptions,
}

/// Async worker task that owns the session state and processes commands in order.
///
/// Commands are handled one at a time, so an assembly run always sees the
/// hierarchy as it was when its command arrived and no two runs overlap.
pub async fn worker_task(
    mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    update_tx: mpsc::UnboundedSender<SessionUpdate>,
) {
    let mut state = SessionState::default();
    // Commands pulled off the channel early while coalescing
    let mut pending = VecDeque::new();

    loop {
        let cmd = match pending.pop_front() {
            Some(cmd) => cmd,
            None => match command_rx.recv().await {
                Some(cmd) => cmd,
                None => break,
            },
        };
        process_command(cmd, &mut state, &mut command_rx, &mut pending, &update_tx).await;
    }
    log::debug!("Session closed");
}

async fn process_command(
    cmd: SessionCommand,
    state: &mut SessionState,
    command_rx: &mut mpsc::UnboundedReceiver<SessionCommand>,
    pending: &mut VecDeque<SessionCommand>,
    update_tx: &mpsc::UnboundedSender<SessionUpdate>,
) {
    match cmd {
        SessionCommand::Ingest { files } => {
            let report = state.hierarchy.ingest(files);
            log::info!(
                "Ingested {} files ({} rejected, {} new sections)",
                report.accepted,
                report.rejected.len(),
                report.containers_created
            );
            let _ = update_tx.send(SessionUpdate::Ingested {
                report,
                hierarchy: state.hierarchy.clone(),
            });
        }
        SessionCommand::LoadDirectory { path } => match load_directory(&path).await {
            Ok(files) => {
                let report = state.hierarchy.ingest(files);
                log::info!("Loaded {}: {} files", path.display(), report.accepted);
                let _ = update_tx.send(SessionUpdate::Ingested {
                    report,
                    hierarchy: state.hierarchy.clone(),
                });
            }
            Err(e) => send_error(
                update_tx,
                format!("Failed to read {}: {}", path.display(), e),
            ),
        },
        SessionCommand::SetVisibility { id, visible } => {
            if state.hierarchy.set_visibility(id, visible) {
                send_hierarchy(update_tx, &state.hierarchy);
            } else {
                // Unknown ids are a no-op
                log::debug!("Visibility change for unknown container {} ignored", id);
            }
        }
        SessionCommand::Reorder { group, order } => {
            match state.hierarchy.reorder(group, &order) {
                Ok(()) => send_hierarchy(update_tx, &state.hierarchy),
                Err(e) => send_error(update_tx, e.to_string()),
            }
        }
        SessionCommand::ReorderFiles { id, order } => {
            match state.hierarchy.reorder_files(id, &order) {
                Ok(()) => send_hierarchy(update_tx, &state.hierarchy),
                Err(e) => send_error(update_tx, e.to_string()),
            }
        }
        SessionCommand::SetFrontPage { bytes } => {
            state.front_matter.extra_front_page = bytes;
            send_front_matter(update_tx, &state.front_matter);
        }
        SessionCommand::SetStandardCover { bytes } => {
            state.front_matter.standard_cover = bytes;
            send_front_matter(update_tx, &state.front_matter);
        }
        SessionCommand::SetOptions { options } => match options.validate() {
            Ok(()) => {
                state.options = options;
                let _ = update_tx.send(SessionUpdate::OptionsChanged {
                    options: state.options.clone(),
                });
            }
            Err(e) => send_error(update_tx, e.to_string()),
        },
        SessionCommand::LoadProfile { path } => match ProjectProfile::load(&path).await {
            Ok(profile) => {
                profile.apply(&mut state.options);
                log::info!("Applied profile '{}'", profile.name);
                let _ = update_tx.send(SessionUpdate::OptionsChanged {
                    options: state.options.clone(),
                });
            }
            Err(e) => send_error(
                update_tx,
                format!("Failed to load profile {}: {}", path.display(), e),
            ),
        },
        SessionCommand::CalculateStats => {
            // Coalesce back-to-back stats requests; one answer covers them all
            while let Ok(next_cmd) = command_rx.try_recv() {
                if let SessionCommand::CalculateStats = next_cmd {
                    log::debug!("Discarding queued statistics request");
                } else {
                    pending.push_back(next_cmd);
                    break;
                }
            }
            let stats = calculate_statistics(&state.hierarchy, &state.options);
            let _ = update_tx.send(SessionUpdate::StatsCalculated { stats });
        }
        SessionCommand::Assemble { output_dir } => {
            handle_assemble(state, output_dir, update_tx).await;
        }
        SessionCommand::Clear => {
            state.hierarchy = Hierarchy::new();
            send_hierarchy(update_tx, &state.hierarchy);
        }
    }
}

async fn handle_assemble(
    state: &SessionState,
    output_dir: Option<PathBuf>,
    update_tx: &mpsc::UnboundedSender<SessionUpdate>,
) {
    let document = match assemble(&state.hierarchy, &state.front_matter, &state.options).await {
        Ok(document) => document,
        Err(e) => {
            send_error(update_tx, format!("Assembly failed: {}", e));
            return;
        }
    };

    let path = match output_dir {
        Some(dir) => match save_document(&document, &dir).await {
            Ok(path) => Some(path),
            Err(e) => {
                let message = format!("Failed to save {}: {}", document.file_name, e);
                send_error(update_tx, message);
                return;
            }
        },
        None => None,
    };

    let _ = update_tx.send(SessionUpdate::Assembled { document, path });
}

fn send_hierarchy(update_tx: &mpsc::UnboundedSender<SessionUpdate>, hierarchy: &Hierarchy) {
    let _ = update_tx.send(SessionUpdate::HierarchyChanged {
        hierarchy: hierarchy.clone(),
    });
}

fn send_front_matter(
    update_tx: &mpsc::UnboundedSender<SessionUpdate>,
    front_matter: &FrontMatter,
) {
    let _ = update_tx.send(SessionUpdate::FrontMatterChanged {
        front_page: front_matter.extra_front_page.is_some(),
        standard_cover: front_matter.standard_cover.is_some(),
    });
}

fn send_error(update_tx: &mpsc::UnboundedSender<SessionUpdate>, message: String) {
    log::warn!("{}", message);
    let _ = update_tx.send(SessionUpdate::Error { message });
}
