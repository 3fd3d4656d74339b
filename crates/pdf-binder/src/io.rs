//! File system helpers for hosts that work from disk

use crate::types::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Guess a MIME type from a file extension
pub fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" | "jpe" | "jfif" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "tif" | "tiff" => "image/tiff",
        "txt" => "text/plain",
        "doc" | "docx" => "application/msword",
        _ => "application/octet-stream",
    }
}

/// Read a folder the way a browser folder upload presents it: every file
/// below `root`, with a path relative to the folder's parent so the folder
/// name itself is the first component. Hidden files are skipped.
pub async fn load_directory(root: impl AsRef<Path>) -> Result<Vec<UploadedFile>> {
    let root = root.as_ref().to_owned();
    tokio::task::spawn_blocking(move || load_directory_sync(&root)).await?
}

fn load_directory_sync(root: &Path) -> Result<Vec<UploadedFile>> {
    if !root.is_dir() {
        return Err(AssembleError::Config(format!(
            "'{}' is not a directory",
            root.display()
        )));
    }
    let base = root.parent().unwrap_or(root);

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

    for entry in walker {
        let entry = entry.map_err(|e| AssembleError::Io(std::io::Error::other(e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(base).unwrap_or(entry.path());
        let path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let bytes = std::fs::read(entry.path())?;
        log::debug!("Read {} ({} bytes)", path, bytes.len());
        files.push(UploadedFile::new(path, mime_type_for(entry.path()), bytes));
    }

    Ok(files)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|name| name.starts_with('.'))
}

/// Read a whole file, for the cover template and the extra front page
pub async fn load_bytes(path: impl AsRef<Path>) -> Result<Arc<[u8]>> {
    Ok(tokio::fs::read(path).await?.into())
}

/// Write an assembled document into `dir` under its file name
pub async fn save_document(document: &AssembledDocument, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let path = dir.as_ref().join(&document.file_name);
    tokio::fs::write(&path, &document.bytes).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_types_from_extensions() {
        assert_eq!(mime_type_for(Path::new("a/b.PDF")), "application/pdf");
        assert_eq!(mime_type_for(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("photo.JPG")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("notes.txt")), "text/plain");
        assert_eq!(mime_type_for(Path::new("README")), "application/octet-stream");
    }

    #[tokio::test]
    async fn directory_paths_start_with_the_folder_name() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("Inspections");
        std::fs::create_dir_all(root.join("Unit1")).unwrap();
        std::fs::write(root.join("Unit1").join("a.pdf"), b"%PDF").unwrap();
        std::fs::write(root.join("cover.jpg"), b"jpeg").unwrap();
        std::fs::write(root.join(".DS_Store"), b"junk").unwrap();

        let files = load_directory(&root).await.unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["Inspections/Unit1/a.pdf", "Inspections/cover.jpg"]);
        assert_eq!(files[0].mime_type, "application/pdf");
        assert_eq!(files[1].mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn missing_directory_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_directory(dir.path().join("nope")).await;
        assert!(matches!(result, Err(AssembleError::Config(_))));
    }
}
