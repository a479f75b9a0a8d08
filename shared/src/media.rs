use anyhow::Result;
use std::path::{Path, PathBuf};

/// Folder under `MEDIA_ROOT` for customer payment proofs.
pub const PROOFS_DIR: &str = "proofs";
pub const VENDOR_PROOFS_DIR: &str = "vendor_proofs";
pub const RECEIPTS_DIR: &str = "receipts";

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Path relative to the media root for a new file in `folder`.
pub fn new_relative_path(folder: &str, file_name: &str) -> String {
    let stem = uuid::Uuid::new_v4().simple().to_string();
    match extension_of(file_name) {
        Some(ext) => format!("{}/{}.{}", folder, stem, ext),
        None => format!("{}/{}", folder, stem),
    }
}

pub fn absolute(media_root: &str, relative: &str) -> PathBuf {
    Path::new(media_root).join(relative)
}

pub async fn save(media_root: &str, folder: &str, file_name: &str, bytes: &[u8]) -> Result<String> {
    let relative = new_relative_path(folder, file_name);
    let path = absolute(media_root, &relative);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, bytes).await?;
    tracing::debug!("stored upload at {}", path.display());
    Ok(relative)
}
