//! Saving the finished composite to disk.

use std::future::Future;
use std::path::{Path, PathBuf};

/// File name offered for every download.
pub const DOWNLOAD_FILENAME: &str = "liquid-glass-screenshot.png";

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Download cancelled by user")]
    Cancelled,

    #[error("Failed to write download: {0}")]
    Io(#[from] std::io::Error),
}

pub trait Downloads {
    /// Write `bytes` under `filename`. With `save_as`, the user picks the
    /// destination. Returns where the file ended up.
    fn download(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        save_as: bool,
    ) -> impl Future<Output = Result<PathBuf, DownloadError>> + Send;
}

/// Asks the user where to save. `None` means the dialog was dismissed.
pub trait SaveDialog {
    fn choose(&self, suggested: &Path) -> Option<PathBuf>;
}

/// Accepts the suggested path without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptSuggested;

impl SaveDialog for AcceptSuggested {
    fn choose(&self, suggested: &Path) -> Option<PathBuf> {
        Some(suggested.to_path_buf())
    }
}

/// Writes downloads into a directory, never overwriting an existing file.
#[derive(Debug, Clone)]
pub struct DirectoryDownloads<P = AcceptSuggested> {
    dir: PathBuf,
    dialog: P,
}

impl DirectoryDownloads<AcceptSuggested> {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            dialog: AcceptSuggested,
        }
    }
}

impl<P: SaveDialog> DirectoryDownloads<P> {
    pub fn with_dialog(dir: impl Into<PathBuf>, dialog: P) -> Self {
        Self {
            dir: dir.into(),
            dialog,
        }
    }
}

impl<P: SaveDialog + Sync> Downloads for DirectoryDownloads<P> {
    async fn download(&self, bytes: Vec<u8>, filename: &str, save_as: bool) -> Result<PathBuf, DownloadError> {
        let suggested = unique_path(&self.dir, filename);
        let dest = if save_as {
            self.dialog.choose(&suggested).ok_or(DownloadError::Cancelled)?
        } else {
            suggested
        };

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest, &bytes).await?;

        log::info!("[DOWNLOAD] Saved {} bytes to {}", bytes.len(), dest.display());
        Ok(dest)
    }
}

/// `dir/name.ext`, or `dir/name (n).ext` for the first free `n`.
fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(filename);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
    let ext = path.extension().and_then(|s| s.to_str());

    (1u32..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{} ({}).{}", stem, n, ext)),
            None => dir.join(format!("{} ({})", stem, n)),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
