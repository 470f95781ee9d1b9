use super::synthesis_session::{ArtifactHandle, SessionError, SessionFactory, SynthesisSession};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use tokio::time::Instant;

/// Suffixes of files a downloader is still writing
const PARTIAL_SUFFIXES: &[&str] = &[".crdownload", ".part", ".tmp"];

/// Creates sessions that talk to an external driver through the filesystem
pub struct FolderSessionFactory {
    request_path: PathBuf,
    download_dir: PathBuf,
    poll_interval: Duration,
}

impl FolderSessionFactory {
    pub fn new(request_path: PathBuf, download_dir: PathBuf, poll_interval: Duration) -> Self {
        Self {
            request_path,
            download_dir,
            poll_interval,
        }
    }
}

#[async_trait]
impl SessionFactory for FolderSessionFactory {
    fn provider(&self) -> &str {
        "folder"
    }

    async fn create(&self) -> Result<Box<dyn SynthesisSession>, SessionError> {
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| {
                SessionError::Fatal(format!(
                    "cannot prepare download directory {}: {e}",
                    self.download_dir.display()
                ))
            })?;

        Ok(Box::new(FolderSession {
            request_path: self.request_path.clone(),
            download_dir: self.download_dir.clone(),
            poll_interval: self.poll_interval,
            seen: HashSet::new(),
        }))
    }
}

/// Synthesis through a pair of paths shared with an external driver.
///
/// `submit` writes the text to the request file; the driver synthesizes it and drops the
/// audio into the download directory. Any complete file that was not there at submission
/// time is the artifact. Its fingerprint is `name:len:mtime`.
pub struct FolderSession {
    request_path: PathBuf,
    download_dir: PathBuf,
    poll_interval: Duration,
    seen: HashSet<PathBuf>,
}

#[async_trait]
impl SynthesisSession for FolderSession {
    async fn submit(&mut self, text: &str) -> Result<(), SessionError> {
        self.seen = list_files(&self.download_dir).await?;

        let staging = self.request_path.with_extension("writing");
        tokio::fs::write(&staging, text)
            .await
            .map_err(|e| SessionError::Rejected(format!("cannot write request: {e}")))?;
        tokio::fs::rename(&staging, &self.request_path)
            .await
            .map_err(|e| SessionError::Rejected(format!("cannot publish request: {e}")))?;

        tracing::debug!(
            request = %self.request_path.display(),
            text_length = text.len(),
            "Request written for folder driver"
        );
        Ok(())
    }

    async fn await_artifact(&mut self, timeout: Duration) -> Result<ArtifactHandle, SessionError> {
        let path =
            wait_for_new_file(&self.download_dir, &self.seen, timeout, self.poll_interval).await?;
        self.seen.insert(path.clone());

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| SessionError::Rejected(format!("artifact vanished: {e}")))?;
        let modified = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|since| since.as_nanos())
            .unwrap_or_default();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(ArtifactHandle::new(
            path.to_string_lossy(),
            format!("{name}:{}:{modified}", metadata.len()),
        ))
    }

    async fn fetch(&mut self, handle: &ArtifactHandle) -> Result<Vec<u8>, SessionError> {
        let path = PathBuf::from(&handle.id);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| SessionError::Rejected(format!("cannot read {}: {e}", path.display())))?;

        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), error = %e, "Could not remove fetched download");
        }
        Ok(bytes)
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        match tokio::fs::remove_file(&self.request_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Rejected(format!(
                "cannot remove request file: {e}"
            ))),
        }
    }
}

/// Poll `dir` until a complete, non-empty file outside `existing` appears
pub async fn wait_for_new_file(
    dir: &Path,
    existing: &HashSet<PathBuf>,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<PathBuf, SessionError> {
    let deadline = Instant::now() + timeout;

    loop {
        for path in list_files(dir).await? {
            if existing.contains(&path) || is_partial(&path) {
                continue;
            }
            let non_empty = tokio::fs::metadata(&path)
                .await
                .map(|m| m.len() > 0)
                .unwrap_or(false);
            if non_empty {
                return Ok(path);
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(SessionError::TimedOut(timeout));
        }
        tokio::time::sleep(poll_interval.min(deadline - now)).await;
    }
}

async fn list_files(dir: &Path) -> Result<HashSet<PathBuf>, SessionError> {
    let fatal = |e: std::io::Error| {
        SessionError::Fatal(format!("download directory {} unusable: {e}", dir.display()))
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(fatal)?;
    let mut files = HashSet::new();
    while let Some(entry) = entries.next_entry().await.map_err(fatal)? {
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if is_file {
            files.insert(entry.path());
        }
    }
    Ok(files)
}

fn is_partial(path: &Path) -> bool {
    let name = path.to_string_lossy();
    PARTIAL_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}
