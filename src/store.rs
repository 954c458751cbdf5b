//! Transient file store for uploaded recordings and synthesized replies
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/audio/    synthesized replies, served at /audio/<file>
//! <root>/uploads/  scratch copies of uploads awaiting transcription
//! ```
//!
//! Nothing here is durable. A background sweep deletes anything older than
//! the retention window, whether or not it was ever fetched.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;

use crate::Result;

/// Directory-backed store of short-lived audio files
#[derive(Debug)]
pub struct AudioStore {
    audio_dir: PathBuf,
    upload_dir: PathBuf,
}

impl AudioStore {
    /// Open (and create if needed) a store rooted at `root`
    ///
    /// # Errors
    ///
    /// Returns error if the directories cannot be created
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let audio_dir = root.join("audio");
        let upload_dir = root.join("uploads");

        std::fs::create_dir_all(&audio_dir)?;
        std::fs::create_dir_all(&upload_dir)?;

        tracing::debug!(root = %root.display(), "audio store ready");

        Ok(Self {
            audio_dir,
            upload_dir,
        })
    }

    /// Directory holding publicly served audio
    #[must_use]
    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Directory holding upload scratch files
    #[must_use]
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Reserve a fresh `<hex>.mp3` name in the audio directory
    ///
    /// Returns the bare file name and its full path. Nothing is created.
    #[must_use]
    pub fn new_audio_file(&self) -> (String, PathBuf) {
        let name = format!("{}.mp3", random_stem());
        let path = self.audio_dir.join(&name);
        (name, path)
    }

    /// Persist an uploaded buffer to a uniquely named scratch file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub async fn write_upload(&self, bytes: &[u8]) -> Result<ScratchFile> {
        let path = self
            .upload_dir
            .join(format!("upload-{}.webm", random_stem()));

        // Register for cleanup before writing so a partial file is removed too
        let scratch = ScratchFile { path };
        tokio::fs::write(&scratch.path, bytes).await?;

        Ok(scratch)
    }

    /// Delete every file older than `retention` from both directories
    ///
    /// Per-file failures are skipped. Returns the number of files removed.
    #[must_use]
    pub fn sweep(&self, retention: Duration) -> usize {
        let now = SystemTime::now();
        [&self.audio_dir, &self.upload_dir]
            .into_iter()
            .map(|dir| sweep_dir(dir, now, retention))
            .sum()
    }

    /// Run [`sweep`](Self::sweep) every `interval` on a background task
    ///
    /// The task runs until the runtime shuts down.
    #[must_use]
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration, retention: Duration) -> JoinHandle<()> {
        tracing::info!(
            interval_secs = interval.as_secs(),
            retention_secs = retention.as_secs(),
            "audio sweep scheduled"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // Skip the first immediate tick
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let store = Arc::clone(&self);
                match tokio::task::spawn_blocking(move || store.sweep(retention)).await {
                    Ok(0) => {}
                    Ok(removed) => tracing::debug!(removed, "expired audio swept"),
                    Err(e) => tracing::debug!(error = %e, "audio sweep failed"),
                }
            }
        })
    }
}

fn sweep_dir(dir: &Path, now: SystemTime, retention: Duration) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };

    entries
        .flatten()
        .filter(|entry| {
            entry
                .metadata()
                .ok()
                .filter(std::fs::Metadata::is_file)
                .and_then(|meta| meta.modified().ok())
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age > retention)
        })
        .filter(|entry| std::fs::remove_file(entry.path()).is_ok())
        .count()
}

fn random_stem() -> String {
    hex::encode(rand::random::<[u8; 8]>())
}

/// Upload scratch file, deleted when dropped
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Location of the scratch file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove upload scratch file");
            }
        }
    }
}
