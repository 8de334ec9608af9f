//! Job-scoped temporary artifact arena.
//!
//! Every job gets a private directory under the configured temp root.
//! Intermediate artifacts live there; the final artifact is moved out on
//! success and everything left is deleted when the arena goes away, on
//! every exit path.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Directory name prefix for job arenas under the temp root.
const ARENA_PREFIX: &str = "job-";

/// Private temp directory for one job's intermediate artifacts.
#[derive(Debug)]
pub struct JobArena {
    dir: PathBuf,
}

impl JobArena {
    /// Create the arena directory for a job.
    pub async fn create(base: &Path, job_id: &str) -> MediaResult<Self> {
        let dir = base.join(format!("{ARENA_PREFIX}{job_id}"));
        fs::create_dir_all(&dir).await.map_err(|e| {
            MediaError::resource(format!(
                "Failed to create temp arena {}: {}",
                dir.display(),
                e
            ))
        })?;
        debug!(arena = %dir.display(), "Created job arena");
        Ok(Self { dir })
    }

    /// The arena directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for a named artifact inside the arena.
    pub fn artifact(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Delete the arena and everything in it.
    pub async fn purge(&self) {
        if let Err(e) = fs::remove_dir_all(&self.dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(arena = %self.dir.display(), "Failed to purge arena: {}", e);
            }
        }
    }

    /// Move the final artifact out of the arena to its destination.
    ///
    /// Tries a fast rename first and falls back to copy-then-delete when
    /// the destination lives on a different filesystem (EXDEV). The copy
    /// goes through a temp name next to the destination so the final
    /// rename is atomic there.
    pub async fn release(&self, artifact: &Path, dest: &Path) -> MediaResult<()> {
        if let Some(parent) = dest.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        match fs::rename(artifact, dest).await {
            Ok(()) => Ok(()),
            Err(e) if is_cross_device_error(&e) => {
                debug!(
                    "Cross-device release, falling back to copy+delete: {} -> {}",
                    artifact.display(),
                    dest.display()
                );
                let tmp_dest = dest.with_extension("part");
                fs::copy(artifact, &tmp_dest).await?;
                if let Err(e) = fs::rename(&tmp_dest, dest).await {
                    let _ = fs::remove_file(&tmp_dest).await;
                    return Err(MediaError::from(e));
                }
                if let Err(e) = fs::remove_file(artifact).await {
                    warn!("Failed to remove released artifact {}: {}", artifact.display(), e);
                }
                Ok(())
            }
            Err(e) => Err(MediaError::from(e)),
        }
    }
}

impl Drop for JobArena {
    fn drop(&mut self) {
        if self.dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.dir) {
                warn!(arena = %self.dir.display(), "Arena cleanup on drop failed: {}", e);
            }
        }
    }
}

/// Check if an IO error is EXDEV (cross-device link).
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

/// Delete arenas older than `max_age` under the temp root.
///
/// Retention hook for the storage layer; independent of per-job cleanup.
/// Returns the number of arenas removed.
pub async fn sweep_stale(base: &Path, max_age: Duration) -> MediaResult<usize> {
    let mut removed = 0;

    let mut entries = match fs::read_dir(base).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(MediaError::from(e)),
    };

    let now = SystemTime::now();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(ARENA_PREFIX) {
            continue;
        }

        let age = entry
            .metadata()
            .await
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());

        if age.is_some_and(|age| age > max_age) {
            match fs::remove_dir_all(entry.path()).await {
                Ok(()) => {
                    debug!(arena = %entry.path().display(), "Swept stale arena");
                    removed += 1;
                }
                Err(e) => warn!(arena = %entry.path().display(), "Sweep failed: {}", e),
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_arena_lifecycle() {
        let base = TempDir::new().unwrap();
        let arena = JobArena::create(base.path(), "abc123").await.unwrap();

        let artifact = arena.artifact("trimmed.mp4");
        fs::write(&artifact, b"data").await.unwrap();
        assert!(artifact.exists());

        arena.purge().await;
        assert!(!arena.dir().exists());
    }

    #[tokio::test]
    async fn test_arena_drop_removes_dir() {
        let base = TempDir::new().unwrap();
        let dir = {
            let arena = JobArena::create(base.path(), "dropped").await.unwrap();
            fs::write(arena.artifact("x.mp4"), b"x").await.unwrap();
            arena.dir().to_path_buf()
        };
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_release_moves_final_artifact() {
        let base = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();
        let arena = JobArena::create(base.path(), "rel").await.unwrap();

        let artifact = arena.artifact("final.mp4");
        fs::write(&artifact, b"final").await.unwrap();

        let dest = out_dir.path().join("processed.mp4");
        arena.release(&artifact, &dest).await.unwrap();

        assert!(dest.exists());
        assert!(!artifact.exists());
        assert_eq!(fs::read(&dest).await.unwrap(), b"final");
    }

    #[tokio::test]
    async fn test_sweep_stale_only_old_arenas() {
        let base = TempDir::new().unwrap();
        let arena = JobArena::create(base.path(), "fresh").await.unwrap();

        // Fresh arena survives a sweep with a generous age bound
        let removed = sweep_stale(base.path(), Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(removed, 0);
        assert!(arena.dir().exists());

        // Zero age bound removes it
        tokio::time::sleep(Duration::from_millis(50)).await;
        let removed = sweep_stale(base.path(), Duration::ZERO).await.unwrap();
        assert_eq!(removed, 1);
        assert!(!arena.dir().exists());
    }

    #[tokio::test]
    async fn test_sweep_ignores_foreign_dirs() {
        let base = TempDir::new().unwrap();
        fs::create_dir(base.path().join("uploads")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let removed = sweep_stale(base.path(), Duration::ZERO).await.unwrap();
        assert_eq!(removed, 0);
        assert!(base.path().join("uploads").exists());
    }
}
