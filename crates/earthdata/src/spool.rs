//! Local spool of downloaded granule files.
//!
//! A granule is opened once per group, so the file is kept on disk between
//! those reads and shared by concurrent requests. Reusing a spooled file
//! refreshes its modification time; files untouched for longer than the max
//! age plus a grace period are pruned before each open.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use tokio::fs;
use tracing::{debug, warn};

use crate::client::Granule;

/// Extra age a file must reach before it is pruned.
pub const DEFAULT_PRUNE_GRACE: Duration = Duration::from_secs(600);

#[derive(Debug)]
pub struct GranuleSpool {
    dir: PathBuf,
    max_age: Duration,
    grace: Duration,
}

impl GranuleSpool {
    pub fn new(dir: impl Into<PathBuf>, max_age: Duration) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            max_age,
            grace: DEFAULT_PRUNE_GRACE,
        })
    }

    /// Keep files this much longer than the max age, covering requests
    /// still reading a file they claimed just before it expired.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Claim an already-spooled file for reuse.
    ///
    /// Refreshes the modification time so a concurrent prune keeps it.
    /// Returns `false` when the file is not (or no longer) spooled.
    pub async fn claim(&self, path: &Path) -> std::io::Result<bool> {
        let file = match fs::OpenOptions::new().write(true).open(path).await {
            Ok(file) => file.into_std().await,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };
        tokio::task::spawn_blocking(move || file.set_modified(SystemTime::now()))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))??;
        Ok(true)
    }

    /// Final on-disk location for a granule.
    pub fn path_for(&self, granule: &Granule) -> PathBuf {
        let name: String = granule
            .id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.nc", name))
    }

    /// Unique scratch path next to `final_path`; renamed into place when complete.
    pub fn partial_path(&self, final_path: &Path) -> PathBuf {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let count = COUNTER.fetch_add(1, Ordering::Relaxed);
        final_path.with_extension(format!("nc.part.{}.{}", std::process::id(), count))
    }

    /// Remove spooled files older than the max age plus grace. Returns how
    /// many were removed.
    pub async fn prune(&self) -> std::io::Result<usize> {
        let now = SystemTime::now();
        let limit = self.max_age + self.grace;
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age > limit {
                match fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) => warn!(path = %entry.path().display(), error = %e, "Failed to prune spooled granule"),
                }
            }
        }

        if removed > 0 {
            debug!(removed = removed, "Pruned spooled granules");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn granule(id: &str) -> Granule {
        Granule {
            id: id.to_string(),
            title: "title".to_string(),
            time_start: Utc::now(),
            time_end: None,
            data_links: vec![],
        }
    }

    #[test]
    fn test_path_is_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let spool = GranuleSpool::new(dir.path(), Duration::from_secs(60)).unwrap();
        let path = spool.path_for(&granule("G123-LARC/../x"));
        assert_eq!(path.parent(), Some(dir.path()));
        assert_eq!(path.file_name().unwrap(), "G123-LARC_.._x.nc");
    }

    #[test]
    fn test_partial_paths_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let spool = GranuleSpool::new(dir.path(), Duration::from_secs(60)).unwrap();
        let final_path = spool.path_for(&granule("G1"));
        assert_ne!(spool.partial_path(&final_path), spool.partial_path(&final_path));
    }

    #[tokio::test]
    async fn test_prune_keeps_fresh_files() {
        let dir = tempfile::tempdir().unwrap();
        let spool = GranuleSpool::new(dir.path(), Duration::from_secs(3600)).unwrap();
        std::fs::write(dir.path().join("fresh.nc"), b"x").unwrap();

        assert_eq!(spool.prune().await.unwrap(), 0);
        assert!(dir.path().join("fresh.nc").exists());
    }

    #[tokio::test]
    async fn test_prune_removes_expired_files() {
        let dir = tempfile::tempdir().unwrap();
        let spool = GranuleSpool::new(dir.path(), Duration::ZERO)
            .unwrap()
            .with_grace(Duration::ZERO);
        std::fs::write(dir.path().join("old.nc"), b"x").unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(spool.prune().await.unwrap(), 1);
        assert!(!dir.path().join("old.nc").exists());
    }

    fn write_aged(path: &Path, age: Duration) {
        let file = std::fs::File::create(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[tokio::test]
    async fn test_grace_keeps_recently_expired_files() {
        let dir = tempfile::tempdir().unwrap();
        let spool = GranuleSpool::new(dir.path(), Duration::from_secs(3600))
            .unwrap()
            .with_grace(Duration::from_secs(600));
        let path = dir.path().join("expiring.nc");
        write_aged(&path, Duration::from_secs(3700));

        assert_eq!(spool.prune().await.unwrap(), 0);
        assert!(path.exists());

        write_aged(&path, Duration::from_secs(4300));
        assert_eq!(spool.prune().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_claimed_file_survives_prune() {
        let dir = tempfile::tempdir().unwrap();
        let spool = GranuleSpool::new(dir.path(), Duration::from_secs(3600))
            .unwrap()
            .with_grace(Duration::ZERO);
        let path = spool.path_for(&granule("G1"));
        write_aged(&path, Duration::from_secs(7200));

        assert!(spool.claim(&path).await.unwrap());
        let (pruned, claimed_again) = tokio::join!(spool.prune(), spool.claim(&path));

        assert_eq!(pruned.unwrap(), 0);
        assert!(claimed_again.unwrap());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_claim_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let spool = GranuleSpool::new(dir.path(), Duration::from_secs(60)).unwrap();
        let path = spool.path_for(&granule("absent"));
        assert!(!spool.claim(&path).await.unwrap());
    }
}
