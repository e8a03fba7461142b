use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::registry::SessionRegistry;

// ---------------------------------------------------------------------------
// SessionReaper — interval-driven eviction of stale session records
// ---------------------------------------------------------------------------

/// Evicts session records older than the retention horizon on a fixed
/// interval so the in-memory registry stays bounded.
pub struct SessionReaper {
    registry: Arc<SessionRegistry>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    retention: chrono::Duration,
}

impl SessionReaper {
    pub fn new(
        registry: Arc<SessionRegistry>,
        clock: Arc<dyn Clock>,
        interval: Duration,
        retention: chrono::Duration,
    ) -> Self {
        Self {
            registry,
            clock,
            interval,
            retention,
        }
    }

    /// Run the eviction loop. Never returns; spawn it as a task.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick fires immediately; there is nothing to evict yet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let cutoff = self.clock.now() - self.retention;
            let removed = self.registry.evict_before(cutoff).await;
            if removed > 0 {
                tracing::info!("Session reaper evicted {} stale sessions", removed);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ArtifactReaper — hourly cleanup of aged output files
// ---------------------------------------------------------------------------

/// Deletes generated artifacts older than `max_age` from the output
/// directory at the top of every hour.
pub struct ArtifactReaper {
    output_dir: PathBuf,
    max_age: Duration,
}

impl ArtifactReaper {
    pub fn new(output_dir: PathBuf, max_age: Duration) -> Self {
        Self {
            output_dir,
            max_age,
        }
    }

    /// Run the cleanup loop. Never returns; spawn it as a task.
    pub async fn run(self) {
        use std::str::FromStr;
        let cron = match croner::Cron::from_str("0 * * * *") {
            Ok(cron) => cron,
            Err(e) => {
                tracing::error!("Artifact reaper schedule is invalid: {}", e);
                return;
            }
        };
        loop {
            let now: DateTime<Utc> = Utc::now();
            let next = match cron.find_next_occurrence(&now, false) {
                Ok(next) => next,
                Err(e) => {
                    tracing::error!("Artifact reaper could not compute next run: {}", e);
                    return;
                }
            };
            let wait = (next - now)
                .to_std()
                .unwrap_or(Duration::from_secs(0));
            tokio::time::sleep(wait).await;

            let removed = self.sweep().await;
            if removed > 0 {
                tracing::info!("Artifact reaper removed {} aged files", removed);
            }
        }
    }

    /// Delete files in the output directory whose modification time is
    /// older than `max_age`. Errors on individual entries are logged and
    /// skipped so one bad file never aborts the sweep.
    pub async fn sweep(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.output_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    "Artifact reaper cannot read {}: {}",
                    self.output_dir.display(),
                    e
                );
                return 0;
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Artifact reaper stopped on unreadable entry: {}", e);
                    break;
                }
            };
            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!(
                        "Artifact reaper skipping {} (no metadata): {}",
                        path.display(),
                        e
                    );
                    continue;
                }
            };
            if metadata.is_dir() {
                continue;
            }
            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(e) => {
                    tracing::warn!(
                        "Artifact reaper skipping {} (no mtime): {}",
                        path.display(),
                        e
                    );
                    continue;
                }
            };
            let age = match now.duration_since(modified) {
                Ok(age) => age,
                // Clock skew put the file in the future; leave it alone.
                Err(_) => continue,
            };
            if age >= self.max_age {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {
                        tracing::debug!("Artifact reaper removed {}", path.display());
                        removed += 1;
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Artifact reaper failed to remove {}: {}",
                            path.display(),
                            e
                        );
                    }
                }
            }
        }
        removed
    }
}
