use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// Per-kiosk rollup counters surfaced on the monitor endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KioskStats {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub last_active: Option<DateTime<Utc>>,
}

/// Aggregates submission outcomes for the configured kiosk fleet.
///
/// The set of tracked kiosks is fixed at construction from the service
/// configuration; events for ids outside the fleet are dropped so a
/// spoofed header cannot grow the board unboundedly.
pub struct KioskStatsBoard {
    kiosks: RwLock<HashMap<String, KioskStats>>,
}

impl KioskStatsBoard {
    pub fn new<I, S>(kiosk_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let kiosks = kiosk_ids
            .into_iter()
            .map(|id| (id.into(), KioskStats::default()))
            .collect();
        Self {
            kiosks: RwLock::new(kiosks),
        }
    }

    pub async fn record_submitted(&self, kiosk_id: &str, now: DateTime<Utc>) {
        let mut kiosks = self.kiosks.write().await;
        if let Some(stats) = kiosks.get_mut(kiosk_id) {
            stats.total += 1;
            stats.last_active = Some(now);
        }
    }

    /// Count a completed job. `last_active` is a submission-time marker
    /// and is not touched here.
    pub async fn record_completed(&self, kiosk_id: &str) {
        let mut kiosks = self.kiosks.write().await;
        if let Some(stats) = kiosks.get_mut(kiosk_id) {
            stats.completed += 1;
        }
    }

    pub async fn record_failed(&self, kiosk_id: &str) {
        let mut kiosks = self.kiosks.write().await;
        if let Some(stats) = kiosks.get_mut(kiosk_id) {
            stats.failed += 1;
        }
    }

    pub async fn get(&self, kiosk_id: &str) -> Option<KioskStats> {
        self.kiosks.read().await.get(kiosk_id).cloned()
    }

    pub async fn snapshot(&self) -> HashMap<String, KioskStats> {
        self.kiosks.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> KioskStatsBoard {
        KioskStatsBoard::new(["kiosk-1", "kiosk-2"])
    }

    #[tokio::test]
    async fn test_counters_start_at_zero() {
        let board = board();
        let stats = board.get("kiosk-1").await.expect("tracked kiosk");
        assert_eq!(stats.total, 0);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.failed, 0);
        assert!(stats.last_active.is_none());
    }

    #[tokio::test]
    async fn test_outcomes_accumulate_per_kiosk() {
        let board = board();
        let now = Utc::now();

        board.record_submitted("kiosk-1", now).await;
        board.record_submitted("kiosk-1", now).await;
        board.record_completed("kiosk-1").await;
        board.record_failed("kiosk-1").await;
        board.record_submitted("kiosk-2", now).await;

        let one = board.get("kiosk-1").await.unwrap();
        assert_eq!(one.total, 2);
        assert_eq!(one.completed, 1);
        assert_eq!(one.failed, 1);
        assert!(one.completed + one.failed <= one.total);

        let two = board.get("kiosk-2").await.unwrap();
        assert_eq!(two.total, 1);
        assert_eq!(two.completed, 0);
    }

    #[tokio::test]
    async fn test_unknown_kiosk_is_ignored() {
        let board = board();
        board.record_submitted("rogue", Utc::now()).await;
        board.record_completed("rogue").await;

        assert!(board.get("rogue").await.is_none());
        assert_eq!(board.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn test_last_active_is_set_at_submission_only() {
        let board = board();
        let first = Utc::now();
        let later = first + chrono::Duration::seconds(30);

        board.record_submitted("kiosk-1", first).await;
        board.record_completed("kiosk-1").await;
        board.record_failed("kiosk-1").await;

        let stats = board.get("kiosk-1").await.unwrap();
        assert_eq!(stats.last_active, Some(first));

        board.record_submitted("kiosk-1", later).await;
        let stats = board.get("kiosk-1").await.unwrap();
        assert_eq!(stats.last_active, Some(later));
    }
}
