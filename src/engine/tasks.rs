use std::{sync::Arc, time::Duration};

use tracing::{debug, warn};

use crate::{common::types::now_ms, configs::PresenceConfig, reputation::ActivityLedger};

use super::PresenceSink;

/// Sweep the ledger on a fixed cadence, one idempotent unit per tick. The
/// immediate first tick is swallowed so a fresh boot waits a full period.
pub(crate) async fn run_decay_sweep(ledger: Arc<ActivityLedger>, period_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(period_secs.max(1)));
    interval.tick().await;
    loop {
        interval.tick().await;
        if ledger.decay_pass(now_ms()) {
            debug!("decay sweep updated the ledger");
        }
    }
}

/// Cycle the configured display statuses. The first status goes out right
/// away so the bot never sits presence-less after a ready.
pub(crate) async fn run_presence_rotation(sink: Arc<dyn PresenceSink>, config: PresenceConfig) {
    if config.statuses.is_empty() {
        return;
    }
    let mut interval = tokio::time::interval(Duration::from_secs(config.rotate_secs.max(1)));
    let mut index = 0usize;
    loop {
        interval.tick().await;
        let status = &config.statuses[index % config.statuses.len()];
        if let Err(e) = sink.set_presence(status).await {
            warn!("presence update failed: {}", e);
        }
        index = index.wrapping_add(1);
    }
}

/// Periodic safety net on top of the mutation-triggered saves.
pub(crate) async fn run_autosave(ledger: Arc<ActivityLedger>, period_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(period_secs.max(1)));
    interval.tick().await;
    loop {
        interval.tick().await;
        ledger.request_save();
    }
}
