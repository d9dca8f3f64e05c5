use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crate::{common::types::UserId, configs::ReputationConfig};

#[derive(Debug, Clone, Copy)]
pub struct ActivityRecord {
    pub score: i64,
    /// Unix milliseconds of the user's last observed message.
    pub last_active_at: u64,
}

/// The per-user reputation store.
///
/// Mutated from the message path and the decay sweep; both run on the shared
/// scheduler and every operation here is a short in-memory critical section.
/// Durability is somebody else's job: mutations only drop a trigger on the
/// snapshot-writer channel and return.
pub struct ActivityLedger {
    floor: i64,
    ceiling: i64,
    decay_after_ms: u64,
    decay_step: i64,
    records: RwLock<HashMap<UserId, ActivityRecord>>,
    save_tx: flume::Sender<()>,
}

impl ActivityLedger {
    pub fn new(config: &ReputationConfig, save_tx: flume::Sender<()>) -> Self {
        Self::hydrate(config, HashMap::new(), 0, save_tx)
    }

    /// Build a ledger from a loaded snapshot. Scores outside the clamp range
    /// are pulled back in; activity timestamps restart at `now` so a reboot
    /// never triggers an instant mass decay.
    pub fn hydrate(
        config: &ReputationConfig,
        scores: HashMap<UserId, i64>,
        now: u64,
        save_tx: flume::Sender<()>,
    ) -> Self {
        let records = scores
            .into_iter()
            .map(|(user_id, score)| {
                (
                    user_id,
                    ActivityRecord {
                        score: score.clamp(config.floor, config.ceiling),
                        last_active_at: now,
                    },
                )
            })
            .collect();
        Self {
            floor: config.floor,
            ceiling: config.ceiling,
            decay_after_ms: config.decay_after_secs * 1000,
            decay_step: config.decay_step,
            records: RwLock::new(records),
            save_tx,
        }
    }

    /// Award activity points for one message and stamp the user active.
    /// The in-memory record is updated before this returns; the durable write
    /// happens behind the writer channel.
    pub fn on_message(&self, user_id: UserId, message_length: usize, now: u64) {
        let points = 1 + message_length as i64 / 10;
        {
            let mut records = self.records.write();
            let record = records.entry(user_id).or_insert(ActivityRecord {
                score: self.floor,
                last_active_at: now,
            });
            record.score = (record.score + points).min(self.ceiling);
            record.last_active_at = now;
        }
        self.request_save();
    }

    /// Current score, floor for users we have never seen.
    pub fn get(&self, user_id: UserId) -> i64 {
        self.records
            .read()
            .get(&user_id)
            .map(|record| record.score)
            .unwrap_or(self.floor)
    }

    /// Deduct points from every record that sat inactive past the threshold.
    /// Evaluated against the wall-clock gap at call time; one call deducts at
    /// most one step per record. Returns whether anything changed.
    pub fn decay_pass(&self, now: u64) -> bool {
        let mut changed = false;
        {
            let mut records = self.records.write();
            for record in records.values_mut() {
                if now.saturating_sub(record.last_active_at) > self.decay_after_ms
                    && record.score > self.floor
                {
                    record.score = (record.score - self.decay_step).max(self.floor);
                    changed = true;
                }
            }
        }
        if changed {
            self.request_save();
        }
        changed
    }

    /// Highest scores first; ties break on the lower user id.
    pub fn top(&self, n: usize) -> Vec<(UserId, i64)> {
        let records = self.records.read();
        let mut entries: Vec<_> = records
            .iter()
            .map(|(user_id, record)| (*user_id, record.score))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        entries.truncate(n);
        entries
    }

    /// Snapshot for the persistence document: user id keys as strings so the
    /// file stays an open, human-inspectable map.
    pub fn export(&self) -> BTreeMap<String, i64> {
        self.records
            .read()
            .iter()
            .map(|(user_id, record)| (user_id.to_string(), record.score))
            .collect()
    }

    pub(crate) fn request_save(&self) {
        let _ = self.save_tx.send(());
    }
}
