pub mod tasks;

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::{
    common::errors::{PlayerError, StorageError},
    common::types::{AnyResult, ChannelId, GuildId, UserId, now_ms},
    configs::Config,
    player::{Enqueued, PlaybackCoordinator, QueueView, Track},
    reputation::{ActivityLedger, SnapshotStore, store::run_snapshot_writer},
    sources::TrackResolver,
    voice::VoiceGateway,
};

/// Seam to the chat gateway's presence API.
#[async_trait]
pub trait PresenceSink: Send + Sync {
    async fn set_presence(&self, status: &str) -> AnyResult<()>;
}

/// The service core. The host wires the gateway dispatcher to the lifecycle
/// hooks and the command surface; everything stateful lives behind here.
pub struct Engine {
    config: Config,
    ledger: Arc<ActivityLedger>,
    store: SnapshotStore,
    coordinator: PlaybackCoordinator,
    presence: Arc<dyn PresenceSink>,
    started: AtomicBool,
    handles: parking_lot::Mutex<Vec<tokio::task::JoinHandle<()>>>,
    writer: tokio::task::JoinHandle<()>,
}

impl Engine {
    /// Build the core and load the last durable snapshot. Must run inside the
    /// runtime: the snapshot-writer task is spawned here.
    pub fn new(
        config: Config,
        resolver: Arc<dyn TrackResolver>,
        gateway: Arc<dyn VoiceGateway>,
        presence: Arc<dyn PresenceSink>,
    ) -> Self {
        let store = SnapshotStore::new(config.storage.snapshot_path());
        let scores = store.load();
        info!("loaded {} reputation records", scores.len());

        let (save_tx, save_rx) = flume::unbounded();
        let ledger = Arc::new(ActivityLedger::hydrate(
            &config.reputation,
            scores,
            now_ms(),
            save_tx.clone(),
        ));
        let writer = tokio::spawn(run_snapshot_writer(
            Arc::clone(&ledger),
            store.clone(),
            save_rx,
        ));

        // Player faults reuse the save channel as their emergency flush.
        let coordinator = PlaybackCoordinator::new(&config.player, resolver, gateway, save_tx);

        Self {
            config,
            ledger,
            store,
            coordinator,
            presence,
            started: AtomicBool::new(false),
            handles: parking_lot::Mutex::new(Vec::new()),
            writer,
        }
    }

    // -- lifecycle hooks ----------------------------------------------------

    /// Ready hook from the gateway. Reconnects fire this again; the
    /// background timers start exactly once per process.
    pub fn on_ready(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("ready fired again, background tasks already running");
            return;
        }
        info!("starting background tasks");
        let mut handles = self.handles.lock();
        handles.push(tokio::spawn(tasks::run_decay_sweep(
            Arc::clone(&self.ledger),
            self.config.reputation.sweep_secs,
        )));
        handles.push(tokio::spawn(tasks::run_presence_rotation(
            Arc::clone(&self.presence),
            self.config.presence.clone(),
        )));
        handles.push(tokio::spawn(tasks::run_autosave(
            Arc::clone(&self.ledger),
            self.config.storage.autosave_secs,
        )));
    }

    pub fn on_message(&self, user_id: UserId, message_length: usize, now: u64) {
        self.ledger.on_message(user_id, message_length, now);
    }

    /// Gateway dropped: flush synchronously while the process still can.
    pub fn on_disconnect(&self) {
        warn!("gateway disconnected, flushing snapshot");
        self.flush_blocking();
    }

    pub fn on_fatal_error(&self) {
        error!("fatal error reported, flushing snapshot");
        self.flush_blocking();
    }

    pub async fn shutdown(&self) {
        info!("shutting down");
        self.coordinator.shutdown().await;
        for handle in self.handles.lock().drain(..) {
            handle.abort();
        }
        self.writer.abort();
        self.flush_blocking();
    }

    // -- reputation surface -------------------------------------------------

    pub fn get_reputation(&self, user_id: UserId) -> i64 {
        self.ledger.get(user_id)
    }

    pub fn top_reputation(&self, n: usize) -> Vec<(UserId, i64)> {
        self.ledger.top(n)
    }

    /// Admin-triggered sweep; returns whether anything decayed.
    pub fn manual_decay(&self) -> bool {
        self.ledger.decay_pass(now_ms())
    }

    /// Admin-triggered immediate durable write.
    pub async fn manual_save(&self) -> Result<(), StorageError> {
        let store = self.store.clone();
        let scores = self.ledger.export();
        match tokio::task::spawn_blocking(move || store.save(&scores)).await {
            Ok(res) => res,
            Err(e) => Err(StorageError::Io(io::Error::other(e))),
        }
    }

    // -- playback surface ---------------------------------------------------

    pub async fn enqueue(
        &self,
        guild_id: GuildId,
        channel: ChannelId,
        query: &str,
        requested_by: UserId,
    ) -> Result<Enqueued, PlayerError> {
        self.coordinator
            .enqueue(guild_id, channel, query, requested_by)
            .await
    }

    pub async fn skip(&self, guild_id: GuildId) -> Result<Track, PlayerError> {
        self.coordinator.skip(guild_id).await
    }

    pub async fn pause(&self, guild_id: GuildId) -> Result<(), PlayerError> {
        self.coordinator.pause(guild_id).await
    }

    pub async fn resume(&self, guild_id: GuildId) -> Result<(), PlayerError> {
        self.coordinator.resume(guild_id).await
    }

    pub async fn stop(&self, guild_id: GuildId) -> Result<(), PlayerError> {
        self.coordinator.stop(guild_id).await
    }

    pub async fn leave(&self, guild_id: GuildId) -> Result<(), PlayerError> {
        self.coordinator.leave(guild_id).await
    }

    pub async fn queue(&self, guild_id: GuildId) -> QueueView {
        self.coordinator.queue(guild_id).await
    }

    pub async fn now_playing(&self, guild_id: GuildId) -> Option<Track> {
        self.coordinator.now_playing(guild_id).await
    }

    fn flush_blocking(&self) {
        if let Err(e) = self.store.save(&self.ledger.export()) {
            error!("emergency snapshot write failed: {}", e);
        }
    }

    #[cfg(test)]
    fn background_task_count(&self) -> usize {
        self.handles.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parking_lot::Mutex;
    use rand::{Rng, distributions::Alphanumeric};

    use super::*;
    use crate::{
        common::errors::{ResolveError, VoiceError},
        sources::ResolvedTrack,
        voice::VoiceConnection,
    };

    struct NoResolver;

    #[async_trait]
    impl TrackResolver for NoResolver {
        async fn resolve(&self, query: &str) -> Result<ResolvedTrack, ResolveError> {
            Err(ResolveError::Unsupported(query.to_string()))
        }
    }

    struct NoGateway;

    #[async_trait]
    impl VoiceGateway for NoGateway {
        async fn connect(
            &self,
            _guild_id: GuildId,
            _channel_id: ChannelId,
        ) -> Result<Box<dyn VoiceConnection>, VoiceError> {
            Err(VoiceError::Connect("unavailable".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingPresence {
        statuses: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PresenceSink for RecordingPresence {
        async fn set_presence(&self, status: &str) -> AnyResult<()> {
            self.statuses.lock().push(status.to_string());
            Ok(())
        }
    }

    fn test_config() -> Config {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        let mut config = Config::default();
        config.storage.data_dir = std::env::temp_dir()
            .join(format!("jukebot-engine-{suffix}"))
            .display()
            .to_string();
        config
    }

    fn engine_with(config: Config, presence: Arc<RecordingPresence>) -> Engine {
        Engine::new(config, Arc::new(NoResolver), Arc::new(NoGateway), presence)
    }

    const USER: UserId = UserId(555);

    #[tokio::test]
    async fn ready_starts_background_tasks_exactly_once() {
        let presence = Arc::new(RecordingPresence::default());
        let engine = engine_with(test_config(), Arc::clone(&presence));

        engine.on_ready();
        engine.on_ready();
        assert_eq!(engine.background_task_count(), 3);

        // The rotator pushes the first status right after starting.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let statuses = presence.statuses.lock().clone();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0], "Servers");

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn message_scores_survive_a_restart() {
        let config = test_config();
        let presence = Arc::new(RecordingPresence::default());

        let engine = engine_with(config.clone(), Arc::clone(&presence));
        engine.on_message(USER, 25, now_ms());
        assert_eq!(engine.get_reputation(USER), 103);
        engine.manual_save().await.expect("save");
        engine.shutdown().await;

        let restarted = engine_with(config, presence);
        assert_eq!(restarted.get_reputation(USER), 103);
    }

    #[tokio::test]
    async fn mutation_triggered_save_reaches_disk() {
        let config = test_config();
        let presence = Arc::new(RecordingPresence::default());
        let engine = engine_with(config.clone(), presence);

        engine.on_message(USER, 0, now_ms());
        tokio::time::sleep(Duration::from_millis(150)).await;

        let loaded = SnapshotStore::new(config.storage.snapshot_path()).load();
        assert_eq!(loaded.get(&USER), Some(&101));
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn disconnect_flushes_synchronously() {
        let config = test_config();
        let presence = Arc::new(RecordingPresence::default());
        let engine = engine_with(config.clone(), presence);

        engine.on_message(USER, 100, now_ms());
        engine.on_disconnect();

        let loaded = SnapshotStore::new(config.storage.snapshot_path()).load();
        assert_eq!(loaded.get(&USER), Some(&111));
    }

    #[tokio::test]
    async fn manual_decay_reports_whether_anything_changed() {
        let presence = Arc::new(RecordingPresence::default());
        let engine = engine_with(test_config(), presence);

        // Fresh records are active by definition, nothing qualifies.
        engine.on_message(USER, 10, now_ms());
        assert!(!engine.manual_decay());
        assert_eq!(engine.get_reputation(USER), 102);
    }
}
