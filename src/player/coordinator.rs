use std::{sync::Arc, time::Duration};

use dashmap::DashMap;

use crate::{
    common::errors::PlayerError,
    common::types::{ChannelId, GuildId, UserId},
    configs::PlayerConfig,
    player::{
        queue::{GuildPlayer, PlayerCommand},
        state::{Enqueued, QueueView},
        track::Track,
    },
    sources::TrackResolver,
    voice::VoiceGateway,
};

struct PlayerHandle {
    tx: flume::Sender<PlayerCommand>,
    task: tokio::task::JoinHandle<()>,
}

/// Routes playback commands to the right guild player, creating players
/// lazily on the first request that needs one. Read-only commands against a
/// guild that never played anything do not materialize a player.
pub struct PlaybackCoordinator {
    players: DashMap<GuildId, PlayerHandle>,
    resolver: Arc<dyn TrackResolver>,
    gateway: Arc<dyn VoiceGateway>,
    idle_linger: Duration,
    fault_save: flume::Sender<()>,
}

impl PlaybackCoordinator {
    pub fn new(
        config: &PlayerConfig,
        resolver: Arc<dyn TrackResolver>,
        gateway: Arc<dyn VoiceGateway>,
        fault_save: flume::Sender<()>,
    ) -> Self {
        Self {
            players: DashMap::new(),
            resolver,
            gateway,
            idle_linger: Duration::from_secs(config.idle_linger_secs),
            fault_save,
        }
    }

    pub async fn enqueue(
        &self,
        guild_id: GuildId,
        channel: ChannelId,
        query: &str,
        requested_by: UserId,
    ) -> Result<Enqueued, PlayerError> {
        let tx = self.sender(guild_id);
        let query = query.to_string();
        self.request(guild_id, &tx, |reply| PlayerCommand::Enqueue {
            channel,
            query,
            requested_by,
            reply,
        })
        .await?
    }

    pub async fn skip(&self, guild_id: GuildId) -> Result<Track, PlayerError> {
        match self.sender_if_exists(guild_id) {
            Some(tx) => self.request(guild_id, &tx, |reply| PlayerCommand::Skip { reply }).await?,
            None => Err(PlayerError::NothingPlaying),
        }
    }

    pub async fn pause(&self, guild_id: GuildId) -> Result<(), PlayerError> {
        match self.sender_if_exists(guild_id) {
            Some(tx) => self.request(guild_id, &tx, |reply| PlayerCommand::Pause { reply }).await?,
            None => Err(PlayerError::NothingPlaying),
        }
    }

    pub async fn resume(&self, guild_id: GuildId) -> Result<(), PlayerError> {
        match self.sender_if_exists(guild_id) {
            Some(tx) => self.request(guild_id, &tx, |reply| PlayerCommand::Resume { reply }).await?,
            None => Err(PlayerError::NothingPlaying),
        }
    }

    pub async fn stop(&self, guild_id: GuildId) -> Result<(), PlayerError> {
        match self.sender_if_exists(guild_id) {
            Some(tx) => self.request(guild_id, &tx, |reply| PlayerCommand::Stop { reply }).await?,
            None => Err(PlayerError::NothingPlaying),
        }
    }

    pub async fn leave(&self, guild_id: GuildId) -> Result<(), PlayerError> {
        match self.sender_if_exists(guild_id) {
            Some(tx) => self.request(guild_id, &tx, |reply| PlayerCommand::Leave { reply }).await?,
            None => Err(PlayerError::NotConnected),
        }
    }

    /// Read-only queue snapshot. Absent players read as an empty idle view.
    pub async fn queue(&self, guild_id: GuildId) -> QueueView {
        match self.sender_if_exists(guild_id) {
            Some(tx) => self
                .request(guild_id, &tx, |reply| PlayerCommand::View { reply })
                .await
                .unwrap_or_else(|_| QueueView::empty(guild_id)),
            None => QueueView::empty(guild_id),
        }
    }

    pub async fn now_playing(&self, guild_id: GuildId) -> Option<Track> {
        self.queue(guild_id).await.now_playing
    }

    /// Disconnect every guild's transport and quiesce the players.
    pub async fn shutdown(&self) {
        let mut pending = Vec::new();
        for entry in self.players.iter() {
            let (reply, rx) = flume::bounded::<Result<(), PlayerError>>(1);
            if entry.tx.send(PlayerCommand::Leave { reply }).is_ok() {
                pending.push(rx.into_recv_async());
            }
        }
        let _ = futures::future::join_all(pending).await;
        for entry in self.players.iter() {
            entry.task.abort();
        }
    }

    async fn request<T>(
        &self,
        guild_id: GuildId,
        tx: &flume::Sender<PlayerCommand>,
        make: impl FnOnce(flume::Sender<T>) -> PlayerCommand,
    ) -> Result<T, PlayerError> {
        let (reply, rx) = flume::bounded(1);
        tx.send(make(reply)).map_err(|_| PlayerError::Closed(guild_id))?;
        rx.recv_async()
            .await
            .map_err(|_| PlayerError::Closed(guild_id))
    }

    fn sender(&self, guild_id: GuildId) -> flume::Sender<PlayerCommand> {
        let mut entry = self
            .players
            .entry(guild_id)
            .or_insert_with(|| self.spawn_player(guild_id));
        // A player whose task died gets replaced with a fresh one.
        if entry.tx.is_disconnected() {
            *entry = self.spawn_player(guild_id);
        }
        entry.tx.clone()
    }

    fn sender_if_exists(&self, guild_id: GuildId) -> Option<flume::Sender<PlayerCommand>> {
        self.players
            .get(&guild_id)
            .filter(|entry| !entry.tx.is_disconnected())
            .map(|entry| entry.tx.clone())
    }

    fn spawn_player(&self, guild_id: GuildId) -> PlayerHandle {
        let (tx, task) = GuildPlayer::spawn(
            guild_id,
            Arc::clone(&self.resolver),
            Arc::clone(&self.gateway),
            self.idle_linger,
            self.fault_save.clone(),
        );
        PlayerHandle { tx, task }
    }
}
