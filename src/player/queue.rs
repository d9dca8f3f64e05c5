use std::{collections::VecDeque, sync::Arc, time::Duration};

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::{
    common::errors::{PlayerError, VoiceError},
    common::types::{ChannelId, GuildId, UserId},
    player::{
        state::{Enqueued, PlaybackStatus, QueueView},
        track::Track,
    },
    sources::TrackResolver,
    voice::{VoiceConnection, VoiceGateway},
};

/// Fires a "track finished" notification back into the owning player.
///
/// The audio backend holds this across whatever thread it decodes on; firing
/// it enqueues one unit of work on the player mailbox instead of touching the
/// queue directly. Consumed on fire, so a signal fires at most once. Each
/// signal is stamped with the playback attempt it belongs to; a signal that
/// outlives its attempt (explicit stop, skip, leave) lands as a no-op.
pub struct TrackEndSignal {
    tx: flume::Sender<PlayerCommand>,
    token: u64,
}

impl TrackEndSignal {
    pub(crate) fn new(tx: flume::Sender<PlayerCommand>, token: u64) -> Self {
        Self { tx, token }
    }

    pub fn finished(self) {
        let _ = self.tx.send(PlayerCommand::TrackEnded { token: self.token });
    }
}

pub(crate) enum PlayerCommand {
    Enqueue {
        channel: ChannelId,
        query: String,
        requested_by: UserId,
        reply: flume::Sender<Result<Enqueued, PlayerError>>,
    },
    Skip {
        reply: flume::Sender<Result<Track, PlayerError>>,
    },
    Pause {
        reply: flume::Sender<Result<(), PlayerError>>,
    },
    Resume {
        reply: flume::Sender<Result<(), PlayerError>>,
    },
    Stop {
        reply: flume::Sender<Result<(), PlayerError>>,
    },
    Leave {
        reply: flume::Sender<Result<(), PlayerError>>,
    },
    View {
        reply: flume::Sender<QueueView>,
    },
    TrackEnded {
        token: u64,
    },
    IdleDeadline {
        epoch: u64,
    },
}

/// One guild's playback scheduler.
///
/// Runs as a single task draining its mailbox, so commands for the same guild
/// are processed strictly in submission order and the queue is never touched
/// from two contexts at once. Resolution and transport calls are awaited
/// inside the unit of work; other guilds keep making progress meanwhile.
pub(crate) struct GuildPlayer {
    guild_id: GuildId,
    rx: flume::Receiver<PlayerCommand>,
    tx: flume::Sender<PlayerCommand>,
    resolver: Arc<dyn TrackResolver>,
    gateway: Arc<dyn VoiceGateway>,
    queue: VecDeque<Track>,
    now_playing: Option<Track>,
    status: PlaybackStatus,
    voice: Option<Box<dyn VoiceConnection>>,
    /// Identifies the current playback attempt. Bumped by every new play and
    /// by stop/skip/leave, which turns in-flight completion signals stale.
    token: u64,
    /// Guards the delayed idle disconnect; bumped whenever activity resumes.
    idle_epoch: u64,
    idle_linger: Duration,
    fault_save: flume::Sender<()>,
}

impl GuildPlayer {
    pub(crate) fn spawn(
        guild_id: GuildId,
        resolver: Arc<dyn TrackResolver>,
        gateway: Arc<dyn VoiceGateway>,
        idle_linger: Duration,
        fault_save: flume::Sender<()>,
    ) -> (flume::Sender<PlayerCommand>, tokio::task::JoinHandle<()>) {
        let (tx, rx) = flume::unbounded();
        let player = Self {
            guild_id,
            rx,
            tx: tx.clone(),
            resolver,
            gateway,
            queue: VecDeque::new(),
            now_playing: None,
            status: PlaybackStatus::Idle,
            voice: None,
            token: 0,
            idle_epoch: 0,
            idle_linger,
            fault_save,
        };
        let task = tokio::spawn(player.run());
        (tx, task)
    }

    async fn run(mut self) {
        while let Ok(cmd) = self.rx.recv_async().await {
            let unit = std::panic::AssertUnwindSafe(self.handle(cmd)).catch_unwind();
            if let Err(panic) = unit.await {
                error!(
                    "[{}] player unit of work panicked: {}",
                    self.guild_id,
                    panic_message(panic.as_ref())
                );
                let _ = self.fault_save.send(());
            }
        }
        // Mailbox closed: the registry dropped us, release the transport.
        if let Some(conn) = self.voice.take() {
            conn.disconnect().await;
        }
    }

    async fn handle(&mut self, cmd: PlayerCommand) {
        match cmd {
            PlayerCommand::Enqueue {
                channel,
                query,
                requested_by,
                reply,
            } => {
                let res = self.enqueue(channel, query, requested_by).await;
                let _ = reply.send(res);
            }
            PlayerCommand::Skip { reply } => {
                let _ = reply.send(self.skip().await);
            }
            PlayerCommand::Pause { reply } => {
                let _ = reply.send(self.pause().await);
            }
            PlayerCommand::Resume { reply } => {
                let _ = reply.send(self.resume().await);
            }
            PlayerCommand::Stop { reply } => {
                let _ = reply.send(self.stop().await);
            }
            PlayerCommand::Leave { reply } => {
                let _ = reply.send(self.leave().await);
            }
            PlayerCommand::View { reply } => {
                let _ = reply.send(self.view());
            }
            PlayerCommand::TrackEnded { token } => self.on_track_ended(token).await,
            PlayerCommand::IdleDeadline { epoch } => self.on_idle_deadline(epoch).await,
        }
    }

    async fn enqueue(
        &mut self,
        channel: ChannelId,
        query: String,
        requested_by: UserId,
    ) -> Result<Enqueued, PlayerError> {
        self.idle_epoch = self.idle_epoch.wrapping_add(1);

        // -- 1. Resolve on the pool; this unit stays parked meanwhile -------
        let resolver = Arc::clone(&self.resolver);
        let resolved = match tokio::spawn(async move { resolver.resolve(&query).await }).await {
            Ok(res) => res?,
            Err(e) => {
                return Err(PlayerError::Internal(format!("resolver task died: {e}")));
            }
        };
        let track = Track::new(resolved, requested_by);

        // -- 2. Join (or follow the requester to) the voice channel ---------
        self.ensure_connected(channel).await?;

        // -- 3. Queue, and start playback if nothing is on ------------------
        self.queue.push_back(track.clone());
        if self.now_playing.is_none() {
            self.advance().await.map_err(PlayerError::Voice)?;
        }

        match &self.now_playing {
            Some(current) if self.queue.is_empty() && *current == track => {
                Ok(Enqueued::Started(track))
            }
            _ => Ok(Enqueued::Queued {
                position: self.queue.len(),
                track,
            }),
        }
    }

    async fn ensure_connected(&mut self, channel: ChannelId) -> Result<(), PlayerError> {
        match self.voice.as_mut() {
            Some(conn) if conn.channel() == channel => Ok(()),
            Some(conn) => {
                debug!("[{}] moving voice to channel {}", self.guild_id, channel);
                conn.move_to(channel).await.map_err(PlayerError::Voice)
            }
            None => {
                let previous = self.status;
                self.status = PlaybackStatus::Connecting;
                match self.gateway.connect(self.guild_id, channel).await {
                    Ok(conn) => {
                        info!("[{}] voice connected to channel {}", self.guild_id, channel);
                        self.voice = Some(conn);
                        Ok(())
                    }
                    Err(e) => {
                        self.status = previous;
                        Err(PlayerError::Voice(e))
                    }
                }
            }
        }
    }

    /// Dequeue the head of the queue and start it, registering exactly one
    /// completion signal for the new track. Tracks that fail to start are
    /// dropped with a warning and the next one is tried. An exhausted queue
    /// quiesces the player to Idle.
    async fn advance(&mut self) -> Result<(), VoiceError> {
        let mut last_err = None;
        loop {
            let Some(track) = self.queue.pop_front() else {
                self.now_playing = None;
                self.status = PlaybackStatus::Idle;
                self.schedule_idle_disconnect();
                return match last_err {
                    None => Ok(()),
                    Some(e) => Err(e),
                };
            };

            let Some(conn) = self.voice.as_mut() else {
                warn!("[{}] advance without a voice connection", self.guild_id);
                self.queue.clear();
                self.now_playing = None;
                self.status = PlaybackStatus::Idle;
                return Err(VoiceError::Transport("no voice connection".to_string()));
            };

            self.token = self.token.wrapping_add(1);
            let signal = TrackEndSignal::new(self.tx.clone(), self.token);
            match conn.play(&track, signal).await {
                Ok(()) => {
                    info!("[{}] now playing: {}", self.guild_id, track.title);
                    self.now_playing = Some(track);
                    self.status = PlaybackStatus::Playing;
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "[{}] failed to start \"{}\": {}",
                        self.guild_id, track.title, e
                    );
                    last_err = Some(e);
                }
            }
        }
    }

    async fn skip(&mut self) -> Result<Track, PlayerError> {
        let Some(skipped) = self.now_playing.take() else {
            return Err(PlayerError::NothingPlaying);
        };
        // Invalidate the in-flight completion before forcing the stop, so the
        // transport's stop-induced signal lands stale. This advance is the
        // one and only advance for the skipped track.
        self.token = self.token.wrapping_add(1);
        if let Some(conn) = self.voice.as_mut() {
            if let Err(e) = conn.stop().await {
                warn!("[{}] stop before skip failed: {}", self.guild_id, e);
            }
        }
        if let Err(e) = self.advance().await {
            warn!("[{}] failed to start next track: {}", self.guild_id, e);
        }
        Ok(skipped)
    }

    async fn pause(&mut self) -> Result<(), PlayerError> {
        match self.status {
            PlaybackStatus::Playing => {
                let conn = self.voice.as_mut().ok_or(PlayerError::NotConnected)?;
                conn.pause().await.map_err(PlayerError::Voice)?;
                self.status = PlaybackStatus::Paused;
                Ok(())
            }
            PlaybackStatus::Paused => Err(PlayerError::AlreadyPaused),
            _ => Err(PlayerError::NothingPlaying),
        }
    }

    async fn resume(&mut self) -> Result<(), PlayerError> {
        match self.status {
            PlaybackStatus::Paused => {
                let conn = self.voice.as_mut().ok_or(PlayerError::NotConnected)?;
                conn.resume().await.map_err(PlayerError::Voice)?;
                self.status = PlaybackStatus::Playing;
                Ok(())
            }
            PlaybackStatus::Playing => Err(PlayerError::NotPaused),
            _ => Err(PlayerError::NothingPlaying),
        }
    }

    async fn stop(&mut self) -> Result<(), PlayerError> {
        if self.now_playing.is_none() && self.queue.is_empty() {
            return Err(PlayerError::NothingPlaying);
        }
        self.token = self.token.wrapping_add(1);
        self.queue.clear();
        if self.now_playing.take().is_some() {
            if let Some(conn) = self.voice.as_mut() {
                if let Err(e) = conn.stop().await {
                    warn!("[{}] stop failed: {}", self.guild_id, e);
                }
            }
        }
        self.status = PlaybackStatus::Idle;
        self.schedule_idle_disconnect();
        Ok(())
    }

    async fn leave(&mut self) -> Result<(), PlayerError> {
        self.token = self.token.wrapping_add(1);
        self.idle_epoch = self.idle_epoch.wrapping_add(1);
        self.queue.clear();
        self.now_playing = None;
        self.status = PlaybackStatus::Idle;
        match self.voice.take() {
            Some(conn) => {
                info!("[{}] left voice", self.guild_id);
                conn.disconnect().await;
                Ok(())
            }
            None => Err(PlayerError::NotConnected),
        }
    }

    fn view(&self) -> QueueView {
        QueueView {
            guild_id: self.guild_id,
            status: self.status,
            now_playing: self.now_playing.clone(),
            pending: self.queue.iter().cloned().collect(),
        }
    }

    async fn on_track_ended(&mut self, token: u64) {
        if token != self.token {
            debug!(
                "[{}] stale completion signal ignored (token {}, current {})",
                self.guild_id, token, self.token
            );
            return;
        }
        if let Err(e) = self.advance().await {
            warn!("[{}] failed to start next track: {}", self.guild_id, e);
        }
    }

    fn schedule_idle_disconnect(&mut self) {
        if self.voice.is_none() || self.idle_linger.is_zero() {
            return;
        }
        self.idle_epoch = self.idle_epoch.wrapping_add(1);
        let epoch = self.idle_epoch;
        let tx = self.tx.clone();
        let linger = self.idle_linger;
        tokio::spawn(async move {
            tokio::time::sleep(linger).await;
            let _ = tx.send(PlayerCommand::IdleDeadline { epoch });
        });
    }

    async fn on_idle_deadline(&mut self, epoch: u64) {
        if epoch != self.idle_epoch {
            return;
        }
        if self.now_playing.is_none() && self.queue.is_empty() {
            if let Some(conn) = self.voice.take() {
                info!("[{}] idle too long, leaving voice", self.guild_id);
                conn.disconnect().await;
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
