use serde::Serialize;

use crate::{common::types::GuildId, player::track::Track};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackStatus {
    Idle,
    Connecting,
    Playing,
    Paused,
}

/// Outcome of a successful enqueue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enqueued {
    /// The guild was idle; the track started playing immediately.
    Started(Track),
    /// Appended behind the current track; `position` is 1-based within the
    /// pending queue.
    Queued { track: Track, position: usize },
}

/// Read-only snapshot of one guild's playback state for the dispatcher to
/// render. Taking a view never mutates the player.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueView {
    pub guild_id: GuildId,
    pub status: PlaybackStatus,
    pub now_playing: Option<Track>,
    pub pending: Vec<Track>,
}

impl QueueView {
    pub fn empty(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            status: PlaybackStatus::Idle,
            now_playing: None,
            pending: Vec::new(),
        }
    }
}
