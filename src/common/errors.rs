use thiserror::Error;

use crate::common::types::GuildId;

/// Failures coming back from the external track-resolution service.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("no matches for \"{0}\"")]
    NoMatches(String),
    #[error("unsupported source: {0}")]
    Unsupported(String),
    #[error("resolver network failure: {0}")]
    Network(String),
}

/// Failures from the voice/audio transport.
#[derive(Debug, Clone, Error)]
pub enum VoiceError {
    #[error("voice connect failed: {0}")]
    Connect(String),
    #[error("voice transport failure: {0}")]
    Transport(String),
}

/// Failures while loading or writing the durable snapshot.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Everything a playback command can report back to the dispatcher.
///
/// The no-op conditions (`NothingPlaying`, `AlreadyPaused`, ...) are ordinary
/// results the dispatcher renders, not faults.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("nothing is playing")]
    NothingPlaying,
    #[error("playback is already paused")]
    AlreadyPaused,
    #[error("playback is not paused")]
    NotPaused,
    #[error("not connected to a voice channel")]
    NotConnected,
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Voice(#[from] VoiceError),
    #[error("player for guild {0} is gone")]
    Closed(GuildId),
    #[error("internal player fault: {0}")]
    Internal(String),
}
