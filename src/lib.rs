pub mod common;
pub mod configs;
pub mod engine;
pub mod player;
pub mod reputation;
pub mod sources;
pub mod voice;

pub use common::errors::{PlayerError, ResolveError, StorageError, VoiceError};
pub use common::types::{ChannelId, GuildId, UserId};
pub use configs::Config;
pub use engine::{Engine, PresenceSink};
pub use player::{Enqueued, PlaybackStatus, QueueView, Track};
pub use reputation::ActivityLedger;
pub use sources::{ResolvedTrack, TrackResolver};
pub use voice::{VoiceConnection, VoiceGateway};
