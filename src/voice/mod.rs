use async_trait::async_trait;

use crate::{
    common::errors::VoiceError,
    common::types::{ChannelId, GuildId},
    player::{Track, TrackEndSignal},
};

/// Seam to the external voice transport.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Box<dyn VoiceConnection>, VoiceError>;
}

/// An owned connection to one guild's audio channel.
///
/// The owning player is the only component allowed to issue commands here.
/// `play` must hold on to the given [`TrackEndSignal`] and fire it from
/// whatever context the backend finishes (or is forced to stop) the track in;
/// the signal marshals the event back onto the player's mailbox.
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    fn channel(&self) -> ChannelId;

    async fn play(&mut self, track: &Track, on_end: TrackEndSignal) -> Result<(), VoiceError>;

    async fn pause(&mut self) -> Result<(), VoiceError>;

    async fn resume(&mut self) -> Result<(), VoiceError>;

    /// Stop audio output without tearing the connection down.
    async fn stop(&mut self) -> Result<(), VoiceError>;

    async fn move_to(&mut self, channel_id: ChannelId) -> Result<(), VoiceError>;

    async fn disconnect(self: Box<Self>);
}
