use async_trait::async_trait;

use crate::common::errors::ResolveError;

/// Metadata coming back from the resolution service: a display title plus an
/// opaque locator the audio backend knows how to stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTrack {
    pub title: String,
    pub locator: String,
}

/// Seam to the external track-resolution service.
///
/// Turns a search string or URL into something streamable. Calls may take
/// seconds and may fail; callers must treat this as a network hop.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<ResolvedTrack, ResolveError>;
}
