use serde::Serialize;

use crate::{common::types::UserId, sources::ResolvedTrack};

/// A resolved, playable audio reference plus display metadata.
///
/// Immutable once resolved; owned by exactly one guild queue while pending,
/// moved into the now-playing slot, then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub title: String,
    /// Opaque handle the audio backend streams from. Never interpreted here.
    pub locator: String,
    pub requested_by: UserId,
}

impl Track {
    pub fn new(resolved: ResolvedTrack, requested_by: UserId) -> Self {
        Self {
            title: resolved.title,
            locator: resolved.locator,
            requested_by,
        }
    }
}
