//! Track : piste résolue par le nœud audio, enrichie du demandeur

use crate::model::UserId;
use chrono::{DateTime, Utc};
use gmonode::ResolvedTrack;

/// A playable audio item.
///
/// Immutable after construction; the requester metadata is attached once
/// when the track enters the system, everything else comes verbatim from
/// the audio node's resolution result.
#[derive(Clone, Debug)]
pub struct Track {
    /// Opaque node-assigned identifier, replayed on `play`.
    pub id: String,
    pub title: String,
    pub uri: String,
    pub duration_ms: u64,
    pub thumbnail_url: Option<String>,
    /// User who requested the track.
    pub requester: UserId,
    /// When the request was made.
    pub requested_at: DateTime<Utc>,
}

impl Track {
    /// Wrap a node resolution result with its requester.
    pub fn new(resolved: ResolvedTrack, requester: UserId) -> Self {
        Self {
            id: resolved.id,
            title: resolved.title,
            uri: resolved.uri,
            duration_ms: resolved.duration_ms,
            thumbnail_url: resolved.thumbnail_url,
            requester,
            requested_at: Utc::now(),
        }
    }
}
