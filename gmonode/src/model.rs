use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat-room ("guild") identifier, one audio player per guild.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GuildId(pub u64);

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Audio channel identifier inside a guild.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Track data as reported by the audio node.
///
/// This is the node-side view of a track; the orchestration layer wraps it
/// with requester metadata before it enters a queue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTrack {
    /// Opaque node-assigned identifier, replayed verbatim on `play`.
    pub id: String,
    pub title: String,
    pub uri: String,
    pub duration_ms: u64,
    pub thumbnail_url: Option<String>,
}

/// Outcome of a track resolution query.
#[derive(Clone, Debug)]
pub enum ResolveResponse {
    /// Plain search results, best match first.
    Tracks(Vec<ResolvedTrack>),
    /// A whole playlist resolved from a playlist URI.
    Playlist {
        name: String,
        tracks: Vec<ResolvedTrack>,
    },
    /// The node found nothing for the query.
    Empty,
}

/// End-of-track notifications pushed by the audio node.
///
/// All three variants are handled identically by the orchestration layer
/// (advance to the next queue entry, with repeat-one re-insertion applied
/// first).
#[derive(Clone, Debug)]
pub enum NodeEventKind {
    /// The track played to completion or was force-stopped.
    TrackEnd,
    /// The node stalled while streaming the track.
    TrackStuck,
    /// The node raised an exception for the track.
    TrackException { message: String },
}

/// An inbound event from an audio node, addressed to one guild's player.
#[derive(Clone, Debug)]
pub struct NodeEvent {
    pub guild: GuildId,
    pub track_id: String,
    pub kind: NodeEventKind,
}

/// Connection coordinates of one audio node, as configured.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeEndpoint {
    pub identifier: String,
    pub host: String,
    pub port: u16,
    pub password: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub rest_uri: Option<String>,
}
