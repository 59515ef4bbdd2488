//! Backend-agnostic audio node client contract.
//!
//! An `AudioNode` is an external rendering service that owns one logical
//! player per guild. The orchestration layer never talks to a concrete
//! transport; it only depends on this trait, so node backends stay
//! swappable.

use crate::model::{ChannelId, GuildId, ResolveResponse};
use crate::Result;
use async_trait::async_trait;

/// Client surface of one external audio node.
///
/// Per-guild operations address the node's logical player for that guild.
/// Implementations must be cheap to clone behind an `Arc` and safe to call
/// concurrently for different guilds.
#[async_trait]
pub trait AudioNode: Send + Sync {
    /// Stable identifier of this node (unique within the registry).
    fn identifier(&self) -> &str;

    /// Whether the node currently accepts new players.
    fn is_available(&self) -> bool;

    /// Join an audio channel for the guild's player.
    async fn connect(&self, guild: GuildId, channel: ChannelId) -> Result<()>;

    /// Leave the guild's audio channel.
    async fn disconnect(&self, guild: GuildId) -> Result<()>;

    /// Start playing the track identified by `track_id`.
    async fn play(&self, guild: GuildId, track_id: &str) -> Result<()>;

    /// Pause or resume the guild's player.
    async fn set_pause(&self, guild: GuildId, paused: bool) -> Result<()>;

    /// Seek to an absolute position of the current track.
    async fn seek(&self, guild: GuildId, position_ms: u64) -> Result<()>;

    /// Set the player volume (0..=1000, validated upstream).
    async fn set_volume(&self, guild: GuildId, volume: u16) -> Result<()>;

    /// Force-end the current track. The node answers with a
    /// [`NodeEventKind::TrackEnd`](crate::model::NodeEventKind) event.
    async fn stop(&self, guild: GuildId) -> Result<()>;

    /// Release every node-side resource held for the guild's player.
    ///
    /// Must be idempotent: destroying an already-destroyed player is a
    /// no-op, not an error.
    async fn destroy(&self, guild: GuildId) -> Result<()>;

    /// Resolve a search query or URI into playable tracks.
    async fn resolve_tracks(&self, query: &str) -> Result<ResolveResponse>;

    /// Shut the node client down (all guilds). Called by the registry
    /// during teardown.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
