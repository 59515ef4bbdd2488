//! Annuaire en lecture seule de la plateforme de chat

use crate::model::{ChannelId, GuildId, Member, RoleId, UserId};
use async_trait::async_trait;

/// Read-only queries against the chat platform directory.
///
/// The gateway layer implements this; the orchestration core only asks
/// questions (channel membership, roles, ownership) and never mutates
/// anything through it.
#[async_trait]
pub trait ChatDirectory: Send + Sync {
    /// Members currently joined to an audio channel.
    async fn channel_members(&self, guild: GuildId, channel: ChannelId) -> Vec<Member>;

    /// Audio channel the user is currently joined to, if any.
    async fn voice_channel_of(&self, guild: GuildId, user: UserId) -> Option<ChannelId>;

    /// Whether the user holds the given role in the guild.
    async fn has_role(&self, guild: GuildId, user: UserId, role: RoleId) -> bool;

    /// Owner of the guild.
    async fn guild_owner(&self, guild: GuildId) -> Option<UserId>;

    /// Owner of the bot process (moderation override identity).
    async fn process_owner(&self) -> UserId;

    /// Human-readable channel name, for user-facing notices.
    async fn channel_name(&self, channel: ChannelId) -> String {
        format!("channel {}", channel)
    }
}
