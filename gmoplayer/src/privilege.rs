//! Contrôle de privilège : propriétaire du process, propriétaire du salon, rôle DJ

use crate::directory::ChatDirectory;
use crate::model::{GuildId, RoleId, UserId};
use crate::{Error, Result};
use std::sync::Arc;

/// Source of the per-guild DJ role mapping.
///
/// Implemented for `gmoconfig::Config` behind the `gmoconfig` feature;
/// tests provide an in-memory mapping.
pub trait DjRoleProvider: Send + Sync {
    fn dj_role(&self, guild: GuildId) -> Option<RoleId>;
}

/// Authorization predicate over `(user, guild)`.
///
/// A user is privileged when they own the bot process, own the guild, or
/// hold the guild's configured DJ role. Privileged users bypass skip votes
/// entirely.
pub struct PrivilegeGate {
    directory: Arc<dyn ChatDirectory>,
    roles: Arc<dyn DjRoleProvider>,
}

impl PrivilegeGate {
    pub fn new(directory: Arc<dyn ChatDirectory>, roles: Arc<dyn DjRoleProvider>) -> Self {
        Self { directory, roles }
    }

    /// Whether the user may run privileged player commands in the guild.
    pub async fn is_privileged(&self, guild: GuildId, user: UserId) -> bool {
        if self.directory.process_owner().await == user {
            return true;
        }

        if self.directory.guild_owner(guild).await == Some(user) {
            return true;
        }

        if let Some(role) = self.roles.dj_role(guild) {
            return self.directory.has_role(guild, user, role).await;
        }

        false
    }

    /// Same check as a typed failure for command dispatch.
    pub async fn check(&self, guild: GuildId, user: UserId) -> Result<()> {
        if self.is_privileged(guild, user).await {
            Ok(())
        } else {
            Err(Error::permission(
                "You are not allowed to use this command.",
            ))
        }
    }
}
