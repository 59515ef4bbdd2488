//! Extension de gmoconfig pour l'orchestration de lecture

use crate::model::{GuildId, RoleId};
use crate::privilege::DjRoleProvider;
use serde_yaml::Value;
use std::time::Duration;

const DEFAULT_VOTE_WINDOW_SECS: u64 = 30;
const DEFAULT_RESOLVE_RETRY_LIMIT: usize = 10;
const DEFAULT_SEARCH_PREFIX: &str = "ytsearch:";

/// Trait d'extension pour gmoconfig::Config
pub trait PlayerConfigExt {
    /// DJ role configured for the guild, if any.
    fn dj_role(&self, guild: GuildId) -> Option<RoleId>;

    /// Record the guild's DJ role.
    fn set_dj_role(&self, guild: GuildId, role: RoleId) -> anyhow::Result<()>;

    /// Duration of a skip vote window.
    fn vote_window(&self) -> Duration;

    /// Bounded retry count for track resolution.
    fn resolve_retry_limit(&self) -> usize;

    /// Prefix prepended to non-URL play queries.
    fn search_prefix(&self) -> String;
}

impl PlayerConfigExt for gmoconfig::Config {
    fn dj_role(&self, guild: GuildId) -> Option<RoleId> {
        match self.get_value(&["dj_roles", &guild.0.to_string()]) {
            Ok(Value::Number(n)) => n.as_u64().map(RoleId),
            Ok(Value::String(s)) => s.parse::<u64>().ok().map(RoleId),
            _ => None,
        }
    }

    fn set_dj_role(&self, guild: GuildId, role: RoleId) -> anyhow::Result<()> {
        self.set_value(
            &["dj_roles", &guild.0.to_string()],
            Value::Number(role.0.into()),
        )
    }

    fn vote_window(&self) -> Duration {
        let secs = match self.get_value(&["playback", "vote_window_secs"]) {
            Ok(Value::Number(n)) => n.as_u64().unwrap_or(DEFAULT_VOTE_WINDOW_SECS),
            _ => DEFAULT_VOTE_WINDOW_SECS,
        };
        Duration::from_secs(secs)
    }

    fn resolve_retry_limit(&self) -> usize {
        match self.get_value(&["playback", "resolve_retry_limit"]) {
            Ok(Value::Number(n)) => n
                .as_u64()
                .map(|v| v as usize)
                .unwrap_or(DEFAULT_RESOLVE_RETRY_LIMIT),
            _ => DEFAULT_RESOLVE_RETRY_LIMIT,
        }
    }

    fn search_prefix(&self) -> String {
        match self.get_value(&["playback", "search_prefix"]) {
            Ok(Value::String(s)) => s,
            _ => DEFAULT_SEARCH_PREFIX.to_string(),
        }
    }
}

impl DjRoleProvider for gmoconfig::Config {
    fn dj_role(&self, guild: GuildId) -> Option<RoleId> {
        PlayerConfigExt::dj_role(self, guild)
    }
}
