//! Surface d'affichage : message de statut et contrôles de transport

use crate::model::{GuildId, MessageId, UserId};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// The fixed set of transport controls attached to the status display.
///
/// Each activation is dispatched through the same authorization path as the
/// equivalent text command, executed as the reacting user. How a control is
/// rendered (reaction emoji, button, ...) is the surface's business.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlAction {
    /// Toggle between pause and resume depending on the player state.
    PlayPause,
    /// Stop the player, clear the queue and leave the channel.
    Stop,
    /// Skip the current track (vote-gated for non-privileged users).
    Skip,
    /// Toggle repeat-one.
    Repeat,
}

impl ControlAction {
    /// Every control, in display order.
    pub const ALL: [ControlAction; 4] = [
        ControlAction::PlayPause,
        ControlAction::Stop,
        ControlAction::Skip,
        ControlAction::Repeat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlAction::PlayPause => "play_pause",
            ControlAction::Stop => "stop",
            ControlAction::Skip => "skip",
            ControlAction::Repeat => "repeat",
        }
    }
}

/// An inbound control activation on a display message.
#[derive(Clone, Debug)]
pub struct ControlEvent {
    pub message: MessageId,
    pub control: ControlAction,
    pub actor: UserId,
}

/// Render model of the "now playing" status display.
#[derive(Clone, Debug, PartialEq)]
pub struct NowPlayingModel {
    pub title: String,
    pub uri: String,
    pub duration_ms: u64,
    pub thumbnail_url: Option<String>,
    pub requester: UserId,
    pub requested_at: DateTime<Utc>,
    pub paused: bool,
    pub connected: bool,
    pub repeat_one: bool,
}

/// Render model of an open vote tally.
#[derive(Clone, Debug, PartialEq)]
pub struct VoteModel {
    pub prompt: String,
    /// Net count, `|upvotes| - |downvotes|`.
    pub count: i64,
    pub threshold: usize,
    pub window_secs: u64,
}

/// Content of a status message, rendered by the surface.
#[derive(Clone, Debug, PartialEq)]
pub enum DisplayContent {
    NowPlaying(NowPlayingModel),
    VoteTally(VoteModel),
}

/// Polarity of a vote reaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VotePolarity {
    Up,
    Down,
}

/// An inbound vote reaction on a vote message.
///
/// `added` is false when the user retracted the reaction.
#[derive(Clone, Debug)]
pub struct VoteReaction {
    pub message: MessageId,
    pub actor: UserId,
    pub polarity: VotePolarity,
    pub added: bool,
}

/// Outward display operations consumed by the orchestration core.
///
/// Exactly one implementation exists per process (the chat gateway); tests
/// substitute an in-memory recorder.
#[async_trait]
pub trait DisplaySurface: Send + Sync {
    /// Create a status message in the guild's bound text channel.
    async fn create_message(&self, guild: GuildId, content: DisplayContent) -> Result<MessageId>;

    /// Replace the content of an existing message.
    async fn edit_message(&self, message: MessageId, content: DisplayContent) -> Result<()>;

    /// Delete a message. Deleting an already-deleted message is a no-op.
    async fn delete_message(&self, message: MessageId) -> Result<()>;

    /// Attach the transport controls to a message.
    async fn attach_controls(&self, message: MessageId, controls: &[ControlAction]) -> Result<()>;

    /// Detach every control from a message.
    async fn detach_controls(&self, message: MessageId) -> Result<()>;
}
