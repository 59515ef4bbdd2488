//! Évènements diffusés par le SessionManager

use crate::model::GuildId;
use crate::track::Track;

/// Type d'évènement émis par le SessionManager.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub guild: GuildId,
    pub kind: SessionEventKind,
}

/// Variantes d'évènements de session.
#[derive(Debug, Clone)]
pub enum SessionEventKind {
    /// Playback of a new track started.
    TrackStarted { track: Track },
    /// The last queued track finished with an empty queue.
    QueueFinished,
    /// The session was torn down (display removed, node released).
    Destroyed,
}
