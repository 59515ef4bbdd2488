//! Réconciliation du message "now playing" d'une session

use crate::display::{ControlAction, DisplayContent, DisplaySurface, NowPlayingModel};
use crate::model::{GuildId, MessageId};
use crate::Result;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

#[derive(Default)]
struct Inner {
    /// Live display message, at most one per session.
    message: Option<MessageId>,
    /// True while a render pass is running.
    in_flight: bool,
    /// Latest coalesced snapshot waiting for the in-flight pass.
    pending: Option<NowPlayingModel>,
    /// Bumped by destroy; a render pass started under an older epoch must
    /// not commit its result.
    epoch: u64,
}

/// Keeps exactly one status display per session consistent with the
/// playback state.
///
/// Concurrent triggers are coalesced through a single-slot pending queue:
/// at most one render is in flight and at most one snapshot is pending.
/// A new trigger while busy overwrites the pending slot, so the display
/// always converges on the latest state without ever racing two edits of
/// the same message or creating a second display.
pub struct NowPlaying {
    surface: Arc<dyn DisplaySurface>,
    guild: GuildId,
    inner: Mutex<Inner>,
}

enum Step {
    Render(NowPlayingModel),
    OrphanAndExit(MessageId),
    Exit,
}

impl NowPlaying {
    pub fn new(surface: Arc<dyn DisplaySurface>, guild: GuildId) -> Self {
        Self {
            surface,
            guild,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Id of the live display message, if one exists.
    pub fn message_id(&self) -> Option<MessageId> {
        self.inner.lock().unwrap().message
    }

    /// Bring the display in line with the given snapshot.
    ///
    /// `None` (no current track) is a no-op, not an error. When a pass is
    /// already in flight the snapshot lands in the pending slot and this
    /// call returns immediately; the in-flight pass picks it up before
    /// releasing the guard.
    pub async fn reconcile(&self, model: Option<NowPlayingModel>) -> Result<()> {
        let Some(model) = model else { return Ok(()) };

        let epoch = {
            let mut inner = self.inner.lock().unwrap();
            if inner.in_flight {
                inner.pending = Some(model);
                return Ok(());
            }
            inner.in_flight = true;
            inner.epoch
        };

        let mut current = model;
        loop {
            let target = {
                let mut inner = self.inner.lock().unwrap();
                if inner.epoch != epoch {
                    inner.pending = None;
                    inner.in_flight = false;
                    return Ok(());
                }
                inner.message
            };

            let content = DisplayContent::NowPlaying(current.clone());
            let mut created = None;
            match target {
                Some(id) => {
                    if let Err(e) = self.surface.edit_message(id, content).await {
                        warn!(guild = %self.guild, error = %e, "Failed to edit now-playing display");
                    }
                }
                None => match self.surface.create_message(self.guild, content).await {
                    Ok(id) => {
                        if let Err(e) = self.surface.attach_controls(id, &ControlAction::ALL).await
                        {
                            warn!(guild = %self.guild, error = %e, "Failed to attach transport controls");
                        }
                        created = Some(id);
                    }
                    Err(e) => {
                        warn!(guild = %self.guild, error = %e, "Failed to create now-playing display");
                    }
                },
            }

            let step = {
                let mut inner = self.inner.lock().unwrap();
                if inner.epoch != epoch {
                    // Détruit pendant le rendu : ne rien committer
                    inner.pending = None;
                    inner.in_flight = false;
                    match created {
                        Some(id) => Step::OrphanAndExit(id),
                        None => Step::Exit,
                    }
                } else {
                    if let Some(id) = created {
                        inner.message = Some(id);
                    }
                    match inner.pending.take() {
                        Some(next) => Step::Render(next),
                        None => {
                            inner.in_flight = false;
                            Step::Exit
                        }
                    }
                }
            };

            match step {
                Step::Render(next) => current = next,
                Step::OrphanAndExit(id) => {
                    let _ = self.surface.delete_message(id).await;
                    return Ok(());
                }
                Step::Exit => return Ok(()),
            }
        }
    }

    /// Detach the controls and remove the display. Idempotent.
    pub async fn destroy(&self) -> Result<()> {
        let message = {
            let mut inner = self.inner.lock().unwrap();
            inner.epoch += 1;
            inner.pending = None;
            inner.message.take()
        };

        if let Some(id) = message {
            if let Err(e) = self.surface.detach_controls(id).await {
                debug!(guild = %self.guild, error = %e, "Failed to detach controls");
            }
            if let Err(e) = self.surface.delete_message(id).await {
                debug!(guild = %self.guild, error = %e, "Failed to delete now-playing display");
            }
        }

        Ok(())
    }
}
