//! Session : contexte de lecture isolé d'un salon (guild)

use crate::display::{DisplaySurface, NowPlayingModel};
use crate::model::{ChannelId, GuildId};
use crate::nowplaying::NowPlaying;
use crate::queue::TrackQueue;
use crate::track::Track;
use crate::{Error, Result};
use gmonode::AudioNode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Default player volume on session creation.
pub const DEFAULT_VOLUME: u16 = 100;

/// Playback state of a session's player.
///
/// Connection is tracked separately: a session is "disconnected" when it
/// has no audio channel, whatever the playback state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Playing,
    Paused,
}

/// Mutable playback state, single-writer behind the session mutex.
struct PlayerCore {
    state: PlayerState,
    connected_to: Option<ChannelId>,
    repeat_one: bool,
    volume: u16,
    position_ms: u64,
    current: Option<Track>,
    queue: TrackQueue,
}

/// Read-only copy of a session's playback state.
#[derive(Clone, Debug)]
pub struct PlaybackSnapshot {
    pub state: PlayerState,
    pub connected_to: Option<ChannelId>,
    pub repeat_one: bool,
    pub volume: u16,
    pub position_ms: u64,
    pub current: Option<Track>,
    pub queue_len: usize,
}

/// Result of an enqueue call.
#[derive(Clone, Debug)]
pub struct EnqueueReport {
    /// Number of tracks appended.
    pub enqueued: usize,
    /// Track whose playback started because the player was idle.
    pub started: Option<Track>,
    /// Queue length after the append (and the possible advance).
    pub queue_len: usize,
}

/// Result of an advance attempt.
#[derive(Clone, Debug)]
pub enum AdvanceOutcome {
    /// The front track was popped and is now playing.
    Started(Track),
    /// Nothing left to play; the caller tears the session down.
    QueueEmpty,
    /// A track is already playing; the call was a guarded no-op.
    AlreadyPlaying,
    /// The end signal did not match the current track (duplicate or late
    /// event); ignored entirely.
    Stale,
}

/// Isolated playback context of one guild.
///
/// Owns the queue, the playback state machine and the now-playing display.
/// Every mutation goes through the internal mutex, so concurrent command
/// invocations for the same guild are serialized; different sessions never
/// block each other.
pub struct Session {
    guild: GuildId,
    node: Arc<dyn AudioNode>,
    core: Mutex<PlayerCore>,
    nowplaying: NowPlaying,
    destroyed: AtomicBool,
}

impl Session {
    pub fn new(
        guild: GuildId,
        node: Arc<dyn AudioNode>,
        surface: Arc<dyn DisplaySurface>,
    ) -> Self {
        Self {
            guild,
            node,
            core: Mutex::new(PlayerCore {
                state: PlayerState::Idle,
                connected_to: None,
                repeat_one: false,
                volume: DEFAULT_VOLUME,
                position_ms: 0,
                current: None,
                queue: TrackQueue::new(),
            }),
            nowplaying: NowPlaying::new(surface, guild),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn guild(&self) -> GuildId {
        self.guild
    }

    pub fn node(&self) -> Arc<dyn AudioNode> {
        self.node.clone()
    }

    pub fn nowplaying(&self) -> &NowPlaying {
        &self.nowplaying
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Audio channel the session is joined to, if any.
    pub async fn connected_channel(&self) -> Option<ChannelId> {
        self.core.lock().await.connected_to
    }

    /// Copy of the full playback state.
    pub async fn snapshot(&self) -> PlaybackSnapshot {
        let core = self.core.lock().await;
        PlaybackSnapshot {
            state: core.state,
            connected_to: core.connected_to,
            repeat_one: core.repeat_one,
            volume: core.volume,
            position_ms: core.position_ms,
            current: core.current.clone(),
            queue_len: core.queue.len(),
        }
    }

    /// Ordered copy of the queue entries.
    pub async fn queue_snapshot(&self) -> Vec<Track> {
        self.core.lock().await.queue.snapshot()
    }

    /// Join an audio channel (or move to another one).
    pub async fn connect(&self, channel: ChannelId) -> Result<()> {
        {
            let mut core = self.core.lock().await;
            self.node.connect(self.guild, channel).await?;
            core.connected_to = Some(channel);
        }
        self.reconcile_display().await
    }

    /// Leave the current audio channel.
    pub async fn disconnect(&self) -> Result<()> {
        {
            let mut core = self.core.lock().await;
            if core.connected_to.is_none() {
                return Err(Error::already_in_state(
                    "The player is not connected to an audio channel.",
                ));
            }
            self.node.disconnect(self.guild).await?;
            core.connected_to = None;
        }
        self.reconcile_display().await
    }

    /// Append tracks to the queue, advancing immediately when idle.
    pub async fn enqueue(&self, tracks: Vec<Track>) -> Result<EnqueueReport> {
        if tracks.is_empty() {
            let core = self.core.lock().await;
            return Ok(EnqueueReport {
                enqueued: 0,
                started: None,
                queue_len: core.queue.len(),
            });
        }

        let report = {
            let mut core = self.core.lock().await;
            let enqueued = tracks.len();
            core.queue.enqueue_many(tracks);

            let mut started = None;
            if core.state == PlayerState::Idle {
                if let AdvanceOutcome::Started(track) = self.advance_inner(&mut core).await? {
                    started = Some(track);
                }
            }

            EnqueueReport {
                enqueued,
                started,
                queue_len: core.queue.len(),
            }
        };

        if report.started.is_some() {
            self.reconcile_display().await?;
        }
        Ok(report)
    }

    /// Pop and play the next queue entry.
    ///
    /// No-ops while a track is playing, so overlapping end signals cannot
    /// double-advance. A node failure while starting the track puts it back
    /// at the queue front and leaves the state unchanged.
    async fn advance_inner(&self, core: &mut PlayerCore) -> Result<AdvanceOutcome> {
        if core.state == PlayerState::Playing {
            return Ok(AdvanceOutcome::AlreadyPlaying);
        }

        let Some(track) = core.queue.pop_front() else {
            return Ok(AdvanceOutcome::QueueEmpty);
        };

        if let Err(e) = self.node.play(self.guild, &track.id).await {
            core.queue.push_front(track);
            return Err(e.into());
        }

        core.state = PlayerState::Playing;
        core.position_ms = 0;
        core.current = Some(track.clone());
        Ok(AdvanceOutcome::Started(track))
    }

    /// Apply an end-of-track signal from the audio node.
    ///
    /// With repeat-one set, the ended track goes back to the queue front
    /// before the advance, so it plays again until the flag is cleared or
    /// the track is skipped past. Signals for a track that is no longer
    /// current are stale and ignored.
    pub async fn handle_track_end(&self, track_id: &str) -> Result<AdvanceOutcome> {
        let outcome = {
            let mut core = self.core.lock().await;

            let ended = match core.current.take() {
                Some(track) if track.id == track_id => track,
                other => {
                    core.current = other;
                    return Ok(AdvanceOutcome::Stale);
                }
            };

            core.state = PlayerState::Idle;
            core.position_ms = 0;
            if core.repeat_one {
                core.queue.push_front(ended);
            }

            self.advance_inner(&mut core).await?
        };

        if matches!(outcome, AdvanceOutcome::Started(_)) {
            self.reconcile_display().await?;
        }
        Ok(outcome)
    }

    /// Pause playback. Valid only while playing.
    pub async fn pause(&self) -> Result<()> {
        {
            let mut core = self.core.lock().await;
            match core.state {
                PlayerState::Idle => return Err(Error::NotPlaying),
                PlayerState::Paused => {
                    return Err(Error::already_in_state("The player is already paused."))
                }
                PlayerState::Playing => {}
            }
            self.node.set_pause(self.guild, true).await?;
            core.state = PlayerState::Paused;
        }
        self.reconcile_display().await
    }

    /// Resume playback. Valid only while paused.
    pub async fn resume(&self) -> Result<()> {
        {
            let mut core = self.core.lock().await;
            match core.state {
                PlayerState::Idle => return Err(Error::NotPlaying),
                PlayerState::Playing => {
                    return Err(Error::already_in_state("The player is not paused."))
                }
                PlayerState::Paused => {}
            }
            self.node.set_pause(self.guild, false).await?;
            core.state = PlayerState::Playing;
        }
        self.reconcile_display().await
    }

    /// Seek into the current track. Valid while playing or paused.
    pub async fn seek(&self, position: Duration) -> Result<()> {
        let mut core = self.core.lock().await;
        if core.state == PlayerState::Idle {
            return Err(Error::NotPlaying);
        }

        let ms = position.as_millis() as u64;
        self.node.seek(self.guild, ms).await?;
        core.position_ms = ms;
        Ok(())
    }

    /// Set the player volume. The command boundary validates the range.
    pub async fn set_volume(&self, volume: u16) -> Result<()> {
        let mut core = self.core.lock().await;
        self.node.set_volume(self.guild, volume).await?;
        core.volume = volume;
        Ok(())
    }

    /// Force-end the current track. The node answers with a track-end
    /// event, which drives the advance to the next entry.
    pub async fn stop_current(&self) -> Result<()> {
        let core = self.core.lock().await;
        if core.state == PlayerState::Idle {
            return Err(Error::NotPlaying);
        }
        self.node.stop(self.guild).await?;
        Ok(())
    }

    /// Shuffle the queue. Fails on an empty queue.
    pub async fn shuffle(&self) -> Result<usize> {
        let mut core = self.core.lock().await;
        if core.queue.is_empty() {
            return Err(Error::invalid_argument("The queue is empty."));
        }
        core.queue.shuffle();
        Ok(core.queue.len())
    }

    /// Set or toggle the repeat-one flag, returning the new value.
    pub async fn set_repeat(&self, enable: Option<bool>) -> Result<bool> {
        let enabled = {
            let mut core = self.core.lock().await;
            let target = enable.unwrap_or(!core.repeat_one);
            if core.repeat_one == target {
                let text = if target { "enabled" } else { "disabled" };
                return Err(Error::already_in_state(format!(
                    "Repeat is already {}.",
                    text
                )));
            }
            core.repeat_one = target;
            target
        };

        self.reconcile_display().await?;
        Ok(enabled)
    }

    /// Tear the session down: remove the display, release node resources,
    /// disconnect and drop the queue. Idempotent.
    pub async fn destroy(&self) -> Result<()> {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.nowplaying.destroy().await?;

        if let Err(e) = self.node.destroy(self.guild).await {
            // Le nœud a pu oublier ce player ; la destruction reste acquise
            debug!(guild = %self.guild, error = %e, "Audio node destroy reported an error");
        }

        let mut core = self.core.lock().await;
        core.queue.clear();
        core.current = None;
        core.state = PlayerState::Idle;
        core.connected_to = None;
        core.position_ms = 0;
        Ok(())
    }

    /// Render model of the current track, `None` when idle.
    pub async fn now_playing_model(&self) -> Option<NowPlayingModel> {
        let core = self.core.lock().await;
        core.current.as_ref().map(|track| NowPlayingModel {
            title: track.title.clone(),
            uri: track.uri.clone(),
            duration_ms: track.duration_ms,
            thumbnail_url: track.thumbnail_url.clone(),
            requester: track.requester,
            requested_at: track.requested_at,
            paused: core.state == PlayerState::Paused,
            connected: core.connected_to.is_some(),
            repeat_one: core.repeat_one,
        })
    }

    /// Push the current state to the now-playing display.
    pub async fn reconcile_display(&self) -> Result<()> {
        let model = self.now_playing_model().await;
        self.nowplaying.reconcile(model).await
    }
}
