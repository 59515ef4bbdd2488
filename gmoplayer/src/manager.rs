//! SessionManager : gestionnaire central de toutes les sessions de lecture

use crate::directory::ChatDirectory;
use crate::display::{ControlAction, ControlEvent, DisplaySurface, VoteReaction};
use crate::events::{SessionEvent, SessionEventKind};
use crate::model::{GuildId, MessageId, UserId};
use crate::privilege::{DjRoleProvider, PrivilegeGate};
use crate::session::{AdvanceOutcome, PlaybackSnapshot, PlayerState, Session};
use crate::track::Track;
use crate::vote::SkipVotePrompt;
use crate::{Error, Result};
use gmonode::{NodeEvent, NodeEventKind, NodeRegistry, ResolveResponse};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex as StdMutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const VOTE_REACTION_BUFFER: usize = 16;

/// Tunables of the session manager.
#[derive(Clone, Debug)]
pub struct ManagerOptions {
    /// Duration of a skip vote window.
    pub vote_window: Duration,
    /// Prefix prepended to non-URL play queries.
    pub search_prefix: String,
    /// Bounded retry count for track resolution.
    pub resolve_retry_limit: usize,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            vote_window: Duration::from_secs(30),
            search_prefix: "ytsearch:".to_string(),
            resolve_retry_limit: 10,
        }
    }
}

#[cfg(feature = "gmoconfig")]
impl ManagerOptions {
    /// Read the tunables from the application configuration.
    pub fn from_config(config: &gmoconfig::Config) -> Self {
        use crate::config_ext::PlayerConfigExt;

        Self {
            vote_window: config.vote_window(),
            search_prefix: config.search_prefix(),
            resolve_retry_limit: config.resolve_retry_limit(),
        }
    }
}

/// A player operation, invoked explicitly as `(actor, guild)`.
///
/// Text commands and transport-control activations both resolve to one of
/// these; authorization and vote gating apply identically whatever the
/// trigger was.
#[derive(Clone, Debug)]
pub enum PlayerOp {
    /// Join an audio channel; defaults to the actor's current channel.
    Connect { channel: Option<crate::model::ChannelId> },
    /// Leave the current audio channel.
    Disconnect,
    /// Resolve a query and enqueue the result.
    Play { query: String },
    /// Stop the player, clear the queue and leave the channel.
    Stop,
    Pause,
    Resume,
    /// Skip the current track (vote-gated for non-privileged actors).
    Skip,
    /// Seek into the current track.
    Seek { position: Duration },
    /// Set the volume, 0..=1000.
    Volume { volume: u16 },
    /// Shuffle the queue.
    Shuffle,
    /// Set or toggle repeat-one.
    Repeat { enable: Option<bool> },
    /// Snapshot of the current track and position.
    NowPlaying,
    /// Ordered snapshot of the queue.
    Queue,
}

impl PlayerOp {
    /// Operations privileged users may run unconditionally and others may
    /// not run at all (skip is special: it degrades to a vote).
    fn requires_privilege(&self) -> bool {
        matches!(
            self,
            PlayerOp::Connect { .. }
                | PlayerOp::Disconnect
                | PlayerOp::Stop
                | PlayerOp::Pause
                | PlayerOp::Resume
                | PlayerOp::Seek { .. }
                | PlayerOp::Volume { .. }
                | PlayerOp::Shuffle
                | PlayerOp::Repeat { .. }
        )
    }
}

/// Data handed back to the command layer for user feedback.
#[derive(Clone, Debug)]
pub enum OpReply {
    Connected(crate::model::ChannelId),
    Disconnected,
    Enqueued {
        enqueued: usize,
        /// Track whose playback started because the player was idle.
        started: Option<Track>,
        queue_len: usize,
    },
    Stopped,
    Paused,
    Resumed,
    Skipped,
    SeekedTo(Duration),
    VolumeSet(u16),
    Shuffled { queue_len: usize },
    RepeatSet(bool),
    NowPlaying(PlaybackSnapshot),
    Queue(Vec<Track>),
}

/// Structure interne du manager
struct ManagerInner {
    nodes: Arc<NodeRegistry>,
    directory: Arc<dyn ChatDirectory>,
    surface: Arc<dyn DisplaySurface>,
    privilege: PrivilegeGate,
    options: ManagerOptions,
    sessions: RwLock<HashMap<GuildId, Arc<Session>>>,
    /// Open skip votes, keyed by their tally message.
    votes: StdMutex<HashMap<MessageId, mpsc::Sender<VoteReaction>>>,
    event_tx: broadcast::Sender<SessionEvent>,
}

/// Gestionnaire central des sessions de lecture, une par guild.
///
/// Entry point for the command layer: every operation goes through
/// [`SessionManager::invoke`], node events through
/// [`SessionManager::handle_node_event`], and display interactions through
/// [`SessionManager::handle_control`] / [`SessionManager::handle_vote_reaction`].
/// Sessions are created lazily and fully independent of each other.
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

impl Clone for SessionManager {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl SessionManager {
    pub fn new(
        nodes: Arc<NodeRegistry>,
        directory: Arc<dyn ChatDirectory>,
        surface: Arc<dyn DisplaySurface>,
        roles: Arc<dyn DjRoleProvider>,
        options: ManagerOptions,
    ) -> Self {
        let privilege = PrivilegeGate::new(directory.clone(), roles);
        Self {
            inner: Arc::new(ManagerInner {
                nodes,
                directory,
                surface,
                privilege,
                options,
                sessions: RwLock::new(HashMap::new()),
                votes: StdMutex::new(HashMap::new()),
                event_tx: broadcast::channel(EVENT_CHANNEL_CAPACITY).0,
            }),
        }
    }

    /// Souscrit au flux d'évènements de session.
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Shared node registry handle.
    pub fn node_registry(&self) -> Arc<NodeRegistry> {
        self.inner.nodes.clone()
    }

    /// Existing session for a guild, if one is alive.
    pub async fn session(&self, guild: GuildId) -> Option<Arc<Session>> {
        let sessions = self.inner.sessions.read().await;
        sessions.get(&guild).filter(|s| !s.is_destroyed()).cloned()
    }

    fn emit(&self, guild: GuildId, kind: SessionEventKind) {
        // Diffusion ignorée si aucun abonné
        let _ = self.inner.event_tx.send(SessionEvent { guild, kind });
    }

    /// Get or lazily create the guild's session.
    ///
    /// Fails with [`Error::Connection`] when no audio node can host a new
    /// player, leaving no session behind.
    async fn get_or_create_session(&self, guild: GuildId) -> Result<Arc<Session>> {
        if let Some(session) = self.session(guild).await {
            return Ok(session);
        }

        let mut sessions = self.inner.sessions.write().await;
        if let Some(session) = sessions.get(&guild) {
            if !session.is_destroyed() {
                return Ok(session.clone());
            }
        }

        let node = self
            .inner
            .nodes
            .best_available()
            .await
            .map_err(|_| Error::Connection("no audio node is currently available".to_string()))?;

        info!(guild = %guild, node = node.identifier(), "Creating playback session");
        let session = Arc::new(Session::new(guild, node, self.inner.surface.clone()));
        sessions.insert(guild, session.clone());
        Ok(session)
    }

    async fn remove_session(&self, guild: GuildId) {
        self.inner.sessions.write().await.remove(&guild);
    }

    /// Run a player operation as `(actor, guild)`.
    ///
    /// This is the single entry shared by text commands and transport
    /// controls. Channel-membership and privilege gates run first; a
    /// vote-gated skip that fails resolves to [`Error::AbortSilently`].
    pub async fn invoke(&self, actor: UserId, guild: GuildId, op: PlayerOp) -> Result<OpReply> {
        let session = self.get_or_create_session(guild).await?;

        self.check_channel_membership(&session, actor, guild).await?;

        if op.requires_privilege() {
            self.inner.privilege.check(guild, actor).await?;
        }

        match op {
            PlayerOp::Connect { channel } => {
                let channel = match channel {
                    Some(channel) => channel,
                    None => self
                        .inner
                        .directory
                        .voice_channel_of(guild, actor)
                        .await
                        .ok_or_else(|| {
                            Error::invalid_argument(
                                "You have to be in an audio channel or specify one.",
                            )
                        })?,
                };
                session.connect(channel).await?;
                Ok(OpReply::Connected(channel))
            }
            PlayerOp::Disconnect => {
                session.disconnect().await?;
                Ok(OpReply::Disconnected)
            }
            PlayerOp::Play { query } => self.play(&session, actor, guild, query).await,
            PlayerOp::Stop => {
                if session.snapshot().await.state == PlayerState::Idle {
                    return Err(Error::NotPlaying);
                }
                session.destroy().await?;
                self.remove_session(guild).await;
                self.emit(guild, SessionEventKind::Destroyed);
                Ok(OpReply::Stopped)
            }
            PlayerOp::Pause => {
                session.pause().await?;
                Ok(OpReply::Paused)
            }
            PlayerOp::Resume => {
                session.resume().await?;
                Ok(OpReply::Resumed)
            }
            PlayerOp::Skip => {
                if session.snapshot().await.state == PlayerState::Idle {
                    return Err(Error::NotPlaying);
                }

                if !self.inner.privilege.is_privileged(guild, actor).await {
                    self.vote_gated_skip(&session, actor, guild).await?;
                }

                session.stop_current().await?;
                Ok(OpReply::Skipped)
            }
            PlayerOp::Seek { position } => {
                session.seek(position).await?;
                Ok(OpReply::SeekedTo(position))
            }
            PlayerOp::Volume { volume } => {
                if volume > 1000 {
                    return Err(Error::invalid_argument(
                        "The volume has to be between 0 and 1000.",
                    ));
                }
                session.set_volume(volume).await?;
                Ok(OpReply::VolumeSet(volume))
            }
            PlayerOp::Shuffle => {
                let queue_len = session.shuffle().await?;
                Ok(OpReply::Shuffled { queue_len })
            }
            PlayerOp::Repeat { enable } => {
                let enabled = session.set_repeat(enable).await?;
                Ok(OpReply::RepeatSet(enabled))
            }
            PlayerOp::NowPlaying => {
                let snapshot = session.snapshot().await;
                if snapshot.current.is_none() {
                    return Err(Error::NotPlaying);
                }
                Ok(OpReply::NowPlaying(snapshot))
            }
            PlayerOp::Queue => Ok(OpReply::Queue(session.queue_snapshot().await)),
        }
    }

    /// Dispatch a transport-control activation as the reacting user.
    ///
    /// The control maps to the equivalent command and goes through
    /// [`SessionManager::invoke`], so privilege checks and vote gating
    /// apply exactly as for text commands. Activations on a message that
    /// is no longer the live display are silently ignored.
    pub async fn handle_control(&self, event: ControlEvent) -> Result<OpReply> {
        let Some((guild, session)) = self.session_by_display(event.message).await else {
            return Err(Error::AbortSilently);
        };

        let op = match event.control {
            ControlAction::PlayPause => {
                if session.snapshot().await.state == PlayerState::Paused {
                    PlayerOp::Resume
                } else {
                    PlayerOp::Pause
                }
            }
            ControlAction::Stop => PlayerOp::Stop,
            ControlAction::Skip => PlayerOp::Skip,
            ControlAction::Repeat => PlayerOp::Repeat { enable: None },
        };

        self.invoke(event.actor, guild, op).await
    }

    /// Route a vote reaction to the open vote owning the message.
    ///
    /// Reactions on unknown or already-settled votes are dropped.
    pub async fn handle_vote_reaction(&self, reaction: VoteReaction) {
        let sender = {
            let votes = self.inner.votes.lock().unwrap();
            votes.get(&reaction.message).cloned()
        };

        if let Some(tx) = sender {
            if tx.send(reaction).await.is_err() {
                debug!("Vote already settled, reaction dropped");
            }
        }
    }

    /// Apply an inbound node event (track end / stuck / exception).
    ///
    /// All three kinds funnel into the same advance path.
    pub async fn handle_node_event(&self, event: NodeEvent) {
        let session = {
            let sessions = self.inner.sessions.read().await;
            sessions.get(&event.guild).cloned()
        };
        let Some(session) = session else {
            debug!(guild = %event.guild, "Node event for an unknown session");
            return;
        };

        if let NodeEventKind::TrackException { message } = &event.kind {
            warn!(guild = %event.guild, track = event.track_id.as_str(), error = message.as_str(), "Track raised an exception");
        }

        match session.handle_track_end(&event.track_id).await {
            Ok(AdvanceOutcome::Started(track)) => {
                self.emit(event.guild, SessionEventKind::TrackStarted { track });
            }
            Ok(AdvanceOutcome::QueueEmpty) => {
                self.emit(event.guild, SessionEventKind::QueueFinished);
                if let Err(e) = session.destroy().await {
                    warn!(guild = %event.guild, error = %e, "Failed to tear session down");
                }
                self.remove_session(event.guild).await;
                self.emit(event.guild, SessionEventKind::Destroyed);
            }
            Ok(_) => {}
            Err(e) => {
                warn!(guild = %event.guild, error = %e, "Failed to advance after track end");
            }
        }
    }

    /// Drain the node registry's event stream into the sessions.
    ///
    /// Spawned once by the bootstrap layer; returns when the registry is
    /// dropped.
    pub async fn run_node_events(&self) {
        let mut rx = self.inner.nodes.subscribe_events();
        loop {
            match rx.recv().await {
                Ok(event) => self.handle_node_event(event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Node event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Destroy every session (process shutdown).
    pub async fn destroy_all(&self) {
        let sessions: Vec<(GuildId, Arc<Session>)> = {
            let mut guard = self.inner.sessions.write().await;
            guard.drain().collect()
        };

        for (guild, session) in sessions {
            if let Err(e) = session.destroy().await {
                warn!(guild = %guild, error = %e, "Failed to destroy session");
            }
            self.emit(guild, SessionEventKind::Destroyed);
        }
    }

    /// Non-privileged actors must share the session's audio channel.
    async fn check_channel_membership(
        &self,
        session: &Session,
        actor: UserId,
        guild: GuildId,
    ) -> Result<()> {
        let Some(channel) = session.connected_channel().await else {
            return Ok(());
        };

        let members = self.inner.directory.channel_members(guild, channel).await;
        if members.iter().any(|m| m.user == actor) {
            return Ok(());
        }

        if self.inner.privilege.is_privileged(guild, actor).await {
            return Ok(());
        }

        let name = self.inner.directory.channel_name(channel).await;
        Err(Error::permission(format!(
            "You have to be in {} to use player commands.",
            name
        )))
    }

    async fn play(
        &self,
        session: &Arc<Session>,
        actor: UserId,
        guild: GuildId,
        query: String,
    ) -> Result<OpReply> {
        let query = if is_url(&query) {
            query
        } else {
            format!("{}{}", self.inner.options.search_prefix, query)
        };

        let resolved = self.resolve_with_retry(session, &query).await?;
        let resolved_tracks = match resolved {
            ResolveResponse::Playlist { tracks, .. } => tracks,
            // Une recherche simple ne retient que le premier résultat
            ResolveResponse::Tracks(tracks) => tracks.into_iter().take(1).collect(),
            ResolveResponse::Empty => return Err(Error::NoResults(query)),
        };

        if resolved_tracks.is_empty() {
            return Err(Error::NoResults(query));
        }

        let tracks: Vec<Track> = resolved_tracks
            .into_iter()
            .map(|resolved| Track::new(resolved, actor))
            .collect();

        // Auto-connect before touching the queue, so a failed join leaves
        // no queued leftovers behind.
        if session.connected_channel().await.is_none() {
            let channel = self
                .inner
                .directory
                .voice_channel_of(guild, actor)
                .await
                .ok_or_else(|| {
                    Error::invalid_argument("Neither you nor I are in an audio channel.")
                })?;
            session.connect(channel).await?;
        }

        let report = session.enqueue(tracks).await?;
        if let Some(track) = &report.started {
            self.emit(
                guild,
                SessionEventKind::TrackStarted {
                    track: track.clone(),
                },
            );
        }

        Ok(OpReply::Enqueued {
            enqueued: report.enqueued,
            started: report.started,
            queue_len: report.queue_len,
        })
    }

    /// Bounded immediate retry around track resolution.
    ///
    /// Transient node failures and empty results both consume attempts and
    /// exhaust into [`Error::NoResults`]; the node never sees backoff.
    async fn resolve_with_retry(
        &self,
        session: &Arc<Session>,
        query: &str,
    ) -> Result<ResolveResponse> {
        let node = session.node();
        for attempt in 0..self.inner.options.resolve_retry_limit {
            match node.resolve_tracks(query).await {
                Ok(ResolveResponse::Empty) => {
                    debug!(attempt, query, "Empty resolution result, retrying");
                }
                Ok(response) => return Ok(response),
                Err(e) => {
                    debug!(attempt, query, error = %e, "Track resolution failed, retrying");
                }
            }
        }

        Err(Error::NoResults(query.to_string()))
    }

    /// Run a skip vote for a non-privileged actor.
    ///
    /// Eligible voters are the non-automated members of the session's audio
    /// channel at open time, plus the process owner. Resolves to
    /// [`Error::AbortSilently`] when the vote fails, so the command layer
    /// stays quiet (the tally already told the story).
    async fn vote_gated_skip(
        &self,
        session: &Arc<Session>,
        actor: UserId,
        guild: GuildId,
    ) -> Result<()> {
        let Some(channel) = session.connected_channel().await else {
            return Err(Error::Connection(
                "the player is not connected to an audio channel".to_string(),
            ));
        };

        let members = self.inner.directory.channel_members(guild, channel).await;
        let eligible: HashSet<UserId> = members
            .iter()
            .filter(|m| !m.is_automated)
            .map(|m| m.user)
            .collect();
        let override_voter = self.inner.directory.process_owner().await;

        let mut prompt = SkipVotePrompt::new(
            self.inner.surface.clone(),
            guild,
            "Skip the current track?",
            self.inner.options.vote_window,
            eligible,
            override_voter,
        );
        prompt.cast_initial(actor);

        if prompt.decided() {
            return Ok(());
        }

        let message = prompt.open().await?;
        let (tx, mut rx) = mpsc::channel(VOTE_REACTION_BUFFER);
        self.inner.votes.lock().unwrap().insert(message, tx);

        let result = prompt.run(&mut rx).await;

        self.inner.votes.lock().unwrap().remove(&message);

        if result? {
            Ok(())
        } else {
            Err(Error::AbortSilently)
        }
    }

    async fn session_by_display(&self, message: MessageId) -> Option<(GuildId, Arc<Session>)> {
        let sessions = self.inner.sessions.read().await;
        sessions
            .iter()
            .find(|(_, session)| session.nowplaying().message_id() == Some(message))
            .map(|(guild, session)| (*guild, session.clone()))
    }
}

fn is_url(query: &str) -> bool {
    query.starts_with("http://") || query.starts_with("https://")
}
