//! Doublures en mémoire pour le nœud audio, l'annuaire et la surface d'affichage
#![allow(dead_code)]

use async_trait::async_trait;
use gmonode::{
    AudioNode, ChannelId, GuildId, NodeEvent, NodeEventKind, NodeRegistry, ResolveResponse,
    ResolvedTrack,
};
use gmoplayer::{
    ControlAction, DisplayContent, DisplaySurface, DjRoleProvider, Error, ManagerOptions, Member,
    MessageId, RoleId, SessionManager, Track, UserId,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Nœud audio enregistreur : trace les appels, rejoue des résolutions
/// scriptées et peut émettre les évènements de fin de piste.
pub struct FakeNode {
    identifier: String,
    available: AtomicBool,
    calls: Mutex<Vec<String>>,
    playing: Mutex<HashMap<GuildId, String>>,
    resolve_script: Mutex<VecDeque<gmonode::Result<ResolveResponse>>>,
    resolve_calls: AtomicUsize,
    track_counter: AtomicU64,
    fail_next_play: AtomicBool,
}

impl FakeNode {
    pub fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            available: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
            playing: Mutex::new(HashMap::new()),
            resolve_script: Mutex::new(VecDeque::new()),
            resolve_calls: AtomicUsize::new(0),
            track_counter: AtomicU64::new(0),
            fail_next_play: AtomicBool::new(false),
        }
    }

    /// Fait échouer le prochain appel à `play`.
    pub fn fail_next_play(&self) {
        self.fail_next_play.store(true, Ordering::SeqCst);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Queue a scripted resolution result (served before the default).
    pub fn script_resolve(&self, result: gmonode::Result<ResolveResponse>) {
        self.resolve_script.lock().unwrap().push_back(result);
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn play_count(&self, track_id: &str) -> usize {
        let needle = format!("play:{}", track_id);
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == needle)
            .count()
    }

    pub fn playing_track(&self, guild: GuildId) -> Option<String> {
        self.playing.lock().unwrap().get(&guild).cloned()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AudioNode for FakeNode {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn connect(&self, _guild: GuildId, channel: ChannelId) -> gmonode::Result<()> {
        self.record(format!("connect:{}", channel));
        Ok(())
    }

    async fn disconnect(&self, _guild: GuildId) -> gmonode::Result<()> {
        self.record("disconnect".to_string());
        Ok(())
    }

    async fn play(&self, guild: GuildId, track_id: &str) -> gmonode::Result<()> {
        if self.fail_next_play.swap(false, Ordering::SeqCst) {
            return Err(gmonode::NodeError::transport("scripted play failure"));
        }
        self.record(format!("play:{}", track_id));
        self.playing
            .lock()
            .unwrap()
            .insert(guild, track_id.to_string());
        Ok(())
    }

    async fn set_pause(&self, _guild: GuildId, paused: bool) -> gmonode::Result<()> {
        self.record(format!("set_pause:{}", paused));
        Ok(())
    }

    async fn seek(&self, _guild: GuildId, position_ms: u64) -> gmonode::Result<()> {
        self.record(format!("seek:{}", position_ms));
        Ok(())
    }

    async fn set_volume(&self, _guild: GuildId, volume: u16) -> gmonode::Result<()> {
        self.record(format!("set_volume:{}", volume));
        Ok(())
    }

    async fn stop(&self, guild: GuildId) -> gmonode::Result<()> {
        self.record("stop".to_string());
        self.playing.lock().unwrap().remove(&guild);
        Ok(())
    }

    async fn destroy(&self, guild: GuildId) -> gmonode::Result<()> {
        self.record("destroy".to_string());
        self.playing.lock().unwrap().remove(&guild);
        Ok(())
    }

    async fn resolve_tracks(&self, query: &str) -> gmonode::Result<ResolveResponse> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(result) = self.resolve_script.lock().unwrap().pop_front() {
            return result;
        }

        // Par défaut : un seul résultat dérivé de la requête
        let n = self.track_counter.fetch_add(1, Ordering::SeqCst);
        Ok(ResolveResponse::Tracks(vec![ResolvedTrack {
            id: format!("trk-{}", n),
            title: query.to_string(),
            uri: format!("https://tracks.example/{}", n),
            duration_ms: 180_000,
            thumbnail_url: None,
        }]))
    }
}

/// Annuaire en mémoire.
pub struct FakeDirectory {
    process_owner: UserId,
    guild_owners: Mutex<HashMap<GuildId, UserId>>,
    roles: Mutex<HashSet<(GuildId, UserId, RoleId)>>,
    voice: Mutex<HashMap<(GuildId, UserId), ChannelId>>,
    members: Mutex<HashMap<ChannelId, Vec<Member>>>,
}

impl FakeDirectory {
    pub fn new(process_owner: UserId) -> Self {
        Self {
            process_owner,
            guild_owners: Mutex::new(HashMap::new()),
            roles: Mutex::new(HashSet::new()),
            voice: Mutex::new(HashMap::new()),
            members: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_guild_owner(&self, guild: GuildId, owner: UserId) {
        self.guild_owners.lock().unwrap().insert(guild, owner);
    }

    pub fn grant_role(&self, guild: GuildId, user: UserId, role: RoleId) {
        self.roles.lock().unwrap().insert((guild, user, role));
    }

    /// Place un utilisateur (non automatisé) dans un canal audio.
    pub fn join_channel(&self, guild: GuildId, user: UserId, channel: ChannelId) {
        self.voice.lock().unwrap().insert((guild, user), channel);
        self.members
            .lock()
            .unwrap()
            .entry(channel)
            .or_default()
            .push(Member {
                user,
                display_name: format!("user-{}", user),
                is_automated: false,
            });
    }

    /// Place un membre automatisé (bot) dans un canal audio.
    pub fn join_channel_automated(&self, channel: ChannelId, user: UserId) {
        self.members
            .lock()
            .unwrap()
            .entry(channel)
            .or_default()
            .push(Member {
                user,
                display_name: format!("bot-{}", user),
                is_automated: true,
            });
    }
}

#[async_trait]
impl gmoplayer::ChatDirectory for FakeDirectory {
    async fn channel_members(&self, _guild: GuildId, channel: ChannelId) -> Vec<Member> {
        self.members
            .lock()
            .unwrap()
            .get(&channel)
            .cloned()
            .unwrap_or_default()
    }

    async fn voice_channel_of(&self, guild: GuildId, user: UserId) -> Option<ChannelId> {
        self.voice.lock().unwrap().get(&(guild, user)).copied()
    }

    async fn has_role(&self, guild: GuildId, user: UserId, role: RoleId) -> bool {
        self.roles.lock().unwrap().contains(&(guild, user, role))
    }

    async fn guild_owner(&self, guild: GuildId) -> Option<UserId> {
        self.guild_owners.lock().unwrap().get(&guild).copied()
    }

    async fn process_owner(&self) -> UserId {
        self.process_owner
    }
}

/// Surface d'affichage enregistreuse.
///
/// Compte créations/éditions, suit le contenu vivant et mesure le nombre
/// maximal d'éditions simultanées (l'invariant "une seule mise à jour en
/// vol" du réconciliateur).
pub struct FakeSurface {
    next_id: AtomicU64,
    live: Mutex<HashMap<MessageId, DisplayContent>>,
    controls: Mutex<HashMap<MessageId, Vec<ControlAction>>>,
    created: AtomicUsize,
    edits: AtomicUsize,
    deleted: Mutex<Vec<MessageId>>,
    edits_in_flight: AtomicUsize,
    max_edits_in_flight: AtomicUsize,
    edit_delay: Mutex<Option<Duration>>,
}

impl FakeSurface {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            live: Mutex::new(HashMap::new()),
            controls: Mutex::new(HashMap::new()),
            created: AtomicUsize::new(0),
            edits: AtomicUsize::new(0),
            deleted: Mutex::new(Vec::new()),
            edits_in_flight: AtomicUsize::new(0),
            max_edits_in_flight: AtomicUsize::new(0),
            edit_delay: Mutex::new(None),
        }
    }

    /// Ralentit chaque édition pour forcer le chevauchement des triggers.
    pub fn set_edit_delay(&self, delay: Duration) {
        *self.edit_delay.lock().unwrap() = Some(delay);
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn edits(&self) -> usize {
        self.edits.load(Ordering::SeqCst)
    }

    pub fn max_edits_in_flight(&self) -> usize {
        self.max_edits_in_flight.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<MessageId> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn live_messages(&self) -> Vec<(MessageId, DisplayContent)> {
        self.live
            .lock()
            .unwrap()
            .iter()
            .map(|(id, content)| (*id, content.clone()))
            .collect()
    }

    pub fn content_of(&self, message: MessageId) -> Option<DisplayContent> {
        self.live.lock().unwrap().get(&message).cloned()
    }

    pub fn controls_of(&self, message: MessageId) -> Vec<ControlAction> {
        self.controls
            .lock()
            .unwrap()
            .get(&message)
            .cloned()
            .unwrap_or_default()
    }

    /// Id du message de vote vivant, s'il existe.
    pub fn live_vote_message(&self) -> Option<MessageId> {
        self.live
            .lock()
            .unwrap()
            .iter()
            .find(|(_, content)| matches!(content, DisplayContent::VoteTally(_)))
            .map(|(id, _)| *id)
    }

    /// Id du message now-playing vivant, s'il existe.
    pub fn live_now_playing_message(&self) -> Option<MessageId> {
        self.live
            .lock()
            .unwrap()
            .iter()
            .find(|(_, content)| matches!(content, DisplayContent::NowPlaying(_)))
            .map(|(id, _)| *id)
    }
}

impl Default for FakeSurface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DisplaySurface for FakeSurface {
    async fn create_message(
        &self,
        _guild: GuildId,
        content: DisplayContent,
    ) -> gmoplayer::Result<MessageId> {
        let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.created.fetch_add(1, Ordering::SeqCst);
        self.live.lock().unwrap().insert(id, content);
        Ok(id)
    }

    async fn edit_message(
        &self,
        message: MessageId,
        content: DisplayContent,
    ) -> gmoplayer::Result<()> {
        let in_flight = self.edits_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_edits_in_flight
            .fetch_max(in_flight, Ordering::SeqCst);

        let delay = *self.edit_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = {
            let mut live = self.live.lock().unwrap();
            match live.get_mut(&message) {
                Some(slot) => {
                    *slot = content;
                    Ok(())
                }
                None => Err(Error::invalid_argument("unknown message")),
            }
        };

        self.edits.fetch_add(1, Ordering::SeqCst);
        self.edits_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn delete_message(&self, message: MessageId) -> gmoplayer::Result<()> {
        self.live.lock().unwrap().remove(&message);
        self.deleted.lock().unwrap().push(message);
        Ok(())
    }

    async fn attach_controls(
        &self,
        message: MessageId,
        controls: &[ControlAction],
    ) -> gmoplayer::Result<()> {
        self.controls
            .lock()
            .unwrap()
            .insert(message, controls.to_vec());
        Ok(())
    }

    async fn detach_controls(&self, message: MessageId) -> gmoplayer::Result<()> {
        self.controls.lock().unwrap().remove(&message);
        Ok(())
    }
}

/// Mapping DJ en mémoire.
pub struct FakeRoles {
    mapping: Mutex<HashMap<GuildId, RoleId>>,
}

impl FakeRoles {
    pub fn new() -> Self {
        Self {
            mapping: Mutex::new(HashMap::new()),
        }
    }

    pub fn set(&self, guild: GuildId, role: RoleId) {
        self.mapping.lock().unwrap().insert(guild, role);
    }
}

impl Default for FakeRoles {
    fn default() -> Self {
        Self::new()
    }
}

impl DjRoleProvider for FakeRoles {
    fn dj_role(&self, guild: GuildId) -> Option<RoleId> {
        self.mapping.lock().unwrap().get(&guild).copied()
    }
}

/// Banc d'essai complet : manager + doublures.
pub struct Harness {
    pub manager: SessionManager,
    pub registry: Arc<NodeRegistry>,
    pub node: Arc<FakeNode>,
    pub directory: Arc<FakeDirectory>,
    pub surface: Arc<FakeSurface>,
    pub roles: Arc<FakeRoles>,
}

pub async fn harness() -> Harness {
    harness_with(ManagerOptions::default()).await
}

pub async fn harness_with(options: ManagerOptions) -> Harness {
    let registry = Arc::new(NodeRegistry::new());
    let node = Arc::new(FakeNode::new("MAIN"));
    registry
        .register(node.clone())
        .await
        .expect("node registration");

    let directory = Arc::new(FakeDirectory::new(UserId(1)));
    let surface = Arc::new(FakeSurface::new());
    let roles = Arc::new(FakeRoles::new());

    let manager = SessionManager::new(
        registry.clone(),
        directory.clone(),
        surface.clone(),
        roles.clone(),
        options,
    );

    Harness {
        manager,
        registry,
        node,
        directory,
        surface,
        roles,
    }
}

/// Piste de test construite directement (sans passer par la résolution).
pub fn test_track(id: &str, requester: UserId) -> Track {
    Track::new(
        ResolvedTrack {
            id: id.to_string(),
            title: format!("Track {}", id),
            uri: format!("https://tracks.example/{}", id),
            duration_ms: 180_000,
            thumbnail_url: None,
        },
        requester,
    )
}

/// Évènement de fin de piste.
pub fn track_end(guild: GuildId, track_id: &str) -> NodeEvent {
    NodeEvent {
        guild,
        track_id: track_id.to_string(),
        kind: NodeEventKind::TrackEnd,
    }
}

/// Attend qu'une condition devienne vraie (1 s maximum).
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition was not reached within 1s");
}
