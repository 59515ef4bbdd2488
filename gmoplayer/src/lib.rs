//! # gmoplayer - Orchestration de lecture multi-sessions
//!
//! Cette crate est le cœur d'orchestration de GMOBot : elle pilote la
//! lecture en file d'attente de nombreux salons ("guilds") indépendants
//! contre un nœud audio externe, avec :
//! - Une file FIFO par session ([`TrackQueue`]) et la machine à états de
//!   lecture ([`Session`])
//! - Un vote de quorum autorisant le skip des utilisateurs non privilégiés
//!   ([`SkipVote`], seuil = majorité au-delà de deux membres)
//! - La réconciliation du message "now playing" ([`NowPlaying`]) : un seul
//!   affichage vivant par session, mises à jour coalescées
//! - Le contrôle de privilège ([`PrivilegeGate`] : propriétaire du process,
//!   propriétaire du salon, rôle DJ configuré)
//! - Le [`SessionManager`] : point d'entrée unique, une invocation
//!   explicite `(acteur, salon, opération)` partagée par les commandes
//!   texte et les contrôles de transport
//!
//! # Architecture
//!
//! - **SessionManager** : registre central, routage des évènements nœud et
//!   des interactions d'affichage
//! - **Session** : ressource à écrivain unique (mutex interne), files et
//!   états jamais partagés entre sessions
//! - **ChatDirectory / DisplaySurface** : frontières vers la passerelle de
//!   chat, implémentées à l'extérieur du cœur
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use gmoplayer::{ManagerOptions, PlayerOp, SessionManager, UserId};
//! use gmonode::{GuildId, NodeRegistry};
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     directory: Arc<dyn gmoplayer::ChatDirectory>,
//! #     surface: Arc<dyn gmoplayer::DisplaySurface>,
//! #     roles: Arc<dyn gmoplayer::DjRoleProvider>,
//! # ) -> gmoplayer::Result<()> {
//! let nodes = Arc::new(NodeRegistry::new());
//! let manager = SessionManager::new(nodes, directory, surface, roles, ManagerOptions::default());
//!
//! // Les évènements du nœud audio alimentent les sessions
//! let events = manager.clone();
//! tokio::spawn(async move { events.run_node_events().await });
//!
//! // Une commande texte résolue par la couche de commandes
//! let _reply = manager
//!     .invoke(
//!         UserId(42),
//!         GuildId(7),
//!         PlayerOp::Play { query: "some song".to_string() },
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod directory;
mod display;
mod error;
mod events;
mod manager;
pub mod model;
mod nowplaying;
mod privilege;
mod queue;
mod session;
pub mod timefmt;
mod track;
mod vote;

#[cfg(feature = "gmoconfig")]
mod config_ext;

// Réexports publics
pub use directory::ChatDirectory;
pub use display::{
    ControlAction, ControlEvent, DisplayContent, DisplaySurface, NowPlayingModel, VoteModel,
    VotePolarity, VoteReaction,
};
pub use error::{Error, Result};
pub use events::{SessionEvent, SessionEventKind};
pub use manager::{ManagerOptions, OpReply, PlayerOp, SessionManager};
pub use model::{ChannelId, GuildId, Member, MessageId, RoleId, UserId};
pub use nowplaying::NowPlaying;
pub use privilege::{DjRoleProvider, PrivilegeGate};
pub use queue::TrackQueue;
pub use session::{
    AdvanceOutcome, EnqueueReport, PlaybackSnapshot, PlayerState, Session, DEFAULT_VOLUME,
};
pub use track::Track;
pub use vote::{skip_threshold, SkipVote, SkipVotePrompt};

#[cfg(feature = "gmoconfig")]
pub use config_ext::PlayerConfigExt;
