//! # gmonode - Frontière client des nœuds audio externes
//!
//! Cette crate définit le contrat entre le cœur d'orchestration et les
//! nœuds de rendu audio externes :
//! - Le trait [`AudioNode`] (connect, play, pause, seek, volume, stop,
//!   destroy, resolve_tracks)
//! - Les évènements entrants [`NodeEvent`] (fin / blocage / exception de
//!   piste)
//! - Le modèle de résolution ([`ResolveResponse`] : pistes, playlist, vide)
//! - Le [`NodeRegistry`] : registre processus avec init/teardown explicites,
//!   injecté dans les sessions
//!
//! Aucun protocole réseau n'est implémenté ici : les backends concrets
//! vivent en dehors du cœur et s'enregistrent auprès du registre.
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use gmonode::NodeRegistry;
//! use std::sync::Arc;
//!
//! # async fn example(node: Arc<dyn gmonode::AudioNode>) -> gmonode::Result<()> {
//! let registry = Arc::new(NodeRegistry::new());
//! registry.register(node).await?;
//!
//! let best = registry.best_available().await?;
//! let _events = registry.subscribe_events();
//! # Ok(())
//! # }
//! ```

mod error;
pub mod model;
mod node;
mod registry;

#[cfg(feature = "gmoconfig")]
mod config_ext;

// Réexports publics
pub use error::{NodeError, Result};
pub use model::{
    ChannelId, GuildId, NodeEndpoint, NodeEvent, NodeEventKind, ResolveResponse, ResolvedTrack,
};
pub use node::AudioNode;
pub use registry::NodeRegistry;

#[cfg(feature = "gmoconfig")]
pub use config_ext::NodeConfigExt;
