//! Process-wide registry of audio nodes.
//!
//! One registry per process, created at bootstrap and injected into the
//! session layer. Sessions pick a node through [`NodeRegistry::best_available`]
//! and keep the returned handle; they never reach for global state.

use crate::model::NodeEvent;
use crate::node::AudioNode;
use crate::{NodeError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Registry of every configured audio node, with explicit init/teardown.
pub struct NodeRegistry {
    nodes: RwLock<HashMap<String, Arc<dyn AudioNode>>>,
    event_tx: broadcast::Sender<NodeEvent>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            event_tx: broadcast::channel(EVENT_CHANNEL_CAPACITY).0,
        }
    }

    /// Register a node under its identifier.
    ///
    /// Fails with [`NodeError::NodeOccupied`] when a node with the same
    /// identifier is already registered (the caller decides whether to
    /// destroy and re-register, as the bootstrap sequence does).
    pub async fn register(&self, node: Arc<dyn AudioNode>) -> Result<()> {
        let identifier = node.identifier().to_string();
        let mut nodes = self.nodes.write().await;

        if nodes.contains_key(&identifier) {
            return Err(NodeError::NodeOccupied(identifier));
        }

        info!(node = identifier.as_str(), "Audio node registered");
        nodes.insert(identifier, node);
        Ok(())
    }

    /// Remove a node, returning it so the caller can close it.
    pub async fn unregister(&self, identifier: &str) -> Result<Arc<dyn AudioNode>> {
        let mut nodes = self.nodes.write().await;
        nodes
            .remove(identifier)
            .ok_or_else(|| NodeError::UnknownNode(identifier.to_string()))
    }

    /// Look up a node by identifier.
    pub async fn get(&self, identifier: &str) -> Option<Arc<dyn AudioNode>> {
        self.nodes.read().await.get(identifier).cloned()
    }

    /// Pick a node able to host a new player.
    ///
    /// Fails with [`NodeError::NoAvailableNodes`] when the registry is
    /// empty or every node reports itself unavailable.
    pub async fn best_available(&self) -> Result<Arc<dyn AudioNode>> {
        let nodes = self.nodes.read().await;
        nodes
            .values()
            .find(|node| node.is_available())
            .cloned()
            .ok_or(NodeError::NoAvailableNodes)
    }

    /// Number of registered nodes.
    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }

    /// Sender side of the node event stream.
    ///
    /// Node backends emit their inbound `TrackEnd`/`TrackStuck`/
    /// `TrackException` notifications here.
    pub fn event_sender(&self) -> broadcast::Sender<NodeEvent> {
        self.event_tx.clone()
    }

    /// Subscribe to inbound node events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<NodeEvent> {
        self.event_tx.subscribe()
    }

    /// Close every node and empty the registry.
    pub async fn teardown(&self) {
        let nodes: Vec<Arc<dyn AudioNode>> = {
            let mut guard = self.nodes.write().await;
            guard.drain().map(|(_, node)| node).collect()
        };

        for node in nodes {
            if let Err(e) = node.close().await {
                warn!(node = node.identifier(), error = %e, "Failed to close audio node");
            }
        }
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChannelId, GuildId, ResolveResponse};
    use crate::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubNode {
        identifier: String,
        available: bool,
        closed: AtomicBool,
    }

    impl StubNode {
        fn new(identifier: &str, available: bool) -> Arc<Self> {
            Arc::new(Self {
                identifier: identifier.to_string(),
                available,
                closed: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl AudioNode for StubNode {
        fn identifier(&self) -> &str {
            &self.identifier
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn connect(&self, _guild: GuildId, _channel: ChannelId) -> Result<()> {
            Ok(())
        }

        async fn disconnect(&self, _guild: GuildId) -> Result<()> {
            Ok(())
        }

        async fn play(&self, _guild: GuildId, _track_id: &str) -> Result<()> {
            Ok(())
        }

        async fn set_pause(&self, _guild: GuildId, _paused: bool) -> Result<()> {
            Ok(())
        }

        async fn seek(&self, _guild: GuildId, _position_ms: u64) -> Result<()> {
            Ok(())
        }

        async fn set_volume(&self, _guild: GuildId, _volume: u16) -> Result<()> {
            Ok(())
        }

        async fn stop(&self, _guild: GuildId) -> Result<()> {
            Ok(())
        }

        async fn destroy(&self, _guild: GuildId) -> Result<()> {
            Ok(())
        }

        async fn resolve_tracks(&self, _query: &str) -> Result<ResolveResponse> {
            Ok(ResolveResponse::Empty)
        }

        async fn close(&self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn duplicate_identifiers_are_rejected() {
        let registry = NodeRegistry::new();
        registry.register(StubNode::new("MAIN", true)).await.unwrap();

        let result = registry.register(StubNode::new("MAIN", true)).await;
        assert!(matches!(result, Err(NodeError::NodeOccupied(_))));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn best_available_skips_unavailable_nodes() {
        let registry = NodeRegistry::new();
        assert!(matches!(
            registry.best_available().await,
            Err(NodeError::NoAvailableNodes)
        ));

        registry
            .register(StubNode::new("DOWN", false))
            .await
            .unwrap();
        assert!(matches!(
            registry.best_available().await,
            Err(NodeError::NoAvailableNodes)
        ));

        registry.register(StubNode::new("UP", true)).await.unwrap();
        let node = registry.best_available().await.unwrap();
        assert_eq!(node.identifier(), "UP");
    }

    #[tokio::test]
    async fn teardown_closes_and_empties_the_registry() {
        let registry = NodeRegistry::new();
        let node = StubNode::new("MAIN", true);
        registry.register(node.clone()).await.unwrap();

        registry.teardown().await;
        assert!(registry.is_empty().await);
        assert!(node.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unregister_returns_the_node() {
        let registry = NodeRegistry::new();
        registry.register(StubNode::new("MAIN", true)).await.unwrap();

        let node = registry.unregister("MAIN").await.unwrap();
        assert_eq!(node.identifier(), "MAIN");
        assert!(matches!(
            registry.unregister("MAIN").await,
            Err(NodeError::UnknownNode(_))
        ));
    }
}
