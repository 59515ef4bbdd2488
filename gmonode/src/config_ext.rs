//! Extension de gmoconfig pour la configuration des nœuds audio

use crate::model::NodeEndpoint;
use tracing::warn;

/// Typed accessors for the `audio_nodes` configuration section.
pub trait NodeConfigExt {
    /// Endpoints of every configured audio node.
    fn audio_node_endpoints(&self) -> Vec<NodeEndpoint>;
}

impl NodeConfigExt for gmoconfig::Config {
    fn audio_node_endpoints(&self) -> Vec<NodeEndpoint> {
        match self.get_value(&["audio_nodes"]) {
            Ok(value) => match serde_yaml::from_value(value) {
                Ok(endpoints) => endpoints,
                Err(e) => {
                    warn!("Invalid audio_nodes configuration: {}", e);
                    Vec::new()
                }
            },
            Err(e) => {
                warn!("No audio_nodes configured: {}", e);
                Vec::new()
            }
        }
    }
}
