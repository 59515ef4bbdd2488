use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("No audio nodes are available")]
    NoAvailableNodes,
    #[error("Node \"{0}\" is already registered")]
    NodeOccupied(String),
    #[error("Node \"{0}\" is not registered")]
    UnknownNode(String),
    #[error("Cannot join audio channel: {0}")]
    ChannelJoin(String),
    #[error("Track resolution failed: {0}")]
    Resolve(String),
    #[error("Node transport error: {0}")]
    Transport(String),
}

impl NodeError {
    pub fn transport(message: impl Into<String>) -> Self {
        NodeError::Transport(message.into())
    }

    pub fn resolve(message: impl Into<String>) -> Self {
        NodeError::Resolve(message.into())
    }
}

/// Type Result spécialisé pour gmonode
pub type Result<T> = std::result::Result<T, NodeError>;
