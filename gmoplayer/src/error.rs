//! Types d'erreurs pour gmoplayer

/// Erreurs d'orchestration de lecture
///
/// Every variant except [`Error::AbortSilently`] is recoverable at the
/// command boundary and rendered to the user as a transient notice.
/// `AbortSilently` tells the command layer to stop without any feedback
/// (a vote that failed already showed its own tally).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot reach any audio node: {0}")]
    Connection(String),

    #[error("There is nothing playing at the moment")]
    NotPlaying,

    #[error("{0}")]
    AlreadyInState(String),

    #[error("{0}")]
    Permission(String),

    #[error("No results for \"{0}\"")]
    NoResults(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Command execution aborted")]
    AbortSilently,

    #[error(transparent)]
    Node(#[from] gmonode::NodeError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn already_in_state(message: impl Into<String>) -> Self {
        Error::AlreadyInState(message.into())
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Error::Permission(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }
}

/// Type Result spécialisé pour gmoplayer
pub type Result<T> = std::result::Result<T, Error>;
