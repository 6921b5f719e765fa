//! Error types for PeerCache

use std::sync::Arc;

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error produced by a host miss callback
pub type OriginError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in PeerCache
///
/// `Clone` so a single coalesced outcome can be handed to every waiter.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Empty key passed to `Group::get`
    #[error("key is required")]
    EmptyKey,

    /// The host miss callback failed; the message is surfaced unchanged
    #[error("{0}")]
    Origin(#[source] OriginError),

    /// No group registered under this name
    #[error("no such group: {0}")]
    GroupNotFound(String),

    /// A group with this name is already registered
    #[error("group already registered: {0}")]
    GroupExists(String),

    /// `register_peers` called more than once for a group
    #[error("peers already registered for group: {0}")]
    PeersAlreadyRegistered(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    // =========================================================================
    // Peer Transport Errors
    // =========================================================================
    /// Network failure while contacting a peer
    #[error("Peer {peer} unreachable: {source}")]
    PeerConnection {
        peer: String,
        #[source]
        source: Arc<reqwest::Error>,
    },

    /// Peer answered with a non-success status
    #[error("Peer {peer} returned {status}: {message}")]
    PeerStatus {
        peer: String,
        status: u16,
        message: String,
    },

    /// Malformed wire message
    #[error("Failed to decode peer message: {0}")]
    Decode(String),

    /// Request path is not `<base>/<group>/<key>`
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap a miss-callback failure
    pub fn origin(err: anyhow::Error) -> Self {
        let boxed: Box<dyn std::error::Error + Send + Sync + 'static> = err.into();
        Error::Origin(Arc::from(boxed))
    }

    /// True for failures that came from talking to a peer
    pub fn is_peer_error(&self) -> bool {
        matches!(
            self,
            Error::PeerConnection { .. } | Error::PeerStatus { .. } | Error::Decode(_)
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}
