use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Endpoint {peer} failed: {source}")]
    Endpoint {
        peer: String,
        #[source]
        source: BridgeError,
    },

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub(crate) fn endpoint(peer: &str, source: BridgeError) -> Self {
        SyncError::Endpoint {
            peer: peer.to_string(),
            source,
        }
    }

    /// Whether the loop must stop instead of retrying next cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::InvariantViolation(_) | SyncError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
