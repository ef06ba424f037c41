use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Endpoint not reachable: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Malformed response: {0}")]
    Protocol(String),

    #[error("Remote call {method} failed with code {code}: {message}")]
    Remote {
        method: String,
        code: i64,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, BridgeError>;
