use thiserror::Error;

use crate::page::PageError;

/// Errors surfaced by the client API.
///
/// Remote command failures are scoped to the call that issued them and do
/// not poison the session; resource-closed conditions additionally show up
/// as a `disconnected` event on the session's event stream.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("initialization failed: {0}")]
    Initialization(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("remote command failed: {0}")]
    RemoteCommand(String),
    #[error("browser resource closed: {0}")]
    ResourceClosed(String),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("failed to access session storage: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PageError> for ClientError {
    fn from(err: PageError) -> Self {
        match err {
            PageError::Closed => ClientError::ResourceClosed("page closed".to_string()),
            other => ClientError::RemoteCommand(other.to_string()),
        }
    }
}
