use thiserror::Error;

/// Failure classes for the remote store and the local state files.
///
/// The first three are authentication failures and block further remote
/// calls. `NotFound` is a valid empty result for plain reads but an error
/// when it hits the revision-token pre-fetch of an update or delete.
/// `Remote` carries the store's own message and is never retried.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// The token was rejected by the identity endpoint.
    #[error("invalid or expired token")]
    InvalidToken,

    /// The token is valid but cannot touch the configured repository.
    #[error("token does not have repository permission")]
    MissingPermission,

    /// The request was cut short before the store answered.
    #[error("request was aborted")]
    Aborted,

    /// The store reported that the path (or blob) does not exist.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// Any other answer from the store, with its status and message.
    #[error("remote error (status {status}): {message}")]
    Remote { status: u16, message: String },

    /// The request never produced an answer (connect, body read).
    #[error("network error: {0}")]
    Network(String),

    /// The binary-safe transport codec rejected the payload.
    #[error("transport encoding error: {0}")]
    Encoding(String),

    /// A local state file could not be read or written.
    #[error("local storage error: {0}")]
    Local(String),

    /// A category rule was violated: duplicate id on create or rename,
    /// or a single delete of an id that is not there.
    #[error("{0}")]
    Category(String),

    /// No authenticated session is available to issue remote calls.
    #[error("no repository is configured")]
    NotConfigured,
}

impl StoreError {
    /// True for the classes produced by `authenticate()` that must block
    /// all further remote operations.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidToken | StoreError::MissingPermission | StoreError::Aborted
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
