use shared::error::ErrorBody;
use thiserror::Error;

/// Failure of a single registry call.
#[derive(Debug, Clone, Error)]
pub enum RegistryClientError {
    /// No response reached the client.
    #[error("registry unreachable: {0}")]
    Network(String),
    /// The registry answered with a non-success status.
    #[error("registry rejected request with status {status}: {}", .body.message().unwrap_or("no message"))]
    Registry { status: u16, body: ErrorBody },
    /// A success status whose body does not match the expected schema.
    #[error("malformed registry response: {0}")]
    MalformedResponse(String),
}

impl RegistryClientError {
    pub fn registry(status: u16, body: ErrorBody) -> Self {
        Self::Registry { status, body }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Registry { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            Self::Registry { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Message supplied by the registry, if it sent a usable one.
    pub fn server_message(&self) -> Option<&str> {
        self.body().and_then(ErrorBody::message)
    }

    pub fn is_foreign_key_constraint(&self) -> bool {
        self.body().is_some_and(ErrorBody::is_foreign_key_constraint)
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for RegistryClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Failure of a controller operation, after its notice has been published.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("the signed-in user cannot delete their own record")]
    SelfDeletion,
    #[error("{message}")]
    Registry {
        message: String,
        #[source]
        source: RegistryClientError,
    },
    #[error("no edit draft is loaded")]
    MissingDraft,
    #[error("failed to persist session: {0}")]
    SessionPersistence(#[source] anyhow::Error),
}

impl SyncError {
    pub(crate) fn registry(message: impl Into<String>, source: RegistryClientError) -> Self {
        Self::Registry {
            message: message.into(),
            source,
        }
    }

    /// Message shown to the operator for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Registry { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
