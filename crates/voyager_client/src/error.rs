use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoyagerError {
    #[error("redirect attempted to {location:?}")]
    RedirectAttempted { location: Option<String> },
    #[error("access token is no longer valid")]
    TokenInvalidated,
    #[error("challenge required")]
    ChallengeRequired,
    #[error("consent required")]
    ConsentRequired,
    #[error("account suspended")]
    AccountSuspended,
    #[error("failed to send request: {0}")]
    RequestFailed(#[source] reqwest::Error),
    #[error("failed to read response body: {0}")]
    ResponseReadFailed(#[source] reqwest::Error),
    #[error("server returned transient status {status}")]
    TransientStatus { status: u16 },
    #[error("maximum retries reached after {attempts} attempts: {source}")]
    MaxRetriesReached {
        attempts: u32,
        #[source]
        source: Box<VoyagerError>,
    },
    #[error("response type assertion failed: expected {expected}")]
    ResponseTypeAssertionFailed { expected: &'static str },
    #[error("current user id not found")]
    CurrentUserIdNotFound,
    #[error("realtime client is not connected")]
    NotConnected,
    #[error("realtime client is already connected")]
    AlreadyConnected,
    #[error("realtime connect failed with status {status}")]
    RealtimeConnect { status: u16 },
    #[error("failed to {action} (statusCode={status}): {body}")]
    ActionFailed {
        action: &'static str,
        status: u16,
        body: String,
    },
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for header {name}")]
    InvalidHeader { name: String },
    #[error("media of {size} bytes exceeds the {limit} byte upload limit")]
    MediaTooLarge { size: usize, limit: usize },
    #[error("failed to build http client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("operation cancelled")]
    Cancelled,
}

impl VoyagerError {
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::TokenInvalidated
                | Self::ChallengeRequired
                | Self::ConsentRequired
                | Self::AccountSuspended
        )
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RequestFailed(_) | Self::ResponseReadFailed(_) | Self::TransientStatus { .. }
        )
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::RedirectAttempted { .. })
    }

    /// Unwraps `MaxRetriesReached` down to the last underlying error.
    pub fn root_cause(&self) -> &VoyagerError {
        match self {
            Self::MaxRetriesReached { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
