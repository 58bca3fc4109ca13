use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadCredentials,
    ChallengeRequired,
    ConsentRequired,
    AccountSuspended,
    Redirect,
    Network,
    Protocol,
    Unsupported,
    NotConnected,
    Internal,
}

impl ErrorCode {
    pub fn is_session_fatal(self) -> bool {
        matches!(
            self,
            Self::BadCredentials
                | Self::ChallengeRequired
                | Self::ConsentRequired
                | Self::AccountSuspended
        )
    }
}

#[derive(Debug, Clone, Error)]
#[error("{code:?}: {message}")]
pub struct BridgeError {
    pub code: ErrorCode,
    pub message: String,
}

impl BridgeError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
