use shared::error::{BridgeError, ErrorCode};
use voyager_client::VoyagerError;

pub type BridgeResult<T> = Result<T, BridgeError>;

pub fn error_code(err: &VoyagerError) -> ErrorCode {
    match err.root_cause() {
        VoyagerError::TokenInvalidated => ErrorCode::BadCredentials,
        VoyagerError::ChallengeRequired => ErrorCode::ChallengeRequired,
        VoyagerError::ConsentRequired => ErrorCode::ConsentRequired,
        VoyagerError::AccountSuspended => ErrorCode::AccountSuspended,
        VoyagerError::RedirectAttempted { .. } => ErrorCode::Redirect,
        VoyagerError::RequestFailed(_)
        | VoyagerError::ResponseReadFailed(_)
        | VoyagerError::TransientStatus { .. }
        | VoyagerError::MaxRetriesReached { .. }
        | VoyagerError::RealtimeConnect { .. }
        | VoyagerError::Cancelled => ErrorCode::Network,
        VoyagerError::ResponseTypeAssertionFailed { .. }
        | VoyagerError::CurrentUserIdNotFound
        | VoyagerError::ActionFailed { .. }
        | VoyagerError::Decode { .. } => ErrorCode::Protocol,
        VoyagerError::NotConnected => ErrorCode::NotConnected,
        VoyagerError::MediaTooLarge { .. } => ErrorCode::Unsupported,
        VoyagerError::AlreadyConnected
        | VoyagerError::Encode { .. }
        | VoyagerError::InvalidHeader { .. }
        | VoyagerError::ClientBuild(_) => ErrorCode::Internal,
    }
}

pub fn bridge_error(err: VoyagerError) -> BridgeError {
    BridgeError::new(error_code(&err), err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_failures_are_fatal_codes() {
        assert_eq!(
            error_code(&VoyagerError::TokenInvalidated),
            ErrorCode::BadCredentials
        );
        assert!(bridge_error(VoyagerError::ConsentRequired)
            .code
            .is_session_fatal());
    }

    #[test]
    fn retry_exhaustion_is_a_network_error() {
        let err = VoyagerError::MaxRetriesReached {
            attempts: 6,
            source: Box::new(VoyagerError::TransientStatus { status: 503 }),
        };
        let mapped = bridge_error(err);
        assert_eq!(mapped.code, ErrorCode::Network);
        assert!(mapped.message.contains("503"));
    }

    #[test]
    fn action_failures_are_protocol_errors() {
        let err = VoyagerError::ActionFailed {
            action: "send message",
            status: 400,
            body: "bad".into(),
        };
        assert_eq!(error_code(&err), ErrorCode::Protocol);
        assert_eq!(
            error_code(&VoyagerError::RedirectAttempted { location: None }),
            ErrorCode::Redirect
        );
    }
}
