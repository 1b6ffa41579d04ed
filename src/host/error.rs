use axum::http::StatusCode;

/// Exact text the broker recognizes to drop its token and re-attach.
pub const NO_SESSION_DATA_MESSAGE: &str =
    "There is no saved session data associated with the client session id.";

/// Failures of a Host operation.
///
/// The `Display` text of each protocol variant is sent to clients verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum HostError {
    #[error("No client id specified.")]
    MissingClient,

    #[error("No token specified.")]
    MissingToken,

    #[error("Invalid checksum.")]
    InvalidChecksum,

    #[error("Provided client does not exist.")]
    UnknownClient,

    #[error("Missing session key from client.")]
    MissingSessionKey,

    #[error("{}", NO_SESSION_DATA_MESSAGE)]
    NoSessionData,

    #[error("Invalid session id")]
    InvalidSessionId,

    #[error("Checksum failed: Client IP address may have changed")]
    SessionChecksumMismatch,

    #[error("No username and/or password provided.")]
    MissingCredentials,

    #[error("User authentication failed.")]
    AuthenticationFailed,

    #[error("User not authenticated. Session ID: {0}")]
    NotAuthenticated(String),

    #[error("User not found.")]
    UserNotFound,

    #[error("User authorization failed with application.")]
    ApplicationAuthorization,

    /// A collaborator (store or registry) failed. Details are logged, not sent.
    #[error("Internal error")]
    Store(String),
}

/// Error taxonomy used for logging and status selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ProtocolValidation,
    SessionResolution,
    Authentication,
    Authorization,
    Internal,
}

impl HostError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingClient | Self::MissingToken | Self::InvalidChecksum | Self::UnknownClient => {
                ErrorKind::ProtocolValidation
            }
            Self::MissingSessionKey
            | Self::NoSessionData
            | Self::InvalidSessionId
            | Self::SessionChecksumMismatch => ErrorKind::SessionResolution,
            Self::MissingCredentials
            | Self::AuthenticationFailed
            | Self::NotAuthenticated(_)
            | Self::UserNotFound => ErrorKind::Authentication,
            Self::ApplicationAuthorization => ErrorKind::Authorization,
            Self::Store(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingClient => "missing_client",
            Self::MissingToken => "missing_token",
            Self::InvalidChecksum => "invalid_checksum",
            Self::UnknownClient => "unknown_client",
            Self::MissingSessionKey => "missing_session_key",
            Self::NoSessionData => "no_session_data",
            Self::InvalidSessionId => "invalid_session_id",
            Self::SessionChecksumMismatch => "session_checksum_mismatch",
            Self::MissingCredentials => "missing_credentials",
            Self::AuthenticationFailed => "authentication_failed",
            Self::NotAuthenticated(_) => "not_authenticated",
            Self::UserNotFound => "user_not_found",
            Self::ApplicationAuthorization => "application_authorization",
            Self::Store(_) => "internal",
        }
    }

    /// Protocol errors travel inside a 200 response; only internal failures
    /// change the transport status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::OK,
        }
    }

    pub(crate) fn store(e: super::traits::BoxError) -> Self {
        Self::Store(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_text_is_stable() {
        assert_eq!(
            HostError::NoSessionData.to_string(),
            "There is no saved session data associated with the client session id."
        );
        assert_eq!(HostError::NoSessionData.code(), "no_session_data");
    }

    #[test]
    fn protocol_errors_use_ok_status() {
        assert_eq!(HostError::AuthenticationFailed.status(), StatusCode::OK);
        assert_eq!(HostError::InvalidChecksum.status(), StatusCode::OK);
        assert_eq!(
            HostError::Store("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_errors_hide_details() {
        assert_eq!(HostError::Store("connection refused".into()).to_string(), "Internal error");
    }

    #[test]
    fn kinds() {
        assert_eq!(HostError::MissingToken.kind(), ErrorKind::ProtocolValidation);
        assert_eq!(HostError::NoSessionData.kind(), ErrorKind::SessionResolution);
        assert_eq!(HostError::AuthenticationFailed.kind(), ErrorKind::Authentication);
        assert_eq!(HostError::ApplicationAuthorization.kind(), ErrorKind::Authorization);
    }
}
