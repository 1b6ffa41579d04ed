use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Broker errors surfaced to the application's HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// No SSO identity on this request.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The SSO Host could not be reached or answered outside the protocol.
    #[error("SSO host unavailable: {0}")]
    Transport(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()).into_response(),
            Self::Transport(_) => {
                tracing::error!(error = %self, "SSO host call failed");
                (StatusCode::BAD_GATEWAY, "SSO host unavailable").into_response()
            }
            Self::Config(_) => {
                tracing::error!(error = %self, "SSO internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

impl From<crate::error::Error> for BrokerError {
    fn from(e: crate::error::Error) -> Self {
        match e {
            crate::error::Error::Config(msg) => Self::Config(msg),
            other => Self::Transport(other.to_string()),
        }
    }
}
