#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Missing or invalid configuration. Fatal, never retried.
    #[error("Configuration error: {0}")]
    Config(String),
    #[cfg(feature = "broker")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The Host answered outside the JSON protocol (non-2xx without an `error` body).
    #[error("SSO host error during {operation} (status {status}): {detail}")]
    Host {
        operation: &'static str,
        status: u16,
        detail: String,
    },
    #[error("Unexpected response from SSO host: {0}")]
    UnexpectedResponse(String),
    #[error("Password hashing error: {0}")]
    Password(String),
}
