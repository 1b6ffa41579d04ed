use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::token;

/// Per-browser random token, kept by the broker in a cookie.
///
/// Never sent to the Host on its own: it travels either with its attach
/// checksum or embedded in a [`DerivedSessionId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct Token(pub String);

impl Token {
    /// Generate a fresh 40-character alphanumeric token.
    #[must_use]
    pub fn generate() -> Self {
        Self(token::random_alphanumeric(token::TOKEN_LENGTH))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// `SSO-{client}-{token}-{hash}`, computed independently by broker and Host.
///
/// Not a secret by itself; forging one requires the client secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct DerivedSessionId(pub String);

impl DerivedSessionId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of the Host's own browser session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct HostSessionId(pub String);

impl HostSessionId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A registered client application.
///
/// `secret` is the only material shared between a broker and the Host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Client {
    pub id: String,
    pub name: String,
    pub secret: String,
}

impl Client {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            secret: secret.into(),
        }
    }
}
