use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::HeaderMap;
use axum::http::header::HOST;
use axum_extra::extract::cookie::Key;

use super::client::BrokerClient;
use super::config::{BrokerConfig, BrokerSettings};
use crate::error::Error;

/// Shared state for the broker middleware and routes.
#[derive(Clone)]
pub struct BrokerState {
    pub(super) client: Arc<BrokerClient>,
    pub(super) settings: BrokerSettings,
}

impl BrokerState {
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(config: BrokerConfig) -> Result<Self, Error> {
        let client = BrokerClient::new(&config)?;
        Ok(Self::with_client(config, client))
    }

    /// Use a preconfigured [`BrokerClient`].
    #[must_use]
    pub fn with_client(config: BrokerConfig, client: BrokerClient) -> Self {
        Self {
            client: Arc::new(client),
            settings: config.settings,
        }
    }

    #[must_use]
    pub fn client(&self) -> &Arc<BrokerClient> {
        &self.client
    }

    /// Absolute URL of `path_and_query` on this application, used as the
    /// Host's return URL.
    pub(super) fn absolute_url(&self, path_and_query: &str, headers: &HeaderMap) -> String {
        if let Some(base) = &self.settings.app_url {
            return format!("{}{path_and_query}", base.as_str().trim_end_matches('/'));
        }

        let scheme = if self.settings.secure_cookies { "https" } else { "http" };
        match headers.get(HOST).and_then(|v| v.to_str().ok()) {
            Some(host) => format!("{scheme}://{host}{path_and_query}"),
            None => path_and_query.to_string(),
        }
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl FromRef<BrokerState> for Key {
    fn from_ref(state: &BrokerState) -> Self {
        state.settings.cookie_key.clone()
    }
}
