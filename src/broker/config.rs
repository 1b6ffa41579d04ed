use axum_extra::extract::cookie::Key;
use time::Duration;
use url::Url;

use crate::error::Error;

/// Shared broker settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct BrokerSettings {
    pub(crate) cookie_key: Key,
    pub(crate) token_ttl: Duration,
    pub(crate) secure_cookies: bool,
    pub(crate) app_url: Option<Url>,
    pub(crate) auth_path: String,
    pub(crate) login_redirect: String,
    pub(crate) logout_redirect: String,
    pub(crate) error_redirect: String,
}

impl BrokerSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            token_ttl: Duration::minutes(60),
            secure_cookies: true,
            app_url: None,
            auth_path: "/sso".into(),
            login_redirect: "/".into(),
            logout_redirect: "/".into(),
            error_redirect: "/login".into(),
        }
    }
}

/// Broker (client application) configuration.
///
/// Host URL, client name and client secret are required; construction fails
/// with [`Error::Config`] when any of them is missing. Everything else has a
/// default and can be overridden with `with_*` methods.
///
/// ```rust,ignore
/// let config = BrokerConfig::new("https://sso.example.com", "app1", "s3cret")?
///     .with_app_url("https://app1.example.com".parse()?);
/// ```
#[derive(Clone)]
pub struct BrokerConfig {
    pub(crate) host_url: Url,
    pub(crate) client_name: String,
    pub(crate) client_secret: String,
    pub(crate) api_prefix: String,
    pub(crate) timeout: std::time::Duration,
    pub(crate) settings: BrokerSettings,
}

impl std::fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("host_url", &self.host_url.as_str())
            .field("client_name", &self.client_name)
            .field("api_prefix", &self.api_prefix)
            .finish_non_exhaustive()
    }
}

impl BrokerConfig {
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any value is empty or `host_url` is not a URL.
    pub fn new(
        host_url: &str,
        client_name: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, Error> {
        let client_name = client_name.into();
        let client_secret = client_secret.into();

        if host_url.trim().is_empty() || client_name.is_empty() || client_secret.is_empty() {
            return Err(Error::Config("Missing configuration values.".into()));
        }

        let host_url: Url = host_url
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("host URL: {e}")))?;

        Ok(Self {
            host_url,
            client_name,
            client_secret,
            api_prefix: "/api/sso".into(),
            timeout: std::time::Duration::from_secs(10),
            settings: BrokerSettings::defaults(),
        })
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `SSO_HOST_URL`: Base URL of the SSO Host
    /// - `SSO_CLIENT_NAME`: Registered client name
    /// - `SSO_CLIENT_SECRET`: Client secret shared with the Host
    ///
    /// # Optional env vars
    /// - `SSO_APP_URL`: Public base URL of this application (for return URLs)
    /// - `SSO_API_PREFIX`: Host route prefix (default `/api/sso`)
    /// - `SSO_HTTP_TIMEOUT_SECS`: Timeout of calls to the Host (default 10)
    /// - `DEV_AUTH`: Set to `"1"` or `"true"` to disable secure cookies
    /// - `COOKIE_KEY`: Cookie encryption key bytes
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required env vars are missing or values are invalid.
    pub fn from_env() -> Result<Self, Error> {
        let host_url = std::env::var("SSO_HOST_URL")
            .map_err(|_| Error::Config("SSO_HOST_URL is required".into()))?;
        let client_name = std::env::var("SSO_CLIENT_NAME")
            .map_err(|_| Error::Config("SSO_CLIENT_NAME is required".into()))?;
        let client_secret = std::env::var("SSO_CLIENT_SECRET")
            .map_err(|_| Error::Config("SSO_CLIENT_SECRET is required".into()))?;

        let mut config = Self::new(&host_url, client_name, client_secret)?;

        if let Ok(url_str) = std::env::var("SSO_APP_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| Error::Config(format!("SSO_APP_URL: {e}")))?;
            config = config.with_app_url(url);
        }
        if let Ok(prefix) = std::env::var("SSO_API_PREFIX") {
            config = config.with_api_prefix(prefix);
        }
        if let Ok(secs) = std::env::var("SSO_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("SSO_HTTP_TIMEOUT_SECS: {e}")))?;
            config = config.with_timeout(std::time::Duration::from_secs(secs));
        }

        let dev_auth = matches!(
            std::env::var("DEV_AUTH").as_deref(),
            Ok("1") | Ok("true"),
        );

        if let Ok(k) = std::env::var("COOKIE_KEY") {
            let key = Key::try_from(k.as_bytes()).map_err(|_| {
                Error::Config(
                    "COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid key."
                        .into(),
                )
            })?;
            config = config.with_cookie_key(key);
        }

        Ok(config.with_secure_cookies(!dev_auth))
    }

    #[must_use]
    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.api_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    /// Timeout of each call to the Host.
    #[must_use]
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    /// Lifetime of the token cookie. Keep it at least as long as the Host's
    /// binding TTL.
    #[must_use]
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.settings.token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    /// Public base URL of this application, used to build return URLs.
    #[must_use]
    pub fn with_app_url(mut self, url: Url) -> Self {
        self.settings.app_url = Some(url);
        self
    }

    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    #[must_use]
    pub fn with_login_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.login_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_logout_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.logout_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_error_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.error_redirect = path.into();
        self
    }

    #[must_use]
    pub fn host_url(&self) -> &Url {
        &self.host_url
    }

    #[must_use]
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    #[must_use]
    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_constructor() {
        let config = BrokerConfig::new("https://sso.example.com", "app1", "secret").unwrap();

        assert_eq!(config.host_url().as_str(), "https://sso.example.com/");
        assert_eq!(config.client_name(), "app1");
        assert_eq!(config.api_prefix(), "/api/sso");
        assert_eq!(config.settings.token_ttl, Duration::minutes(60));
    }

    #[test]
    fn test_config_rejects_missing_values() {
        assert!(matches!(
            BrokerConfig::new("", "app1", "secret"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            BrokerConfig::new("https://sso.example.com", "", "secret"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            BrokerConfig::new("https://sso.example.com", "app1", ""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_config_rejects_invalid_url() {
        assert!(matches!(
            BrokerConfig::new("not a url", "app1", "secret"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = BrokerConfig::new("https://sso.example.com", "app1", "topsecret").unwrap();
        assert!(!format!("{config:?}").contains("topsecret"));
    }
}
