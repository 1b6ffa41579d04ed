use axum_extra::extract::cookie::Key;
use time::Duration;

use crate::error::Error;

/// Shared Host settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct HostSettings {
    pub(crate) cookie_key: Key,
    pub(crate) api_prefix: String,
    pub(crate) binding_ttl: Duration,
    pub(crate) session_cookie_name: String,
    pub(crate) session_cookie_ttl: Duration,
    pub(crate) secure_cookies: bool,
    pub(crate) user_fields: Vec<(String, String)>,
    pub(crate) require_application_auth: bool,
}

impl HostSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            api_prefix: "/api/sso".into(),
            binding_ttl: Duration::hours(1),
            session_cookie_name: "sso_host_session".into(),
            session_cookie_ttl: Duration::minutes(120),
            secure_cookies: true,
            user_fields: vec![("id".into(), "id".into())],
            require_application_auth: true,
        }
    }
}

/// SSO Host configuration.
///
/// Every field has a default; override with `with_*` methods or use
/// [`from_env()`](HostConfig::from_env).
///
/// ```rust,ignore
/// let config = HostConfig::new()
///     .with_user_fields([("id", "id"), ("email", "email")])
///     .with_binding_ttl(time::Duration::minutes(30));
/// ```
#[derive(Clone)]
pub struct HostConfig {
    pub(crate) settings: HostSettings,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl HostConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: HostSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `SSO_API_PREFIX`: Route prefix (default `/api/sso`)
    /// - `SSO_BINDING_TTL_SECS`: Lifetime of attached client sessions (default 3600)
    /// - `SSO_USER_FIELDS`: Comma-separated `output=field` pairs (default `id=id`)
    /// - `SSO_REQUIRE_APP_AUTH`: `"0"`/`"false"` disables the per-client allow-list
    /// - `DEV_AUTH`: Set to `"1"` or `"true"` to disable secure cookies
    /// - `COOKIE_KEY`: Cookie encryption key bytes
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is set but malformed.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Self::new();

        if let Ok(prefix) = std::env::var("SSO_API_PREFIX") {
            config = config.with_api_prefix(prefix);
        }
        if let Ok(secs) = std::env::var("SSO_BINDING_TTL_SECS") {
            let secs: i64 = secs
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("SSO_BINDING_TTL_SECS: {e}")))?;
            config = config.with_binding_ttl(Duration::seconds(secs));
        }
        if let Ok(fields) = std::env::var("SSO_USER_FIELDS") {
            config = config.with_user_fields(parse_user_fields(&fields)?);
        }
        if let Ok(flag) = std::env::var("SSO_REQUIRE_APP_AUTH") {
            config = config
                .with_require_application_auth(!matches!(flag.trim(), "0" | "false"));
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
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.settings.api_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    /// Lifetime of the binding created by each attach.
    #[must_use]
    pub fn with_binding_ttl(mut self, ttl: Duration) -> Self {
        self.settings.binding_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_session_cookie_ttl(mut self, ttl: Duration) -> Self {
        self.settings.session_cookie_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    /// Fields sent to clients, as `(output name, record field)` pairs.
    #[must_use]
    pub fn with_user_fields<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.settings.user_fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Whether `GET /userInfo` also requires a client/user authorization entry.
    #[must_use]
    pub fn with_require_application_auth(mut self, required: bool) -> Self {
        self.settings.require_application_auth = required;
        self
    }

    #[must_use]
    pub fn api_prefix(&self) -> &str {
        &self.settings.api_prefix
    }

    #[must_use]
    pub fn binding_ttl(&self) -> Duration {
        self.settings.binding_ttl
    }
}

fn parse_user_fields(raw: &str) -> Result<Vec<(String, String)>, Error> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((out, field)) if !out.trim().is_empty() && !field.trim().is_empty() => {
                Ok((out.trim().to_string(), field.trim().to_string()))
            }
            None => Ok((pair.to_string(), pair.to_string())),
            Some(_) => Err(Error::Config(format!("SSO_USER_FIELDS: invalid entry `{pair}`"))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HostConfig::new();
        assert_eq!(config.api_prefix(), "/api/sso");
        assert_eq!(config.binding_ttl(), Duration::hours(1));
        assert_eq!(config.settings.user_fields, vec![("id".to_string(), "id".to_string())]);
        assert!(config.settings.require_application_auth);
    }

    #[test]
    fn api_prefix_trailing_slash_trimmed() {
        let config = HostConfig::new().with_api_prefix("/sso/");
        assert_eq!(config.api_prefix(), "/sso");
    }

    #[test]
    fn parse_user_fields_pairs() {
        let fields = parse_user_fields("id=id, mail = email,name").unwrap();
        assert_eq!(
            fields,
            vec![
                ("id".to_string(), "id".to_string()),
                ("mail".to_string(), "email".to_string()),
                ("name".to_string(), "name".to_string()),
            ]
        );
    }

    #[test]
    fn parse_user_fields_rejects_empty_side() {
        assert!(parse_user_fields("id=").is_err());
        assert!(parse_user_fields("=id").is_err());
    }
}
