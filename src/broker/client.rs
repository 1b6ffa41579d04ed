use std::fmt;

use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use time::Duration;
use url::Url;

use super::config::BrokerConfig;
use crate::checksum;
use crate::error::Error;
use crate::token;
use crate::types::{DerivedSessionId, Token};

/// Substring of the Host error that means "this token has no binding".
const NO_SESSION_DATA_SENTINEL: &str =
    "There is no saved session data associated with the client session id";
const NOT_AUTHENTICATED_PREFIX: &str = "User not authenticated.";

/// Identity projection returned by the Host.
///
/// Always carries an `id` field; other fields depend on the Host's field mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserInfo(Map<String, JsonValue>);

impl UserInfo {
    /// The user's id as sent by the Host (number or string).
    #[must_use]
    pub fn id(&self) -> &JsonValue {
        self.0.get("id").unwrap_or(&JsonValue::Null)
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.0.get(field)
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, JsonValue> {
        &self.0
    }
}

/// A protocol-level `{"error": ...}` reply from the Host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFailure {
    message: String,
}

/// Coarse classification of Host failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The token has no binding on the Host; the broker must re-attach.
    NoSessionData,
    NotAuthenticated,
    Other,
}

impl HostFailure {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn kind(&self) -> FailureKind {
        if self.message.contains(NO_SESSION_DATA_SENTINEL) {
            FailureKind::NoSessionData
        } else if self.message.starts_with(NOT_AUTHENTICATED_PREFIX) {
            FailureKind::NotAuthenticated
        } else {
            FailureKind::Other
        }
    }

    #[must_use]
    pub fn is_stale_session(&self) -> bool {
        self.kind() == FailureKind::NoSessionData
    }
}

impl fmt::Display for HostFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Classified reply of a signed call.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum HostReply {
    User(UserInfo),
    Success(String),
    Failure(HostFailure),
}

#[derive(Debug, Deserialize)]
struct RawReply {
    error: Option<String>,
    data: Option<JsonValue>,
    success: Option<String>,
}

impl HostReply {
    fn classify(raw: RawReply) -> Result<Self, Error> {
        if let Some(error) = raw.error {
            return Ok(Self::Failure(HostFailure::new(error)));
        }
        match raw.data {
            Some(JsonValue::Object(data)) if data.get("id").is_some_and(|id| !id.is_null()) => {
                return Ok(Self::User(UserInfo(data)));
            }
            Some(other) => {
                return Err(Error::UnexpectedResponse(format!(
                    "user data without id: {other}"
                )));
            }
            None => {}
        }
        raw.success
            .map(Self::Success)
            .ok_or_else(|| Error::UnexpectedResponse("empty reply".into()))
    }
}

/// Settings of the cookie that stores the visitor token.
#[derive(Debug, Clone)]
pub(crate) struct TokenCookie {
    pub(crate) name: String,
    pub(crate) ttl: Duration,
    pub(crate) secure: bool,
}

/// HTTP client for the SSO Host, bound to one registered client.
pub struct BrokerClient {
    host_url: Url,
    api_prefix: String,
    client_name: String,
    client_secret: String,
    pub(crate) token_cookie: TokenCookie,
    http: reqwest::Client,
}

impl fmt::Debug for BrokerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerClient")
            .field("host_url", &self.host_url.as_str())
            .field("client_name", &self.client_name)
            .finish_non_exhaustive()
    }
}

impl BrokerClient {
    /// Create a client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(config: &BrokerConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            host_url: config.host_url.clone(),
            api_prefix: config.api_prefix.clone(),
            client_name: config.client_name.clone(),
            client_secret: config.client_secret.clone(),
            token_cookie: TokenCookie {
                name: token::cookie_name(&config.client_name),
                ttl: config.settings.token_ttl,
                secure: config.settings.secure_cookies,
            },
            http,
        })
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    /// Name of the cookie holding the visitor token.
    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.token_cookie.name
    }

    /// Session id for `token`, recomputed on every call.
    #[must_use]
    pub fn session_id(&self, token: &Token) -> DerivedSessionId {
        checksum::session_id(&self.client_name, token.as_str(), &self.client_secret)
    }

    /// Host attach URL for `token`, returning the browser to `return_url`.
    #[must_use]
    pub fn attach_url(&self, token: &Token, return_url: &str) -> Url {
        let checksum = checksum::attach_checksum(token.as_str(), &self.client_secret);

        let mut url = self.command_url("attach");
        url.query_pairs_mut()
            .append_pair("return_url", return_url)
            .append_pair("client", &self.client_name)
            .append_pair("token", token.as_str())
            .append_pair("checksum", &checksum);
        url
    }

    /// Log a user in at the Host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, [`Error::Host`] on a non-2xx
    /// status, or [`Error::UnexpectedResponse`] if the body is not a protocol reply.
    pub async fn login(
        &self,
        token: &Token,
        username: &str,
        password: &str,
    ) -> Result<HostReply, Error> {
        let params = [("username", username), ("password", password)];
        let request = self.http.post(self.command_url("login")).form(&params);
        self.send(request, token, "login").await
    }

    /// Log the user out at the Host.
    ///
    /// # Errors
    ///
    /// Same as [`login`](Self::login).
    pub async fn logout(&self, token: &Token) -> Result<HostReply, Error> {
        let request = self.http.post(self.command_url("logout"));
        self.send(request, token, "logout").await
    }

    /// Fetch the identity attached to `token`.
    ///
    /// # Errors
    ///
    /// Same as [`login`](Self::login).
    pub async fn user_info(&self, token: &Token) -> Result<HostReply, Error> {
        let request = self.http.get(self.command_url("userInfo"));
        self.send(request, token, "userInfo").await
    }

    fn command_url(&self, command: &str) -> Url {
        let mut url = self.host_url.clone();
        let path = format!(
            "{}{}/{command}",
            url.path().trim_end_matches('/'),
            self.api_prefix
        );
        url.set_path(&path);
        url.set_query(None);
        url
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        token: &Token,
        operation: &'static str,
    ) -> Result<HostReply, Error> {
        let response = request
            .bearer_auth(self.session_id(token))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let response = Self::ensure_success(response, operation).await?;
        let raw = response.json::<RawReply>().await?;
        HostReply::classify(raw)
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(Error::Host {
            operation,
            status,
            detail: body,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn test_client() -> BrokerClient {
        let config = BrokerConfig::new("https://sso.example.com/base/", "My App", "secret").unwrap();
        BrokerClient::new(&config).unwrap()
    }

    fn raw(value: JsonValue) -> RawReply {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_attach_url_contains_parameters() {
        let client = test_client();
        let token = Token::from("T1".to_string());
        let url = client.attach_url(&token, "https://app.example.com/page?x=1");

        assert_eq!(url.path(), "/base/api/sso/attach");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client".into(), "My App".into())));
        assert!(pairs.contains(&("token".into(), "T1".into())));
        assert!(pairs.contains(&(
            "return_url".into(),
            "https://app.example.com/page?x=1".into()
        )));
        assert!(pairs.contains(&("checksum".into(), checksum::attach_checksum("T1", "secret"))));
    }

    #[test]
    fn test_cookie_name_normalized() {
        assert_eq!(test_client().cookie_name(), "sso_token_my_app");
    }

    #[test]
    fn test_classify_user() {
        let reply = HostReply::classify(raw(json!({ "data": { "id": 42 } }))).unwrap();
        let HostReply::User(info) = reply else {
            panic!("expected user");
        };
        assert_eq!(info.id(), &json!(42));
    }

    #[test]
    fn test_classify_error_wins_over_data() {
        let reply =
            HostReply::classify(raw(json!({ "error": "nope", "data": { "id": 1 } }))).unwrap();
        assert_eq!(reply, HostReply::Failure(HostFailure::new("nope")));
    }

    #[test]
    fn test_classify_success_and_malformed() {
        assert_eq!(
            HostReply::classify(raw(json!({ "success": "bye" }))).unwrap(),
            HostReply::Success("bye".into())
        );
        assert!(HostReply::classify(raw(json!({ "data": { "name": "x" } }))).is_err());
        assert!(HostReply::classify(raw(json!({ "data": { "id": null } }))).is_err());
        assert!(HostReply::classify(raw(json!({}))).is_err());
    }

    #[test]
    fn test_failure_kinds() {
        let stale = HostFailure::new(
            "There is no saved session data associated with the client session id.",
        );
        assert!(stale.is_stale_session());
        assert_eq!(
            HostFailure::new("User not authenticated. Session ID: x").kind(),
            FailureKind::NotAuthenticated
        );
        assert_eq!(HostFailure::new("User not found.").kind(), FailureKind::Other);
    }
}
