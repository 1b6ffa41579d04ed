use serde_json::{Map, Value as JsonValue};

use super::config::{HostConfig, HostSettings};
use super::error::HostError;
use super::outcome::{JsonOutcome, Outcome, RedirectOutcome};
use super::traits::{
    AuthenticationChecker, ClientRegistry, HostSessions, SessionStore, UserRecord, UserRegistry,
};
use crate::checksum;
use crate::types::{Client, DerivedSessionId, HostSessionId};

const BINDING_KEY_PREFIX: &str = "client_session:";
const LOGOUT_MESSAGE: &str = "User has been successfully logged out.";

/// Parameters of an attach request, as sent by the broker.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[non_exhaustive]
pub struct AttachRequest {
    pub client: Option<String>,
    pub token: Option<String>,
    pub checksum: Option<String>,
    pub return_url: Option<String>,
}

impl AttachRequest {
    #[must_use]
    pub fn new(
        client: impl Into<String>,
        token: impl Into<String>,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            client: Some(client.into()),
            token: Some(token.into()),
            checksum: Some(checksum.into()),
            return_url: None,
        }
    }

    #[must_use]
    pub fn with_return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = Some(url.into());
        self
    }
}

/// Attach result: the redirect plus the Host session the browser now carries.
#[derive(Debug, Clone)]
pub struct AttachOutcome {
    pub outcome: Outcome,
    /// Set on success; the route layer stores it in the Host session cookie.
    pub host_session: Option<HostSessionId>,
}

/// A client session resolved from a bearer id.
struct ClientSession {
    id: DerivedSessionId,
    host_session: HostSessionId,
    client: Client,
}

/// The central SSO authority.
///
/// Holds no per-request state: every operation resolves what it needs from
/// the injected stores and returns an [`Outcome`] for the HTTP layer to write.
pub struct HostAuthority<S, H, C, U> {
    bindings: S,
    sessions: H,
    clients: C,
    users: U,
    pub(crate) settings: HostSettings,
}

impl<S, H, C, U> HostAuthority<S, H, C, U>
where
    S: SessionStore,
    H: HostSessions,
    C: ClientRegistry,
    U: UserRegistry + AuthenticationChecker,
{
    #[must_use]
    pub fn new(config: HostConfig, bindings: S, sessions: H, clients: C, users: U) -> Self {
        Self {
            bindings,
            sessions,
            clients,
            users,
            settings: config.settings,
        }
    }

    /// Attach the browser's Host session to a broker token.
    ///
    /// Always answers with a redirect to `return_url` (or `/`); failures carry
    /// an `sso_error` parameter and create no binding.
    pub async fn attach(
        &self,
        request: AttachRequest,
        host_session: Option<&HostSessionId>,
    ) -> AttachOutcome {
        let return_url = request
            .return_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or("/")
            .to_string();
        let redirect = RedirectOutcome::temporary(return_url);

        match self.try_attach(&request, host_session).await {
            Ok(session) => AttachOutcome {
                outcome: redirect.into(),
                host_session: Some(session),
            },
            Err(e) => {
                log_failure("attach", &e);
                AttachOutcome {
                    outcome: redirect.with_param("sso_error", e.to_string()).into(),
                    host_session: None,
                }
            }
        }
    }

    async fn try_attach(
        &self,
        request: &AttachRequest,
        host_session: Option<&HostSessionId>,
    ) -> Result<HostSessionId, HostError> {
        let client_name = present(request.client.as_deref()).ok_or(HostError::MissingClient)?;
        let token = present(request.token.as_deref()).ok_or(HostError::MissingToken)?;
        let checksum = present(request.checksum.as_deref()).ok_or(HostError::InvalidChecksum)?;
        let client = self.client(client_name).await?;
        let expected = checksum::attach_checksum(token, &client.secret);
        if !checksum::checksums_match(&expected, checksum) {
            return Err(HostError::InvalidChecksum);
        }

        let session = self
            .sessions
            .ensure(host_session)
            .await
            .map_err(HostError::store)?;

        let id = checksum::session_id(client_name, token, &client.secret);
        self.bindings
            .put(&binding_key(&id), session.as_str(), self.settings.binding_ttl)
            .await
            .map_err(HostError::store)?;

        tracing::info!(client = %client_name, "Client session attached");
        Ok(session)
    }

    /// Authenticate a user into the Host session bound to `bearer`.
    pub async fn login(
        &self,
        bearer: Option<&DerivedSessionId>,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Outcome {
        self.try_login(bearer, username, password)
            .await
            .map_or_else(|e| json_failure("login", &e), |data| JsonOutcome::data(data).into())
    }

    async fn try_login(
        &self,
        bearer: Option<&DerivedSessionId>,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<JsonValue, HostError> {
        let session = self.resolve(bearer).await?;

        let (Some(username), Some(password)) = (present(username), present(password)) else {
            return Err(HostError::MissingCredentials);
        };

        let valid = self
            .users
            .check_credentials(username, password)
            .await
            .map_err(HostError::store)?;
        if !valid {
            return Err(HostError::AuthenticationFailed);
        }

        // Stored in the bound session, so later userInfo calls from any
        // attached client read the same identity.
        self.sessions
            .set_user(&session.host_session, Some(username))
            .await
            .map_err(HostError::store)?;

        tracing::info!(client = %session.client.name, "User logged in");

        let user = self.authenticated_user(&session).await?;
        self.project(&user)
    }

    /// Clear the authenticated user from the bound Host session.
    pub async fn logout(&self, bearer: Option<&DerivedSessionId>) -> Outcome {
        let result = async {
            let session = self.resolve(bearer).await?;
            self.sessions
                .set_user(&session.host_session, None)
                .await
                .map_err(HostError::store)?;
            tracing::info!(client = %session.client.name, "User logged out");
            Ok::<_, HostError>(())
        }
        .await;

        match result {
            Ok(()) => JsonOutcome::success(LOGOUT_MESSAGE).into(),
            Err(e) => json_failure("logout", &e),
        }
    }

    /// Projection of the user authenticated in the bound Host session.
    pub async fn user_info(&self, bearer: Option<&DerivedSessionId>) -> Outcome {
        let result = async {
            let session = self.resolve(bearer).await?;
            let user = self.authenticated_user(&session).await?;
            self.project(&user)
        }
        .await;

        result.map_or_else(|e| json_failure("userInfo", &e), |data| JsonOutcome::data(data).into())
    }

    /// [`user_info`](Self::user_info) gated by the client/user allow-list.
    pub async fn check_user_application_auth(&self, bearer: Option<&DerivedSessionId>) -> Outcome {
        let result = async {
            let session = self.resolve(bearer).await?;
            let user = self.authenticated_user(&session).await?;

            let authorized = self
                .clients
                .is_user_authorized(&session.client, &user.user_id())
                .await
                .map_err(HostError::store)?;
            if !authorized {
                return Err(HostError::ApplicationAuthorization);
            }

            self.project(&user)
        }
        .await;

        result.map_or_else(|e| json_failure("userInfo", &e), |data| JsonOutcome::data(data).into())
    }

    /// Host session currently bound to `id`, if the binding is live.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Store`] if the session store fails.
    pub async fn binding(&self, id: &DerivedSessionId) -> Result<Option<HostSessionId>, HostError> {
        self.bindings
            .get(&binding_key(id))
            .await
            .map(|value| value.map(HostSessionId))
            .map_err(HostError::store)
    }

    /// Resume the Host session bound to the bearer id and check the id itself.
    async fn resolve(&self, bearer: Option<&DerivedSessionId>) -> Result<ClientSession, HostError> {
        let id = bearer
            .filter(|id| !id.as_str().is_empty())
            .ok_or(HostError::MissingSessionKey)?;

        let host_session = self.binding(id).await?.ok_or(HostError::NoSessionData)?;

        let parts = checksum::parse_session_id(id.as_str()).ok_or(HostError::InvalidSessionId)?;
        let client = self.client(parts.client_name).await?;
        if !checksum::verify_session_id(id, &client.secret) {
            return Err(HostError::SessionChecksumMismatch);
        }

        Ok(ClientSession {
            id: id.clone(),
            host_session,
            client,
        })
    }

    async fn authenticated_user(&self, session: &ClientSession) -> Result<U::User, HostError> {
        let login = self
            .sessions
            .user(&session.host_session)
            .await
            .map_err(HostError::store)?
            .ok_or_else(|| HostError::NotAuthenticated(session.id.to_string()))?;

        self.users
            .find_user(&login)
            .await
            .map_err(HostError::store)?
            .ok_or(HostError::UserNotFound)
    }

    async fn client(&self, name: &str) -> Result<Client, HostError> {
        self.clients
            .find_client(name)
            .await
            .map_err(HostError::store)?
            .ok_or(HostError::UnknownClient)
    }

    /// Only the configured fields leave the Host.
    fn project(&self, user: &U::User) -> Result<JsonValue, HostError> {
        let record = match serde_json::to_value(user) {
            Ok(JsonValue::Object(record)) => record,
            Ok(_) => return Err(HostError::Store("user record is not a JSON object".into())),
            Err(e) => return Err(HostError::Store(e.to_string())),
        };

        let projected: Map<String, JsonValue> = self
            .settings
            .user_fields
            .iter()
            .map(|(output, field)| {
                let value = record.get(field).cloned().unwrap_or(JsonValue::Null);
                (output.clone(), value)
            })
            .collect();

        Ok(JsonValue::Object(projected))
    }
}

fn binding_key(id: &DerivedSessionId) -> String {
    format!("{BINDING_KEY_PREFIX}{id}")
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn json_failure(operation: &'static str, e: &HostError) -> Outcome {
    log_failure(operation, e);
    JsonOutcome::error(e).into()
}

fn log_failure(operation: &'static str, e: &HostError) {
    match e {
        HostError::Store(detail) => {
            tracing::error!(operation, error = %detail, "SSO store failure");
        }
        _ => tracing::warn!(operation, code = e.code(), error = %e, "SSO request rejected"),
    }
}
