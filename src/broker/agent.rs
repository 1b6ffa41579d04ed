use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::PrivateCookieJar;
use url::Url;

use super::client::{BrokerClient, HostFailure, HostReply, UserInfo};
use super::cookies;
use crate::error::Error;
use crate::types::{DerivedSessionId, Token};

/// What to do with the current request once the visitor token is known.
#[derive(Debug)]
pub enum Visit {
    /// The visitor already has a token; calls to the Host can be made.
    Ready(BrokerAgent),
    /// Fresh visitor: the request ends with this redirect to the Host.
    Attach(AttachRedirect),
}

/// Redirect to the Host attach endpoint, carrying the updated cookie jar.
pub struct AttachRedirect {
    jar: PrivateCookieJar,
    location: Url,
    status: StatusCode,
}

impl fmt::Debug for AttachRedirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachRedirect")
            .field("location", &self.location.as_str())
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl AttachRedirect {
    #[must_use]
    pub fn location(&self) -> &Url {
        &self.location
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Use `303 See Other`, for redirects issued in response to a POST that
    /// must reach the Host as a GET.
    #[must_use]
    pub fn see_other(mut self) -> Self {
        self.status = StatusCode::SEE_OTHER;
        self
    }
}

impl IntoResponse for AttachRedirect {
    fn into_response(self) -> Response {
        (self.status, self.jar, [(LOCATION, self.location.to_string())]).into_response()
    }
}

/// Outcome of [`BrokerAgent::get_user_info`].
#[derive(Debug, Clone, PartialEq)]
pub enum UserInfoReply {
    Authenticated(UserInfo),
    Failed(HostFailure),
}

/// Per-request broker agent.
///
/// Owns the visitor token and the cookie jar of the current request. Dropped at
/// the end of the request, together with its user info cache.
pub struct BrokerAgent {
    client: Arc<BrokerClient>,
    jar: PrivateCookieJar,
    token: Token,
    user_info: Option<UserInfo>,
    last_failure: Option<HostFailure>,
}

impl fmt::Debug for BrokerAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerAgent")
            .field("client", &self.client.client_name())
            .field("user_info", &self.user_info)
            .finish_non_exhaustive()
    }
}

impl BrokerAgent {
    /// Read the visitor token from `jar`.
    ///
    /// A visitor without a token gets a new one, stored in the jar, and the
    /// request must end with the returned attach redirect back to `current_url`.
    #[must_use]
    pub fn start(client: Arc<BrokerClient>, jar: PrivateCookieJar, current_url: &str) -> Visit {
        if let Some(token) = cookies::get_token(&jar, client.cookie_name()) {
            return Visit::Ready(Self {
                client,
                jar,
                token,
                user_info: None,
                last_failure: None,
            });
        }

        let token = Token::generate();
        let jar = jar.add(cookies::token_cookie(&client.token_cookie, &token));

        tracing::debug!(client = %client.client_name(), "New visitor token, attaching");

        Visit::Attach(
            Self {
                client,
                jar,
                token,
                user_info: None,
                last_failure: None,
            }
            .attach(current_url),
        )
    }

    /// Send the browser to the Host to attach this token.
    ///
    /// Consumes the agent: the current request ends with the redirect.
    #[must_use]
    pub fn attach(self, return_url: &str) -> AttachRedirect {
        AttachRedirect {
            location: self.client.attach_url(&self.token, return_url),
            jar: self.jar,
            status: StatusCode::TEMPORARY_REDIRECT,
        }
    }

    #[must_use]
    pub fn token(&self) -> &Token {
        &self.token
    }

    #[must_use]
    pub fn session_id(&self) -> DerivedSessionId {
        self.client.session_id(&self.token)
    }

    /// Failure reported by the last `login`, `logout` or `get_user_info` call.
    #[must_use]
    pub fn last_failure(&self) -> Option<&HostFailure> {
        self.last_failure.as_ref()
    }

    /// Log in at the Host. `Ok(false)` means the Host refused; see
    /// [`last_failure`](Self::last_failure).
    ///
    /// # Errors
    ///
    /// Propagates transport and non-protocol Host errors.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<bool, Error> {
        let reply = self.client.login(&self.token, username, password).await?;

        match reply {
            HostReply::User(info) => {
                tracing::info!(client = %self.client.client_name(), "SSO login succeeded");
                self.user_info = Some(info);
                self.last_failure = None;
                Ok(true)
            }
            HostReply::Failure(failure) => {
                tracing::warn!(reason = %failure, "SSO login refused");
                self.user_info = None;
                self.last_failure = Some(failure);
                Ok(false)
            }
            HostReply::Success(message) => Err(Error::UnexpectedResponse(message)),
        }
    }

    /// Log out at the Host and drop the visitor token.
    ///
    /// # Errors
    ///
    /// Propagates transport and non-protocol Host errors; the token cookie is
    /// removed in every case.
    pub async fn logout(&mut self) -> Result<(), Error> {
        let reply = self.client.logout(&self.token).await;
        self.user_info = None;
        self.forget_token();

        match reply? {
            HostReply::Failure(failure) => {
                tracing::warn!(reason = %failure, "SSO logout refused");
                self.last_failure = Some(failure);
            }
            _ => self.last_failure = None,
        }
        Ok(())
    }

    /// Identity attached to this token, cached for the agent's lifetime once
    /// the Host confirms it.
    ///
    /// # Errors
    ///
    /// Propagates transport and non-protocol Host errors.
    pub async fn get_user_info(&mut self) -> Result<UserInfoReply, Error> {
        if let Some(info) = &self.user_info {
            return Ok(UserInfoReply::Authenticated(info.clone()));
        }

        match self.client.user_info(&self.token).await? {
            HostReply::User(info) => {
                self.user_info = Some(info.clone());
                self.last_failure = None;
                Ok(UserInfoReply::Authenticated(info))
            }
            HostReply::Failure(failure) => {
                self.last_failure = Some(failure.clone());
                Ok(UserInfoReply::Failed(failure))
            }
            HostReply::Success(message) => Err(Error::UnexpectedResponse(message)),
        }
    }

    /// Remove the token cookie so the next request starts a new attach.
    pub fn forget_token(&mut self) {
        self.jar = self
            .jar
            .clone()
            .remove(cookies::clear_token_cookie(self.client.cookie_name()));
    }

    /// The cookie jar to send back with the response.
    #[must_use]
    pub fn into_jar(self) -> PrivateCookieJar {
        self.jar
    }
}
