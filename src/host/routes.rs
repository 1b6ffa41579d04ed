use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Form, Query, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::routing::{get, post};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;

use super::authority::{AttachRequest, HostAuthority};
use super::cookies;
use super::outcome::Outcome;
use super::state::HostState;
use super::traits::{AuthenticationChecker, ClientRegistry, HostSessions, SessionStore, UserRegistry};
use crate::types::DerivedSessionId;

/// Create the SSO Host router.
///
/// Mounts `GET attach`, `POST login`, `POST logout` and `GET userInfo` under
/// the configured API prefix.
pub fn host_routes<S, H, C, U>(authority: HostAuthority<S, H, C, U>) -> Router
where
    S: SessionStore,
    H: HostSessions,
    C: ClientRegistry,
    U: UserRegistry + AuthenticationChecker,
{
    let prefix = authority.settings.api_prefix.clone();

    let state = HostState {
        authority: Arc::new(authority),
    };

    Router::new()
        .route(&format!("{prefix}/attach"), get(attach::<S, H, C, U>))
        .route(&format!("{prefix}/login"), post(login::<S, H, C, U>))
        .route(&format!("{prefix}/logout"), post(logout::<S, H, C, U>))
        .route(&format!("{prefix}/userInfo"), get(user_info::<S, H, C, U>))
        .with_state(state)
}

/// Derived session id from an `Authorization: Bearer` header.
#[must_use]
pub fn bearer_session_id(headers: &HeaderMap) -> Option<DerivedSessionId> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| DerivedSessionId(v.trim().to_string()))
}

// ── Attach ─────────────────────────────────────────────────────────

async fn attach<S, H, C, U>(
    State(state): State<HostState<S, H, C, U>>,
    jar: PrivateCookieJar,
    params: Result<Query<AttachRequest>, QueryRejection>,
) -> (PrivateCookieJar, Outcome)
where
    S: SessionStore,
    H: HostSessions,
    C: ClientRegistry,
    U: UserRegistry + AuthenticationChecker,
{
    // An unreadable query fails validation like an empty one: a redirect, never a 400.
    let params = params.map(|Query(p)| p).unwrap_or_default();
    let settings = &state.authority.settings;
    let existing = cookies::host_session(&jar, &settings.session_cookie_name);

    let result = state.authority.attach(params, existing.as_ref()).await;

    let jar = match &result.host_session {
        Some(session) => jar.add(cookies::host_session_cookie(
            &settings.session_cookie_name,
            session,
            settings.session_cookie_ttl,
            settings.secure_cookies,
        )),
        None => jar,
    };

    (jar, result.outcome)
}

// ── Login ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct LoginForm {
    username: Option<String>,
    password: Option<String>,
}

async fn login<S, H, C, U>(
    State(state): State<HostState<S, H, C, U>>,
    headers: HeaderMap,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Outcome
where
    S: SessionStore,
    H: HostSessions,
    C: ClientRegistry,
    U: UserRegistry + AuthenticationChecker,
{
    // A missing or unreadable body is reported as missing credentials.
    let form = form.map(|Form(f)| f).unwrap_or_default();
    let bearer = bearer_session_id(&headers);

    state
        .authority
        .login(
            bearer.as_ref(),
            form.username.as_deref(),
            form.password.as_deref(),
        )
        .await
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<S, H, C, U>(
    State(state): State<HostState<S, H, C, U>>,
    headers: HeaderMap,
) -> Outcome
where
    S: SessionStore,
    H: HostSessions,
    C: ClientRegistry,
    U: UserRegistry + AuthenticationChecker,
{
    let bearer = bearer_session_id(&headers);
    state.authority.logout(bearer.as_ref()).await
}

// ── User info ──────────────────────────────────────────────────────

async fn user_info<S, H, C, U>(
    State(state): State<HostState<S, H, C, U>>,
    headers: HeaderMap,
) -> Outcome
where
    S: SessionStore,
    H: HostSessions,
    C: ClientRegistry,
    U: UserRegistry + AuthenticationChecker,
{
    let bearer = bearer_session_id(&headers);
    if state.authority.settings.require_application_auth {
        state.authority.check_user_application_auth(bearer.as_ref()).await
    } else {
        state.authority.user_info(bearer.as_ref()).await
    }
}
