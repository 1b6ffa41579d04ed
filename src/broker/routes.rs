use axum::Router;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::post;
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;

use super::agent::{BrokerAgent, Visit};
use super::error::BrokerError;
use super::state::BrokerState;

/// Create the broker login/logout router.
///
/// Mounts `POST login` and `POST logout` under the configured auth path.
/// Both forward to the SSO Host and answer with a redirect.
pub fn broker_routes(state: BrokerState) -> Router {
    let auth_path = state.settings.auth_path.clone();

    Router::new()
        .route(&format!("{auth_path}/login"), post(login))
        .route(&format!("{auth_path}/logout"), post(logout))
        .with_state(state)
}

// ── Login ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn login(
    State(state): State<BrokerState>,
    jar: PrivateCookieJar,
    headers: HeaderMap,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Response, BrokerError> {
    let form = form.map(|Form(f)| f).unwrap_or_default();
    let settings = &state.settings;

    // No token yet: attach first and let the user submit again.
    let return_url = state.absolute_url(&settings.error_redirect, &headers);
    let mut agent = match BrokerAgent::start(state.client.clone(), jar, &return_url) {
        Visit::Ready(agent) => agent,
        Visit::Attach(redirect) => return Ok(redirect.see_other().into_response()),
    };

    if agent.login(&form.username, &form.password).await? {
        return Ok((agent.into_jar(), Redirect::to(&settings.login_redirect)).into_response());
    }

    let message = agent
        .last_failure()
        .map(|f| f.message().to_string())
        .unwrap_or_default();
    if agent.last_failure().is_some_and(|f| f.is_stale_session()) {
        agent.forget_token();
    }

    let location = format!(
        "{}?error={}",
        settings.error_redirect,
        urlencoding::encode(&message)
    );
    Ok((agent.into_jar(), Redirect::to(&location)).into_response())
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout(
    State(state): State<BrokerState>,
    jar: PrivateCookieJar,
) -> Response {
    let redirect = Redirect::to(&state.settings.logout_redirect);

    let mut agent = match BrokerAgent::start(state.client.clone(), jar, "") {
        Visit::Ready(agent) => agent,
        // Nothing attached, nothing to log out. Drop the fresh token again.
        Visit::Attach(_) => return redirect.into_response(),
    };

    // The token cookie is removed even when the Host call fails.
    let result = agent.logout().await;
    let jar = agent.into_jar();
    match result {
        Ok(()) => (jar, redirect).into_response(),
        Err(e) => (jar, BrokerError::from(e)).into_response(),
    }
}
