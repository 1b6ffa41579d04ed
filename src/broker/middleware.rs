use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::PrivateCookieJar;

use super::agent::{BrokerAgent, UserInfoReply, Visit};
use super::error::BrokerError;
use super::extractor::SsoUser;
use super::state::BrokerState;

/// Query parameter the Host uses to report a failed attach.
const SSO_ERROR_PARAM: &str = "sso_error";

/// Attach visitors to the SSO Host and resolve their identity.
///
/// Mount with [`axum::middleware::from_fn_with_state`]:
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/", get(home))
///     .layer(axum::middleware::from_fn_with_state(state.clone(), sso_auto_login))
///     .merge(broker_routes(state));
/// ```
///
/// - Visitor without a token: redirected to the Host attach endpoint.
/// - Host confirms a user: [`SsoUser`] is inserted into request extensions.
/// - Host has no binding for the token: the token is dropped and the browser
///   reloads the page, which starts a new attach.
/// - Any other Host refusal: the request continues anonymously.
pub async fn sso_auto_login(
    State(state): State<BrokerState>,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path_and_query = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_string(), |pq| pq.as_str().to_string());

    // The Host sent the browser back with an error; attaching again would loop.
    if let Some(reason) = sso_error(request.uri().query()) {
        tracing::warn!(reason = %reason, "SSO attach failed, continuing anonymously");
        return next.run(request).await;
    }

    let current_url = state.absolute_url(&path_and_query, request.headers());

    let mut agent = match BrokerAgent::start(state.client.clone(), jar, &current_url) {
        Visit::Ready(agent) => agent,
        Visit::Attach(redirect) => return redirect.into_response(),
    };

    match agent.get_user_info().await {
        Ok(UserInfoReply::Authenticated(user)) => {
            request.extensions_mut().insert(SsoUser(user));
            next.run(request).await
        }
        Ok(UserInfoReply::Failed(failure)) if failure.is_stale_session() => {
            tracing::info!(
                session_id = %agent.session_id(),
                "SSO binding expired, re-attaching"
            );
            agent.forget_token();
            (agent.into_jar(), Redirect::to(&path_and_query)).into_response()
        }
        Ok(UserInfoReply::Failed(failure)) => {
            tracing::debug!(reason = %failure, "No SSO user for this visitor");
            next.run(request).await
        }
        Err(e) => {
            tracing::error!(error = %e, "SSO user info request failed");
            BrokerError::from(e).into_response()
        }
    }
}

fn sso_error(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == SSO_ERROR_PARAM)
        .map(|(_, value)| value.into_owned())
}
