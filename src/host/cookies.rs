use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::types::HostSessionId;

/// Create the Host session cookie.
///
/// `SameSite=Lax` still sends it on the top-level GET navigation that an
/// attach redirect produces.
pub(super) fn host_session_cookie(
    name: &str,
    session: &HostSessionId,
    ttl: Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), session.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(ttl)
        .build()
}

/// Get the Host session id from cookies.
pub(super) fn host_session(jar: &PrivateCookieJar, name: &str) -> Option<HostSessionId> {
    jar.get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .map(HostSessionId)
}
