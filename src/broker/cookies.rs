use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use super::client::TokenCookie;
use crate::types::Token;

/// Create the visitor token cookie.
pub(super) fn token_cookie(settings: &TokenCookie, token: &Token) -> Cookie<'static> {
    Cookie::build((settings.name.clone(), token.to_string()))
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(settings.ttl)
        .build()
}

/// Create removal cookie for the visitor token.
pub(super) fn clear_token_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// Get the visitor token from cookies.
pub(super) fn get_token(jar: &PrivateCookieJar, name: &str) -> Option<Token> {
    jar.get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .map(Token)
}
