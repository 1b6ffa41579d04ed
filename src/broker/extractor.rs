use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;

use super::client::UserInfo;
use super::error::BrokerError;

/// Identity confirmed by the SSO Host for this request.
///
/// Inserted by [`sso_auto_login`](super::sso_auto_login). Returns
/// `401 Unauthorized` if absent.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected(SsoUser(user): SsoUser) -> impl IntoResponse {
///     format!("Hello, user {}", user.id())
/// }
///
/// // Optional: accessible to both authenticated and anonymous users
/// async fn public(user: Option<SsoUser>) -> impl IntoResponse {
///     match user {
///         Some(SsoUser(u)) => format!("Hello, {}", u.id()),
///         None => "Hello, guest".to_string(),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SsoUser(pub UserInfo);

impl<S: Send + Sync> FromRequestParts<S> for SsoUser {
    type Rejection = BrokerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SsoUser>()
            .cloned()
            .ok_or(BrokerError::Unauthenticated)
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for SsoUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<SsoUser>().cloned())
    }
}
