use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::authority::HostAuthority;

/// Shared state for Host route handlers.
pub(super) struct HostState<S, H, C, U> {
    pub(super) authority: Arc<HostAuthority<S, H, C, U>>,
}

// Manual Clone: avoid derive adding `S: Clone, ...` bounds.
impl<S, H, C, U> Clone for HostState<S, H, C, U> {
    fn clone(&self) -> Self {
        Self {
            authority: self.authority.clone(),
        }
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl<S, H, C, U> FromRef<HostState<S, H, C, U>> for Key {
    fn from_ref(state: &HostState<S, H, C, U>) -> Self {
        state.authority.settings.cookie_key.clone()
    }
}
