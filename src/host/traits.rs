use std::future::Future;

use serde::Serialize;
use time::Duration;

use crate::types::{Client, HostSessionId};

/// Error type returned by collaborator implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// TTL-bounded mapping from derived session ids to Host session ids.
///
/// `put` and `get` must be atomic per key. No multi-key transactions are needed:
/// a repeated attach for the same token simply overwrites its key.
///
/// # Example
///
/// ```rust,ignore
/// impl SessionStore for RedisBindings {
///     async fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
///         Ok(self.redis.get(key).await?)
///     }
///
///     async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BoxError> {
///         self.redis.set_ex(key, value, ttl.whole_seconds() as u64).await?;
///         Ok(())
///     }
///
///     async fn forget(&self, key: &str) -> Result<(), BoxError> {
///         self.redis.del(key).await?;
///         Ok(())
///     }
/// }
/// ```
pub trait SessionStore: Send + Sync + 'static {
    /// Look up a live entry. Expired entries are reported as `None`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, BoxError>> + Send;

    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    fn put(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Expire an entry immediately.
    fn forget(&self, key: &str) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// The Host's own browser sessions.
///
/// Sessions are identified by opaque [`HostSessionId`]s. The consumer decides
/// the id format and expiry policy.
pub trait HostSessions: Send + Sync + 'static {
    /// Resume `existing` if it is still live, otherwise start a new session.
    fn ensure(
        &self,
        existing: Option<&HostSessionId>,
    ) -> impl Future<Output = Result<HostSessionId, BoxError>> + Send;

    /// Authenticated login identifier stored in the session, if any.
    fn user(
        &self,
        session: &HostSessionId,
    ) -> impl Future<Output = Result<Option<String>, BoxError>> + Send;

    /// Record (`Some`) or clear (`None`) the authenticated login identifier.
    fn set_user(
        &self,
        session: &HostSessionId,
        login: Option<&str>,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// Registered client applications and their per-user allow-list.
pub trait ClientRegistry: Send + Sync + 'static {
    /// Find a client by its public name.
    fn find_client(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Client>, BoxError>> + Send;

    /// Whether `user_id` may use `client`.
    fn is_user_authorized(
        &self,
        client: &Client,
        user_id: &str,
    ) -> impl Future<Output = Result<bool, BoxError>> + Send;
}

/// A user record as stored by the Host.
///
/// Serialized to JSON before the configured field mapping picks the fields that
/// are sent to clients, so sensitive fields should be `#[serde(skip)]`.
pub trait UserRecord: Serialize + Send + Sync {
    /// Key used for the client/user authorization lookup.
    fn user_id(&self) -> String;
}

/// Lookup of user records by login identifier (e-mail).
pub trait UserRegistry: Send + Sync + 'static {
    type User: UserRecord;

    fn find_user(
        &self,
        login: &str,
    ) -> impl Future<Output = Result<Option<Self::User>, BoxError>> + Send;
}

/// Credential verification.
pub trait AuthenticationChecker: Send + Sync + 'static {
    /// `Ok(false)` for unknown users and wrong passwords alike.
    fn check_credentials(
        &self,
        login: &str,
        password: &str,
    ) -> impl Future<Output = Result<bool, BoxError>> + Send;
}
