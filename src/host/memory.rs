//! In-memory collaborators.
//!
//! Suitable for tests, demos and single-process Hosts. Every store is safe to
//! share between concurrent requests; locks are never held across `.await`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use ulid::Ulid;

use super::traits::{
    AuthenticationChecker, BoxError, ClientRegistry, HostSessions, SessionStore, UserRecord,
    UserRegistry,
};
use crate::error::Error;
use crate::token;
use crate::types::{Client, HostSessionId};

/// Source of the current time for expiry decisions.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> OffsetDateTime;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<OffsetDateTime>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(OffsetDateTime::now_utc())
    }
}

impl ManualClock {
    #[must_use]
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock()
    }
}

// ── Session bindings ───────────────────────────────────────────────

struct Expiring<T> {
    value: T,
    expires_at: OffsetDateTime,
}

/// TTL map implementing [`SessionStore`].
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, Expiring<String>>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    #[must_use]
    pub fn with_clock(clock: impl Clock) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock: Arc::new(clock),
        }
    }

    /// Number of stored entries. Expired entries count until the next write
    /// or a read of their key.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BoxError> {
        let now = self.clock.now();
        let expires_at = now + ttl;
        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            Expiring {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn forget(&self, key: &str) -> Result<(), BoxError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

// ── Host sessions ──────────────────────────────────────────────────

/// Host browser sessions with a sliding lifetime.
pub struct MemoryHostSessions {
    sessions: RwLock<HashMap<String, Expiring<Option<String>>>>,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryHostSessions {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHostSessions {
    /// Sessions idle for 120 minutes expire.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    #[must_use]
    pub fn with_clock(clock: impl Clock) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            lifetime: Duration::minutes(120),
            clock: Arc::new(clock),
        }
    }

    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Number of stored sessions. Expired sessions count until the next
    /// `ensure` or a read of their id.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl HostSessions for MemoryHostSessions {
    async fn ensure(&self, existing: Option<&HostSessionId>) -> Result<HostSessionId, BoxError> {
        let now = self.clock.now();
        let expires_at = now + self.lifetime;
        let mut sessions = self.sessions.write();
        sessions.retain(|_, entry| entry.expires_at > now);

        if let Some(id) = existing {
            if let Some(entry) = sessions.get_mut(id.as_str()).filter(|e| e.expires_at > now) {
                entry.expires_at = expires_at;
                return Ok(id.clone());
            }
        }

        let id = Ulid::new().to_string();
        sessions.insert(
            id.clone(),
            Expiring {
                value: None,
                expires_at,
            },
        );
        Ok(HostSessionId(id))
    }

    async fn user(&self, session: &HostSessionId) -> Result<Option<String>, BoxError> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write();
        match sessions.get_mut(session.as_str()) {
            Some(entry) if entry.expires_at > now => {
                entry.expires_at = now + self.lifetime;
                Ok(entry.value.clone())
            }
            Some(_) => {
                sessions.remove(session.as_str());
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_user(&self, session: &HostSessionId, login: Option<&str>) -> Result<(), BoxError> {
        let now = self.clock.now();
        // An expired id bound by an attach comes back to life with fresh data.
        self.sessions.write().insert(
            session.as_str().to_string(),
            Expiring {
                value: login.map(str::to_string),
                expires_at: now + self.lifetime,
            },
        );
        Ok(())
    }
}

// ── Clients ────────────────────────────────────────────────────────

/// Client records and the client/user allow-list.
#[derive(Default)]
pub struct MemoryClientRegistry {
    clients: RwLock<HashMap<String, Client>>,
    grants: RwLock<HashSet<(String, String)>>,
}

impl MemoryClientRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under `name` with a freshly generated secret.
    /// Replaces any client with the same name.
    pub fn register(&self, name: impl Into<String>) -> Client {
        let client = Client::new(
            Ulid::new().to_string(),
            name,
            token::generate_client_secret(),
        );
        self.insert(client.clone());
        client
    }

    pub fn insert(&self, client: Client) {
        self.clients.write().insert(client.name.clone(), client);
    }

    /// Delete a client and its grants.
    pub fn remove(&self, name: &str) -> Option<Client> {
        let removed = self.clients.write().remove(name)?;
        self.grants.write().retain(|(client_id, _)| client_id != &removed.id);
        Some(removed)
    }

    /// All clients, ordered by name.
    #[must_use]
    pub fn clients(&self) -> Vec<Client> {
        let mut clients: Vec<Client> = self.clients.read().values().cloned().collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        clients
    }

    /// Allow `user_id` to use `client`.
    pub fn authorize(&self, client: &Client, user_id: impl Into<String>) {
        self.grants.write().insert((client.id.clone(), user_id.into()));
    }

    pub fn revoke(&self, client: &Client, user_id: &str) {
        self.grants
            .write()
            .remove(&(client.id.clone(), user_id.to_string()));
    }
}

impl ClientRegistry for MemoryClientRegistry {
    async fn find_client(&self, name: &str) -> Result<Option<Client>, BoxError> {
        Ok(self.clients.read().get(name).cloned())
    }

    async fn is_user_authorized(&self, client: &Client, user_id: &str) -> Result<bool, BoxError> {
        Ok(self
            .grants
            .read()
            .contains(&(client.id.clone(), user_id.to_string())))
    }
}

// ── Users ──────────────────────────────────────────────────────────

/// User record kept by [`MemoryUserRegistry`].
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct MemoryUser {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    password_hash: String,
}

impl UserRecord for MemoryUser {
    fn user_id(&self) -> String {
        self.id.to_string()
    }
}

/// Users keyed by e-mail with Argon2 password hashes.
#[derive(Default)]
pub struct MemoryUserRegistry {
    users: RwLock<HashMap<String, MemoryUser>>,
}

impl MemoryUserRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Password`] if hashing fails.
    pub fn add_user(
        &self,
        id: u64,
        name: impl Into<String>,
        email: impl Into<String>,
        password: &str,
    ) -> Result<(), Error> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Password(e.to_string()))?
            .to_string();

        let user = MemoryUser {
            id,
            name: name.into(),
            email: email.into(),
            password_hash,
        };
        self.users.write().insert(user.email.clone(), user);
        Ok(())
    }
}

impl UserRegistry for MemoryUserRegistry {
    type User = MemoryUser;

    async fn find_user(&self, login: &str) -> Result<Option<MemoryUser>, BoxError> {
        Ok(self.users.read().get(login).cloned())
    }
}

impl AuthenticationChecker for MemoryUserRegistry {
    async fn check_credentials(&self, login: &str, password: &str) -> Result<bool, BoxError> {
        let Some(hash) = self.users.read().get(login).map(|u| u.password_hash.clone()) else {
            return Ok(false);
        };
        let parsed = PasswordHash::new(&hash).map_err(|e| e.to_string())?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}
