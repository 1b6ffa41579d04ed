//! SSO Host authority.
//!
//! The Host owns user accounts and the authenticated session. Brokers attach
//! their visitors' tokens to the Host session once, then sign every call with
//! the derived session id.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sso_broker::host::{
//!     HostAuthority, HostConfig, MemoryClientRegistry, MemoryHostSessions,
//!     MemorySessionStore, MemoryUserRegistry, host_routes,
//! };
//!
//! let clients = MemoryClientRegistry::new();
//! let app = clients.register("app1");
//!
//! let users = MemoryUserRegistry::new();
//! users.add_user(42, "Alice", "alice@example.com", "secret")?;
//! clients.authorize(&app, "42");
//!
//! let authority = HostAuthority::new(
//!     HostConfig::from_env()?,
//!     MemorySessionStore::new(),
//!     MemoryHostSessions::new(),
//!     clients,
//!     users,
//! );
//!
//! let router = axum::Router::new().merge(host_routes(authority));
//! ```

mod authority;
mod config;
mod cookies;
mod error;
pub mod memory;
mod outcome;
mod routes;
mod state;
mod traits;

pub use authority::{AttachOutcome, AttachRequest, HostAuthority};
pub use config::HostConfig;
pub use error::{ErrorKind, HostError, NO_SESSION_DATA_MESSAGE};
pub use memory::{
    Clock, ManualClock, MemoryClientRegistry, MemoryHostSessions, MemorySessionStore,
    MemoryUser, MemoryUserRegistry, SystemClock,
};
pub use outcome::{JsonOutcome, Outcome, RedirectOutcome};
pub use routes::{bearer_session_id, host_routes};
pub use traits::{
    AuthenticationChecker, BoxError, ClientRegistry, HostSessions, SessionStore, UserRecord,
    UserRegistry,
};

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
