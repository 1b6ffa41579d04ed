//! SSO broker for client applications.
//!
//! A broker gives each visitor a random token, has the browser attach it to
//! the Host session once, and from then on talks to the Host server-to-server,
//! signing every call with the session id derived from token and client secret.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sso_broker::broker::{BrokerConfig, BrokerState, SsoUser, broker_routes, sso_auto_login};
//!
//! let state = BrokerState::new(BrokerConfig::from_env()?)?;
//!
//! let app = axum::Router::new()
//!     .route("/", get(|SsoUser(user): SsoUser| async move { format!("{}", user.id()) }))
//!     .layer(axum::middleware::from_fn_with_state(state.clone(), sso_auto_login))
//!     .merge(broker_routes(state));
//! ```
//!
//! Lower-level access is available through [`BrokerClient`] (stateless signed
//! calls) and [`BrokerAgent`] (per-request token and cookie handling).

mod agent;
mod client;
mod config;
mod cookies;
mod error;
mod extractor;
mod middleware;
mod routes;
mod state;

pub use agent::{AttachRedirect, BrokerAgent, UserInfoReply, Visit};
pub use client::{BrokerClient, FailureKind, HostFailure, HostReply, UserInfo};
pub use config::BrokerConfig;
pub use error::BrokerError;
pub use extractor::SsoUser;
pub use middleware::sso_auto_login;
pub use routes::broker_routes;
pub use state::BrokerState;

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
