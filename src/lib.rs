#![doc = include_str!("../README.md")]

pub mod checksum;
pub mod error;
pub mod token;
pub mod types;

#[cfg(feature = "broker")]
pub mod broker;
#[cfg(feature = "host")]
pub mod host;

// Re-exports for convenient access
pub use checksum::{attach_checksum, parse_session_id, session_id, verify_session_id};
pub use error::Error;
pub use token::{generate_client_secret, random_alphanumeric};
pub use types::{Client, DerivedSessionId, HostSessionId, Token};
