//! Snapgate Server - HTTP surface over the lifecycle and delivery crates
//!
//! [`router`] builds the typed axum route table; [`AppState::from_config`]
//! wires production handlers under the configured data directory. The
//! `snapgate` binary adds configuration loading, logging and the CLI.

#![forbid(unsafe_code)]

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

pub use auth::{ClientIdentity, Producer, SESSION_COOKIE};
pub use error::{ApiError, ApiResult, ErrorBody};
pub use routes::{router, COMMENTS_PATH, GATE_PATH};
pub use state::AppState;
