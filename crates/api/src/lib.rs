//! airwatch control surface and process wiring.
//!
//! Exposes config, state, error handling, the settings bridge and routes so
//! integration tests and the binary entrypoint share them.

pub mod bridge;
pub mod config;
pub mod error;
pub mod handlers;
pub mod reboot;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
