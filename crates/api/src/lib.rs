//! Document generation API server library.
//!
//! Exposes the core building blocks (config, state, error handling, routes,
//! push-stream infrastructure) so integration tests and the binary
//! entrypoint can both access them.

pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod stream;
