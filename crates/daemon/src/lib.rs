//! Keywheel rotation daemon library.
//!
//! Exposes the building blocks (config, engine, scheduler, routes, state,
//! error handling) so integration tests and the binary entrypoint can both
//! access them.

pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod scheduler;
pub mod state;
