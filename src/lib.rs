//! Library entry point for the storefront admin backend.
//!
//! Exports all core modules for use in integration tests and by the main binary.

pub mod auth_middleware;
pub mod db;
pub mod gate;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod services;

pub use auth_middleware::{AdminSession, RouteGate};
pub use gate::{Decision, GateConfig, GateOutcome};
pub use handlers::*;
pub use logging::*;
pub use models::AppState;
