//! HTTP server: the actix-web app factory, routes, and shared state.

pub mod builder;
pub mod errors;
pub mod routes;
pub mod state;

pub use builder::run_server;
pub use state::AppState;
