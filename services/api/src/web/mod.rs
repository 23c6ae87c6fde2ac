pub mod auth;
pub mod markers;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod settings;
pub mod state;
pub mod ws_handler;

// Re-export the handlers the binary wires up outside the REST modules.
pub use middleware::require_admin;
pub use ws_handler::ws_handler;
