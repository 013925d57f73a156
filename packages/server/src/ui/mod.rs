//! UI layer: axum HTTP routes and the WebSocket endpoint.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
