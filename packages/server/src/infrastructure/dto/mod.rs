//! Data Transfer Objects (DTOs) for the messaging core.
//!
//! DTOs are organized by protocol:
//! - `websocket`: frames pushed to / received from WebSocket clients
//! - `http`: HTTP API request and response bodies

pub mod conversion;
pub mod http;
pub mod websocket;
