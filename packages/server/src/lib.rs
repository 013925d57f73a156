//! Nounou messaging core.
//!
//! Private conversation channels, a presence channel for online users and an
//! in-chat counter-offer negotiation between a parent and a babysitter.
//!
//! Layers follow the usual split: `domain` (entities, state machine, ports),
//! `usecase` (the five core components), `infrastructure` (in-memory store,
//! in-process broadcaster, push sinks, DTOs) and `ui` (axum routes).

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
