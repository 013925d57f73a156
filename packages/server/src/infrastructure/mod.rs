//! Infrastructure layer: concrete stores, transports and wire formats.

pub mod broadcaster;
pub mod dto;
pub mod push;
pub mod repository;
