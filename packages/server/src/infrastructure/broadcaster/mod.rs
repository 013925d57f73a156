//! Broadcaster の実装

pub mod in_process;

pub use in_process::InProcessBroadcaster;
