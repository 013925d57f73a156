//! Server configuration.
//!
//! Every flag can also be given through a `NOUNOU_*` environment variable.
//! `Args` is what clap parses; `ServerConfig` is the validated form the server runs with.

use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::domain::value_object::DEFAULT_MAX_BODY_LENGTH;

#[derive(Parser, Debug, Clone)]
#[command(name = "nounou-server")]
#[command(about = "Real-time conversation, presence and negotiation server", long_about = None)]
pub struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "NOUNOU_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "NOUNOU_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Seconds between WebSocket pings and presence sweeps
    #[arg(long, env = "NOUNOU_HEARTBEAT_INTERVAL_SECS", default_value_t = 25)]
    pub heartbeat_interval_secs: u64,

    /// Seconds of silence after which a connection is dropped
    #[arg(long, env = "NOUNOU_HEARTBEAT_TIMEOUT_SECS", default_value_t = 60)]
    pub heartbeat_timeout_secs: u64,

    /// Maximum message length in characters
    #[arg(long, env = "NOUNOU_MAX_MESSAGE_LENGTH", default_value_t = DEFAULT_MAX_BODY_LENGTH)]
    pub max_message_length: usize,

    /// Publish attempts per event before giving up
    #[arg(long, env = "NOUNOU_BROADCAST_ATTEMPTS", default_value_t = 3)]
    pub broadcast_attempts: u32,

    /// Webhook receiving push notifications for offline users (logged only when unset)
    #[arg(long, env = "NOUNOU_PUSH_WEBHOOK_URL")]
    pub push_webhook_url: Option<String>,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "NOUNOU_LOG_LEVEL", default_value = "debug")]
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("heartbeat interval must be at least one second")]
    ZeroHeartbeatInterval,
    #[error("heartbeat timeout ({timeout}s) must be longer than the interval ({interval}s)")]
    TimeoutNotAfterInterval { interval: u64, timeout: u64 },
    #[error("broadcast attempts must be at least 1")]
    ZeroBroadcastAttempts,
    #[error("maximum message length must be at least 1")]
    ZeroMessageLength,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub heartbeat_interval: Duration,
    pub heartbeat_timeout: Duration,
    pub max_message_length: usize,
    pub broadcast_attempts: u32,
    pub push_webhook_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            heartbeat_interval: Duration::from_secs(25),
            heartbeat_timeout: Duration::from_secs(60),
            max_message_length: DEFAULT_MAX_BODY_LENGTH,
            broadcast_attempts: 3,
            push_webhook_url: None,
        }
    }
}

impl TryFrom<Args> for ServerConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if args.heartbeat_interval_secs == 0 {
            return Err(ConfigError::ZeroHeartbeatInterval);
        }
        if args.heartbeat_timeout_secs <= args.heartbeat_interval_secs {
            return Err(ConfigError::TimeoutNotAfterInterval {
                interval: args.heartbeat_interval_secs,
                timeout: args.heartbeat_timeout_secs,
            });
        }
        if args.broadcast_attempts == 0 {
            return Err(ConfigError::ZeroBroadcastAttempts);
        }
        if args.max_message_length == 0 {
            return Err(ConfigError::ZeroMessageLength);
        }

        Ok(Self {
            host: args.host,
            port: args.port,
            heartbeat_interval: Duration::from_secs(args.heartbeat_interval_secs),
            heartbeat_timeout: Duration::from_secs(args.heartbeat_timeout_secs),
            max_message_length: args.max_message_length,
            broadcast_attempts: args.broadcast_attempts,
            push_webhook_url: args.push_webhook_url.filter(|url| !url.trim().is_empty()),
        })
    }
}
