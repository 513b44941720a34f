//! Server configuration from the command line and environment variables.
//!
//! The listening port comes from `--port`; everything else from the
//! environment (or a `.env` file via `dotenvy`):
//!
//! | Variable          | Default     | Meaning                               |
//! |-------------------|-------------|---------------------------------------|
//! | `LISTEN_HOST`     | `127.0.0.1` | IP address to bind                    |
//! | `OUTBOUND_BUFFER` | `64`        | Per-connection outbound queue (>= 1)  |
//! | `LOG_FORMAT`      | `text`      | `text` or `json`                      |
//! | `RUST_LOG`        | `info`      | `tracing` filter directives           |

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;

use crate::error::ConfigError;

/// Default listening port.
pub const DEFAULT_PORT: i64 = 8080;
/// Lowest accepted port.
pub const MIN_PORT: i64 = 1024;
/// Default per-connection outbound queue capacity.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(name = "gridwarriors-server", version, about = "Two-player tic-tac-toe WebSocket server")]
pub struct Cli {
    /// Port to listen on (1024-65535).
    #[arg(long, default_value_t = DEFAULT_PORT, allow_negative_numbers = true)]
    pub port: i64,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidValue {
                key: "LOG_FORMAT",
                value: s.to_string(),
            }),
        }
    }
}

/// Validated server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Socket address to bind.
    pub listen_addr: SocketAddr,
    /// Capacity of each connection's outbound queue.
    pub outbound_buffer: usize,
    /// Log output format.
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Loads `.env` if present, then builds the configuration from `cli`
    /// and the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an out-of-range port or an
    /// unparseable environment value.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_source(cli.port, |key| std::env::var(key).ok())
    }

    /// Builds the configuration from a port and a variable lookup.
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::load`].
    pub fn from_source<F>(port: i64, var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = validate_port(port)?;

        let host = match var("LISTEN_HOST") {
            Some(value) => value
                .trim()
                .parse::<IpAddr>()
                .map_err(|source| ConfigError::InvalidHost { value, source })?,
            None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };

        let outbound_buffer = match var("OUTBOUND_BUFFER") {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "OUTBOUND_BUFFER",
                        value,
                    });
                }
            },
            None => DEFAULT_OUTBOUND_BUFFER,
        };

        let log_format = match var("LOG_FORMAT") {
            Some(value) => value.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self {
            listen_addr: SocketAddr::new(host, port),
            outbound_buffer,
            log_format,
        })
    }
}

/// Checks that `port` lies in `[1024, 65535]`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPort`] otherwise.
pub fn validate_port(port: i64) -> Result<u16, ConfigError> {
    u16::try_from(port)
        .ok()
        .filter(|p| i64::from(*p) >= MIN_PORT)
        .ok_or(ConfigError::InvalidPort(port))
}
