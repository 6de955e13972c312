//! Command-line arguments.

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use tether_app::AppConfig;
use tether_core::{Backoff, ConfigError, SupervisorConfig};

/// Interactive terminal client for agent servers
#[derive(Parser, Debug, Clone)]
#[command(name = "tether")]
#[command(about = "Interactive terminal client for agent servers with automatic reconnection")]
#[command(version)]
pub struct Args {
    /// Server host
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Server port
    #[arg(long, default_value_t = 9999)]
    pub port: u16,

    /// Start with monitor mode on (trace every inbound frame)
    #[arg(short, long)]
    pub monitor: bool,

    /// Domain announced in the handshake and attached to messages
    #[arg(long, default_value = "cli")]
    pub domain: String,

    /// First retry delay in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub initial_delay_ms: u64,

    /// Retry delay cap in milliseconds
    #[arg(long, default_value_t = 30_000)]
    pub max_delay_ms: u64,

    /// Growth factor between consecutive retry delays
    #[arg(long, default_value_t = 2.0)]
    pub backoff_multiplier: f64,

    /// Keepalive ping interval in seconds (0 disables)
    #[arg(long, default_value_t = 25)]
    pub keepalive_secs: u64,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Write logs to this file. Without it, logs are off unless RUST_LOG is
    /// set, in which case they go to stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or address
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl Args {
    /// Server address.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint { host: self.host.clone(), port: self.port }
    }

    /// Supervisor configuration. Fails on an invalid backoff policy.
    pub fn supervisor_config(&self) -> Result<SupervisorConfig, ConfigError> {
        let backoff = Backoff::new(
            Duration::from_millis(self.initial_delay_ms),
            self.backoff_multiplier,
            Duration::from_millis(self.max_delay_ms),
        )?;
        let heartbeat_interval =
            (self.keepalive_secs > 0).then(|| Duration::from_secs(self.keepalive_secs));

        Ok(SupervisorConfig { backoff, heartbeat_interval })
    }

    /// Application configuration.
    pub fn app_config(&self) -> AppConfig {
        AppConfig { domain: self.domain.clone(), monitor: self.monitor, ..AppConfig::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("tether").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let args = parse(&[]);
        assert_eq!(args.endpoint(), Endpoint { host: "localhost".into(), port: 9999 });
        assert_eq!(args.log_level, "warn");
        assert!(args.log_file.is_none());

        let config = args.supervisor_config().unwrap();
        assert_eq!(config.backoff.initial(), Duration::from_secs(1));
        assert_eq!(config.backoff.max(), Duration::from_secs(30));
        assert_eq!(config.heartbeat_interval, Some(Duration::from_secs(25)));

        let app = args.app_config();
        assert_eq!(app.domain, "cli");
        assert!(!app.monitor);
    }

    #[test]
    fn overrides() {
        let args = parse(&[
            "--host",
            "agents.local",
            "--port",
            "7000",
            "-m",
            "--domain",
            "ops",
            "--keepalive-secs",
            "0",
        ]);

        assert_eq!(args.endpoint().host, "agents.local");
        assert_eq!(args.endpoint().port, 7000);
        assert!(args.app_config().monitor);
        assert_eq!(args.app_config().domain, "ops");
        assert_eq!(args.supervisor_config().unwrap().heartbeat_interval, None);
    }

    #[test]
    fn invalid_backoff_is_rejected() {
        let args = parse(&["--initial-delay-ms", "5000", "--max-delay-ms", "1000"]);
        assert!(matches!(args.supervisor_config(), Err(ConfigError::MaxBelowInitial { .. })));

        let args = parse(&["--backoff-multiplier", "1.0"]);
        assert!(matches!(args.supervisor_config(), Err(ConfigError::MultiplierTooSmall(_))));
    }

    #[test]
    fn port_must_fit_u16() {
        assert!(Args::try_parse_from(["tether", "--port", "70000"]).is_err());
    }
}
