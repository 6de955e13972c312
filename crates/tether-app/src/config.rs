//! Application configuration.

use tether_proto::Connect;

/// Identity and routing announced to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Client name sent in the handshake
    pub client: String,
    /// Client version sent in the handshake
    pub version: String,
    /// Domain messages are routed to
    pub domain: String,
    /// Start with monitor mode on
    pub monitor: bool,
    /// Capability flags sent in the handshake
    pub capabilities: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client: "tether".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            domain: "cli".to_string(),
            monitor: false,
            capabilities: vec!["commands".to_string(), "monitor".to_string()],
        }
    }
}

impl AppConfig {
    /// Handshake frame announcing this client.
    pub fn handshake(&self) -> Connect {
        Connect {
            client: self.client.clone(),
            version: self.version.clone(),
            domain: self.domain.clone(),
            capabilities: self.capabilities.clone(),
        }
    }
}
