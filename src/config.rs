use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST), port: 3000 }
    }
}

impl ServerConfig {
    /// Reads `BIND_ADDR` and `PORT`, falling back to defaults for missing or unparsable values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: parse_or(lookup("BIND_ADDR"), "BIND_ADDR", defaults.bind_addr),
            port: parse_or(lookup("PORT"), "PORT", defaults.port),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.bind_addr, self.port) }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> T {
    match raw {
        None => default,
        Some(v) => v.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring unparsable {}={:?}", key, v);
            default
        }),
    }
}
