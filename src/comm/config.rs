use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::str::FromStr;

/// Which byte stream carries the line protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Tcp,
    Stdio,
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Transport::Tcp),
            "stdio" => Ok(Transport::Stdio),
            other => Err(format!("unknown transport '{}'", other)),
        }
    }
}

/// Comm module configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommConfig {
    /// Transport (default: tcp)
    pub transport: Transport,
    /// Listen address (default: 127.0.0.1)
    pub listen_addr: String,
    /// Listen port (default: 9710)
    pub listen_port: u16,
    /// Longest accepted request line in bytes (default: 1 MiB)
    pub max_line_bytes: usize,
    /// Concurrent TCP connections (default: 64)
    pub max_connections: usize,
}

impl Default for CommConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Tcp,
            listen_addr: "127.0.0.1".to_string(),
            listen_port: 9710,
            max_line_bytes: 1_048_576,
            max_connections: 64,
        }
    }
}

impl CommConfig {
    /// Returns the socket address to bind to
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.listen_addr, self.listen_port).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_parse() {
        assert_eq!("TCP".parse::<Transport>().unwrap(), Transport::Tcp);
        assert_eq!(" stdio ".parse::<Transport>().unwrap(), Transport::Stdio);
        assert!("udp".parse::<Transport>().is_err());
    }

    #[test]
    fn test_bind_addr() {
        let config = CommConfig::default();
        assert_eq!(config.bind_addr().unwrap().port(), 9710);
        let bad = CommConfig {
            listen_addr: "not an address".to_string(),
            ..Default::default()
        };
        assert!(bad.bind_addr().is_err());
    }
}
