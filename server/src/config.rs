//! Configuration management for the server.

use aerokv_engine::{MissingBinPolicy, StoreConfig};
use std::env;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Namespaces served, one in-memory store each
    pub namespaces: Vec<String>,
    /// TTL in seconds for writes using the namespace default; 0 never expires
    pub default_ttl: u32,
    /// Codec for JSON values with no native bin type ("json" or "none")
    pub serializer: String,
    /// How clear/size treat a missing bin
    pub missing_bin: MissingBinPolicy,
    /// Seconds between expired-record sweeps; 0 disables the sweep
    pub reap_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let namespaces = parse_namespaces(&env::var("NAMESPACES").unwrap_or_else(|_| "test".to_string()))?;

        let default_ttl = env::var("DEFAULT_TTL")
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidDefaultTtl)?;

        let serializer = env::var("SERIALIZER").unwrap_or_else(|_| "json".to_string());

        let missing_bin = match env::var("MISSING_BIN_POLICY").as_deref() {
            Err(_) | Ok("empty") => MissingBinPolicy::Empty,
            Ok("incompatible") => MissingBinPolicy::Incompatible,
            Ok(other) => return Err(ConfigError::InvalidMissingBinPolicy(other.to_string())),
        };

        let reap_interval_secs = env::var("REAP_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidReapInterval)?;

        Ok(Self {
            host,
            port,
            namespaces,
            default_ttl,
            serializer,
            missing_bin,
            reap_interval_secs,
        })
    }

    /// Store settings for one namespace.
    pub fn store_config(&self, namespace: &str) -> StoreConfig {
        StoreConfig {
            namespace: namespace.to_string(),
            default_ttl: self.default_ttl,
            missing_bin: self.missing_bin,
        }
    }
}

fn parse_namespaces(raw: &str) -> Result<Vec<String>, ConfigError> {
    let namespaces: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|ns| !ns.is_empty())
        .map(str::to_string)
        .collect();
    if namespaces.is_empty() {
        return Err(ConfigError::NoNamespaces);
    }
    Ok(namespaces)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("NAMESPACES must name at least one namespace")]
    NoNamespaces,

    #[error("Invalid DEFAULT_TTL value")]
    InvalidDefaultTtl,

    #[error("Invalid MISSING_BIN_POLICY value: {0} (expected 'empty' or 'incompatible')")]
    InvalidMissingBinPolicy(String),

    #[error("Invalid REAP_INTERVAL_SECS value")]
    InvalidReapInterval,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_are_trimmed() {
        assert_eq!(
            parse_namespaces(" test, bar ,,").unwrap(),
            vec!["test".to_string(), "bar".to_string()]
        );
    }

    #[test]
    fn empty_namespace_list_rejected() {
        assert!(matches!(parse_namespaces(" , "), Err(ConfigError::NoNamespaces)));
    }
}
