//! Configuration Module
//!
//! Server addresses and client options for the cache store, loadable from
//! environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StoreError};
use crate::key::TRUNCATED_PREFIX_LENGTH;

/// Port used when an address omits one.
pub const DEFAULT_PORT: u16 = 11211;

// == Server Address ==
/// A `host[:port]` cache server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    /// Parses `host[:port]`. A missing or unparsable port falls back to
    /// [`DEFAULT_PORT`]; hostnames may contain dashes.
    pub fn parse(address: &str) -> Self {
        let address = address.trim();
        match address.rsplit_once(':') {
            Some((host, port)) => Self {
                host: host.to_string(),
                port: port.parse().unwrap_or(DEFAULT_PORT),
            },
            None => Self {
                host: address.to_string(),
                port: DEFAULT_PORT,
            },
        }
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// == Distribution ==
/// How keys are spread across servers by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Distribution {
    #[default]
    Consistent,
    Modula,
}

impl FromStr for Distribution {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "consistent" => Ok(Self::Consistent),
            "modula" => Ok(Self::Modula),
            other => Err(format!("unknown distribution: {other}")),
        }
    }
}

/// Store configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Cache servers, never empty
    pub addresses: Vec<ServerAddress>,
    /// Key distribution policy
    pub distribution: Distribution,
    /// Non-blocking I/O on the client
    pub no_block: bool,
    /// Eject failing servers and fail over to the rest
    pub failover: bool,
    /// Namespace prepended to every key by the client
    pub prefix_key: Option<String>,
    /// Separator between namespace and key
    pub prefix_delimiter: String,
    /// Report remote failures through the logger
    pub log_errors: bool,
    /// Capacity of the in-memory backend
    pub max_entries: usize,
}

impl StoreConfig {
    /// Creates a config for the given addresses with default options.
    ///
    /// An empty list means a single local server.
    pub fn new<S: AsRef<str>>(addresses: &[S]) -> Self {
        Self {
            addresses: parse_addresses(addresses.iter().map(AsRef::as_ref)),
            ..Self::default()
        }
    }

    /// Creates a new StoreConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_SERVERS` - Comma separated `host[:port]` list (default: localhost)
    /// - `CACHE_DISTRIBUTION` - `consistent` or `modula` (default: consistent)
    /// - `CACHE_NO_BLOCK` - Non-blocking I/O (default: true)
    /// - `CACHE_FAILOVER` - Server failover (default: true)
    /// - `CACHE_PREFIX_KEY` - Key namespace (default: none)
    /// - `CACHE_PREFIX_DELIMITER` - Namespace separator (default: empty)
    /// - `CACHE_LOG_ERRORS` - Log remote failures (default: true)
    /// - `CACHE_MAX_ENTRIES` - In-memory backend capacity (default: 10000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let servers = env::var("CACHE_SERVERS").unwrap_or_default();

        Self {
            addresses: parse_addresses(servers.split(',')),
            distribution: env_parse("CACHE_DISTRIBUTION").unwrap_or(defaults.distribution),
            no_block: env_parse("CACHE_NO_BLOCK").unwrap_or(defaults.no_block),
            failover: env_parse("CACHE_FAILOVER").unwrap_or(defaults.failover),
            prefix_key: env::var("CACHE_PREFIX_KEY").ok().filter(|p| !p.is_empty()),
            prefix_delimiter: env::var("CACHE_PREFIX_DELIMITER").unwrap_or_default(),
            log_errors: env_parse("CACHE_LOG_ERRORS").unwrap_or(defaults.log_errors),
            max_entries: env_parse("CACHE_MAX_ENTRIES").unwrap_or(defaults.max_entries),
        }
    }

    /// Sets the key namespace.
    pub fn with_prefix(mut self, prefix_key: impl Into<String>, delimiter: impl Into<String>) -> Self {
        self.prefix_key = Some(prefix_key.into());
        self.prefix_delimiter = delimiter.into();
        self
    }

    /// Full namespace string the client prepends, if any.
    pub fn namespace(&self) -> Option<String> {
        self.prefix_key
            .as_ref()
            .map(|prefix| format!("{}{}", prefix, self.prefix_delimiter))
    }

    /// Bytes of the 250-byte key budget consumed by the namespace.
    pub fn namespace_len(&self) -> usize {
        self.prefix_key
            .as_ref()
            .map_or(0, |prefix| prefix.len() + self.prefix_delimiter.len())
    }

    /// Checks that the namespace leaves room for a hashed key.
    ///
    /// A namespace longer than [`TRUNCATED_PREFIX_LENGTH`] bytes could push
    /// wire keys past the protocol limit.
    pub fn validate(&self) -> Result<()> {
        let len = self.namespace_len();
        if len > TRUNCATED_PREFIX_LENGTH {
            return Err(StoreError::InvalidOptions(format!(
                "namespace of {} bytes exceeds the {} byte limit",
                len, TRUNCATED_PREFIX_LENGTH
            )));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            addresses: vec![ServerAddress::parse("localhost")],
            distribution: Distribution::Consistent,
            no_block: true,
            failover: true,
            prefix_key: None,
            prefix_delimiter: String::new(),
            log_errors: true,
            max_entries: 10_000,
        }
    }
}

fn parse_addresses<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<ServerAddress> {
    let addresses: Vec<ServerAddress> = raw
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(ServerAddress::parse)
        .collect();

    if addresses.is_empty() {
        vec![ServerAddress::parse("localhost")]
    } else {
        addresses
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = StoreConfig::default();
        assert_eq!(config.addresses, vec![ServerAddress::parse("localhost")]);
        assert_eq!(config.distribution, Distribution::Consistent);
        assert!(config.no_block);
        assert!(config.failover);
        assert!(config.log_errors);
        assert_eq!(config.namespace_len(), 0);
    }

    #[test]
    fn test_config_new_defaults_to_localhost() {
        let config = StoreConfig::new::<&str>(&[]);
        assert_eq!(config.addresses.len(), 1);
        assert_eq!(config.addresses[0].host, "localhost");
        assert_eq!(config.addresses[0].port, DEFAULT_PORT);
    }

    #[test]
    fn test_config_custom_addresses() {
        let config = StoreConfig::new(&["localhost", "192.168.1.1:11212", "cache-01"]);
        let rendered: Vec<String> = config.addresses.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["localhost:11211", "192.168.1.1:11212", "cache-01:11211"]
        );
    }

    #[test]
    fn test_distribution_from_str() {
        assert_eq!("modula".parse(), Ok(Distribution::Modula));
        assert_eq!("Consistent".parse(), Ok(Distribution::Consistent));
        assert!("ketama".parse::<Distribution>().is_err());
    }

    #[test]
    fn test_namespace_len_counts_delimiter() {
        let config = StoreConfig::default().with_prefix("app", ":");
        assert_eq!(config.namespace().as_deref(), Some("app:"));
        assert_eq!(config.namespace_len(), 4);
    }

    #[test]
    fn test_validate_namespace_length() {
        assert!(StoreConfig::default().validate().is_ok());

        let at_limit = StoreConfig::default().with_prefix("p".repeat(TRUNCATED_PREFIX_LENGTH - 1), ":");
        assert!(at_limit.validate().is_ok());

        let too_long = StoreConfig::default().with_prefix("p".repeat(TRUNCATED_PREFIX_LENGTH), ":");
        assert!(matches!(
            too_long.validate(),
            Err(StoreError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for name in [
            "CACHE_SERVERS",
            "CACHE_DISTRIBUTION",
            "CACHE_NO_BLOCK",
            "CACHE_FAILOVER",
            "CACHE_PREFIX_KEY",
            "CACHE_PREFIX_DELIMITER",
            "CACHE_LOG_ERRORS",
            "CACHE_MAX_ENTRIES",
        ] {
            env::remove_var(name);
        }

        let config = StoreConfig::from_env();
        assert_eq!(config.addresses[0].host, "localhost");
        assert_eq!(config.distribution, Distribution::Consistent);
        assert!(config.no_block);
        assert!(config.failover);
        assert!(config.prefix_key.is_none());
        assert_eq!(config.max_entries, 10_000);
    }
}
