//! Driver configuration
//!
//! Everything is fixed once the handler is created. Values come from the
//! environment of the pcscd process, falling back to the built-in defaults.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use log::{warn, LevelFilter};

/// Port the swICC backend connects to
pub const DEFAULT_PORT: u16 = 37324;

/// Device name prefix pcscd must hand us (DEVICENAME in reader.conf)
pub const DEFAULT_DEVICE_PREFIX: &str = "/dev/null";

/// Handler configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address the listening socket binds to
    pub addr: IpAddr,
    /// Listening port; 0 picks an ephemeral port
    pub port: u16,
    /// Required prefix of the device name given at channel creation
    pub device_prefix: String,
    /// Read/write timeout applied to every backend connection
    pub io_timeout: Option<Duration>,
    /// Level for the logger installed on first use
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            device_prefix: DEFAULT_DEVICE_PREFIX.to_string(),
            io_timeout: None,
            log_level: LevelFilter::Info,
        }
    }
}

impl Config {
    pub const ENV_ADDR: &'static str = "IFD_SWICC_ADDR";
    pub const ENV_PORT: &'static str = "IFD_SWICC_PORT";
    pub const ENV_DEVICE: &'static str = "IFD_SWICC_DEVICE";
    pub const ENV_TIMEOUT_MS: &'static str = "IFD_SWICC_TIMEOUT_MS";
    pub const ENV_LOG: &'static str = "IFD_SWICC_LOG";

    /// Read the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let timeout_ms: u64 = parse_or(&lookup, Self::ENV_TIMEOUT_MS, 0);

        Self {
            addr: parse_or(&lookup, Self::ENV_ADDR, defaults.addr),
            port: parse_or(&lookup, Self::ENV_PORT, defaults.port),
            device_prefix: lookup(Self::ENV_DEVICE)
                .filter(|prefix| !prefix.is_empty())
                .unwrap_or(defaults.device_prefix),
            io_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            log_level: parse_or(&lookup, Self::ENV_LOG, defaults.log_level),
        }
    }

    /// Socket address the listener binds to
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring invalid {}={:?}, using the default", key, raw);
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config, Config::default());
        assert_eq!(config.listen_addr().port(), DEFAULT_PORT);
        assert!(config.io_timeout.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            (Config::ENV_ADDR, "127.0.0.1"),
            (Config::ENV_PORT, "4000"),
            (Config::ENV_DEVICE, "/dev/swicc"),
            (Config::ENV_TIMEOUT_MS, "1500"),
            (Config::ENV_LOG, "debug"),
        ]));
        assert_eq!(config.listen_addr(), "127.0.0.1:4000".parse().unwrap());
        assert_eq!(config.device_prefix, "/dev/swicc");
        assert_eq!(config.io_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup(&[
            (Config::ENV_PORT, "not-a-port"),
            (Config::ENV_TIMEOUT_MS, "0"),
            (Config::ENV_DEVICE, ""),
        ]));
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.io_timeout.is_none());
        assert_eq!(config.device_prefix, DEFAULT_DEVICE_PREFIX);
    }
}
