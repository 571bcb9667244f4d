use std::{fmt, time::Duration};

use serde_derive::Deserialize;

/// Maximum number of live resources when no size is configured.
pub const DEFAULT_POOL_SIZE: usize = 32;

/// Seconds a `get` waits for an idle resource when no timeout is configured.
pub const DEFAULT_GET_TIMEOUT_SECS: u64 = 3;

/// Backend coordinates handed to [`Manager::create`](crate::Manager::create).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new<T>(host: T, port: u16) -> Self
    where
        T: Into<String>,
    {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<(&str, u16)> for Target {
    fn from((host, port): (&str, u16)) -> Self {
        Target::new(host, port)
    }
}

/// How long `get` may wait for an idle resource once the pool is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "u64")]
pub enum GetTimeout {
    Infinite,
    /// `Bounded(Duration::ZERO)` fails immediately when the pool is full.
    Bounded(Duration),
}

impl GetTimeout {
    /// Legacy seconds form, where `0` means waiting forever.
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            GetTimeout::Infinite
        } else {
            GetTimeout::Bounded(Duration::from_secs(secs))
        }
    }
}

impl From<u64> for GetTimeout {
    fn from(secs: u64) -> Self {
        GetTimeout::from_secs(secs)
    }
}

impl From<Option<Duration>> for GetTimeout {
    fn from(duration: Option<Duration>) -> Self {
        duration.map_or(GetTimeout::Infinite, GetTimeout::Bounded)
    }
}

impl Default for GetTimeout {
    fn default() -> Self {
        GetTimeout::Bounded(Duration::from_secs(DEFAULT_GET_TIMEOUT_SECS))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct PoolConfig {
    pub max_size: usize,
    #[serde(rename = "get_timeout_secs")]
    pub get_timeout: GetTimeout,
}

impl PoolConfig {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            get_timeout: GetTimeout::default(),
        }
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_get_timeout<T>(mut self, get_timeout: T) -> Self
    where
        T: Into<GetTimeout>,
    {
        self.get_timeout = get_timeout.into();
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_POOL_SIZE,
            get_timeout: GetTimeout::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_seconds_waits_forever() {
        assert_eq!(GetTimeout::from_secs(0), GetTimeout::Infinite);
        assert_eq!(
            GetTimeout::from_secs(5),
            GetTimeout::Bounded(Duration::from_secs(5))
        );
    }

    #[test]
    fn zero_duration_is_not_infinite() {
        let timeout = GetTimeout::from(Some(Duration::ZERO));
        assert_eq!(timeout, GetTimeout::Bounded(Duration::ZERO));
        assert_eq!(GetTimeout::from(None), GetTimeout::Infinite);
    }

    #[test]
    fn defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.max_size, 32);
        assert_eq!(config.get_timeout, GetTimeout::Bounded(Duration::from_secs(3)));
    }

    #[test]
    fn builder_methods() {
        let config = PoolConfig::new(4).with_get_timeout(0);
        assert_eq!(config.max_size, 4);
        assert_eq!(config.get_timeout, GetTimeout::Infinite);
        assert_eq!(config.with_max_size(7).max_size, 7);
    }

    #[test]
    fn target_display() {
        let target: Target = ("fakehost", 9090).into();
        assert_eq!(target.to_string(), "fakehost:9090");
    }
}
