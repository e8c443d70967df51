use std::path::PathBuf;

use crate::error::ConfigError;

/// Upper bound on configurable CPUs.
pub const MAX_CPUS: usize = 128;

pub const DEFAULT_SOCKET: &str = "event.socket";

/// Runtime configuration, fixed at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Endpoint the scheduler connects to for its event stream.
    pub socket: PathBuf,
    pub cpus: usize,
    /// Milliseconds of runtime accounted per tick.
    pub quantum: u64,
    /// Whether decisions carry the `meta` block.
    pub metadata: bool,
}

impl Config {
    pub fn new(
        socket: impl Into<PathBuf>,
        cpus: usize,
        quantum: u64,
        metadata: bool,
    ) -> Result<Self, ConfigError> {
        if cpus == 0 || cpus > MAX_CPUS {
            return Err(ConfigError::InvalidCpuCount(cpus));
        }
        if quantum == 0 {
            return Err(ConfigError::InvalidQuantum);
        }
        Ok(Self {
            socket: socket.into(),
            cpus,
            quantum,
            metadata,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket: PathBuf::from(DEFAULT_SOCKET),
            cpus: 4,
            quantum: 1,
            metadata: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_bounds() {
        assert!(Config::new("s.sock", 1, 1, false).is_ok());
        assert!(Config::new("s.sock", MAX_CPUS, 50, true).is_ok());
    }

    #[test]
    fn rejects_invalid_values() {
        assert_eq!(
            Config::new("s.sock", 0, 1, false).unwrap_err(),
            ConfigError::InvalidCpuCount(0)
        );
        assert_eq!(
            Config::new("s.sock", 129, 1, false).unwrap_err(),
            ConfigError::InvalidCpuCount(129)
        );
        assert_eq!(
            Config::new("s.sock", 4, 0, false).unwrap_err(),
            ConfigError::InvalidQuantum
        );
    }

    #[test]
    fn defaults_mirror_the_cli() {
        let config = Config::default();
        assert_eq!(config.socket, PathBuf::from("event.socket"));
        assert_eq!(config.cpus, 4);
        assert_eq!(config.quantum, 1);
        assert!(!config.metadata);
    }
}
