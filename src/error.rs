use thiserror::Error;

/// Event-level failures. These are reported and skipped; the tick for the
/// current virtual time still runs and a decision is still emitted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("no such task {0:?}")]
    UnknownTask(String),
    #[error("no such cgroup {0:?}")]
    UnknownCgroup(String),
    #[error("task {0:?} already exists")]
    TaskExists(String),
    #[error("cgroup {0:?} already exists")]
    CgroupExists(String),
    #[error("{action} requires field {field}")]
    MissingField {
        action: &'static str,
        field: &'static str,
    },
    #[error("burst duration must be positive")]
    ZeroBurstDuration,
}

/// Rejected startup configuration. Fatal: the process exits with a
/// diagnostic before any scheduling happens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cpu count must be between 1 and 128, got {0}")]
    InvalidCpuCount(usize),
    #[error("quantum must be positive")]
    InvalidQuantum,
}

/// Transport and codec failures on the event stream.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame of {0} bytes exceeds the 16 MiB limit")]
    FrameTooLarge(usize),
}
