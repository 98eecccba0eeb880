use thiserror::Error;

/// Fatal configuration problems, discovered once at load time.
///
/// Any variant here maps to process exit code `1`: config errors are
/// never retried or worked around.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required key: {0}")]
    MissingKey(String),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("floor/ceiling ordering violated for {direction}: {detail}")]
    FloorOrdering { direction: String, detail: String },

    #[error("threshold ordering violated: {0}")]
    ThresholdOrdering(String),

    #[error("alpha out of range: {0}")]
    AlphaOutOfRange(String),

    #[error("factor_down out of range (0, 1): got {0}")]
    FactorDownOutOfRange(f64),

    #[error("environment variable {0} referenced by config is not set")]
    MissingEnvVar(String),

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Failures reading or writing the per-WAN state snapshot.
///
/// A corrupt state file is *not* fatal: callers treat it as "missing" and
/// fall back to defaults, logging a warning.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot at {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
