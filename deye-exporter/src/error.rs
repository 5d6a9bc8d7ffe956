use std::path::PathBuf;

/// Failure to decode the words returned for a read batch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The transport returned a different number of words than the batch covers
    #[error("expected {expected} words for the batch but received {actual}")]
    WordCountMismatch {
        /// word count of the batch
        expected: usize,
        /// word count of the response
        actual: usize,
    },
    /// A register in the batch lies outside of the batch's address range
    #[error("register {name} at address {address} lies outside of the batch")]
    RegisterOutsideBatch {
        /// register name
        name: String,
        /// register start address
        address: u16,
    },
    /// The words of a register cannot be decoded according to its kind
    #[error("register {name} is malformed: {reason}")]
    Malformed {
        /// register name
        name: String,
        /// what is wrong with the words
        reason: String,
    },
}

/// A metric sink refused to create a handle
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The backing Prometheus registry rejected the collector
    #[error("unable to register metric {identity}: {source}")]
    Registration {
        /// metric name that was rejected
        identity: String,
        /// underlying error
        #[source]
        source: prometheus::Error,
    },
    /// The sink already holds a handle with this name
    #[error("metric {0} is already registered")]
    Duplicate(String),
}

/// Invalid or unreadable configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file cannot be read
    #[error("unable to read config file {}: {source}", path.display())]
    Read {
        /// path of the file
        path: PathBuf,
        /// underlying error
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML for the expected schema
    #[error("unable to parse config file {}: {source}", path.display())]
    Parse {
        /// path of the file
        path: PathBuf,
        /// underlying error
        #[source]
        source: toml::de::Error,
    },
    /// An environment variable holds a value of the wrong type
    #[error("environment variable {name} has invalid value '{value}'")]
    BadEnv {
        /// variable name
        name: &'static str,
        /// offending value
        value: String,
    },
    /// A setting is out of range
    #[error("invalid setting: {0}")]
    Invalid(&'static str),
}

/// Errors that stop the exporter before the poll loop begins
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Building the metric registry failed
    #[error(transparent)]
    Sink(#[from] SinkError),
    /// The data logger is unreachable
    #[error("unable to connect to data logger at {host}:{port}: {source}")]
    Connect {
        /// data logger host
        host: String,
        /// data logger port
        port: u16,
        /// underlying error
        #[source]
        source: solarman::RequestError,
    },
    /// The HTTP listener cannot be bound
    #[error("unable to bind HTTP listener on port {port}: {source}")]
    Bind {
        /// requested port
        port: u16,
        /// underlying error
        #[source]
        source: std::io::Error,
    },
    /// The HTTP server stopped with an error
    #[error("HTTP server error: {0}")]
    Serve(#[source] std::io::Error),
}
