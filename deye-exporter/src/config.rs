//! Exporter settings merged from built-in defaults, a TOML file, environment variables and the
//! command line, in increasing order of precedence

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use solarman::{DecodeLevel, FrameDecodeLevel, PhysDecodeLevel};

use crate::error::ConfigError;

/// file read when `--config` is not given, if it exists
pub const DEFAULT_CONFIG_FILE: &str = "deye-exporter.toml";

/// Environment variables
pub mod env {
    /// HTTP port
    pub const EXPORTER_PORT: &str = "EXPORTER_PORT";
    /// seconds between cycles
    pub const EXPORTER_COLLECTION_INTERVAL: &str = "EXPORTER_COLLECTION_INTERVAL";
    /// data logger host
    pub const INVERTER_HOST: &str = "INVERTER_HOST";
    /// data logger port
    pub const INVERTER_PORT: &str = "INVERTER_PORT";
    /// data logger serial number
    pub const INVERTER_SERIAL: &str = "INVERTER_SERIAL";
    /// Modbus slave id
    pub const INVERTER_SLAVE_ID: &str = "INVERTER_SLAVE_ID";
    /// request timeout in seconds
    pub const INVERTER_TIMEOUT: &str = "INVERTER_TIMEOUT";
    /// comma separated register names
    pub const INVERTER_METRICS: &str = "INVERTER_METRICS";
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum DecodeArg {
    Nothing,
    Header,
    Payload,
    Data,
}

impl From<DecodeArg> for DecodeLevel {
    fn from(value: DecodeArg) -> Self {
        match value {
            DecodeArg::Nothing => DecodeLevel::nothing(),
            DecodeArg::Header => FrameDecodeLevel::Header.into(),
            DecodeArg::Payload => FrameDecodeLevel::Payload.into(),
            DecodeArg::Data => DecodeLevel::new(FrameDecodeLevel::Payload, PhysDecodeLevel::Data),
        }
    }
}

/// Command line of the exporter
#[derive(Parser, Debug)]
#[command(name = "deye-exporter")]
#[command(about = "Prometheus exporter for Deye inverters behind a Solarman data logger")]
#[command(version)]
pub struct Cli {
    #[arg(short = 'c', long, help = "Path of a TOML configuration file")]
    config: Option<PathBuf>,

    #[arg(short = 'p', long, help = "Port the metrics are served on")]
    port: Option<u16>,

    #[arg(long, help = "Seconds between two collection cycles")]
    interval: Option<u64>,

    #[arg(long, help = "Host name or IP address of the data logger")]
    host: Option<String>,

    #[arg(long, help = "TCP port of the data logger")]
    inverter_port: Option<u16>,

    #[arg(short = 's', long, help = "Serial number of the data logger")]
    serial: Option<u32>,

    #[arg(short = 'i', long, help = "Modbus slave id of the inverter")]
    slave_id: Option<u8>,

    #[arg(short = 't', long, help = "Connect and request timeout in seconds")]
    timeout: Option<u64>,

    #[arg(
        short = 'm',
        long,
        value_delimiter = ',',
        help = "Register names to export as a comma delimited list (e.g. BatterySOC,GridPower), all registers if empty"
    )]
    metrics: Vec<String>,

    #[arg(long, default_value = "info", help = "Maximum log level (error, warn, info, debug, trace)")]
    log_level: tracing::Level,

    #[arg(long, value_enum, default_value = "nothing", help = "Protocol decoding written to the log")]
    decode: DecodeArg,

    #[arg(long, help = "Print the register names of the catalog and exit")]
    list: bool,
}

impl Cli {
    /// maximum log level
    pub fn log_level(&self) -> tracing::Level {
        self.log_level
    }

    /// `true` if only the catalog should be listed
    pub fn list(&self) -> bool {
        self.list
    }
}

/// HTTP side of the exporter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExporterSettings {
    /// port the metrics are served on
    pub port: u16,
    /// time between two collection cycles
    pub collection_interval: Duration,
}

/// Data logger and inverter
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InverterSettings {
    /// host of the data logger
    pub host: String,
    /// TCP port of the data logger
    pub port: u16,
    /// serial number of the data logger
    pub serial_number: u32,
    /// Modbus slave id of the inverter
    pub slave_id: u8,
    /// connect and request timeout
    pub timeout: Duration,
    /// protocol decoding
    pub decode: DecodeLevel,
}

/// Complete exporter configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// HTTP side
    pub exporter: ExporterSettings,
    /// data logger and inverter
    pub inverter: InverterSettings,
    /// register names to export, the whole catalog if empty
    pub metrics: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            exporter: ExporterSettings {
                port: 9877,
                collection_interval: Duration::from_secs(15),
            },
            inverter: InverterSettings {
                host: "192.168.100.102".to_string(),
                port: 8899,
                serial_number: 2_999_999_999,
                slave_id: 1,
                timeout: Duration::from_secs(10),
                decode: DecodeLevel::nothing(),
            },
            metrics: Vec::new(),
        }
    }
}

#[derive(Deserialize, Default, Debug)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    exporter: FileExporter,
    inverter: FileInverter,
    metrics: FileMetrics,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default, deny_unknown_fields)]
struct FileExporter {
    port: Option<u16>,
    collection_interval: Option<u64>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default, deny_unknown_fields)]
struct FileInverter {
    host: Option<String>,
    port: Option<u16>,
    serial_number: Option<u32>,
    slave_id: Option<u8>,
    timeout: Option<u64>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default, deny_unknown_fields)]
struct FileMetrics {
    selection: Option<Selection>,
}

/// register selection, either a TOML array or a comma delimited string
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum Selection {
    List(Vec<String>),
    Delimited(String),
}

impl Selection {
    fn into_names(self) -> Vec<String> {
        match self {
            Selection::List(names) => names
                .into_iter()
                .map(|x| x.trim().to_string())
                .filter(|x| !x.is_empty())
                .collect(),
            Selection::Delimited(text) => split_names(&text),
        }
    }
}

fn split_names(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(str::to_string)
        .collect()
}

impl FileConfig {
    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn parse_env<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::BadEnv { name, value })
}

impl Settings {
    /// Load the settings for `cli`, reading environment variables through `lookup`
    pub fn load<F>(cli: &Cli, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        match &cli.config {
            Some(path) => settings.apply_file(FileConfig::read(path)?),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    settings.apply_file(FileConfig::read(path)?);
                }
            }
        }

        settings.apply_env(lookup)?;
        settings.apply_cli(cli);
        settings.validate()?;
        Ok(settings)
    }

    /// Load the settings for `cli` from the process environment
    pub fn from_process(cli: &Cli) -> Result<Self, ConfigError> {
        Self::load(cli, |name| std::env::var(name).ok())
    }

    fn apply_file(&mut self, file: FileConfig) {
        let FileConfig {
            exporter,
            inverter,
            metrics,
        } = file;

        if let Some(x) = exporter.port {
            self.exporter.port = x;
        }
        if let Some(x) = exporter.collection_interval {
            self.exporter.collection_interval = Duration::from_secs(x);
        }
        if let Some(x) = inverter.host {
            self.inverter.host = x;
        }
        if let Some(x) = inverter.port {
            self.inverter.port = x;
        }
        if let Some(x) = inverter.serial_number {
            self.inverter.serial_number = x;
        }
        if let Some(x) = inverter.slave_id {
            self.inverter.slave_id = x;
        }
        if let Some(x) = inverter.timeout {
            self.inverter.timeout = Duration::from_secs(x);
        }
        if let Some(x) = metrics.selection {
            self.metrics = x.into_names();
        }
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(x) = lookup(env::EXPORTER_PORT) {
            self.exporter.port = parse_env(env::EXPORTER_PORT, x)?;
        }
        if let Some(x) = lookup(env::EXPORTER_COLLECTION_INTERVAL) {
            self.exporter.collection_interval =
                Duration::from_secs(parse_env(env::EXPORTER_COLLECTION_INTERVAL, x)?);
        }
        if let Some(x) = lookup(env::INVERTER_HOST) {
            self.inverter.host = x;
        }
        if let Some(x) = lookup(env::INVERTER_PORT) {
            self.inverter.port = parse_env(env::INVERTER_PORT, x)?;
        }
        if let Some(x) = lookup(env::INVERTER_SERIAL) {
            self.inverter.serial_number = parse_env(env::INVERTER_SERIAL, x)?;
        }
        if let Some(x) = lookup(env::INVERTER_SLAVE_ID) {
            self.inverter.slave_id = parse_env(env::INVERTER_SLAVE_ID, x)?;
        }
        if let Some(x) = lookup(env::INVERTER_TIMEOUT) {
            self.inverter.timeout = Duration::from_secs(parse_env(env::INVERTER_TIMEOUT, x)?);
        }
        if let Some(x) = lookup(env::INVERTER_METRICS) {
            let names = split_names(&x);
            if !names.is_empty() {
                self.metrics = names;
            }
        }
        Ok(())
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(x) = cli.port {
            self.exporter.port = x;
        }
        if let Some(x) = cli.interval {
            self.exporter.collection_interval = Duration::from_secs(x);
        }
        if let Some(x) = &cli.host {
            self.inverter.host = x.clone();
        }
        if let Some(x) = cli.inverter_port {
            self.inverter.port = x;
        }
        if let Some(x) = cli.serial {
            self.inverter.serial_number = x;
        }
        if let Some(x) = cli.slave_id {
            self.inverter.slave_id = x;
        }
        if let Some(x) = cli.timeout {
            self.inverter.timeout = Duration::from_secs(x);
        }
        let metrics: Vec<String> = cli
            .metrics
            .iter()
            .map(|x| x.trim().to_string())
            .filter(|x| !x.is_empty())
            .collect();
        if !metrics.is_empty() {
            self.metrics = metrics;
        }
        self.inverter.decode = cli.decode.into();
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.exporter.collection_interval.is_zero() {
            return Err(ConfigError::Invalid("collection interval must be at least 1 second"));
        }
        if self.inverter.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be at least 1 second"));
        }
        if self.inverter.host.trim().is_empty() {
            return Err(ConfigError::Invalid("inverter host must not be empty"));
        }
        Ok(())
    }
}
