//! A [Prometheus](https://prometheus.io) exporter for Deye hybrid inverters, polling the inverter
//! through its Solarman data logger with the [solarman](../solarman) client.
//!
//! Each collection cycle resolves the configured register names against a [`RegisterCatalog`],
//! reads them in as few contiguous requests as possible, decodes the words and publishes every
//! value through a fixed [`MetricRegistry`] built once at startup. Numeric values become gauges
//! named `deye_<description>`, textual values become `deye_<description>_info` gauges carrying the
//! text in a `value` label.
//!
//! The pieces are usable on their own: the collector only needs a [`RegisterTransport`], a
//! [`RegisterCatalog`] and a registry built from any [`MetricSink`].

pub use crate::catalog::{
    Batch, DecodedRegister, DeyeCatalog, RegisterCatalog, RegisterDescriptor, ValueKind,
};
pub use crate::collector::{Collector, CycleReport};
pub use crate::config::{Cli, Settings};
pub use crate::error::{ConfigError, DecodeError, SinkError, StartupError};
pub use crate::identity::{metric_label, MetricIdentity};
pub use crate::metrics::{MetricSink, NumericHandle, PrometheusSink, TextHandle};
pub use crate::registry::{build_registry, MetricRegistry};
pub use crate::transport::RegisterTransport;
pub use crate::value::{Classified, RegisterValue};

/// Register catalog, batching and decoding
pub mod catalog;
/// One collection cycle
pub mod collector;
/// Settings and command line
pub mod config;
/// Error types
pub mod error;
/// Metric identities and labels
pub mod identity;
/// Metric sinks and handles
pub mod metrics;
/// Metric registry built at startup
pub mod registry;
/// Periodic execution of collection cycles
pub mod scheduler;
/// HTTP endpoint
pub mod server;
/// Register reads
pub mod transport;
/// Decoded register values
pub mod value;

use solarman::{Client, ClientOptions, LoggerSerial, SlaveId};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Run the exporter until Ctrl-C
pub async fn run(settings: Settings) -> Result<(), StartupError> {
    let shutdown = CancellationToken::new();

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("received Ctrl-C, shutting down"),
                Err(err) => tracing::error!("unable to listen for Ctrl-C: {}", err),
            }
            shutdown.cancel();
        }
    });

    run_until(settings, shutdown).await
}

/// Run the exporter until `shutdown` is cancelled
///
/// Startup fails if the metric registry cannot be built, the data logger is unreachable or the
/// HTTP listener cannot be bound. Once running, read and decode failures only affect the cycle
/// they occur in.
pub async fn run_until(settings: Settings, shutdown: CancellationToken) -> Result<(), StartupError> {
    let catalog = DeyeCatalog::new();
    let names = if settings.metrics.is_empty() {
        catalog.names()
    } else {
        settings.metrics.clone()
    };

    let registry = prometheus::Registry::new();
    let mut sink = PrometheusSink::new(registry.clone());
    let metrics = build_registry(&names, &catalog, &mut sink)?;
    tracing::info!(
        "publishing {} metrics for {} configured registers",
        metrics.len(),
        names.len()
    );

    let inverter = &settings.inverter;
    let options = ClientOptions::default()
        .slave(SlaveId::new(inverter.slave_id))
        .timeout(inverter.timeout)
        .decode(inverter.decode);
    let client = Client::connect(
        &inverter.host,
        inverter.port,
        LoggerSerial::new(inverter.serial_number),
        options,
    )
    .await
    .map_err(|source| StartupError::Connect {
        host: inverter.host.clone(),
        port: inverter.port,
        source,
    })?;
    tracing::info!(
        "connected to data logger {} at {}:{}",
        inverter.serial_number,
        inverter.host,
        inverter.port
    );

    let port = settings.exporter.port;
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|source| StartupError::Bind { port, source })?;

    let server = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            let stopped = shutdown.clone();
            let result = server::serve(listener, registry, async move {
                stopped.cancelled().await
            })
            .await;
            // stop collecting if the server dies on its own
            shutdown.cancel();
            result
        }
    });

    let mut collector = Collector::new(client, catalog, metrics, names);
    scheduler::run(
        &mut collector,
        settings.exporter.collection_interval,
        shutdown.cancelled(),
    )
    .await;

    match server.await {
        Ok(result) => result.map_err(StartupError::Serve),
        Err(err) => Err(StartupError::Serve(std::io::Error::other(err))),
    }
}
