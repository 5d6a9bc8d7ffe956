//! Metric sinks: the factory the registry builder creates handles from

use std::sync::Mutex;

use prometheus::{Gauge, GaugeVec, Opts, Registry};

use crate::error::SinkError;
use crate::identity::MetricIdentity;

/// Publishes the numeric value of one metric
pub trait NumericHandle: Send + Sync {
    /// replace the current value
    fn set(&self, value: f64);
}

/// Publishes the textual value of one metric
pub trait TextHandle: Send + Sync {
    /// replace the current value
    fn set_text(&self, value: &str);
}

/// Factory of metric handles
pub trait MetricSink {
    /// Create the numeric handle of `id`
    fn create_numeric(
        &mut self,
        id: &MetricIdentity,
        label: &str,
    ) -> Result<Box<dyn NumericHandle>, SinkError>;

    /// Create the text handle of `id`
    fn create_text(
        &mut self,
        id: &MetricIdentity,
        label: &str,
    ) -> Result<Box<dyn TextHandle>, SinkError>;
}

/// Sink that registers gauges in a Prometheus registry
///
/// Numeric handles are gauges named by the identity. Text handles are gauges named
/// `<identity>_info` with a single `value` label: the current text is the only series and it is
/// always set to 1.
#[derive(Clone)]
pub struct PrometheusSink {
    registry: Registry,
}

impl PrometheusSink {
    /// label that carries the text of info metrics
    pub const VALUE_LABEL: &'static str = "value";

    /// Create a sink that registers into `registry`
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// The registry handles are registered in
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn register<T>(&self, name: String, collector: T) -> Result<T, SinkError>
    where
        T: prometheus::core::Collector + Clone + 'static,
    {
        match self.registry.register(Box::new(collector.clone())) {
            Ok(()) => Ok(collector),
            Err(prometheus::Error::AlreadyReg) => Err(SinkError::Duplicate(name)),
            Err(source) => Err(SinkError::Registration {
                identity: name,
                source,
            }),
        }
    }
}

fn invalid(name: &str, source: prometheus::Error) -> SinkError {
    SinkError::Registration {
        identity: name.to_string(),
        source,
    }
}

impl MetricSink for PrometheusSink {
    fn create_numeric(
        &mut self,
        id: &MetricIdentity,
        label: &str,
    ) -> Result<Box<dyn NumericHandle>, SinkError> {
        let gauge = Gauge::with_opts(Opts::new(id.as_str(), label))
            .map_err(|err| invalid(id.as_str(), err))?;
        let gauge = self.register(id.to_string(), gauge)?;
        Ok(Box::new(gauge))
    }

    fn create_text(
        &mut self,
        id: &MetricIdentity,
        label: &str,
    ) -> Result<Box<dyn TextHandle>, SinkError> {
        let name = id.info_name();
        let gauge = GaugeVec::new(Opts::new(name.as_str(), label), &[Self::VALUE_LABEL])
            .map_err(|err| invalid(&name, err))?;
        let gauge = self.register(name, gauge)?;
        Ok(Box::new(InfoGauge::new(gauge)))
    }
}

impl NumericHandle for Gauge {
    fn set(&self, value: f64) {
        Gauge::set(self, value)
    }
}

struct InfoGauge {
    gauge: GaugeVec,
    // label value of the series currently set to 1
    current: Mutex<Option<String>>,
}

impl InfoGauge {
    fn new(gauge: GaugeVec) -> Self {
        Self {
            gauge,
            current: Mutex::new(None),
        }
    }
}

impl TextHandle for InfoGauge {
    fn set_text(&self, value: &str) {
        let mut current = match self.current.lock() {
            Ok(x) => x,
            Err(poisoned) => poisoned.into_inner(),
        };

        // the new series exists before the old one goes away
        self.gauge.with_label_values(&[value]).set(1.0);
        if let Some(previous) = current.as_deref() {
            if previous != value {
                if let Err(err) = self.gauge.remove_label_values(&[previous]) {
                    tracing::debug!("unable to remove info series '{}': {}", previous, err);
                }
            }
        }
        *current = Some(value.to_string());
    }
}
