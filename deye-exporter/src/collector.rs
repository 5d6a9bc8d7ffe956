use solarman::RequestError;

use crate::catalog::{Batch, DecodedRegister, RegisterCatalog, RegisterDescriptor};
use crate::error::DecodeError;
use crate::identity::MetricIdentity;
use crate::registry::MetricRegistry;
use crate::transport::RegisterTransport;
use crate::value::Classified;

/// Summary of one poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// configured names that did not resolve
    pub unresolved: usize,
    /// batches the registers were grouped into
    pub batches_planned: usize,
    /// batches whose read or decode failed
    pub batches_failed: usize,
    /// numeric handles written
    pub numeric_updates: usize,
    /// text handles written
    pub text_updates: usize,
    /// decoded registers that updated nothing
    pub skipped: usize,
}

impl CycleReport {
    /// `true` if every planned batch was read and decoded
    pub fn is_complete(&self) -> bool {
        self.batches_failed == 0
    }
}

impl std::fmt::Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "batches: {}/{} ok, updates: {} numeric {} text, skipped: {}",
            self.batches_planned - self.batches_failed,
            self.batches_planned,
            self.numeric_updates,
            self.text_updates,
            self.skipped
        )
    }
}

#[derive(Debug, thiserror::Error)]
enum BatchError {
    #[error("read failed: {0}")]
    Read(#[from] RequestError),
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
}

/// Polls the configured registers and publishes their values through the metric registry
pub struct Collector<T, C> {
    transport: T,
    catalog: C,
    registry: MetricRegistry,
    names: Vec<String>,
}

impl<T, C> Collector<T, C>
where
    T: RegisterTransport,
    C: RegisterCatalog,
{
    /// Create a collector for the configured register `names`
    pub fn new(transport: T, catalog: C, registry: MetricRegistry, names: Vec<String>) -> Self {
        Self {
            transport,
            catalog,
            registry,
            names,
        }
    }

    /// The registry values are published through
    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// The underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one poll cycle
    ///
    /// A batch that cannot be read or decoded is logged and skipped; the other batches of the
    /// cycle still update their metrics. Metrics of skipped registers keep their last value.
    pub async fn collect_once(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        let batches = self.plan(&mut report);
        report.batches_planned = batches.len();

        for batch in &batches {
            match self.collect_batch(batch).await {
                Ok(decoded) => {
                    for register in decoded {
                        self.dispatch(register, &mut report);
                    }
                }
                Err(err) => {
                    report.batches_failed += 1;
                    tracing::warn!(
                        start = batch.range.start,
                        count = batch.range.count,
                        "skipping batch: {}",
                        err
                    );
                }
            }
        }

        report
    }

    fn plan(&self, report: &mut CycleReport) -> Vec<Batch> {
        let descriptors: Vec<RegisterDescriptor> = self
            .names
            .iter()
            .filter_map(|name| match self.catalog.resolve(name) {
                Some(descriptor) => Some(descriptor),
                None => {
                    report.unresolved += 1;
                    tracing::warn!(register = %name, "unknown register, not polled");
                    None
                }
            })
            .collect();

        if descriptors.is_empty() {
            return Vec::new();
        }

        self.catalog.group_for_batching(&descriptors)
    }

    async fn collect_batch(&mut self, batch: &Batch) -> Result<Vec<DecodedRegister>, BatchError> {
        let words = self.transport.read_holding_registers(batch.range).await?;
        Ok(self.catalog.decode(&words, batch)?)
    }

    fn dispatch(&self, register: DecodedRegister, report: &mut CycleReport) {
        let descriptor = &register.descriptor;

        let Some(id) = descriptor
            .description()
            .and_then(MetricIdentity::from_description)
        else {
            tracing::warn!(register = %descriptor.name, "malformed register without description");
            report.skipped += 1;
            return;
        };

        let Some(value) = register.value.as_ref() else {
            tracing::debug!(register = %descriptor.name, "no value");
            report.skipped += 1;
            return;
        };

        match value.classify() {
            Classified::Numeric(x) => match self.registry.numeric(&id) {
                Some(handle) => {
                    handle.set(x);
                    report.numeric_updates += 1;
                }
                None => {
                    tracing::debug!(register = %descriptor.name, "no numeric metric {}", id);
                    report.skipped += 1;
                }
            },
            Classified::Textual(text) => match self.registry.text(&id) {
                Some(handle) => {
                    let text = match descriptor.suffix() {
                        Some(suffix) => format!("{text} {suffix}"),
                        None => text,
                    };
                    handle.set_text(&text);
                    report.text_updates += 1;
                }
                None => {
                    tracing::debug!(register = %descriptor.name, "no text metric {}", id);
                    report.skipped += 1;
                }
            },
            Classified::Unclassifiable => {
                tracing::debug!(
                    register = %descriptor.name,
                    "value '{}' is neither numeric nor text",
                    value
                );
                report.skipped += 1;
            }
        }
    }
}
