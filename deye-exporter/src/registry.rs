use std::collections::{BTreeMap, HashMap};

use crate::catalog::RegisterCatalog;
use crate::error::SinkError;
use crate::identity::{metric_label, MetricIdentity};
use crate::metrics::{MetricSink, NumericHandle, TextHandle};

/// Numeric and text handles of every published metric, keyed by identity
///
/// Built once at startup; only the values behind the handles change afterwards.
#[derive(Default)]
pub struct MetricRegistry {
    numeric: HashMap<MetricIdentity, Box<dyn NumericHandle>>,
    text: HashMap<MetricIdentity, Box<dyn TextHandle>>,
    labels: BTreeMap<MetricIdentity, String>,
}

impl MetricRegistry {
    /// numeric handle of `id`
    pub fn numeric(&self, id: &MetricIdentity) -> Option<&dyn NumericHandle> {
        self.numeric.get(id).map(|x| x.as_ref())
    }

    /// text handle of `id`
    pub fn text(&self, id: &MetricIdentity) -> Option<&dyn TextHandle> {
        self.text.get(id).map(|x| x.as_ref())
    }

    /// identity to label mapping of every registered metric
    pub fn labels(&self) -> &BTreeMap<MetricIdentity, String> {
        &self.labels
    }

    /// number of registered identities
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// `true` if no metric is registered
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.labels.iter()).finish()
    }
}

/// Resolve the configured register names and create a numeric and a text handle for each
///
/// Unknown names, registers without a description and identities that were already registered in
/// this build are skipped with a warning. A sink refusing a handle aborts the build.
pub fn build_registry<C, S>(
    names: &[String],
    catalog: &C,
    sink: &mut S,
) -> Result<MetricRegistry, SinkError>
where
    C: RegisterCatalog + ?Sized,
    S: MetricSink + ?Sized,
{
    let mut registry = MetricRegistry::default();
    let mut registered_by: HashMap<MetricIdentity, String> = HashMap::new();

    for name in names {
        let Some(descriptor) = catalog.resolve(name) else {
            tracing::warn!(register = %name, "unknown register, skipping");
            continue;
        };

        let Some(description) = descriptor.description() else {
            tracing::warn!(register = %name, "register has no description, skipping");
            continue;
        };

        let Some(id) = MetricIdentity::from_description(description) else {
            tracing::warn!(
                register = %name,
                "description '{}' does not yield a metric name, skipping",
                description
            );
            continue;
        };

        if let Some(previous) = registered_by.get(&id) {
            if previous == name {
                tracing::warn!(register = %name, "register configured twice, skipping");
            } else {
                tracing::warn!(
                    register = %name,
                    "metric {} is already published for register {}, skipping",
                    id,
                    previous
                );
            }
            continue;
        }

        let label = metric_label(description, descriptor.suffix());
        let numeric = sink.create_numeric(&id, &label)?;
        let text = sink.create_text(&id, &label)?;

        tracing::debug!(register = %name, "registered metric {}: {}", id, label);
        registry.numeric.insert(id.clone(), numeric);
        registry.text.insert(id.clone(), text);
        registry.labels.insert(id.clone(), label);
        registered_by.insert(id, name.clone());
    }

    Ok(registry)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::{
        Batch, DecodedRegister, DeyeCatalog, RegisterDescriptor, ValueKind,
    };
    use crate::error::DecodeError;
    use crate::metrics::testing::RecordingSink;
    use crate::metrics::PrometheusSink;

    pub(crate) fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|x| x.to_string()).collect()
    }

    /// catalog with registers that the Deye table cannot express
    struct OddCatalog;

    impl RegisterCatalog for OddCatalog {
        fn resolve(&self, name: &str) -> Option<RegisterDescriptor> {
            let description = match name {
                "Undescribed" => None,
                "Blank" => Some("   "),
                "Punctuation" => Some("--"),
                "VoltageA" => Some("Battery voltage"),
                "VoltageB" => Some("battery  VOLTAGE"),
                _ => return None,
            };
            Some(RegisterDescriptor {
                name: name.to_string(),
                description: description.map(str::to_string),
                suffix: None,
                address: 0,
                words: 1,
                kind: ValueKind::RAW,
            })
        }

        fn names(&self) -> Vec<String> {
            Vec::new()
        }

        fn group_for_batching(&self, _: &[RegisterDescriptor]) -> Vec<Batch> {
            Vec::new()
        }

        fn decode(&self, _: &[u16], _: &Batch) -> Result<Vec<DecodedRegister>, DecodeError> {
            Ok(Vec::new())
        }
    }

    fn identities(registry: &MetricRegistry) -> Vec<&str> {
        registry.labels().keys().map(MetricIdentity::as_str).collect()
    }

    #[test]
    fn registers_numeric_and_text_handle_per_register() {
        let mut sink = RecordingSink::default();
        let registry = build_registry(
            &names(&["BatterySOC", "BatteryVoltage"]),
            &DeyeCatalog::new(),
            &mut sink,
        )
        .unwrap();

        assert_eq!(
            identities(&registry),
            vec!["deye_battery_state_of_charge", "deye_battery_voltage"]
        );
        let id = MetricIdentity::from_description("Battery voltage").unwrap();
        assert!(registry.numeric(&id).is_some());
        assert!(registry.text(&id).is_some());
        assert_eq!(
            registry.labels().get(&id).map(String::as_str),
            Some("Battery Voltage (V)")
        );
        assert_eq!(sink.created.lock().unwrap().len(), 4);
    }

    #[test]
    fn unknown_names_are_excluded() {
        let mut sink = RecordingSink::default();
        let registry = build_registry(
            &names(&["UnknownReg", "BatterySOC"]),
            &DeyeCatalog::new(),
            &mut sink,
        )
        .unwrap();
        assert_eq!(identities(&registry), vec!["deye_battery_state_of_charge"]);
    }

    #[test]
    fn only_unknown_names_yield_empty_registry() {
        let mut sink = RecordingSink::default();
        let registry =
            build_registry(&names(&["UnknownReg"]), &DeyeCatalog::new(), &mut sink).unwrap();
        assert!(registry.is_empty());
        assert!(sink.created.lock().unwrap().is_empty());
    }

    #[test]
    fn registers_without_description_are_skipped() {
        let mut sink = RecordingSink::default();
        let registry = build_registry(
            &names(&["Undescribed", "Blank", "Punctuation", "VoltageA"]),
            &OddCatalog,
            &mut sink,
        )
        .unwrap();
        assert_eq!(identities(&registry), vec!["deye_battery_voltage"]);
    }

    #[test]
    fn colliding_identities_register_once() {
        let mut sink = RecordingSink::default();
        let registry = build_registry(
            &names(&["VoltageA", "VoltageB", "VoltageA"]),
            &OddCatalog,
            &mut sink,
        )
        .unwrap();
        assert_eq!(registry.len(), 1);
        // one numeric and one text handle
        assert_eq!(sink.created.lock().unwrap().len(), 2);
    }

    #[test]
    fn build_is_idempotent() {
        let input = names(&["RunState", "BatterySOC", "UnknownReg", "GridPower"]);
        let first = build_registry(&input, &DeyeCatalog::new(), &mut RecordingSink::default())
            .unwrap();
        let second = build_registry(&input, &DeyeCatalog::new(), &mut RecordingSink::default())
            .unwrap();
        assert_eq!(first.labels(), second.labels());
    }

    #[test]
    fn sink_refusal_is_fatal() {
        let mut sink = PrometheusSink::new(prometheus::Registry::new());
        let catalog = DeyeCatalog::new();
        build_registry(&names(&["BatterySOC"]), &catalog, &mut sink).unwrap();
        assert!(matches!(
            build_registry(&names(&["BatterySOC"]), &catalog, &mut sink),
            Err(SinkError::Duplicate(_))
        ));
    }
}
