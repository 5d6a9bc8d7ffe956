use std::collections::BTreeMap;

use solarman::AddressRange;

use crate::catalog::decode::decode_batch;
use crate::catalog::group::group_registers;
use crate::catalog::{Batch, DecodedRegister, RegisterCatalog, RegisterDescriptor, ValueKind};
use crate::error::DecodeError;

const DEVICE_TYPES: &[(u16, &str)] = &[
    (0x0002, "String inverter"),
    (0x0003, "Single-phase hybrid"),
    (0x0004, "Microinverter"),
    (0x0005, "Low-voltage three-phase hybrid"),
    (0x0006, "High-voltage three-phase hybrid"),
];

const RUNNING_STATES: &[(u16, &str)] = &[
    (0, "Standby"),
    (1, "Self-check"),
    (2, "Normal"),
    (3, "Alarm"),
    (4, "Fault"),
];

const FAULTS: &[(u16, &str)] = &[
    (1, "F13 working mode change"),
    (6, "F18 AC over current"),
    (7, "F20 DC over current"),
    (9, "F22 tz emergency stop"),
    (10, "F23 tz GFCI over current"),
    (12, "F26 DC busbar imbalanced"),
    (16, "F29 parallel CAN bus fault"),
    (18, "F35 no AC grid"),
    (25, "F42 AC line low voltage"),
    (30, "F47 AC over frequency"),
    (31, "F48 AC lower frequency"),
    (40, "F56 DC busbar voltage too low"),
    (42, "F58 BMS communication fault"),
    (47, "F63 ARC fault"),
    (48, "F64 heat sink high temperature"),
];

const fn unsigned(divisor: u32) -> ValueKind {
    ValueKind::Unsigned { divisor, offset: 0 }
}

const fn signed(divisor: u32) -> ValueKind {
    ValueKind::Signed { divisor, offset: 0 }
}

const fn total(divisor: u32) -> ValueKind {
    ValueKind::Unsigned32 { divisor }
}

// temperatures are reported in 0.1 degrees above -100
const TEMPERATURE: ValueKind = ValueKind::Unsigned {
    divisor: 10,
    offset: -1000,
};

struct Definition {
    name: &'static str,
    description: &'static str,
    suffix: Option<&'static str>,
    address: u16,
    words: u16,
    kind: ValueKind,
}

const fn def(
    name: &'static str,
    description: &'static str,
    suffix: Option<&'static str>,
    address: u16,
    words: u16,
    kind: ValueKind,
) -> Definition {
    Definition {
        name,
        description,
        suffix,
        address,
        words,
        kind,
    }
}

const KWH: Option<&str> = Some("kWh");
const W: Option<&str> = Some("W");
const V: Option<&str> = Some("V");
const A: Option<&str> = Some("A");
const CELSIUS: Option<&str> = Some("°C");

/// Holding registers of Deye single-phase hybrid inverters (SUN-xK-SG0xLP1)
const DEFINITIONS: &[Definition] = &[
    def("DeviceType", "Device type", None, 0, 1, ValueKind::Enum(DEVICE_TYPES)),
    def("ModbusAddress", "Modbus address", None, 1, 1, ValueKind::RAW),
    def("SerialNumber", "Serial number", None, 3, 5, ValueKind::Ascii),
    def("RatedPower", "Rated power", W, 16, 2, total(10)),
    def("SystemTime", "System time", None, 22, 3, ValueKind::DateTime),
    def("RunState", "Running state", None, 59, 1, ValueKind::Enum(RUNNING_STATES)),
    def("DailyBatteryCharge", "Daily battery charge", KWH, 70, 1, unsigned(10)),
    def("DailyBatteryDischarge", "Daily battery discharge", KWH, 71, 1, unsigned(10)),
    def("TotalBatteryCharge", "Total battery charge", KWH, 72, 2, total(10)),
    def("TotalBatteryDischarge", "Total battery discharge", KWH, 74, 2, total(10)),
    def("DailyEnergyBought", "Daily energy bought", KWH, 76, 1, unsigned(10)),
    def("DailyEnergySold", "Daily energy sold", KWH, 77, 1, unsigned(10)),
    def("TotalEnergyBought", "Total energy bought", KWH, 78, 2, total(10)),
    def("TotalEnergySold", "Total energy sold", KWH, 81, 2, total(10)),
    def("DailyLoadConsumption", "Daily load consumption", KWH, 84, 1, unsigned(10)),
    def("TotalLoadConsumption", "Total load consumption", KWH, 85, 2, total(10)),
    def("DCTransformerTemp", "DC transformer temperature", CELSIUS, 90, 1, TEMPERATURE),
    def("HeatSinkTemp", "Heat sink temperature", CELSIUS, 91, 1, TEMPERATURE),
    def("TotalProduction", "Total production", KWH, 96, 2, total(10)),
    def("Faults", "Fault information", None, 103, 4, ValueKind::Faults(FAULTS)),
    def("DailyProduction", "Daily production", KWH, 108, 1, unsigned(10)),
    def("PV1Voltage", "PV1 voltage", V, 109, 1, unsigned(10)),
    def("PV1Current", "PV1 current", A, 110, 1, unsigned(10)),
    def("PV2Voltage", "PV2 voltage", V, 111, 1, unsigned(10)),
    def("PV2Current", "PV2 current", A, 112, 1, unsigned(10)),
    def("GridVoltage", "Grid voltage", V, 150, 1, unsigned(10)),
    def("GridPower", "Grid power", W, 169, 1, signed(1)),
    def("InverterPower", "Inverter output power", W, 175, 1, signed(1)),
    def("LoadPower", "Load power", W, 178, 1, signed(1)),
    def("BatteryTemp", "Battery temperature", CELSIUS, 182, 1, TEMPERATURE),
    def("BatteryVoltage", "Battery voltage", V, 183, 1, unsigned(100)),
    def("BatterySOC", "Battery state of charge", Some("%"), 184, 1, ValueKind::RAW),
    def("PV1Power", "PV1 power", W, 186, 1, ValueKind::RAW),
    def("PV2Power", "PV2 power", W, 187, 1, ValueKind::RAW),
    def("BatteryPower", "Battery power", W, 190, 1, signed(1)),
    def("BatteryCurrent", "Battery current", A, 191, 1, signed(100)),
    def("LoadFrequency", "Load frequency", Some("Hz"), 192, 1, unsigned(100)),
    def("GridConnected", "Grid relay closed", None, 194, 1, ValueKind::Bool),
];

/// Closed catalog of Deye inverter holding registers
pub struct DeyeCatalog {
    registers: BTreeMap<&'static str, RegisterDescriptor>,
    max_span: u16,
}

impl DeyeCatalog {
    /// Create the catalog with the largest batch a single request allows
    pub fn new() -> Self {
        Self::with_max_span(AddressRange::MAX_READ_COUNT)
    }

    /// Create the catalog, limiting each read batch to `max_span` words
    pub fn with_max_span(max_span: u16) -> Self {
        let registers = DEFINITIONS
            .iter()
            .map(|x| {
                let descriptor = RegisterDescriptor {
                    name: x.name.to_string(),
                    description: Some(x.description.to_string()),
                    suffix: x.suffix.map(str::to_string),
                    address: x.address,
                    words: x.words,
                    kind: x.kind.clone(),
                };
                (x.name, descriptor)
            })
            .collect();

        Self {
            registers,
            max_span: max_span.clamp(1, AddressRange::MAX_READ_COUNT),
        }
    }
}

impl Default for DeyeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterCatalog for DeyeCatalog {
    fn resolve(&self, name: &str) -> Option<RegisterDescriptor> {
        self.registers.get(name).cloned()
    }

    fn names(&self) -> Vec<String> {
        let mut registers: Vec<&RegisterDescriptor> = self.registers.values().collect();
        registers.sort_by_key(|x| x.address);
        registers.into_iter().map(|x| x.name.clone()).collect()
    }

    fn group_for_batching(&self, descriptors: &[RegisterDescriptor]) -> Vec<Batch> {
        group_registers(descriptors, self.max_span)
    }

    fn decode(&self, words: &[u16], batch: &Batch) -> Result<Vec<DecodedRegister>, DecodeError> {
        decode_batch(words, batch)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::identity::MetricIdentity;
    use crate::value::RegisterValue;

    #[test]
    fn resolves_known_names_only() {
        let catalog = DeyeCatalog::new();
        let soc = catalog.resolve("BatterySOC").unwrap();
        assert_eq!(soc.address, 184);
        assert_eq!(soc.description(), Some("Battery state of charge"));
        assert_eq!(soc.suffix(), Some("%"));
        assert!(catalog.resolve("UnknownReg").is_none());
        assert!(catalog.resolve("batterysoc").is_none());
    }

    #[test]
    fn names_are_unique_and_in_address_order() {
        let catalog = DeyeCatalog::new();
        let names = catalog.names();
        assert_eq!(names.len(), DEFINITIONS.len());
        assert_eq!(names.first().map(String::as_str), Some("DeviceType"));
        let addresses: Vec<u16> = names
            .iter()
            .map(|x| catalog.resolve(x).unwrap().address)
            .collect();
        assert!(addresses.windows(2).all(|x| x[0] < x[1]));
    }

    #[test]
    fn definitions_do_not_overlap() {
        let mut sorted: Vec<&Definition> = DEFINITIONS.iter().collect();
        sorted.sort_by_key(|x| x.address);
        for pair in sorted.windows(2) {
            assert!(
                pair[0].address + pair[0].words <= pair[1].address,
                "{} overlaps {}",
                pair[0].name,
                pair[1].name
            );
        }
    }

    #[test]
    fn descriptions_yield_distinct_identities() {
        let identities: HashSet<MetricIdentity> = DEFINITIONS
            .iter()
            .map(|x| MetricIdentity::from_description(x.description).unwrap())
            .collect();
        assert_eq!(identities.len(), DEFINITIONS.len());
    }

    #[test]
    fn full_catalog_fits_in_two_batches() {
        let catalog = DeyeCatalog::new();
        let descriptors: Vec<RegisterDescriptor> = catalog
            .names()
            .iter()
            .filter_map(|x| catalog.resolve(x))
            .collect();
        let batches = catalog.group_for_batching(&descriptors);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].range.start, 0);
        assert_eq!(batches[1].range.start, 150);
        let covered: usize = batches.iter().map(|x| x.registers.len()).sum();
        assert_eq!(covered, DEFINITIONS.len());
    }

    #[test]
    fn decodes_battery_batch() {
        let catalog = DeyeCatalog::new();
        let descriptors = vec![
            catalog.resolve("BatterySOC").unwrap(),
            catalog.resolve("BatteryVoltage").unwrap(),
        ];
        let batches = catalog.group_for_batching(&descriptors);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].range, AddressRange::try_from(183, 2).unwrap());

        let decoded = catalog.decode(&[5230, 87], &batches[0]).unwrap();
        let values: Vec<(&str, Option<RegisterValue>)> = decoded
            .iter()
            .map(|x| (x.descriptor.name.as_str(), x.value.clone()))
            .collect();
        assert_eq!(
            values,
            vec![
                ("BatteryVoltage", Some(RegisterValue::Float(52.3))),
                ("BatterySOC", Some(RegisterValue::Integer(87))),
            ]
        );
    }

    #[test]
    fn small_span_produces_more_batches() {
        let catalog = DeyeCatalog::with_max_span(10);
        let descriptors = vec![
            catalog.resolve("DailyBatteryCharge").unwrap(),
            catalog.resolve("DailyLoadConsumption").unwrap(),
        ];
        assert_eq!(catalog.group_for_batching(&descriptors).len(), 2);
    }
}
