use crate::constants::limits::MAX_READ_REGISTERS_COUNT;
use crate::error::InvalidRange;

/// Serial number printed on the Solarman data-logger stick
///
/// Every V5 frame carries it; the logger silently drops frames addressed to another serial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoggerSerial {
    /// underlying raw value
    pub value: u32,
}

/// Modbus slave id of the inverter behind the logger, just a type-safe wrapper around `u8`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlaveId {
    /// underlying raw value
    pub value: u8,
}

/// Start and count tuple used when reading registers
/// Cannot be constructed with invalid start/count
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AddressRange {
    /// Starting address of the range
    pub start: u16,
    /// Count of registers in the range
    pub count: u16,
}

impl LoggerSerial {
    /// Create a new logger serial
    pub fn new(value: u32) -> Self {
        Self { value }
    }
}

impl SlaveId {
    /// Create a new slave id
    pub fn new(value: u8) -> Self {
        Self { value }
    }
}

impl Default for SlaveId {
    fn default() -> Self {
        Self::new(1)
    }
}

impl std::fmt::Display for LoggerSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl std::fmt::Display for SlaveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#04X}", self.value)
    }
}

impl AddressRange {
    /// Maximum number of registers a single read may request
    pub const MAX_READ_COUNT: u16 = MAX_READ_REGISTERS_COUNT;

    /// Create a new address range
    pub fn try_from(start: u16, count: u16) -> Result<Self, InvalidRange> {
        if count == 0 {
            return Err(InvalidRange::CountOfZero);
        }

        let max_start = u16::MAX - (count - 1);

        if start > max_start {
            return Err(InvalidRange::AddressOverflow(start, count));
        }

        Ok(Self { start, count })
    }

    pub(crate) fn of_read_registers(self) -> Result<Self, InvalidRange> {
        if self.count > Self::MAX_READ_COUNT {
            return Err(InvalidRange::CountTooLargeForType(
                self.count,
                Self::MAX_READ_COUNT,
            ));
        }
        Ok(self)
    }
}

impl std::fmt::Display for AddressRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "start: {:#06X} qty: {}", self.start, self.count)
    }
}
