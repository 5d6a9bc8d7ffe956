//! Register catalog: name resolution, read batching and decoding of batch responses

use solarman::AddressRange;

use crate::error::DecodeError;
use crate::value::RegisterValue;

pub(crate) mod decode;
mod deye;
pub(crate) mod group;

pub use deye::DeyeCatalog;

/// How the raw words of a register turn into a value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueKind {
    /// `(raw + offset) / divisor` of one unsigned word
    Unsigned {
        /// applied after the offset
        divisor: u32,
        /// added to the raw value
        offset: i32,
    },
    /// `(raw + offset) / divisor` of one two's complement word
    Signed {
        /// applied after the offset
        divisor: u32,
        /// added to the raw value
        offset: i32,
    },
    /// `raw / divisor` of two words, low word first
    Unsigned32 {
        /// applied to the combined value
        divisor: u32,
    },
    /// non-zero word is `true`
    Bool,
    /// one word mapped to a name
    Enum(&'static [(u16, &'static str)]),
    /// two ASCII characters per word, high byte first
    Ascii,
    /// three words: year/month, day/hour, minute/second
    DateTime,
    /// bit field where every set bit maps to a fault message
    Faults(&'static [(u16, &'static str)]),
}

impl ValueKind {
    /// plain unsigned word
    pub const RAW: ValueKind = ValueKind::Unsigned {
        divisor: 1,
        offset: 0,
    };
}

/// Everything needed to read, decode and publish one named register
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterDescriptor {
    /// unique key of the register in its catalog
    pub name: String,
    /// human readable description, source of the metric identity
    pub description: Option<String>,
    /// unit of the value
    pub suffix: Option<String>,
    /// first holding register
    pub address: u16,
    /// number of holding registers
    pub words: u16,
    /// how the words decode
    pub kind: ValueKind,
}

impl RegisterDescriptor {
    /// description, if present and not blank
    pub fn description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|x| !x.is_empty())
    }

    /// unit suffix, if present and not blank
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref().map(str::trim).filter(|x| !x.is_empty())
    }

    /// one past the last address covered by the register
    pub(crate) fn end(&self) -> u32 {
        self.address as u32 + self.words as u32
    }
}

/// Contiguous address range read with a single request, and the registers it covers
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// range requested from the transport
    pub range: AddressRange,
    /// registers covered by the range, in address order
    pub registers: Vec<RegisterDescriptor>,
}

/// A register of a batch after decoding the batch response
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRegister {
    /// the register
    pub descriptor: RegisterDescriptor,
    /// decoded value, absent when the words hold no usable value
    pub value: Option<RegisterValue>,
}

/// Source of register definitions and of the logic to read them in batches
pub trait RegisterCatalog {
    /// Look up a register by name
    fn resolve(&self, name: &str) -> Option<RegisterDescriptor>;

    /// Names of every register in the catalog
    fn names(&self) -> Vec<String>;

    /// Group registers into read batches, ordered by address
    fn group_for_batching(&self, descriptors: &[RegisterDescriptor]) -> Vec<Batch>;

    /// Decode the words returned for `batch`
    fn decode(&self, words: &[u16], batch: &Batch) -> Result<Vec<DecodedRegister>, DecodeError>;
}
