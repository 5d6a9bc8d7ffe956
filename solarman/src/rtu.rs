//! Modbus RTU framing of the read holding registers request/response carried inside V5 frames

use crate::decode::FrameDecodeLevel;
use crate::error::{AduParseError, FrameParseError, RequestError};
use crate::exception::ExceptionCode;
use crate::types::{AddressRange, SlaveId};

pub(crate) mod constants {
    pub(crate) const READ_HOLDING_REGISTERS: u8 = 0x03;
    pub(crate) const ERROR_DELIMITER: u8 = 0x80;
    pub(crate) const CRC_LENGTH: usize = 2;
    /// slave id + function + (byte count | exception code) + crc
    pub(crate) const MIN_RESPONSE_LENGTH: usize = 3 + CRC_LENGTH;
    /// slave id + function + start + count + crc
    pub(crate) const REQUEST_LENGTH: usize = 6 + CRC_LENGTH;
}

/// precomputes the CRC table as a constant!
const CRC: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_MODBUS);

pub(crate) fn format_read_holding_registers(
    out: &mut Vec<u8>,
    slave: SlaveId,
    range: AddressRange,
) {
    let start_frame = out.len();
    out.push(slave.value);
    out.push(constants::READ_HOLDING_REGISTERS);
    out.extend_from_slice(&range.start.to_be_bytes());
    out.extend_from_slice(&range.count.to_be_bytes());
    let crc = CRC.checksum(&out[start_frame..]);
    out.extend_from_slice(&crc.to_le_bytes());
}

/// Validate a read holding registers response and extract the register values
pub(crate) fn parse_read_holding_registers(
    frame: &[u8],
    slave: SlaveId,
    range: AddressRange,
    level: FrameDecodeLevel,
) -> Result<Vec<u16>, RequestError> {
    if frame.len() < constants::MIN_RESPONSE_LENGTH {
        return Err(AduParseError::InsufficientBytes.into());
    }

    let (body, crc) = frame.split_at(frame.len() - constants::CRC_LENGTH);
    let received_crc = u16::from_le_bytes([crc[0], crc[1]]);
    let expected_crc = CRC.checksum(body);
    if received_crc != expected_crc {
        return Err(FrameParseError::CrcValidationFailure(received_crc, expected_crc).into());
    }

    if level.enabled() {
        tracing::info!("RTU RX - {}", RtuDisplay::new(level, body, received_crc));
    }

    let (unit, function) = (body[0], body[1]);
    if unit != slave.value {
        return Err(AduParseError::SlaveIdMismatch(slave.value, unit).into());
    }

    match function {
        constants::READ_HOLDING_REGISTERS => {}
        x if x == constants::READ_HOLDING_REGISTERS | constants::ERROR_DELIMITER => {
            return Err(ExceptionCode::from(body[2]).into());
        }
        x => {
            return Err(AduParseError::UnknownResponseFunction(
                x,
                constants::READ_HOLDING_REGISTERS,
                constants::READ_HOLDING_REGISTERS | constants::ERROR_DELIMITER,
            )
            .into());
        }
    }

    let byte_count = body[2] as usize;
    let data = &body[3..];
    if byte_count > data.len() {
        return Err(AduParseError::InsufficientBytesForByteCount(byte_count, data.len()).into());
    }
    if byte_count < data.len() {
        return Err(AduParseError::TrailingBytes(data.len() - byte_count).into());
    }

    let expected = 2 * range.count as usize;
    if byte_count != expected {
        return Err(AduParseError::RequestByteCountMismatch(expected, byte_count).into());
    }

    Ok(data
        .chunks_exact(2)
        .map(|x| u16::from_be_bytes([x[0], x[1]]))
        .collect())
}

pub(crate) struct RtuDisplay<'a> {
    level: FrameDecodeLevel,
    body: &'a [u8],
    crc: u16,
}

impl<'a> RtuDisplay<'a> {
    pub(crate) fn new(level: FrameDecodeLevel, body: &'a [u8], crc: u16) -> Self {
        RtuDisplay { level, body, crc }
    }
}

impl std::fmt::Display for RtuDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.body {
            [unit, function, ..] => write!(
                f,
                "slave: {unit:#04X} fc: {function:#04X} crc: {:#06X} (len = {})",
                self.crc,
                self.body.len()
            )?,
            _ => write!(f, "crc: {:#06X} (len = {})", self.crc, self.body.len())?,
        }
        if self.level.payload_enabled() {
            crate::common::phys::format_bytes(f, self.body)?;
        }
        Ok(())
    }
}
