//! Solarman V5 envelope that wraps Modbus RTU frames on the data-logger TCP port
//!
//! ```text
//! | start | length | control | sequence | logger serial | payload ... | checksum | end  |
//! | 0xA5  | u16 LE | u16 LE  | u16 LE   | u32 LE        | length     | u8       | 0x15 |
//! ```

use crate::common::buffer::ReadBuffer;
use crate::common::phys::PhysLayer;
use crate::constants::v5::*;
use crate::decode::{DecodeLevel, FrameDecodeLevel};
use crate::error::{AduParseError, FrameParseError, InternalError, RequestError};
use crate::types::LoggerSerial;

pub(crate) mod constants {
    /// start + length + control + sequence + logger serial
    pub(crate) const HEADER_LENGTH: usize = 11;
    /// checksum + end
    pub(crate) const TRAILER_LENGTH: usize = 2;
    /// frame type + sensor type + total working time + power on time + offset time
    pub(crate) const REQUEST_PREFIX_LENGTH: usize = 15;
    /// frame type + status + total working time + power on time + offset time
    pub(crate) const RESPONSE_PREFIX_LENGTH: usize = 14;
    pub(crate) const MAX_PAYLOAD_LENGTH: usize = 512;
    pub(crate) const MAX_FRAME_LENGTH: usize = HEADER_LENGTH + MAX_PAYLOAD_LENGTH + TRAILER_LENGTH;
}

/// Sequence number placed in each request, the logger echoes the low byte
#[derive(PartialEq, Eq, Copy, Clone, Debug, Default)]
pub(crate) struct Sequence {
    value: u16,
}

impl Sequence {
    #[cfg(test)]
    pub(crate) fn new(value: u16) -> Self {
        Sequence { value }
    }

    pub(crate) fn to_u16(self) -> u16 {
        self.value
    }

    pub(crate) fn echo(self) -> u8 {
        self.value.to_le_bytes()[0]
    }

    pub(crate) fn next(&mut self) -> Sequence {
        let ret = *self;
        self.value = self.value.wrapping_add(1);
        ret
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06X}", self.value)
    }
}

fn sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, x| acc.wrapping_add(*x))
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct V5Header {
    pub(crate) control: u16,
    pub(crate) sequence: u16,
    pub(crate) serial: LoggerSerial,
    length: usize,
    // running checksum of every header byte after the start marker
    checksum: u8,
}

pub(crate) struct V5Frame {
    pub(crate) header: V5Header,
    pub(crate) payload: Vec<u8>,
}

impl V5Frame {
    pub(crate) fn is_response(&self) -> bool {
        self.header.control == CONTROL_RESPONSE
    }

    /// check that this frame answers the request sent with `sequence` to `serial`
    pub(crate) fn validate(
        &self,
        sequence: Sequence,
        serial: LoggerSerial,
    ) -> Result<(), FrameParseError> {
        let echo = self.header.sequence.to_le_bytes()[0];
        if echo != sequence.echo() {
            return Err(FrameParseError::SequenceMismatch(sequence.echo(), echo));
        }
        if self.header.serial != serial {
            return Err(FrameParseError::LoggerSerialMismatch(
                serial.value,
                self.header.serial.value,
            ));
        }
        Ok(())
    }

    /// the Modbus RTU frame carried by a response payload
    pub(crate) fn modbus_response(&self) -> Result<&[u8], AduParseError> {
        let frame_type = *self
            .payload
            .first()
            .ok_or(AduParseError::InsufficientBytes)?;
        if frame_type != FRAME_TYPE_INVERTER {
            return Err(AduParseError::UnexpectedFrameType(frame_type));
        }
        let modbus = self
            .payload
            .get(constants::RESPONSE_PREFIX_LENGTH..)
            .ok_or(AduParseError::InsufficientBytes)?;
        if modbus.len() < crate::rtu::constants::MIN_RESPONSE_LENGTH {
            return Err(AduParseError::NoModbusFrame);
        }
        Ok(modbus)
    }
}

#[derive(Clone, Copy)]
enum ParseState {
    Begin,
    Header(V5Header),
}

pub(crate) struct V5Parser {
    state: ParseState,
}

impl V5Parser {
    pub(crate) fn new() -> Self {
        Self {
            state: ParseState::Begin,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.state = ParseState::Begin;
    }

    fn parse_header(cursor: &mut ReadBuffer) -> Result<V5Header, RequestError> {
        let start = cursor.read_u8()?;
        if start != START {
            return Err(FrameParseError::UnexpectedStart(start).into());
        }

        let length = cursor.read_u16_le()?;
        let control = cursor.read_u16_le()?;
        let sequence = cursor.read_u16_le()?;
        let serial = cursor.read_u32_le()?;

        let length = length as usize;
        if length > constants::MAX_PAYLOAD_LENGTH {
            return Err(FrameParseError::FrameLengthTooBig(
                length,
                constants::MAX_PAYLOAD_LENGTH,
            )
            .into());
        }

        let checksum = sum(&(length as u16).to_le_bytes())
            .wrapping_add(sum(&control.to_le_bytes()))
            .wrapping_add(sum(&sequence.to_le_bytes()))
            .wrapping_add(sum(&serial.to_le_bytes()));

        Ok(V5Header {
            control,
            sequence,
            serial: LoggerSerial::new(serial),
            length,
            checksum,
        })
    }

    fn parse_body(header: &V5Header, cursor: &mut ReadBuffer) -> Result<V5Frame, RequestError> {
        let payload = cursor.read(header.length)?.to_vec();
        let received = cursor.read_u8()?;
        let end = cursor.read_u8()?;

        let expected = header.checksum.wrapping_add(sum(&payload));
        if received != expected {
            return Err(FrameParseError::ChecksumMismatch(received, expected).into());
        }
        if end != END {
            return Err(FrameParseError::UnexpectedEnd(end).into());
        }

        Ok(V5Frame {
            header: *header,
            payload,
        })
    }

    /// Parse bytes using the provided cursor. Advancing the cursor always implies that the bytes
    /// are consumed and can be discarded
    ///
    /// Err implies the input data is invalid
    /// Ok(None) implies that more data is required to complete parsing
    /// Ok(Some(..)) will contain a fully parsed frame and will advance the cursor appropriately
    pub(crate) fn parse(&mut self, cursor: &mut ReadBuffer) -> Result<Option<V5Frame>, RequestError> {
        match self.state {
            ParseState::Header(header) => {
                if cursor.len() < header.length + constants::TRAILER_LENGTH {
                    return Ok(None);
                }

                self.state = ParseState::Begin;
                Self::parse_body(&header, cursor).map(Some)
            }
            ParseState::Begin => {
                if cursor.len() < constants::HEADER_LENGTH {
                    return Ok(None);
                }

                self.state = ParseState::Header(Self::parse_header(cursor)?);
                self.parse(cursor)
            }
        }
    }
}

pub(crate) struct V5Reader {
    parser: V5Parser,
    buffer: ReadBuffer,
}

impl V5Reader {
    pub(crate) fn new() -> Self {
        Self {
            parser: V5Parser::new(),
            buffer: ReadBuffer::new(constants::MAX_FRAME_LENGTH),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.parser.reset();
        self.buffer.clear();
    }

    pub(crate) async fn next_frame(
        &mut self,
        io: &mut PhysLayer,
        decode: DecodeLevel,
    ) -> Result<V5Frame, RequestError> {
        loop {
            match self.parser.parse(&mut self.buffer)? {
                Some(frame) => {
                    if decode.frame.enabled() {
                        tracing::info!(
                            "V5 RX - {}",
                            V5Display::new(decode.frame, &frame.header, &frame.payload)
                        );
                    }
                    return Ok(frame);
                }
                None => {
                    self.buffer.read_some(io, decode.physical).await?;
                }
            }
        }
    }
}

pub(crate) struct V5Formatter {
    buffer: Vec<u8>,
}

impl V5Formatter {
    pub(crate) fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(constants::MAX_FRAME_LENGTH),
        }
    }

    /// wrap a Modbus RTU request into a V5 request frame
    pub(crate) fn format_request(
        &mut self,
        sequence: Sequence,
        serial: LoggerSerial,
        modbus: &[u8],
        level: FrameDecodeLevel,
    ) -> Result<&[u8], RequestError> {
        let payload_length = constants::REQUEST_PREFIX_LENGTH + modbus.len();
        let length = u16::try_from(payload_length)
            .map_err(|_| InternalError::FrameTooBig(payload_length))?;

        self.buffer.clear();
        self.buffer.push(START);
        self.buffer.extend_from_slice(&length.to_le_bytes());
        self.buffer.extend_from_slice(&CONTROL_REQUEST.to_le_bytes());
        self.buffer.extend_from_slice(&sequence.to_u16().to_le_bytes());
        self.buffer.extend_from_slice(&serial.value.to_le_bytes());
        self.buffer.push(FRAME_TYPE_INVERTER);
        // sensor type, total working time, power on time, offset time
        self.buffer.extend_from_slice(&[0; constants::REQUEST_PREFIX_LENGTH - 1]);
        self.buffer.extend_from_slice(modbus);
        let checksum = sum(&self.buffer[1..]);
        self.buffer.push(checksum);
        self.buffer.push(END);

        if level.enabled() {
            let header = V5Header {
                control: CONTROL_REQUEST,
                sequence: sequence.to_u16(),
                serial,
                length: payload_length,
                checksum,
            };
            let payload = &self.buffer[constants::HEADER_LENGTH..constants::HEADER_LENGTH + payload_length];
            tracing::info!("V5 TX - {}", V5Display::new(level, &header, payload));
        }

        Ok(self.buffer.as_slice())
    }
}

pub(crate) struct V5Display<'a> {
    level: FrameDecodeLevel,
    header: &'a V5Header,
    payload: &'a [u8],
}

impl<'a> V5Display<'a> {
    pub(crate) fn new(level: FrameDecodeLevel, header: &'a V5Header, payload: &'a [u8]) -> Self {
        V5Display {
            level,
            header,
            payload,
        }
    }
}

impl std::fmt::Display for V5Display<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "ctrl: {:#06X} seq: {:#06X} logger: {} (payload len = {})",
            self.header.control,
            self.header.sequence,
            self.header.serial,
            self.payload.len(),
        )?;
        if self.level.payload_enabled() {
            crate::common::phys::format_bytes(f, self.payload)?;
        }
        Ok(())
    }
}
