use crate::exception::ExceptionCode;

/// Top level error type returned by every client request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestError {
    /// An I/O error occurred while connecting, writing or reading
    Io(std::io::ErrorKind),
    /// The inverter replied with a Modbus exception
    Exception(ExceptionCode),
    /// The requested range is invalid
    BadRequest(InvalidRange),
    /// A V5 frame or its embedded Modbus RTU frame could not be parsed off the stream
    BadFrame(FrameParseError),
    /// The response was framed correctly but its content is invalid
    BadResponse(AduParseError),
    /// No response arrived before the configured timeout elapsed
    ResponseTimeout,
    /// Internal error that indicates a bug in the library
    Internal(InternalError),
}

impl RequestError {
    /// `true` if the connection that produced the error can no longer be trusted
    ///
    /// After one of these errors the stream may hold a partial or foreign frame, so the
    /// client drops the connection and reconnects on the next request.
    pub fn invalidates_connection(&self) -> bool {
        matches!(
            self,
            RequestError::Io(_) | RequestError::BadFrame(_) | RequestError::ResponseTimeout
        )
    }
}

impl std::error::Error for RequestError {}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RequestError::Io(kind) => write!(f, "I/O error: {kind}"),
            RequestError::Exception(ex) => write!(f, "Modbus exception: {ex}"),
            RequestError::BadRequest(err) => write!(f, "invalid request: {err}"),
            RequestError::BadFrame(err) => write!(f, "bad frame: {err}"),
            RequestError::BadResponse(err) => write!(f, "bad response: {err}"),
            RequestError::ResponseTimeout => {
                f.write_str("timeout occurred before receiving a response from the data logger")
            }
            RequestError::Internal(err) => write!(f, "internal error: {err}"),
        }
    }
}

impl From<std::io::Error> for RequestError {
    fn from(err: std::io::Error) -> Self {
        RequestError::Io(err.kind())
    }
}

impl From<tokio::time::error::Elapsed> for RequestError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        RequestError::ResponseTimeout
    }
}

impl From<ExceptionCode> for RequestError {
    fn from(ex: ExceptionCode) -> Self {
        RequestError::Exception(ex)
    }
}

impl From<InvalidRange> for RequestError {
    fn from(err: InvalidRange) -> Self {
        RequestError::BadRequest(err)
    }
}

impl From<FrameParseError> for RequestError {
    fn from(err: FrameParseError) -> Self {
        RequestError::BadFrame(err)
    }
}

impl From<AduParseError> for RequestError {
    fn from(err: AduParseError) -> Self {
        RequestError::BadResponse(err)
    }
}

impl From<InternalError> for RequestError {
    fn from(err: InternalError) -> Self {
        RequestError::Internal(err)
    }
}

/// Errors that result from an invalid address range
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidRange {
    /// The count of registers is zero
    CountOfZero,
    /// start + count would overflow the u16 address space
    AddressOverflow(u16, u16),
    /// The count exceeds the maximum for a single read
    CountTooLargeForType(u16, u16), // actual / limit
}

impl std::error::Error for InvalidRange {}

impl std::fmt::Display for InvalidRange {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InvalidRange::CountOfZero => f.write_str("range contains a count of zero"),
            InvalidRange::AddressOverflow(start, count) => write!(
                f,
                "start == {start} and count == {count} would overflow the representation of u16"
            ),
            InvalidRange::CountTooLargeForType(count, limit) => write!(
                f,
                "the request count of {count} exceeds the maximum of {limit} registers per read"
            ),
        }
    }
}

/// Errors that occur while parsing a frame off the stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameParseError {
    /// First byte was not the V5 start marker
    UnexpectedStart(u8),
    /// Last byte was not the V5 end marker
    UnexpectedEnd(u8),
    /// The length field exceeds what the receive buffer can hold
    FrameLengthTooBig(usize, usize), // actual / max
    /// The checksum in the frame does not match the calculated one
    ChecksumMismatch(u8, u8), // received / expected
    /// The response does not echo the sequence number of the request
    SequenceMismatch(u8, u8), // expected / received
    /// The response comes from a different data logger
    LoggerSerialMismatch(u32, u32), // expected / received
    /// CRC of the embedded Modbus RTU frame is invalid
    CrcValidationFailure(u16, u16), // received / expected
}

impl std::error::Error for FrameParseError {}

impl std::fmt::Display for FrameParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FrameParseError::UnexpectedStart(value) => {
                write!(f, "frame does not begin with the V5 start byte: {value:#04X}")
            }
            FrameParseError::UnexpectedEnd(value) => {
                write!(f, "frame does not end with the V5 end byte: {value:#04X}")
            }
            FrameParseError::FrameLengthTooBig(size, max) => write!(
                f,
                "received frame with payload length ({size}) that exceeds max allowed size ({max})"
            ),
            FrameParseError::ChecksumMismatch(received, expected) => write!(
                f,
                "received V5 checksum ({received:#04X}) does not match the expected value ({expected:#04X})"
            ),
            FrameParseError::SequenceMismatch(expected, received) => write!(
                f,
                "response sequence number ({received}) does not match the request ({expected})"
            ),
            FrameParseError::LoggerSerialMismatch(expected, received) => write!(
                f,
                "response from logger {received} while talking to logger {expected}"
            ),
            FrameParseError::CrcValidationFailure(received, expected) => write!(
                f,
                "received Modbus CRC ({received:#06X}) does not match the expected value ({expected:#06X})"
            ),
        }
    }
}

/// Errors that occur while parsing the content of a response
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AduParseError {
    /// The payload carries a frame type other than the inverter frame type
    UnexpectedFrameType(u8),
    /// The logger answered without an embedded Modbus frame
    NoModbusFrame,
    /// Response is too short to be valid
    InsufficientBytes,
    /// The Modbus frame comes from another slave id
    SlaveIdMismatch(u8, u8), // expected / actual
    /// An unknown response function code was received
    UnknownResponseFunction(u8, u8, u8), // actual, expected, expected error
    /// Byte count doesn't match what is expected based on the request
    RequestByteCountMismatch(usize, usize), // expected / actual
    /// Byte count doesn't match the actual number of bytes present
    InsufficientBytesForByteCount(usize, usize), // count / remaining
    /// Response contains extra trailing bytes
    TrailingBytes(usize),
}

impl std::error::Error for AduParseError {}

impl std::fmt::Display for AduParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AduParseError::UnexpectedFrameType(value) => {
                write!(f, "unexpected V5 payload frame type: {value:#04X}")
            }
            AduParseError::NoModbusFrame => {
                f.write_str("data logger replied without a Modbus frame (inverter offline?)")
            }
            AduParseError::InsufficientBytes => f.write_str("response is too short to be valid"),
            AduParseError::SlaveIdMismatch(expected, actual) => write!(
                f,
                "response from slave id {actual} while talking to slave id {expected}"
            ),
            AduParseError::UnknownResponseFunction(actual, expected, error) => write!(
                f,
                "received unknown response function code: {actual}. Expected {expected} or {error}"
            ),
            AduParseError::RequestByteCountMismatch(request, response) => write!(
                f,
                "byte count ({response}) doesn't match what is expected based on request ({request})"
            ),
            AduParseError::InsufficientBytesForByteCount(count, remaining) => write!(
                f,
                "byte count ({count}) doesn't match the actual number of bytes remaining ({remaining})"
            ),
            AduParseError::TrailingBytes(remaining) => {
                write!(f, "response contains {remaining} extra trailing bytes")
            }
        }
    }
}

/// Errors that indicate a bug in the library
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InternalError {
    /// Attempted to read more bytes than present
    InsufficientBytesForRead(usize, usize), // requested / remaining
    /// A frame to be written does not fit the length field
    FrameTooBig(usize),
}

impl std::error::Error for InternalError {}

impl std::fmt::Display for InternalError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InternalError::InsufficientBytesForRead(requested, remaining) => write!(
                f,
                "attempted to read {requested} bytes with only {remaining} remaining"
            ),
            InternalError::FrameTooBig(size) => {
                write!(f, "frame payload of {size} bytes does not fit the length field")
            }
        }
    }
}
