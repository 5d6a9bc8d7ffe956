use crate::constants::exceptions;

/// Modbus exception returned by the inverter behind the data logger
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExceptionCode {
    /// The inverter does not support the function code
    IllegalFunction,
    /// One or more addresses in the requested range do not exist on the inverter
    IllegalDataAddress,
    /// A value in the request is not allowed, usually the register count
    IllegalDataValue,
    /// The inverter failed while processing the request
    ServerDeviceFailure,
    /// The request was accepted but has not completed yet
    Acknowledge,
    /// The inverter is busy, try again later
    ServerDeviceBusy,
    /// Parity error while the inverter read its own memory
    MemoryParityError,
    /// The data logger could not route the request to the inverter
    GatewayPathUnavailable,
    /// The data logger forwarded the request but the inverter never answered
    ///
    /// Loggers commonly report this while the inverter is asleep at night.
    GatewayTargetDeviceFailedToRespond,
    /// Exception code not defined by Modbus
    Unknown(u8),
}

impl From<u8> for ExceptionCode {
    fn from(value: u8) -> Self {
        match value {
            exceptions::ILLEGAL_FUNCTION => ExceptionCode::IllegalFunction,
            exceptions::ILLEGAL_DATA_ADDRESS => ExceptionCode::IllegalDataAddress,
            exceptions::ILLEGAL_DATA_VALUE => ExceptionCode::IllegalDataValue,
            exceptions::SERVER_DEVICE_FAILURE => ExceptionCode::ServerDeviceFailure,
            exceptions::ACKNOWLEDGE => ExceptionCode::Acknowledge,
            exceptions::SERVER_DEVICE_BUSY => ExceptionCode::ServerDeviceBusy,
            exceptions::MEMORY_PARITY_ERROR => ExceptionCode::MemoryParityError,
            exceptions::GATEWAY_PATH_UNAVAILABLE => ExceptionCode::GatewayPathUnavailable,
            exceptions::GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND => {
                ExceptionCode::GatewayTargetDeviceFailedToRespond
            }
            _ => ExceptionCode::Unknown(value),
        }
    }
}

impl From<ExceptionCode> for u8 {
    fn from(ex: ExceptionCode) -> Self {
        match ex {
            ExceptionCode::IllegalFunction => exceptions::ILLEGAL_FUNCTION,
            ExceptionCode::IllegalDataAddress => exceptions::ILLEGAL_DATA_ADDRESS,
            ExceptionCode::IllegalDataValue => exceptions::ILLEGAL_DATA_VALUE,
            ExceptionCode::ServerDeviceFailure => exceptions::SERVER_DEVICE_FAILURE,
            ExceptionCode::Acknowledge => exceptions::ACKNOWLEDGE,
            ExceptionCode::ServerDeviceBusy => exceptions::SERVER_DEVICE_BUSY,
            ExceptionCode::MemoryParityError => exceptions::MEMORY_PARITY_ERROR,
            ExceptionCode::GatewayPathUnavailable => exceptions::GATEWAY_PATH_UNAVAILABLE,
            ExceptionCode::GatewayTargetDeviceFailedToRespond => {
                exceptions::GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND
            }
            ExceptionCode::Unknown(value) => value,
        }
    }
}

impl std::error::Error for ExceptionCode {}

impl std::fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ExceptionCode::IllegalFunction => f.write_str("illegal function"),
            ExceptionCode::IllegalDataAddress => f.write_str("illegal data address"),
            ExceptionCode::IllegalDataValue => f.write_str("illegal data value"),
            ExceptionCode::ServerDeviceFailure => f.write_str("inverter device failure"),
            ExceptionCode::Acknowledge => f.write_str("request acknowledged, still processing"),
            ExceptionCode::ServerDeviceBusy => f.write_str("inverter busy"),
            ExceptionCode::MemoryParityError => f.write_str("memory parity error"),
            ExceptionCode::GatewayPathUnavailable => {
                f.write_str("data logger could not route the request to the inverter")
            }
            ExceptionCode::GatewayTargetDeviceFailedToRespond => {
                f.write_str("inverter did not respond to the data logger")
            }
            ExceptionCode::Unknown(code) => write!(f, "unknown exception code: {code:#04X}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_survive_conversion() {
        for code in [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x08, 0x0A, 0x0B] {
            let ex = ExceptionCode::from(code);
            assert!(!matches!(ex, ExceptionCode::Unknown(_)));
            assert_eq!(u8::from(ex), code);
        }
    }

    #[test]
    fn undefined_code_is_unknown() {
        assert_eq!(ExceptionCode::from(0x07), ExceptionCode::Unknown(0x07));
    }
}
