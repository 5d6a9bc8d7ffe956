pub(crate) mod v5 {
    /// First byte of every V5 frame
    pub(crate) const START: u8 = 0xA5;
    /// Last byte of every V5 frame
    pub(crate) const END: u8 = 0x15;
    /// Control code of a request sent to the data logger
    pub(crate) const CONTROL_REQUEST: u16 = 0x4510;
    /// Control code of a response returned by the data logger
    pub(crate) const CONTROL_RESPONSE: u16 = 0x1510;
    /// Frame type of a payload carrying a Modbus RTU frame for the inverter
    pub(crate) const FRAME_TYPE_INVERTER: u8 = 0x02;
}

pub(crate) mod limits {
    /// Maximum count allowed in a read holding registers request
    pub(crate) const MAX_READ_REGISTERS_COUNT: u16 = 0x007D;
}

pub(crate) mod exceptions {
    pub(crate) const ILLEGAL_FUNCTION: u8 = 0x01;
    pub(crate) const ILLEGAL_DATA_ADDRESS: u8 = 0x02;
    pub(crate) const ILLEGAL_DATA_VALUE: u8 = 0x03;
    pub(crate) const SERVER_DEVICE_FAILURE: u8 = 0x04;
    pub(crate) const ACKNOWLEDGE: u8 = 0x05;
    pub(crate) const SERVER_DEVICE_BUSY: u8 = 0x06;
    pub(crate) const MEMORY_PARITY_ERROR: u8 = 0x08;
    pub(crate) const GATEWAY_PATH_UNAVAILABLE: u8 = 0x0A;
    pub(crate) const GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND: u8 = 0x0B;
}
