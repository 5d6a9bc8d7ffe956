/// Controls the decoding of transmitted and received data at the frame and physical layer
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct DecodeLevel {
    /// Controls the decoding of V5 frames and the Modbus frame they carry
    pub frame: FrameDecodeLevel,
    /// Controls the logging of physical layer read/write
    pub physical: PhysDecodeLevel,
}

/// Controls how transmitted and received frames are decoded at the INFO log level
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum FrameDecodeLevel {
    /// Decode nothing
    #[default]
    Nothing,
    /// Decode the V5 header and the Modbus function/range
    Header,
    /// Decode the header and the raw payload as hexadecimal
    Payload,
}

/// Controls how data transmitted on the TCP stream is logged
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum PhysDecodeLevel {
    /// Log nothing
    #[default]
    Nothing,
    /// Log only the length of data that is sent and received
    Length,
    /// Log the length and the actual data that is sent and received
    Data,
}

impl DecodeLevel {
    /// construct a `DecodeLevel` with nothing enabled
    pub fn nothing() -> Self {
        Self::default()
    }

    /// construct a `DecodeLevel` from its fields
    pub fn new(frame: FrameDecodeLevel, physical: PhysDecodeLevel) -> Self {
        DecodeLevel { frame, physical }
    }
}

impl From<FrameDecodeLevel> for DecodeLevel {
    fn from(frame: FrameDecodeLevel) -> Self {
        Self {
            frame,
            physical: PhysDecodeLevel::Nothing,
        }
    }
}

impl FrameDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        self.header_enabled()
    }

    pub(crate) fn header_enabled(&self) -> bool {
        match self {
            FrameDecodeLevel::Nothing => false,
            FrameDecodeLevel::Header => true,
            FrameDecodeLevel::Payload => true,
        }
    }

    pub(crate) fn payload_enabled(&self) -> bool {
        match self {
            FrameDecodeLevel::Nothing => false,
            FrameDecodeLevel::Header => false,
            FrameDecodeLevel::Payload => true,
        }
    }
}

impl PhysDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        self.length_enabled()
    }

    pub(crate) fn length_enabled(&self) -> bool {
        match self {
            PhysDecodeLevel::Nothing => false,
            PhysDecodeLevel::Length => true,
            PhysDecodeLevel::Data => true,
        }
    }

    pub(crate) fn data_enabled(&self) -> bool {
        match self {
            PhysDecodeLevel::Nothing => false,
            PhysDecodeLevel::Length => false,
            PhysDecodeLevel::Data => true,
        }
    }
}
