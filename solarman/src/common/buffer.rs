use crate::common::phys::PhysLayer;
use crate::decode::PhysDecodeLevel;
use crate::error::InternalError;

pub(crate) struct ReadBuffer {
    buffer: Vec<u8>,
    begin: usize,
    end: usize,
}

impl ReadBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        ReadBuffer {
            buffer: vec![0; capacity],
            begin: 0,
            end: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.end - self.begin
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// discard everything buffered so far, used when a connection is replaced
    pub(crate) fn clear(&mut self) {
        self.begin = 0;
        self.end = 0;
    }

    pub(crate) fn read(&mut self, count: usize) -> Result<&[u8], InternalError> {
        if self.len() < count {
            return Err(InternalError::InsufficientBytesForRead(count, self.len()));
        }

        match self.buffer.get(self.begin..(self.begin + count)) {
            Some(ret) => {
                self.begin += count;
                Ok(ret)
            }
            None => Err(InternalError::InsufficientBytesForRead(count, self.len())),
        }
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, InternalError> {
        if self.is_empty() {
            return Err(InternalError::InsufficientBytesForRead(1, 0));
        }
        match self.buffer.get(self.begin) {
            Some(ret) => {
                self.begin += 1;
                Ok(*ret)
            }
            None => Err(InternalError::InsufficientBytesForRead(1, 0)),
        }
    }

    pub(crate) fn read_u16_le(&mut self) -> Result<u16, InternalError> {
        let mut bytes = [0; 2];
        bytes.copy_from_slice(self.read(2)?);
        Ok(u16::from_le_bytes(bytes))
    }

    pub(crate) fn read_u32_le(&mut self) -> Result<u32, InternalError> {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(self.read(4)?);
        Ok(u32::from_le_bytes(bytes))
    }

    pub(crate) async fn read_some(
        &mut self,
        io: &mut PhysLayer,
        decode_level: PhysDecodeLevel,
    ) -> Result<usize, std::io::Error> {
        // an empty buffer restarts at zero so the read gets all of the free space
        if self.is_empty() {
            self.clear();
        }

        // partial frame at the end of the buffer, move it to the front
        if self.end == self.buffer.len() {
            let length = self.len();
            self.buffer.copy_within(self.begin..self.end, 0);
            self.begin = 0;
            self.end = length;
        }

        let count = io.read(&mut self.buffer[self.end..], decode_level).await?;

        if count == 0 {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        }
        self.end += count;
        Ok(count)
    }
}
