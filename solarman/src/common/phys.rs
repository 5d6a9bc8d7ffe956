use std::fmt::Write;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::decode::PhysDecodeLevel;

trait Stream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Stream for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Byte stream to a data logger
///
/// Always a TCP socket outside of tests. Every read and write can be logged at the configured
/// [`PhysDecodeLevel`], tagged with the peer so several loggers can be told apart.
pub(crate) struct PhysLayer {
    stream: Box<dyn Stream>,
    peer: String,
}

impl std::fmt::Debug for PhysLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("PhysLayer")
            .field("peer", &self.peer)
            .finish()
    }
}

impl PhysLayer {
    pub(crate) fn new_tcp(socket: tokio::net::TcpStream) -> Self {
        let peer = match socket.peer_addr() {
            Ok(addr) => addr.to_string(),
            Err(_) => "tcp".to_string(),
        };
        Self {
            stream: Box::new(socket),
            peer,
        }
    }

    #[cfg(test)]
    pub(crate) fn new_mock(mock: tokio_test::io::Mock) -> Self {
        Self {
            stream: Box::new(mock),
            peer: "mock".to_string(),
        }
    }

    pub(crate) async fn read(
        &mut self,
        buffer: &mut [u8],
        decode_level: PhysDecodeLevel,
    ) -> Result<usize, std::io::Error> {
        let length = self.stream.read(buffer).await?;

        if decode_level.enabled() {
            if let Some(x) = buffer.get(..length) {
                tracing::info!("PHYS RX {} - {}", self.peer, PhysDisplay::new(decode_level, x));
            }
        }

        Ok(length)
    }

    pub(crate) async fn write(
        &mut self,
        data: &[u8],
        decode_level: PhysDecodeLevel,
    ) -> Result<(), std::io::Error> {
        if decode_level.enabled() {
            tracing::info!("PHYS TX {} - {}", self.peer, PhysDisplay::new(decode_level, data));
        }
        self.stream.write_all(data).await?;
        self.stream.flush().await
    }
}

struct PhysDisplay<'a> {
    level: PhysDecodeLevel,
    data: &'a [u8],
}

impl<'a> PhysDisplay<'a> {
    fn new(level: PhysDecodeLevel, data: &'a [u8]) -> Self {
        PhysDisplay { level, data }
    }
}

impl std::fmt::Display for PhysDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} bytes", self.data.len())?;
        if self.level.data_enabled() {
            format_bytes(f, self.data)?;
        }
        Ok(())
    }
}

const BYTES_PER_LINE: usize = 16;

/// hex dump of `bytes`, one line per 16 bytes prefixed by the offset
pub(crate) fn format_bytes(f: &mut std::fmt::Formatter, bytes: &[u8]) -> std::fmt::Result {
    for (line, chunk) in bytes.chunks(BYTES_PER_LINE).enumerate() {
        write!(f, "\n{:04X}:", line * BYTES_PER_LINE)?;
        for byte in chunk {
            f.write_char(' ')?;
            write!(f, "{byte:02X}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dump<'a>(&'a [u8]);

    impl std::fmt::Display for Dump<'_> {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            format_bytes(f, self.0)
        }
    }

    #[test]
    fn dumps_bytes_with_offsets() {
        let bytes: Vec<u8> = (0..18).collect();
        assert_eq!(
            Dump(&bytes).to_string(),
            "\n0000: 00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F\n0010: 10 11"
        );
    }

    #[test]
    fn display_shows_length_only_below_data_level() {
        let data = [0xA5, 0x15];
        assert_eq!(
            PhysDisplay::new(PhysDecodeLevel::Length, &data).to_string(),
            "2 bytes"
        );
        assert_eq!(
            PhysDisplay::new(PhysDecodeLevel::Data, &data).to_string(),
            "2 bytes\n0000: A5 15"
        );
    }
}
