use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::Instrument;

use crate::common::phys::PhysLayer;
use crate::decode::DecodeLevel;
use crate::error::{FrameParseError, RequestError};
use crate::types::{AddressRange, LoggerSerial, SlaveId};
use crate::v5::{Sequence, V5Formatter, V5Reader};

/// Options that control how the client talks to the inverter behind the data logger
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClientOptions {
    /// Modbus slave id of the inverter
    pub slave: SlaveId,
    /// Maximum time allowed for connecting and for each request/response exchange
    pub timeout: Duration,
    /// Decode level applied to every request and response
    pub decode: DecodeLevel,
}

impl ClientOptions {
    /// default timeout applied to connects and requests
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Set the slave id
    pub fn slave(self, slave: SlaveId) -> Self {
        Self { slave, ..self }
    }

    /// Set the timeout
    pub fn timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Set the decode level
    pub fn decode(self, decode: DecodeLevel) -> Self {
        Self { decode, ..self }
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            slave: SlaveId::default(),
            timeout: Self::DEFAULT_TIMEOUT,
            decode: DecodeLevel::default(),
        }
    }
}

/// Async client that reads holding registers through a Solarman V5 data logger
///
/// Requests are executed one at a time on a single TCP connection. When a request fails in a way
/// that leaves the stream in an unknown state (I/O error, timeout, bad framing) the connection is
/// dropped and a new one is opened by the next request.
#[derive(Debug)]
pub struct Client {
    host: String,
    port: u16,
    serial: LoggerSerial,
    options: ClientOptions,
    sequence: Sequence,
    connection: Option<Connection>,
}

impl Client {
    /// Connect to the data logger at `host:port`
    ///
    /// Fails if the TCP connection cannot be established within the configured timeout.
    pub async fn connect(
        host: &str,
        port: u16,
        serial: LoggerSerial,
        options: ClientOptions,
    ) -> Result<Self, RequestError> {
        let connection = Self::open(host, port, options.timeout).await?;
        Ok(Self {
            host: host.to_string(),
            port,
            serial,
            options,
            sequence: Sequence::default(),
            connection: Some(connection),
        })
    }

    /// `true` if a TCP connection is currently open
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Read `range.count` holding registers starting at `range.start`
    pub async fn read_holding_registers(
        &mut self,
        range: AddressRange,
    ) -> Result<Vec<u16>, RequestError> {
        let range = range.of_read_registers()?;

        let mut connection = match self.connection.take() {
            Some(connection) => connection,
            None => Self::open(&self.host, self.port, self.options.timeout).await?,
        };

        let sequence = self.sequence.next();
        let result = connection
            .execute(sequence, self.serial, range, &self.options)
            .instrument(tracing::info_span!("Transaction", seq = %sequence))
            .await;

        match &result {
            Err(err) if err.invalidates_connection() => {
                tracing::warn!("closing connection to {}:{}: {}", self.host, self.port, err);
            }
            _ => self.connection = Some(connection),
        }

        result
    }

    // takes no `&self` so the request future stays `Send`
    async fn open(host: &str, port: u16, timeout: Duration) -> Result<Connection, RequestError> {
        let socket = tokio::time::timeout(timeout, TcpStream::connect((host, port))).await??;
        tracing::info!("connected to: {}:{}", host, port);
        Ok(Connection::new(PhysLayer::new_tcp(socket)))
    }
}

struct Connection {
    phys: PhysLayer,
    reader: V5Reader,
    formatter: V5Formatter,
    modbus: Vec<u8>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Connection({:?})", self.phys)
    }
}

impl Connection {
    fn new(phys: PhysLayer) -> Self {
        Self {
            phys,
            reader: V5Reader::new(),
            formatter: V5Formatter::new(),
            modbus: Vec::with_capacity(crate::rtu::constants::REQUEST_LENGTH),
        }
    }

    async fn execute(
        &mut self,
        sequence: Sequence,
        serial: LoggerSerial,
        range: AddressRange,
        options: &ClientOptions,
    ) -> Result<Vec<u16>, RequestError> {
        let decode = options.decode;

        self.modbus.clear();
        crate::rtu::format_read_holding_registers(&mut self.modbus, options.slave, range);
        if decode.frame.enabled() {
            tracing::info!("RTU TX - slave: {} {}", options.slave, range);
        }

        let bytes = self
            .formatter
            .format_request(sequence, serial, &self.modbus, decode.frame)?;
        self.phys.write(bytes, decode.physical).await?;

        let deadline = Instant::now() + options.timeout;

        // loop until we get a response to this request or we timeout
        let frame = loop {
            let frame = tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    self.reader.reset();
                    return Err(RequestError::ResponseTimeout);
                }
                frame = self.reader.next_frame(&mut self.phys, decode) => {
                    frame?
                }
            };

            if !frame.is_response() {
                tracing::debug!(
                    "ignoring frame with control code {:#06X}",
                    frame.header.control
                );
                continue;
            }

            match frame.validate(sequence, serial) {
                Ok(()) => break frame,
                // a late answer to a request that already timed out
                Err(FrameParseError::SequenceMismatch(expected, received)) => {
                    tracing::warn!(
                        "received sequence {:#04X} while expecting {:#04X}",
                        received,
                        expected
                    );
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        };

        let modbus = frame.modbus_response()?;
        crate::rtu::parse_read_holding_registers(modbus, options.slave, range, decode.frame)
    }
}
