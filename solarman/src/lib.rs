//! An async client for the Solarman V5 data-logger protocol
//! using [Tokio](https://docs.rs/tokio) and Rust's `async/await` syntax.
//!
//! Solarman Wi-Fi/LAN sticks sit in front of many residential inverters (Deye, Sofar, ...) and
//! expose the inverter's Modbus RTU interface on TCP port 8899, wrapped in a small proprietary
//! envelope addressed by the logger's serial number.
//!
//! # Features
//!
//! * Read Holding Registers (function code 0x03)
//! * Panic-free parsing of the V5 envelope and the embedded Modbus RTU frame
//! * Per-request timeout and transparent reconnect after I/O or framing errors
//! * Configurable protocol decoding via `tracing`
//!
//! # Example
//!
//! ```no_run
//!use solarman::*;
//!
//!#[tokio::main]
//!async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!    let mut client = Client::connect(
//!        "192.168.100.102",
//!        8899,
//!        LoggerSerial::new(2_999_999_999),
//!        ClientOptions::default(),
//!    )
//!    .await?;
//!
//!    let values = client
//!        .read_holding_registers(AddressRange::try_from(184, 1)?)
//!        .await?;
//!    println!("battery SOC: {}%", values[0]);
//!    Ok(())
//!}
//! ```

pub use crate::client::*;
pub use crate::decode::*;
pub use crate::error::*;
pub use crate::exception::*;
pub use crate::types::*;

mod client;
mod common;
mod constants;
mod decode;
mod error;
mod exception;
mod rtu;
mod types;
mod v5;
