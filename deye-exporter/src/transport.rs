use std::future::Future;

use solarman::{AddressRange, RequestError};

/// Reads holding registers from the inverter
pub trait RegisterTransport: Send {
    /// Read `range.count` registers starting at `range.start`
    fn read_holding_registers(
        &mut self,
        range: AddressRange,
    ) -> impl Future<Output = Result<Vec<u16>, RequestError>> + Send;
}

impl RegisterTransport for solarman::Client {
    fn read_holding_registers(
        &mut self,
        range: AddressRange,
    ) -> impl Future<Output = Result<Vec<u16>, RequestError>> + Send {
        solarman::Client::read_holding_registers(self, range)
    }
}
