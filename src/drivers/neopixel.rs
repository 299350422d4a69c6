use crate::{CHAIN_CAPACITY, Error, Result, drivers::ChainWriter};
use esp_hal::{
    Async,
    gpio::interconnect::PeripheralOutput,
    rmt::{ConstChannelAccess, Rmt, Tx},
};
use esp_hal_smartled::{SmartLedsAdapterAsync, buffer_size_async};
use smart_leds::{RGB8, SmartLedsWriteAsync};

/// We must know what the LED TX buffer size is as a constant for the types involved here
const LED_INTERNAL_BUF_LEN: usize = buffer_size_async(CHAIN_CAPACITY);

/// Drives one chain from one of the two RMT transmit channels. Each channel has its own type, so
/// the two chains are variants of one driver
pub enum LedDriver {
    Channel0(SmartLedsAdapterAsync<ConstChannelAccess<Tx, 0>, LED_INTERNAL_BUF_LEN>),
    Channel1(SmartLedsAdapterAsync<ConstChannelAccess<Tx, 1>, LED_INTERNAL_BUF_LEN>),
}

impl LedDriver {
    /// Create drivers for both chains.
    ///
    /// # Parameters
    /// * `rmt` - The RMT peripheral device to use for driving the LED chains
    /// * `pin0` - The GPIO pin the first chain is connected to
    /// * `pin1` - The GPIO pin the second chain is connected to
    pub fn pair<'a>(
        rmt: Rmt<Async>,
        pin0: impl PeripheralOutput<'a>,
        pin1: impl PeripheralOutput<'a>,
    ) -> (Self, Self) {
        let first = SmartLedsAdapterAsync::new(rmt.channel0, pin0, [0_u32; LED_INTERNAL_BUF_LEN]);
        let second = SmartLedsAdapterAsync::new(rmt.channel1, pin1, [0_u32; LED_INTERNAL_BUF_LEN]);
        (Self::Channel0(first), Self::Channel1(second))
    }

    fn channel(&self) -> usize {
        match self {
            LedDriver::Channel0(_) => 0,
            LedDriver::Channel1(_) => 1,
        }
    }
}

impl ChainWriter for LedDriver {
    /// Push the buffer to the chain as-is. No gamma or brightness is applied
    async fn write(&mut self, pixels: &[RGB8]) -> Result<()> {
        let chain = self.channel();
        let sent = match self {
            LedDriver::Channel0(led) => led.write(pixels.iter().copied()).await,
            LedDriver::Channel1(led) => led.write(pixels.iter().copied()).await,
        };
        sent.map_err(|_| Error::ChainWrite { chain })
    }
}
