use crate::{CurrentMode, mode::mode_from_byte};
use embedded_io_async::Read;

/// Feed every byte from `reader` into the current mode, one byte at a time.
///
/// Newlines and undecodable bytes are dropped. Read errors are logged and reading carries on;
/// the pump only returns when the source reports end of stream.
pub async fn pump_modes<R: Read>(reader: &mut R, mode: &CurrentMode, source: &str) {
    let mut byte = [0_u8; 1];
    loop {
        match reader.read(&mut byte).await {
            Ok(0) => {
                info!("INPUT: {} closed", source);
                return;
            }
            Ok(_) => match mode_from_byte(byte[0]) {
                Some(next) => {
                    if next != mode.get() {
                        info!("INPUT: {} selects mode '{}'", source, next);
                    }
                    mode.set(next);
                }
                None => trace!("INPUT: {} byte {=u8:#x} ignored", source, byte[0]),
            },
            Err(_) => warn!("INPUT: {} read failed, continuing", source),
        }
    }
}

#[cfg(feature = "esp32c3")]
mod esp {
    use super::pump_modes;
    use crate::{Controller, drivers::neopixel::LedDriver};
    use esp_hal::{Async, uart::Uart, usb_serial_jtag::UsbSerialJtag};

    /// Mode characters from the serial link
    #[embassy_executor::task]
    pub async fn uart_task(mut uart: Uart<'static, Async>, controller: &'static Controller<LedDriver>) {
        pump_modes(&mut uart, controller.mode(), "uart").await;
    }

    /// Mode characters typed on the USB console
    #[embassy_executor::task]
    pub async fn console_task(
        mut console: UsbSerialJtag<'static, Async>,
        controller: &'static Controller<LedDriver>,
    ) {
        pump_modes(&mut console, controller.mode(), "console").await;
    }
}

#[cfg(feature = "esp32c3")]
pub use esp::{console_task, uart_task};
