use crate::{DEBOUNCE, Error, Result};
use embassy_time::Timer;
use embedded_hal_async::digital::Wait;

/// Simple debounced button press detection. The button pulls its pin low when pressed
pub async fn wait_for_press(button: &mut impl Wait) -> Result<()> {
    button
        .wait_for_falling_edge()
        .await
        .map_err(|_| Error::Button)?;
    Timer::after(DEBOUNCE).await; // debounce
    Ok(())
}
