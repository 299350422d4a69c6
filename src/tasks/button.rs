use crate::{controller::ResetSignal, drivers::button::wait_for_press};
use esp_hal::gpio::Input;

/// Watch the reset button and raise `reset` on every press. The tick loop picks it up
#[embassy_executor::task]
pub async fn reset_button_task(mut button: Input<'static>, reset: &'static ResetSignal) {
    loop {
        match wait_for_press(&mut button).await {
            Ok(()) => {
                info!("BUTTON: reset pressed");
                reset.signal(());
            }
            Err(error) => {
                error!("BUTTON: {}, reset button disabled", error);
                return;
            }
        }
    }
}
