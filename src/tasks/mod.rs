#[cfg(feature = "esp32c3")]
pub mod button;
pub mod input;
#[cfg(feature = "esp32c3")]
pub mod segment;

#[cfg(feature = "esp32c3")]
pub use button::reset_button_task;
#[cfg(feature = "esp32c3")]
pub use input::{console_task, uart_task};
pub use input::pump_modes;
#[cfg(feature = "esp32c3")]
pub use segment::segment_task;
