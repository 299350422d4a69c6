pub mod button;
pub mod chain;
#[cfg(feature = "esp32c3")]
pub mod neopixel;

pub use chain::{Chain, ChainWriter};
