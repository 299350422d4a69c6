#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait, reason = "single-threaded embedded executor")]

// Must come first so the logging macros are visible to every module below.
#[macro_use]
mod fmt;

pub mod animations;
pub mod config;
pub mod controller;
pub mod drivers;
mod error;
pub mod maths;
pub mod mode;
pub mod scheduler;
pub mod segments;
pub mod tasks;

pub use config::{AnimationSpec, ChainConfig, Config, SegmentConfig};
pub use controller::{Controller, Shutdown};
pub use error::{Error, Result};
pub use mode::CurrentMode;

use embassy_time::Duration;

/// How often the scheduler re-evaluates every segment against the current mode
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Settle time after a reset button edge before the press counts
pub const DEBOUNCE: Duration = Duration::from_millis(100);

/// The maximum number of physical chains (one RMT channel each)
pub const MAX_CHAINS: usize = 2;

/// The maximum number of segments across all chains
pub const MAX_SEGMENTS: usize = 8;

/// The number of pixels a single chain buffer can hold
pub const CHAIN_CAPACITY: usize = 64;

/// Largest `steps` a chase may precompute a gradient for
pub const MAX_CHASE_STEPS: u16 = 64;

/// The colour every chain is forced to on shutdown
pub const BLACK: smart_leds::RGB8 = smart_leds::RGB8::new(0, 0, 0);
