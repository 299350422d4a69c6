#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

use defmt::{error, info};
use embassy_executor::Spawner;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use esp_hal::{
    Config as HalConfig,
    clock::CpuClock,
    gpio::{Input, InputConfig, Pull},
    rmt::Rmt,
    system::software_reset,
    time::Rate,
    timer::systimer::SystemTimer,
    uart::{Config as UartConfig, Uart},
    usb_serial_jtag::UsbSerialJtag,
};
use panic_rtt_target as _;
use segment_pixels::{
    AnimationSpec, ChainConfig, Config, Controller, SegmentConfig, Shutdown,
    animations::ChaseProfile,
    controller::ResetSignal,
    drivers::neopixel::LedDriver,
    tasks::{console_task, reset_button_task, segment_task, uart_task},
};
use smart_leds::RGB8;
use static_cell::StaticCell;

/// Blue background with a magenta comet
const COMET: AnimationSpec = AnimationSpec::Chase {
    base: RGB8::new(0, 0, 200),
    chase: RGB8::new(200, 0, 200),
    steps: 10,
    step_delay: Duration::from_millis(10),
    width: 20,
    speed: 50.0,
    profile: ChaseProfile::Triangular,
};

static PRIMARIES: [RGB8; 3] = [
    RGB8::new(255, 0, 0),
    RGB8::new(0, 255, 0),
    RGB8::new(0, 0, 255),
];

const RAINBOW: AnimationSpec = AnimationSpec::FadeCycle {
    colours: &PRIMARIES,
    steps: 128,
    step_delay: Duration::from_millis(10),
    cycle_delay: Duration::from_millis(0),
};

const SOLID_GREEN: AnimationSpec = AnimationSpec::Static {
    colour: RGB8::new(0, 255, 0),
    hold: Duration::from_millis(0),
    kill_after: false,
    kill_mode: 'D',
};

/// White for a second, then back to the comet
const FLASH: AnimationSpec = AnimationSpec::Static {
    colour: RGB8::new(255, 255, 255),
    hold: Duration::from_secs(1),
    kill_after: true,
    kill_mode: 'D',
};

static MODES: [(char, AnimationSpec); 5] = [
    ('D', COMET),
    ('E', RAINBOW),
    ('X', COMET),
    ('G', SOLID_GREEN),
    ('F', FLASH),
];

static SEGMENTS: [SegmentConfig; 1] = [SegmentConfig {
    len: 45,
    modes: &MODES,
}];

static CHAINS: [ChainConfig; 2] = [
    ChainConfig {
        segments: &SEGMENTS,
    },
    ChainConfig {
        segments: &SEGMENTS,
    },
];

static CONFIG: Config = Config {
    chains: &CHAINS,
    initial_mode: 'D',
};

/// Everything the tasks share
static CONTROLLER: StaticCell<Controller<LedDriver>> = StaticCell::new();

/// Raised by the reset button task
static RESET: ResetSignal = Signal::new();

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[esp_hal_embassy::main]
async fn main(spawner: Spawner) {
    #[cfg(all(feature = "rtt", feature = "defmt"))]
    rtt_target::rtt_init_defmt!();

    let peripherals = esp_hal::init(HalConfig::default().with_cpu_clock(CpuClock::max()));
    let timer0 = SystemTimer::new(peripherals.SYSTIMER);
    esp_hal_embassy::init(timer0.alarm0);

    let rmt = Rmt::new(peripherals.RMT, Rate::from_mhz(80))
        .expect("Failed to initialise RMT")
        .into_async();
    let (chain0, chain1) = LedDriver::pair(rmt, peripherals.GPIO2, peripherals.GPIO4);

    let controller: &'static Controller<LedDriver> = match Controller::new(&CONFIG, [chain0, chain1]) {
        Ok(controller) => CONTROLLER.init(controller),
        Err(err) => {
            error!("MAIN: invalid configuration: {}", err);
            loop {
                Timer::after(Duration::from_secs(60)).await;
            }
        }
    };

    for segment in 0..controller.segments().len() {
        spawner
            .spawn(segment_task(controller, segment))
            .expect("Failed to spawn segment task");
    }

    let uart = Uart::new(peripherals.UART1, UartConfig::default().with_baudrate(9600))
        .expect("Failed to initialise UART1")
        .with_tx(peripherals.GPIO0)
        .with_rx(peripherals.GPIO1)
        .into_async();
    spawner
        .spawn(uart_task(uart, controller))
        .expect("Failed to spawn uart task");

    let console = UsbSerialJtag::new(peripherals.USB_DEVICE).into_async();
    spawner
        .spawn(console_task(console, controller))
        .expect("Failed to spawn console task");

    // The boot button doubles as the reset button
    let button = Input::new(peripherals.GPIO9, InputConfig::default().with_pull(Pull::Up));
    spawner
        .spawn(reset_button_task(button, &RESET))
        .expect("Failed to spawn reset button task");

    info!("MAIN: Starting tick loop");
    match controller.run(&RESET).await {
        Shutdown::Reset => {
            info!("MAIN: Restarting");
            software_reset();
        }
        Shutdown::Fault(err) => {
            error!("MAIN: Stopped after fault: {}", err);
            loop {
                Timer::after(Duration::from_secs(60)).await;
            }
        }
    }
}
