//! # Si5351 color-carrier firmware
//!
//! Programs an Si5351 breakout (25 MHz crystal) from a Raspberry Pi Pico
//! and switches CLK0/CLK1 between NTSC and PAL color-carrier clocks.
//!
//! ```text
//! Raspberry Pi Pico Pinout
//! ========================
//!
//! | Pin | GPIO | Purpose                        |
//! +-----+------+--------------------------------+
//! |  6  | GP4  | I2C0 SDA                       |
//! |  7  | GP5  | I2C0 SCL                       |
//! |  8  | GND  | GND                            |
//! | 20  | GP15 | Mode switch (to GND = NTSC)    |
//! | 36  | 3V3  | Si5351 VIN                     |
//!
//! Si5351 Outputs
//! ==============
//!
//! | Output | NTSC          | PAL           |
//! |--------+---------------+---------------|
//! | CLK0   | 21.477270 MHz | 26.601712 MHz |
//! | CLK1   | 21.477270 MHz | 26.601712 MHz |
//! | CLK2   | powered down  | powered down  |
//! ```
//!
//! Build and flash with `cargo flash` (see `.cargo/config.toml`).

#![no_std]
#![no_main]

// The macro for our start-up function
use cortex_m_rt::entry;

// info!() and error!() macros for printing information to the debug output
use defmt::*;
use defmt_rtt as _;

use embedded_hal::digital::v2::OutputPin;

// Ensure we halt the program on panic (if we don't mention this crate it won't
// be linked)
use panic_probe as _;

// Pull in any important traits
use rp_pico::hal::prelude::*;

// Embed the `Hz` function/trait:
use embedded_time::rate::*;

// A shorter alias for the Peripheral Access Crate, which provides low-level
// register access
use rp_pico::hal::pac;

// Import the GPIO abstraction:
use rp_pico::hal::gpio;

// A shorter alias for the Hardware Abstraction Layer, which provides
// higher-level drivers.
use rp_pico::hal;

use si5351ctl::{ModeController, Si5351, COLOR_CARRIER, SETTLE_MS};

/// Standard-mode I2C, as the Si5351 breakout ships without strong pull-ups.
const I2C_FREQ_HZ: u32 = 100_000;

#[entry]
fn main() -> ! {
    info!("Program start");

    // Grab our singleton objects
    let mut pac = pac::Peripherals::take().unwrap();
    let core = pac::CorePeripherals::take().unwrap();

    // Set up the watchdog driver - needed by the clock setup code
    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);

    // Configure the clocks
    //
    // The default is to generate a 125 MHz system clock
    let clocks = hal::clocks::init_clocks_and_plls(
        rp_pico::XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();

    // The single-cycle I/O block controls our GPIO pins
    let sio = hal::Sio::new(pac.SIO);

    // Set the pins up according to their function on this particular board
    let pins = rp_pico::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    // Lit while the synthesizer is being programmed
    let mut led_pin = pins.led.into_push_pull_output();

    let sda_pin = pins.gpio4.into_mode::<gpio::FunctionI2C>();
    let scl_pin = pins.gpio5.into_mode::<gpio::FunctionI2C>();

    // Open switch reads high (PAL), closed to ground reads low (NTSC)
    let switch_pin = pins.gpio15.into_pull_up_input();

    let i2c = hal::I2C::i2c0(
        pac.I2C0,
        sda_pin,
        scl_pin,
        I2C_FREQ_HZ.Hz(),
        &mut pac.RESETS,
        clocks.peripheral_clock.freq(),
    );

    let delay = cortex_m::delay::Delay::new(core.SYST, clocks.system_clock.freq().integer());

    led_pin.set_high().unwrap();

    let mut synth = Si5351::new(i2c);
    let mut controller = ModeController::new(switch_pin, delay, SETTLE_MS, COLOR_CARRIER);

    match controller.boot(&mut synth) {
        Ok(standard) => info!("Running {}", standard),
        Err(e) => error!("Boot programming failed: {}", e),
    }
    if synth.bus_faults() > 0 {
        warn!("{} writes were not acknowledged", synth.bus_faults());
    }

    led_pin.set_low().unwrap();

    controller.run(&mut synth)
}
