//! # Si5351 color-carrier clock
//!
//! Programs an Si5351 clock synthesizer over I2C to produce a video
//! color-carrier reference: 21.477270 MHz (NTSC, 6x 3.579545 MHz) or
//! 26.601712 MHz (PAL, 6x 4.43361875 MHz), chosen by a mode switch.
//!
//! The driver is generic over the `embedded-hal` 0.2 blocking traits; the
//! Raspberry Pi Pico firmware in `src/main.rs` supplies them.
//!
//! ```text
//! ModeController --> Si5351 --> DividerParams --> I2C
//!   (switch)        (state)    (P1, P2, P3)     (one register
//!                                                per transaction)
//! ```

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod divider;
mod error;
pub mod mode;
pub mod program;
pub mod si5351;

#[cfg(test)]
mod mock;

pub use divider::DividerParams;
pub use error::Error;
pub use mode::{Debouncer, ModeController, SETTLE_MS};
pub use program::{ClockProgram, Selection, Standard, COLOR_CARRIER};
pub use si5351::{ClockOutput, CrystalLoad, DeviceState, MultisynthConfig, Pll, PllConfig, Si5351};
