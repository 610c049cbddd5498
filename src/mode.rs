//! Mode switch handling: a settle-and-reread debounce over the raw pin, and
//! the controller that reprograms the outputs on every confirmed change.

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c::Write;
use embedded_hal::digital::v2::InputPin;

use crate::program::{ClockProgram, Standard};
use crate::si5351::{Pll, Si5351};
use crate::Error;

/// Settle interval used by the shipped firmware.
pub const SETTLE_MS: u32 = 250;

/// Debounced switch. A level change is committed only if it is still
/// present after `settle_ms`.
pub struct Debouncer<P, D> {
    switch: P,
    delay: D,
    pub settle_ms: u32,
    committed: bool,
}

impl<P, D> Debouncer<P, D>
where
    P: InputPin,
    D: DelayMs<u32>,
{
    pub fn new(switch: P, delay: D, settle_ms: u32) -> Self {
        Self {
            switch,
            delay,
            settle_ms,
            committed: false,
        }
    }

    /// Take the current level as committed without debouncing. A failed read
    /// keeps the previous level.
    pub fn prime(&mut self) -> bool {
        if let Some(level) = self.read() {
            self.committed = level;
        }
        self.committed
    }

    pub fn committed(&self) -> bool {
        self.committed
    }

    /// One poll step. Returns the new level when a change is confirmed.
    pub fn poll(&mut self) -> Option<bool> {
        if self.read()? == self.committed {
            return None;
        }

        self.delay.delay_ms(self.settle_ms);
        let level = self.read()?;
        if level == self.committed {
            trace!("switch: bounce ignored");
            return None;
        }

        self.committed = level;
        Some(level)
    }

    fn read(&mut self) -> Option<bool> {
        match self.switch.is_high() {
            Ok(level) => Some(level),
            Err(_) => {
                warn!("switch: read failed");
                None
            }
        }
    }
}

/// Owns the mode switch and drives the synthesizer from it.
pub struct ModeController<P, D> {
    debouncer: Debouncer<P, D>,
    program: ClockProgram,
}

impl<P, D> ModeController<P, D>
where
    P: InputPin,
    D: DelayMs<u32>,
{
    pub fn new(switch: P, delay: D, settle_ms: u32, program: ClockProgram) -> Self {
        Self {
            debouncer: Debouncer::new(switch, delay, settle_ms),
            program,
        }
    }

    pub fn program(&self) -> &ClockProgram {
        &self.program
    }

    /// Full bring-up: outputs off, crystal load, both PLLs, then the outputs
    /// for whatever the switch reads now.
    pub fn boot<I2C: Write>(&mut self, synth: &mut Si5351<I2C>) -> Result<Standard, Error> {
        synth.init(self.program.crystal_load);
        for pll in [Pll::A, Pll::B] {
            let cfg = self.program.pll(pll);
            synth.setup_pll(pll, cfg.mult, cfg.num, cfg.denom)?;
            info!("PLL {}: {} Hz", pll, cfg.vco_hz(self.program.xtal_hz));
        }

        let standard = Standard::from_switch(self.debouncer.prime());
        self.change_freq(synth, standard)?;
        Ok(standard)
    }

    /// Retarget every program output to the selection for `standard`, with
    /// the outputs disabled while the dividers are rewritten. On error the
    /// outputs stay disabled.
    pub fn change_freq<I2C: Write>(
        &self,
        synth: &mut Si5351<I2C>,
        standard: Standard,
    ) -> Result<(), Error> {
        let selection = self.program.selection(standard);

        synth.enable_outputs(false);
        for &output in self.program.outputs {
            synth.setup_multisynth_int(output, selection.source, selection.div)?;
        }
        synth.enable_outputs(true);

        info!("{}: {} Hz", standard, self.program.output_hz(standard));
        Ok(())
    }

    /// One main-loop step. Returns the newly selected standard, if any.
    pub fn poll<I2C: Write>(&mut self, synth: &mut Si5351<I2C>) -> Result<Option<Standard>, Error> {
        match self.debouncer.poll() {
            Some(level) => {
                let standard = Standard::from_switch(level);
                self.change_freq(synth, standard)?;
                Ok(Some(standard))
            }
            None => Ok(None),
        }
    }

    pub fn run<I2C: Write>(&mut self, synth: &mut Si5351<I2C>) -> ! {
        loop {
            if let Err(e) = self.poll(synth) {
                error!("reprogramming failed: {}", e);
            }
            core::hint::spin_loop();
        }
    }
}
