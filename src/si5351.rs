//! Si5351 programmed one register per I2C transaction:
//! [START] [0x60 << 1 | W] [register] [value] [STOP]
//! Power-up sequence:
//! 1. Disable all outputs (R3 = 0xFF)
//! 2. Power down CLK0-CLK2 (R16-R18 = 0x80)
//! 3. Program crystal load capacitance (R183)
//! 4. Program PLL A and PLL B feedback dividers, each followed by its reset bit
//!    in R177. A divider change without the reset leaves the PLL running on the
//!    old feedback ratio.
//! Changing output frequency:
//! 1. Disable outputs
//! 2. Program each multisynth divider (8 registers), then its CLKx control
//! 3. Enable outputs
//! General programming remarks
//! 1. R3 is an output *disable* mask: 0x00 enables everything
//! 2. The R divider stage and spread spectrum are left at their reset values
//! 3. The bus is never read back; an unacknowledged write is not retried

use bitflags::bitflags;
use embedded_hal::blocking::i2c::Write;

use crate::divider::DividerParams;
use crate::Error;

/// 7-bit bus address.
pub const ADDRESS: u8 = 0x60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Register {
    OutputEnable = 3,
    Clk0Control = 16,
    Clk1Control = 17,
    Clk2Control = 18,
    PllReset = 177,
    CrystalLoad = 183,
}

impl Register {
    fn addr(self) -> u8 {
        self as u8
    }
}

bitflags! {
    /// CLKx control register (R16-R18).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClockControl: u8 {
        const POWER_DOWN = 0b1000_0000;
        const INTEGER_MODE = 0b0100_0000;
        const SOURCE_PLL_B = 0b0010_0000;
        const SOURCE_MULTISYNTH = 0b0000_1100;
        const DRIVE_8MA = 0b0000_0011;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct PllReset: u8 {
        const PLL_B = 0b1000_0000;
        const PLL_A = 0b0010_0000;
    }
}

/// Internal load capacitance across the crystal pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CrystalLoad {
    Pf6,
    Pf8,
    Pf10,
}

impl CrystalLoad {
    fn bits(self) -> u8 {
        match self {
            CrystalLoad::Pf6 => 1 << 6,
            CrystalLoad::Pf8 => 2 << 6,
            CrystalLoad::Pf10 => 3 << 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pll {
    A,
    B,
}

impl Pll {
    /// First register of the feedback multisynth (MSNA/MSNB) parameters.
    pub fn base_addr(self) -> u8 {
        match self {
            Pll::A => 26,
            Pll::B => 34,
        }
    }

    fn ix(self) -> usize {
        self as usize
    }

    fn reset_bits(self) -> PllReset {
        match self {
            Pll::A => PllReset::PLL_A,
            Pll::B => PllReset::PLL_B,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockOutput {
    Clk0,
    Clk1,
    Clk2,
}

impl ClockOutput {
    pub const ALL: [ClockOutput; 3] = [ClockOutput::Clk0, ClockOutput::Clk1, ClockOutput::Clk2];

    /// First register of the output multisynth (MS0-MS2) parameters.
    pub fn base_addr(self) -> u8 {
        match self {
            ClockOutput::Clk0 => 42,
            ClockOutput::Clk1 => 50,
            ClockOutput::Clk2 => 58,
        }
    }

    fn control_register(self) -> Register {
        match self {
            ClockOutput::Clk0 => Register::Clk0Control,
            ClockOutput::Clk1 => Register::Clk1Control,
            ClockOutput::Clk2 => Register::Clk2Control,
        }
    }

    fn ix(self) -> usize {
        self as usize
    }
}

/// Feedback ratio `mult + num/denom` of one PLL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PllConfig {
    pub mult: u8,
    pub num: u32,
    pub denom: u32,
}

impl PllConfig {
    pub const fn new(mult: u8, num: u32, denom: u32) -> Self {
        Self { mult, num, denom }
    }

    pub const fn int(mult: u8) -> Self {
        Self::new(mult, 0, 1)
    }

    /// VCO frequency for a given crystal, rounded down.
    pub fn vco_hz(&self, xtal_hz: u32) -> u64 {
        let denom = u64::from(self.denom.max(1));
        u64::from(xtal_hz) * (u64::from(self.mult) * denom + u64::from(self.num)) / denom
    }
}

/// Output divider `div + num/denom` fed by `source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MultisynthConfig {
    pub source: Pll,
    pub div: u32,
    pub num: u32,
    pub denom: u32,
}

impl MultisynthConfig {
    pub fn is_integer(&self) -> bool {
        self.num == 0
    }

    /// Control byte: 8 mA drive, multisynth as clock source.
    pub fn control(&self) -> ClockControl {
        let mut clk = ClockControl::SOURCE_MULTISYNTH | ClockControl::DRIVE_8MA;
        if self.source == Pll::B {
            clk |= ClockControl::SOURCE_PLL_B;
        }
        if self.is_integer() {
            clk |= ClockControl::INTEGER_MODE;
        }
        clk
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    /// Nothing written since power-up.
    Uninitialized,
    /// `init` done, outputs forced off, PLLs not both programmed.
    Disabled,
    /// Both PLLs programmed; outputs follow `enable_outputs`.
    Configured,
}

/// Si5351 driver holding the last state written to each block of the chip.
pub struct Si5351<I2C> {
    i2c: I2C,
    state: DeviceState,
    crystal_load: Option<CrystalLoad>,
    plls: [Option<PllConfig>; 2],
    outputs: [Option<MultisynthConfig>; 3],
    outputs_enabled: bool,
    bus_faults: u32,
}

impl<I2C> Si5351<I2C>
where
    I2C: Write,
{
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            state: DeviceState::Uninitialized,
            crystal_load: None,
            plls: [None; 2],
            outputs: [None; 3],
            outputs_enabled: false,
            bus_faults: 0,
        }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Force every output off and set the crystal load. Must precede any
    /// PLL or multisynth setup.
    pub fn init(&mut self, load: CrystalLoad) {
        info!("si5351: init, crystal load {}", load);
        self.enable_outputs(false);
        for clk in ClockOutput::ALL {
            self.write_register(clk.control_register().addr(), ClockControl::POWER_DOWN.bits());
        }
        self.write_register(Register::CrystalLoad.addr(), load.bits());

        self.state = DeviceState::Disabled;
        self.crystal_load = Some(load);
        self.plls = [None; 2];
        self.outputs = [None; 3];
    }

    /// Write R3. `false` writes 0xFF (all outputs disabled), `true` 0x00.
    pub fn enable_outputs(&mut self, enabled: bool) {
        debug!("si5351: outputs enabled = {}", enabled);
        let mask = if enabled { 0x00 } else { 0xFF };
        self.write_register(Register::OutputEnable.addr(), mask);
        self.outputs_enabled = enabled;
    }

    pub fn setup_pll_int(&mut self, pll: Pll, mult: u8) -> Result<(), Error> {
        self.setup_pll(pll, mult, 0, 1)
    }

    /// Program the feedback divider of `pll`, then pulse its reset bit.
    pub fn setup_pll(&mut self, pll: Pll, mult: u8, num: u32, denom: u32) -> Result<(), Error> {
        self.ensure_initialized()?;
        let params = DividerParams::for_pll(mult, num, denom)?;

        debug!("si5351: PLL {} = {} + {}/{}", pll, mult, num, denom);
        self.write_divider_block(pll.base_addr(), &params);
        self.write_register(Register::PllReset.addr(), pll.reset_bits().bits());

        self.plls[pll.ix()] = Some(PllConfig::new(mult, num, denom));
        if self.plls.iter().all(Option::is_some) {
            self.state = DeviceState::Configured;
        }
        Ok(())
    }

    pub fn setup_multisynth_int(&mut self, output: ClockOutput, src: Pll, div: u32) -> Result<(), Error> {
        self.setup_multisynth(output, src, div, 0, 1)
    }

    /// Program the output divider of `output`, then its control register.
    pub fn setup_multisynth(
        &mut self,
        output: ClockOutput,
        src: Pll,
        div: u32,
        num: u32,
        denom: u32,
    ) -> Result<(), Error> {
        self.ensure_initialized()?;
        let params = DividerParams::for_multisynth(div, num, denom)?;
        let config = MultisynthConfig {
            source: src,
            div,
            num,
            denom,
        };

        debug!("si5351: {} = PLL {} / ({} + {}/{})", output, src, div, num, denom);
        self.write_divider_block(output.base_addr(), &params);
        self.write_register(output.control_register().addr(), config.control().bits());

        self.outputs[output.ix()] = Some(config);
        Ok(())
    }

    /// Eight single-register writes, `base` first.
    pub fn write_divider_block(&mut self, base: u8, params: &DividerParams) {
        trace!("si5351: block @{} = {}", base, params);
        for (offset, value) in (0u8..).zip(params.to_block()) {
            self.write_register(base + offset, value);
        }
    }

    /// Single register write. Faults are counted and otherwise ignored.
    fn write_register(&mut self, reg: u8, value: u8) {
        trace!("si5351: R{} <- {=u8:#x}", reg, value);
        if self.i2c.write(ADDRESS, &[reg, value]).is_err() {
            self.bus_faults = self.bus_faults.saturating_add(1);
            warn!("si5351: write to R{} not acknowledged", reg);
        }
    }

    fn ensure_initialized(&self) -> Result<(), Error> {
        match self.state {
            DeviceState::Uninitialized => Err(Error::NotInitialized),
            _ => Ok(()),
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn crystal_load(&self) -> Option<CrystalLoad> {
        self.crystal_load
    }

    pub fn pll(&self, pll: Pll) -> Option<PllConfig> {
        self.plls[pll.ix()]
    }

    pub fn output(&self, output: ClockOutput) -> Option<MultisynthConfig> {
        self.outputs[output.ix()]
    }

    pub fn outputs_enabled(&self) -> bool {
        self.outputs_enabled
    }

    /// Writes the bus rejected since construction.
    pub fn bus_faults(&self) -> u32 {
        self.bus_faults
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBus;

    fn initialized() -> (Si5351<MockBus>, MockBus) {
        let bus = MockBus::default();
        let mut synth = Si5351::new(bus.clone());
        synth.init(CrystalLoad::Pf10);
        bus.clear();
        (synth, bus)
    }

    fn block(base: u8, bytes: [u8; 8]) -> Vec<(u8, u8)> {
        (base..).zip(bytes).collect()
    }

    #[test]
    fn init_sequence() {
        let bus = MockBus::default();
        let mut synth = Si5351::new(bus.clone());
        assert_eq!(synth.state(), DeviceState::Uninitialized);

        synth.init(CrystalLoad::Pf10);
        assert_eq!(
            bus.writes(),
            vec![(3, 0xff), (16, 0x80), (17, 0x80), (18, 0x80), (183, 0xc0)]
        );
        assert_eq!(synth.state(), DeviceState::Disabled);
        assert_eq!(synth.crystal_load(), Some(CrystalLoad::Pf10));
        assert!(!synth.outputs_enabled());
    }

    #[test]
    fn crystal_load_bits() {
        for (load, bits) in [
            (CrystalLoad::Pf6, 0x40),
            (CrystalLoad::Pf8, 0x80),
            (CrystalLoad::Pf10, 0xc0),
        ] {
            let bus = MockBus::default();
            Si5351::new(bus.clone()).init(load);
            assert_eq!(bus.writes().last(), Some(&(183, bits)));
        }
    }

    #[test]
    fn setup_before_init_is_refused() {
        let bus = MockBus::default();
        let mut synth = Si5351::new(bus.clone());
        assert_eq!(synth.setup_pll_int(Pll::A, 36), Err(Error::NotInitialized));
        assert_eq!(
            synth.setup_multisynth_int(ClockOutput::Clk0, Pll::A, 30),
            Err(Error::NotInitialized)
        );
        assert!(bus.writes().is_empty());
    }

    #[test]
    fn pll_block_then_reset() {
        let (mut synth, bus) = initialized();
        synth.setup_pll(Pll::A, 25, 193_181, 250_000).unwrap();

        let mut expected = block(26, [0xd0, 0x90, 0x00, 0x0a, 0xe2, 0x33, 0x77, 0x60]);
        expected.push((177, 0x20));
        assert_eq!(bus.writes(), expected);
        assert_eq!(synth.state(), DeviceState::Disabled);
        assert_eq!(synth.pll(Pll::A), Some(PllConfig::new(25, 193_181, 250_000)));
    }

    #[test]
    fn both_plls_configure_the_device() {
        let (mut synth, bus) = initialized();
        synth.setup_pll(Pll::A, 25, 193_181, 250_000).unwrap();
        bus.clear();
        synth.setup_pll(Pll::B, 27, 520_141, 781_250).unwrap();

        let mut expected = block(34, [0xeb, 0xc2, 0x00, 0x0b, 0xd5, 0xb2, 0x9f, 0x16]);
        expected.push((177, 0x80));
        assert_eq!(bus.writes(), expected);
        assert_eq!(synth.state(), DeviceState::Configured);
    }

    #[test]
    fn multisynth_control_bytes() {
        let (mut synth, bus) = initialized();
        synth.setup_multisynth_int(ClockOutput::Clk0, Pll::A, 30).unwrap();
        synth.setup_multisynth_int(ClockOutput::Clk1, Pll::B, 26).unwrap();
        synth.setup_multisynth(ClockOutput::Clk2, Pll::A, 30, 1, 3).unwrap();

        let writes = bus.writes();
        assert_eq!(writes.len(), 27);
        assert_eq!(&writes[..8], &block(42, [0, 1, 0, 0x0d, 0x00, 0, 0, 0])[..]);
        assert_eq!(writes[8], (16, 0x4f));
        assert_eq!(&writes[9..17], &block(50, [0, 1, 0, 0x0b, 0x00, 0, 0, 0])[..]);
        assert_eq!(writes[17], (17, 0x6f));
        assert_eq!(writes[26], (18, 0x0f));

        assert_eq!(
            synth.output(ClockOutput::Clk1),
            Some(MultisynthConfig {
                source: Pll::B,
                div: 26,
                num: 0,
                denom: 1
            })
        );
    }

    #[test]
    fn enable_mask_is_inverted() {
        let (mut synth, bus) = initialized();
        synth.enable_outputs(true);
        assert!(synth.outputs_enabled());
        synth.enable_outputs(false);
        assert!(!synth.outputs_enabled());
        assert_eq!(bus.writes(), vec![(3, 0x00), (3, 0xff)]);
    }

    #[test]
    fn out_of_range_ratio_writes_nothing() {
        let (mut synth, bus) = initialized();
        assert_eq!(
            synth.setup_pll_int(Pll::B, 91),
            Err(Error::PllMultiplierOutOfRange(91))
        );
        assert_eq!(
            synth.setup_multisynth(ClockOutput::Clk0, Pll::A, 30, 1, 0),
            Err(Error::ZeroDenominator)
        );
        assert!(bus.writes().is_empty());
        assert_eq!(synth.pll(Pll::B), None);
        assert_eq!(synth.output(ClockOutput::Clk0), None);
    }

    #[test]
    fn bus_faults_do_not_stop_the_sequence() {
        let bus = MockBus::default();
        bus.fail(true);
        let mut synth = Si5351::new(bus.clone());
        synth.init(CrystalLoad::Pf8);
        synth.setup_pll_int(Pll::A, 36).unwrap();

        assert_eq!(bus.writes().len(), 5 + 9);
        assert_eq!(synth.bus_faults(), 14);
        assert_eq!(synth.state(), DeviceState::Disabled);
    }

    #[test]
    fn vco_frequency() {
        assert_eq!(PllConfig::new(25, 193_181, 250_000).vco_hz(25_000_000), 644_318_100);
        assert_eq!(PllConfig::int(36).vco_hz(25_000_000), 900_000_000);
    }
}
