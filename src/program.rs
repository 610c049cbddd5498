//! Clock programs. Ratios come from ClockBuilder Desktop for a 25 MHz crystal.
//! Both PLLs are programmed once at boot; switching standards only re-targets
//! the output multisynths.
//!
//! | Standard | PLL | Feedback              | VCO            | Divider | Output          |
//! |----------|-----|-----------------------|----------------|---------|-----------------|
//! | NTSC     | A   | 25 + 193181/250000    | 644.318100 MHz | 30      | 21.477270 MHz   |
//! | PAL      | B   | 27 + 520141/781250    | 691.644512 MHz | 26      | 26.601712 MHz   |
//! | PAL 5/4  | A   | 25 + 193181/250000    | 644.318100 MHz | 24      | 26.8465875 MHz  |

use crate::si5351::{ClockOutput, CrystalLoad, Pll, PllConfig};

/// Video standard selected by the mode switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Standard {
    Ntsc,
    Pal,
}

impl Standard {
    /// Switch high selects PAL.
    pub fn from_switch(level: bool) -> Self {
        if level {
            Standard::Pal
        } else {
            Standard::Ntsc
        }
    }
}

/// Integer output divider and the PLL it divides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Selection {
    pub source: Pll,
    pub div: u32,
}

impl Selection {
    pub fn output_hz(&self, pll: &PllConfig, xtal_hz: u32) -> u64 {
        pll.vco_hz(xtal_hz) / u64::from(self.div.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockProgram {
    pub xtal_hz: u32,
    pub crystal_load: CrystalLoad,
    pub pll_a: PllConfig,
    pub pll_b: PllConfig,
    pub ntsc: Selection,
    pub pal: Selection,
    /// Outputs reprogrammed on every standard change.
    pub outputs: &'static [ClockOutput],
}

impl ClockProgram {
    pub fn pll(&self, pll: Pll) -> &PllConfig {
        match pll {
            Pll::A => &self.pll_a,
            Pll::B => &self.pll_b,
        }
    }

    pub fn selection(&self, standard: Standard) -> Selection {
        match standard {
            Standard::Ntsc => self.ntsc,
            Standard::Pal => self.pal,
        }
    }

    pub fn output_hz(&self, standard: Standard) -> u64 {
        let selection = self.selection(standard);
        selection.output_hz(self.pll(selection.source), self.xtal_hz)
    }
}

pub static COLOR_CARRIER: ClockProgram = ClockProgram {
    xtal_hz: 25_000_000,
    crystal_load: CrystalLoad::Pf10,
    pll_a: PllConfig::new(25, 193_181, 250_000),
    pll_b: PllConfig::new(27, 520_141, 781_250),
    ntsc: Selection {
        source: Pll::A,
        div: 30,
    },
    pal: Selection {
        source: Pll::B,
        div: 26,
    },
    outputs: &[ClockOutput::Clk0, ClockOutput::Clk1],
};

/// PAL at 5/4 of the NTSC VCO; needs no second PLL.
pub const PAL_5_4: Selection = Selection {
    source: Pll::A,
    div: 24,
};
