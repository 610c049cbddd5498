//! Feedback (PLL) and output (multisynth) dividers share one register format.
//! A ratio `a + b/c` is stored as three fields:
//!   P1 = 128*a + floor(128*b/c) - 512   (18 bits)
//!   P2 = 128*b - c*floor(128*b/c)       (20 bits)
//!   P3 = c                              (20 bits)
//! packed into eight consecutive registers:
//!
//! ```text
//! base+0  P3[15:8]
//! base+1  P3[7:0]
//! base+2  P1[17:16]
//! base+3  P1[15:8]
//! base+4  P1[7:0]
//! base+5  P3[19:16] << 4 | P2[19:16]
//! base+6  P2[15:8]
//! base+7  P2[7:0]
//! ```
//!
//! `floor(128*b/c)` is exact integer division. ClockBuilder (and the C drivers
//! derived from it) use a single precision divide; both agree for every ratio
//! shipped in [`crate::program`], and where they disagree the float result
//! overshoots and P2 goes negative.

use core::ops::RangeInclusive;

use crate::Error;

pub const P1_MAX: u32 = (1 << 18) - 1;
pub const P2_MAX: u32 = (1 << 20) - 1;
pub const P3_MAX: u32 = (1 << 20) - 1;

/// Feedback multiplier range the VCO (600-900 MHz) accepts.
pub const PLL_MULT_RANGE: RangeInclusive<u8> = 15..=90;
/// Integer part of an output divider, including the 4/6 integer-only settings.
pub const MULTISYNTH_DIV_RANGE: RangeInclusive<u32> = 4..=2048;

/// Packed P1/P2/P3 triple for one divider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DividerParams {
    pub p1: u32,
    pub p2: u32,
    pub p3: u32,
}

impl DividerParams {
    /// Encode a PLL feedback ratio `mult + num/denom`.
    pub fn for_pll(mult: u8, num: u32, denom: u32) -> Result<Self, Error> {
        if !PLL_MULT_RANGE.contains(&mult) {
            return Err(Error::PllMultiplierOutOfRange(mult));
        }
        check_denom(denom)?;

        let mult = u64::from(mult);
        if num == 0 {
            // Integer mode
            Self::checked(128 * mult - 512, u64::from(num), denom)
        } else {
            Self::fractional(mult, num, denom)
        }
    }

    /// Encode an output divider ratio `div + num/denom`.
    ///
    /// `denom == 1` with a non-zero `num` takes the pre-scaled path: the
    /// caller hands over an already integral fraction, which is packed
    /// without the floor step.
    pub fn for_multisynth(div: u32, num: u32, denom: u32) -> Result<Self, Error> {
        if !MULTISYNTH_DIV_RANGE.contains(&div) {
            return Err(Error::DividerOutOfRange(div));
        }
        check_denom(denom)?;

        let div = u64::from(div);
        let num64 = u64::from(num);
        if num == 0 {
            // Integer mode
            Self::checked(128 * div - 512, 0, denom)
        } else if denom == 1 {
            Self::checked(128 * div + 128 * num64 - 512, 128 * num64 - 128, 1)
        } else {
            Self::fractional(div, num, denom)
        }
    }

    fn fractional(int: u64, num: u32, denom: u32) -> Result<Self, Error> {
        let num = u64::from(num);
        let frac = 128 * num / u64::from(denom);
        Self::checked(
            128 * int + frac - 512,
            128 * num - u64::from(denom) * frac,
            denom,
        )
    }

    fn checked(p1: u64, p2: u64, p3: u32) -> Result<Self, Error> {
        match (u32::try_from(p1), u32::try_from(p2)) {
            (Ok(p1), Ok(p2)) if p1 <= P1_MAX && p2 <= P2_MAX => Ok(Self { p1, p2, p3 }),
            _ => Err(Error::FieldOverflow),
        }
    }

    /// Register image, lowest address first.
    pub fn to_block(&self) -> [u8; 8] {
        let [p1_h, p1_m, p1_l] = low_bytes(self.p1);
        let [p2_h, p2_m, p2_l] = low_bytes(self.p2);
        let [p3_h, p3_m, p3_l] = low_bytes(self.p3);
        [
            p3_m,
            p3_l,
            p1_h & 0x03,
            p1_m,
            p1_l,
            (p3_h & 0x0f) << 4 | (p2_h & 0x0f),
            p2_m,
            p2_l,
        ]
    }

    pub fn from_block(block: &[u8; 8]) -> Self {
        let b = (*block).map(u32::from);
        Self {
            p1: (b[2] & 0x03) << 16 | b[3] << 8 | b[4],
            p2: (b[5] & 0x0f) << 16 | b[6] << 8 | b[7],
            p3: (b[5] >> 4) << 16 | b[0] << 8 | b[1],
        }
    }
}

fn check_denom(denom: u32) -> Result<(), Error> {
    match denom {
        0 => Err(Error::ZeroDenominator),
        d if d > P3_MAX => Err(Error::DenominatorTooLarge(d)),
        _ => Ok(()),
    }
}

fn low_bytes(field: u32) -> [u8; 3] {
    let [_, h, m, l] = field.to_be_bytes();
    [h, m, l]
}

#[cfg(test)]
use proptest::prelude::*;


#[cfg(test)]
proptest! {
    #[test]
    fn integer_pll(mult in PLL_MULT_RANGE, denom in 1..=P3_MAX) {
        let params = DividerParams::for_pll(mult, 0, denom).unwrap();
        prop_assert_eq!(params.p1, 128 * u32::from(mult) - 512);
        prop_assert_eq!(params.p2, 0);
        prop_assert_eq!(params.p3, denom);
    }

    #[test]
    fn fractional_pll_reconstructs_ratio(
        mult in PLL_MULT_RANGE,
        denom in 2..=P3_MAX,
        seed in any::<u32>(),
    ) {
        let num = 1 + seed % (denom - 1);
        let params = DividerParams::for_pll(mult, num, denom).unwrap();
        let (p1, p2, p3) = (u64::from(params.p1), u64::from(params.p2), u64::from(params.p3));
        prop_assert!(p2 < p3);
        prop_assert_eq!(
            (p1 + 512) * p3 + p2,
            128 * (u64::from(mult) * u64::from(denom) + u64::from(num))
        );
        prop_assert_eq!(DividerParams::for_pll(mult, num, denom).unwrap(), params);
    }

    #[test]
    fn prescaled_unit_fraction_matches_general(div in 4u32..=2000, k in 2..=P3_MAX) {
        let prescaled = DividerParams::for_multisynth(div, 1, 1).unwrap();
        let general = DividerParams::for_multisynth(div, k, k).unwrap();
        prop_assert_eq!(prescaled.p1, general.p1);
        prop_assert_eq!(prescaled.p2, general.p2);
    }

    #[test]
    fn block_decodes_to_same_fields(p1 in 0..=P1_MAX, p2 in 0..=P2_MAX, p3 in 0..=P3_MAX) {
        let params = DividerParams { p1, p2, p3 };
        prop_assert_eq!(DividerParams::from_block(&params.to_block()), params);
    }
}
