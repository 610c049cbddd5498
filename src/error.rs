use thiserror::Error;

/// Reasons a ratio or setup request is refused before anything reaches the bus.
///
/// Bus faults are not represented here: the register writer never reports
/// them (see [`Si5351::bus_faults`](crate::Si5351::bus_faults)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    #[error("fraction denominator is zero")]
    ZeroDenominator,
    #[error("fraction denominator {0} does not fit in 20 bits")]
    DenominatorTooLarge(u32),
    #[error("PLL multiplier {0} outside 15..=90")]
    PllMultiplierOutOfRange(u8),
    #[error("multisynth divisor {0} outside 4..=2048")]
    DividerOutOfRange(u32),
    #[error("ratio does not fit the P1/P2 register fields")]
    FieldOverflow,
    #[error("synthesizer used before init")]
    NotInitialized,
}
