use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::clock::UnixTimestamp;

use crate::{error::LedgerError, math::Wad};

/// Lifecycle of a yToken series
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesState {
    Active,
    /// The platform rate captured when the series matured. Set once, never rewritten.
    Matured { rate_at_maturity: u128 },
}

/// Maturity schedule of the synthetic debt token and its rate snapshot
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaturitySeries {
    pub maturity: UnixTimestamp,
    pub state: SeriesState,
}

impl MaturitySeries {
    pub const LEN: usize = 8 + 1 + 16;

    pub fn new(maturity: UnixTimestamp) -> Self {
        Self {
            maturity,
            state: SeriesState::Active,
        }
    }

    pub fn is_matured(&self) -> bool {
        matches!(self.state, SeriesState::Matured { .. })
    }

    /// Active -> Matured, capturing `rate` as the snapshot
    pub fn mature(&mut self, now: UnixTimestamp, rate: u128) -> Result<(), LedgerError> {
        if self.is_matured() {
            return Err(LedgerError::AlreadyMatured);
        }
        if now < self.maturity {
            return Err(LedgerError::NotYetMature);
        }
        if rate == 0 {
            return Err(LedgerError::OracleUnavailable);
        }

        self.state = SeriesState::Matured {
            rate_at_maturity: rate,
        };
        Ok(())
    }

    /// Growth of the platform rate since maturity, scaled by `WAD`.
    ///
    /// Exactly one before maturity. Rounded up and floored at one afterwards, so
    /// debt measured with it is never underestimated.
    pub fn rate_differential(&self, rate_now: u128) -> Result<u128, LedgerError> {
        match self.state {
            SeriesState::Active => Ok(Wad::ONE),
            SeriesState::Matured { rate_at_maturity } => {
                let differential = Wad::ratio_ceil(rate_now, rate_at_maturity)?;
                Ok(differential.max(Wad::ONE))
            }
        }
    }
}
