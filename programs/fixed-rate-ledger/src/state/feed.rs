use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{account_info::AccountInfo, clock::UnixTimestamp};

use crate::{constants::FEED_DISCRIMINATOR, error::LedgerError};

/// Ratio published by an external feed: a collateral price or the platform's accumulated rate
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceFeed {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Ratio scaled by `WAD`. Zero means unconfigured.
    pub value: u128,

    /// Last publication time
    pub last_update: UnixTimestamp,
}

impl PriceFeed {
    pub const LEN: usize = 8 + 16 + 8;

    pub fn new(value: u128, last_update: UnixTimestamp) -> Self {
        Self {
            discriminator: FEED_DISCRIMINATOR,
            value,
            last_update,
        }
    }

    pub fn load(info: &AccountInfo) -> Result<Self, LedgerError> {
        let data = info.try_borrow_data().map_err(|_| LedgerError::OracleUnavailable)?;
        let feed = Self::deserialize(&mut &data[..]).map_err(|_| LedgerError::OracleUnavailable)?;
        if feed.discriminator != FEED_DISCRIMINATOR {
            return Err(LedgerError::OracleUnavailable);
        }
        Ok(feed)
    }

    pub fn ratio(&self) -> Result<u128, LedgerError> {
        if self.value == 0 {
            return Err(LedgerError::OracleUnavailable);
        }
        Ok(self.value)
    }
}
