use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::{constants::MAX_COLLATERAL_TYPES, error::LedgerError};

/// Admissible collateral kinds
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CollateralType {
    /// Wrapped native token
    Native,
    /// Yield-bearing wrapped savings token
    Savings,
}

impl CollateralType {
    pub const ALL: [CollateralType; MAX_COLLATERAL_TYPES] =
        [CollateralType::Native, CollateralType::Savings];

    pub fn tag(&self) -> [u8; 4] {
        match self {
            CollateralType::Native => *b"WETH",
            CollateralType::Savings => *b"CHAI",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            CollateralType::Native => 0,
            CollateralType::Savings => 1,
        }
    }
}

impl TryFrom<u8> for CollateralType {
    type Error = LedgerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(LedgerError::UnregisteredCollateral)
    }
}

/// How one collateral type is addressed outside the ledger
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct CollateralConfig {
    pub collateral: CollateralType,

    /// SPL mint of the collateral token
    pub mint: Pubkey,

    /// Price feed account for this collateral
    pub oracle: Pubkey,

    /// Identifier of the collateral kind in the underlying platform (e.g. `ETH-A`)
    pub platform_id: [u8; 32],
}

impl CollateralConfig {
    pub const LEN: usize = 1 + 32 + 32 + 32;

    pub fn new(collateral: CollateralType, mint: Pubkey, oracle: Pubkey, platform_id: &str) -> Self {
        let mut id = [0u8; 32];
        let bytes = platform_id.as_bytes();
        let len = bytes.len().min(32);
        id[..len].copy_from_slice(&bytes[..len]);

        Self {
            collateral,
            mint,
            oracle,
            platform_id: id,
        }
    }
}

/// Fixed set of collateral kinds accepted by a ledger. Immutable after initialization.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq)]
pub struct CollateralRegistry {
    entries: Vec<CollateralConfig>,
}

impl CollateralRegistry {
    pub const LEN: usize = 4 + MAX_COLLATERAL_TYPES * CollateralConfig::LEN;

    pub fn new(entries: Vec<CollateralConfig>) -> Result<Self, LedgerError> {
        if entries.is_empty() || entries.len() > MAX_COLLATERAL_TYPES {
            return Err(LedgerError::InvalidInstruction);
        }
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.collateral == entry.collateral) {
                return Err(LedgerError::InvalidInstruction);
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, collateral: CollateralType) -> Result<&CollateralConfig, LedgerError> {
        self.entries
            .iter()
            .find(|e| e.collateral == collateral)
            .ok_or(LedgerError::UnregisteredCollateral)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollateralConfig> {
        self.entries.iter()
    }
}
