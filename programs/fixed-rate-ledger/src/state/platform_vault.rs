use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::{
    constants::{PLATFORM_VAULT_DISCRIMINATOR, PLATFORM_VAULT_SEED},
    error::LedgerError,
    math::Wad,
    state::{CollateralType, Migration},
};

/// A user's own position in the underlying platform, the destination of a split
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlatformVault {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Is initialized
    pub is_initialized: bool,

    pub owner: Pubkey,

    pub collateral: CollateralType,

    /// Locked collateral
    pub ink: u64,

    /// Normalized debt
    pub art: u64,

    /// PDA bump
    pub bump: u8,
}

impl PlatformVault {
    pub const LEN: usize = 8 + 1 + 32 + 1 + 8 + 8 + 1 + 32;

    pub fn new(owner: Pubkey, collateral: CollateralType, bump: u8) -> Self {
        Self {
            discriminator: PLATFORM_VAULT_DISCRIMINATOR,
            is_initialized: true,
            owner,
            collateral,
            ink: 0,
            art: 0,
            bump,
        }
    }

    pub fn find_address(program_id: &Pubkey, platform_id: &[u8; 32], owner: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[PLATFORM_VAULT_SEED, platform_id, owner.as_ref()], program_id)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.discriminator != PLATFORM_VAULT_DISCRIMINATOR {
            return Err(LedgerError::InvalidAccount);
        }
        if !self.is_initialized {
            return Err(LedgerError::NotInitialized);
        }
        Ok(())
    }

    pub fn receive(&mut self, migration: &Migration) -> Result<(), LedgerError> {
        self.ink = self
            .ink
            .checked_add(migration.collateral)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        self.art = self
            .art
            .checked_add(migration.normalized_debt)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Debt in stable-asset terms at `rate`
    pub fn debt(&self, rate: u128) -> Result<u64, LedgerError> {
        Wad::mul_ceil(self.art, rate)
    }
}
