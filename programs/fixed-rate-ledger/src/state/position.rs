use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::{
    constants::{POSITION_DISCRIMINATOR, POSITION_SEED},
    error::LedgerError,
    state::CollateralType,
};

/// Identifies a position: one per collateral type and owner
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PositionKey {
    pub collateral: CollateralType,
    pub owner: Pubkey,
}

impl PositionKey {
    pub fn new(collateral: CollateralType, owner: Pubkey) -> Self {
        Self { collateral, owner }
    }

    pub fn find_address(&self, program_id: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[POSITION_SEED, &self.collateral.tag(), self.owner.as_ref()],
            program_id,
        )
    }
}

/// Collateral posted and face-value debt owed by one user for one collateral type
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    /// Collateral in the collateral's native units
    pub posted: u64,

    /// Debt in yToken units
    pub debt_face: u64,
}

impl Position {
    pub fn new(posted: u64, debt_face: u64) -> Self {
        Self { posted, debt_face }
    }

    /// A position with nothing posted and nothing owed carries no meaning
    pub fn is_empty(&self) -> bool {
        self.posted == 0 && self.debt_face == 0
    }

    pub fn add_posted(&mut self, amount: u64) -> Result<(), LedgerError> {
        self.posted = self
            .posted
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        Ok(())
    }

    pub fn remove_posted(&mut self, amount: u64) -> Result<(), LedgerError> {
        self.posted = self
            .posted
            .checked_sub(amount)
            .ok_or(LedgerError::InvariantViolation)?;
        Ok(())
    }

    pub fn add_debt(&mut self, face: u64) -> Result<(), LedgerError> {
        self.debt_face = self
            .debt_face
            .checked_add(face)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        Ok(())
    }

    pub fn remove_debt(&mut self, face: u64) -> Result<(), LedgerError> {
        self.debt_face = self
            .debt_face
            .checked_sub(face)
            .ok_or(LedgerError::InvariantViolation)?;
        Ok(())
    }
}

/// On-chain home of a [`Position`], a PDA derived from its [`PositionKey`]
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct PositionAccount {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Is initialized
    pub is_initialized: bool,

    pub key: PositionKey,

    pub position: Position,

    /// PDA bump
    pub bump: u8,
}

impl PositionAccount {
    pub const LEN: usize = 8 + // discriminator
        1 + // is_initialized
        1 + 32 + // key
        8 + 8 + // position
        1 + // bump
        32; // padding

    pub fn new(key: PositionKey, bump: u8) -> Self {
        Self {
            discriminator: POSITION_DISCRIMINATOR,
            is_initialized: true,
            key,
            position: Position::default(),
            bump,
        }
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.discriminator != POSITION_DISCRIMINATOR {
            return Err(LedgerError::InvalidAccount);
        }
        if !self.is_initialized {
            return Err(LedgerError::NotInitialized);
        }
        Ok(())
    }
}
