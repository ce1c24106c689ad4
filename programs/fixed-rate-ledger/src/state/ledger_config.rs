use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};

use crate::{
    constants::LEDGER_DISCRIMINATOR,
    error::LedgerError,
    state::{CollateralRegistry, MaturitySeries},
};

/// Deployment-wide configuration of a ledger
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct LedgerConfig {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Is initialized flag
    pub is_initialized: bool,

    /// Account that initialized the ledger
    pub authority: Pubkey,

    /// SPL mint of the stable asset
    pub stable_mint: Pubkey,

    /// SPL mint of the yToken; its mint authority is the ledger's mint authority PDA
    pub y_token_mint: Pubkey,

    /// Feed publishing the underlying platform's accumulated rate
    pub rate_feed: Pubkey,

    /// Admissible collateral kinds
    pub registry: CollateralRegistry,

    /// yToken maturity and rate snapshot
    pub series: MaturitySeries,

    /// PDA bumps
    pub bump: u8,
    pub treasury_bump: u8,
    pub mint_authority_bump: u8,
}

impl LedgerConfig {
    pub const LEN: usize = 8 + // discriminator
        1 + // is_initialized
        32 + // authority
        32 + // stable_mint
        32 + // y_token_mint
        32 + // rate_feed
        CollateralRegistry::LEN + // registry
        MaturitySeries::LEN + // series
        3 + // bumps
        64; // padding

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        authority: Pubkey,
        stable_mint: Pubkey,
        y_token_mint: Pubkey,
        rate_feed: Pubkey,
        registry: CollateralRegistry,
        maturity: UnixTimestamp,
        bump: u8,
        treasury_bump: u8,
        mint_authority_bump: u8,
    ) -> Self {
        Self {
            discriminator: LEDGER_DISCRIMINATOR,
            is_initialized: true,
            authority,
            stable_mint,
            y_token_mint,
            rate_feed,
            registry,
            series: MaturitySeries::new(maturity),
            bump,
            treasury_bump,
            mint_authority_bump,
        }
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.discriminator != LEDGER_DISCRIMINATOR {
            return Err(LedgerError::InvalidAccount);
        }
        if !self.is_initialized {
            return Err(LedgerError::NotInitialized);
        }
        if self.stable_mint == self.y_token_mint {
            return Err(LedgerError::InvalidAccount);
        }
        if self.registry.iter().any(|c| c.mint == self.y_token_mint || c.mint == self.stable_mint) {
            return Err(LedgerError::InvalidAccount);
        }
        Ok(())
    }
}
