use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::msg;

use crate::{
    constants::{MAX_COLLATERAL_TYPES, TREASURY_DISCRIMINATOR},
    error::LedgerError,
    math::Wad,
    state::CollateralType,
};

/// Outcome of moving a position out of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Migration {
    /// Collateral handed to the destination
    pub collateral: u64,

    /// Debt the destination owes at the migration rate, in stable-asset terms.
    /// Rounded up from the released present value by less than one normalized unit.
    pub debt: u64,

    /// Debt handed to the destination, in platform-normalized units
    pub normalized_debt: u64,

    /// Stable-asset value of debt the pool did not carry and had to draw fresh
    pub shortfall: u64,
}

/// Bookkeeping of the pooled platform position held on behalf of every ledger user.
///
/// Debt is recorded in platform-normalized units: the stable-asset value of
/// `pooled_debt` is `pooled_debt * rate` for the platform's current rate.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct TreasuryState {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Is initialized
    pub is_initialized: bool,

    /// Collateral locked in the pool, indexed by `CollateralType::index`
    pub pooled_collateral: [u64; MAX_COLLATERAL_TYPES],

    /// Debt drawn against the pool, normalized
    pub pooled_debt: u64,

    /// Stable asset held in wrapped-savings form
    pub savings: u64,

    /// PDA bump
    pub bump: u8,
}

impl TreasuryState {
    pub const LEN: usize = 8 + // discriminator
        1 + // is_initialized
        8 * MAX_COLLATERAL_TYPES + // pooled_collateral
        8 + // pooled_debt
        8 + // savings
        1 + // bump
        32; // padding

    pub fn new(bump: u8) -> Self {
        Self {
            discriminator: TREASURY_DISCRIMINATOR,
            is_initialized: true,
            pooled_collateral: [0; MAX_COLLATERAL_TYPES],
            pooled_debt: 0,
            savings: 0,
            bump,
        }
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.discriminator != TREASURY_DISCRIMINATOR {
            return Err(LedgerError::InvalidAccount);
        }
        if !self.is_initialized {
            return Err(LedgerError::NotInitialized);
        }
        Ok(())
    }

    pub fn collateral(&self, collateral: CollateralType) -> u64 {
        self.pooled_collateral[collateral.index()]
    }

    pub fn deposit_collateral(&mut self, collateral: CollateralType, amount: u64) -> Result<(), LedgerError> {
        let slot = &mut self.pooled_collateral[collateral.index()];
        *slot = slot.checked_add(amount).ok_or(LedgerError::ArithmeticOverflow)?;
        Ok(())
    }

    pub fn withdraw_collateral(&mut self, collateral: CollateralType, amount: u64) -> Result<(), LedgerError> {
        let slot = &mut self.pooled_collateral[collateral.index()];
        *slot = slot.checked_sub(amount).ok_or(LedgerError::CustodianShortfall)?;
        Ok(())
    }

    /// Draw `amount` of stable asset against the pool. The proceeds are saved.
    pub fn draw_debt(&mut self, amount: u64, rate: u128) -> Result<u64, LedgerError> {
        let normalized = Wad::div_ceil(amount, rate)?;
        self.pooled_debt = self
            .pooled_debt
            .checked_add(normalized)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        self.savings = self
            .savings
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        Ok(normalized)
    }

    /// Pay `amount` of stable asset into the pool. Whatever exceeds the pooled debt is saved.
    pub fn repay_debt(&mut self, amount: u64, rate: u128) -> Result<u64, LedgerError> {
        let normalized = Wad::div_floor(amount, rate)?;
        let repaid = normalized.min(self.pooled_debt);
        self.pooled_debt -= repaid;

        if normalized > repaid {
            let excess = Wad::mul_floor(normalized - repaid, rate)?;
            self.savings = self
                .savings
                .checked_add(excess)
                .ok_or(LedgerError::ArithmeticOverflow)?;
        }
        Ok(repaid)
    }

    /// Release `collateral_amount` and `debt` (stable-asset terms) from the pool.
    ///
    /// When the pool carries less debt than is being handed over, the missing part
    /// is drawn fresh for the destination and its stable-asset proceeds land in savings.
    pub fn migrate(
        &mut self,
        collateral: CollateralType,
        collateral_amount: u64,
        debt: u64,
        rate: u128,
    ) -> Result<Migration, LedgerError> {
        if self.collateral(collateral) < collateral_amount {
            msg!(
                "Pool holds {} collateral, {} requested",
                self.collateral(collateral),
                collateral_amount
            );
            return Err(LedgerError::CustodianShortfall);
        }

        let normalized_debt = Wad::div_ceil(debt, rate)?;
        let from_pool = normalized_debt.min(self.pooled_debt);
        let shortfall = Wad::mul_floor(normalized_debt - from_pool, rate)?;

        let savings = self
            .savings
            .checked_add(shortfall)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        self.withdraw_collateral(collateral, collateral_amount)?;
        self.pooled_debt -= from_pool;
        self.savings = savings;

        Ok(Migration {
            collateral: collateral_amount,
            debt: Wad::mul_ceil(normalized_debt, rate)?,
            normalized_debt,
            shortfall,
        })
    }
}
