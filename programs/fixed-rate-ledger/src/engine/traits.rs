use std::collections::BTreeMap;

use solana_program::pubkey::Pubkey;

use crate::{
    error::LedgerError,
    state::{CollateralType, Migration, Position, PositionKey},
};

/// Current collateral price in stable-asset terms
pub trait PriceOracle {
    /// Price scaled by `WAD`. Fails when the feed is unconfigured.
    fn price(&self, collateral: CollateralType) -> Result<u128, LedgerError>;
}

/// Holder of the pooled platform position on behalf of every ledger user
pub trait Custodian {
    /// Move `amount` of collateral from `from` into the pool
    fn deposit_collateral(
        &mut self,
        collateral: CollateralType,
        from: &Pubkey,
        amount: u64,
    ) -> Result<(), LedgerError>;

    /// Release `amount` of pooled collateral to `to`
    fn withdraw_collateral(
        &mut self,
        collateral: CollateralType,
        amount: u64,
        to: &Pubkey,
    ) -> Result<(), LedgerError>;

    /// Increase pooled debt by `amount` of stable asset
    fn draw_debt(&mut self, amount: u64) -> Result<(), LedgerError>;

    /// Take `amount` of stable asset from `from` and pay down pooled debt
    fn repay_debt(&mut self, from: &Pubkey, amount: u64) -> Result<(), LedgerError>;

    /// Stable asset currently held in wrapped-savings form
    fn reserve_savings(&self) -> Result<u64, LedgerError>;

    /// Hand collateral and stable-asset debt to `destination`'s own platform position.
    ///
    /// Succeeds even when the pool carries less debt than `debt`; fails without
    /// effect when the pool cannot supply the collateral. The returned `debt` is
    /// what the destination now owes, which may exceed `debt` by less than one
    /// normalized unit of the platform rate.
    fn migrate_position(
        &mut self,
        collateral: CollateralType,
        collateral_amount: u64,
        debt: u64,
        destination: &Pubkey,
    ) -> Result<Migration, LedgerError>;
}

/// The maturity-dated synthetic debt token
pub trait SyntheticToken {
    /// Fails when minting `amount` to `to` would fail, without minting anything
    fn check_mint(&self, to: &Pubkey, amount: u64) -> Result<(), LedgerError>;

    fn mint(&mut self, to: &Pubkey, amount: u64) -> Result<(), LedgerError>;

    fn burn(&mut self, from: &Pubkey, amount: u64) -> Result<(), LedgerError>;

    fn is_matured(&self) -> bool;

    /// Growth of the platform rate since maturity, scaled by `WAD`. One before maturity.
    fn rate_differential(&self) -> Result<u128, LedgerError>;
}

/// Where positions live. Unknown keys read as the empty position.
pub trait PositionStore {
    fn position(&self, key: &PositionKey) -> Result<Position, LedgerError>;

    fn save(&mut self, key: &PositionKey, position: Position) -> Result<(), LedgerError>;
}

pub type PositionBook = BTreeMap<PositionKey, Position>;

impl PositionStore for PositionBook {
    fn position(&self, key: &PositionKey) -> Result<Position, LedgerError> {
        Ok(self.get(key).copied().unwrap_or_default())
    }

    fn save(&mut self, key: &PositionKey, position: Position) -> Result<(), LedgerError> {
        if position.is_empty() {
            self.remove(key);
        } else {
            self.insert(*key, position);
        }
        Ok(())
    }
}
