use solana_program::{msg, pubkey::Pubkey};

use crate::{
    engine::{
        conversion,
        traits::{Custodian, PositionStore, PriceOracle, SyntheticToken},
    },
    error::LedgerError,
    math::Wad,
    state::{CollateralRegistry, CollateralType, Migration, Position, PositionKey},
};

/// Result of a repayment in either settlement asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Repayment {
    /// Tokens actually taken from the user
    pub paid: u64,

    /// Face debt removed from the position
    pub face_cancelled: u64,

    /// Part of the offered amount that was not needed and stays with the user
    pub surplus: u64,
}

/// Position accounting and debt conversion engine.
///
/// Every mutating operation validates first, performs its collaborator effects
/// with the custodian call leading, and writes the position last. A failure at
/// any step leaves the position untouched.
pub struct Ledger<S, O, C, T> {
    registry: CollateralRegistry,
    store: S,
    oracle: O,
    custodian: C,
    token: T,
}

impl<S, O, C, T> Ledger<S, O, C, T>
where
    S: PositionStore,
    O: PriceOracle,
    C: Custodian,
    T: SyntheticToken,
{
    pub fn new(registry: CollateralRegistry, store: S, oracle: O, custodian: C, token: T) -> Self {
        Self {
            registry,
            store,
            oracle,
            custodian,
            token,
        }
    }

    pub fn custodian(&self) -> &C {
        &self.custodian
    }

    pub fn into_parts(self) -> (S, O, C, T) {
        (self.store, self.oracle, self.custodian, self.token)
    }

    pub fn position(&self, collateral: CollateralType, user: &Pubkey) -> Result<Position, LedgerError> {
        self.registry.get(collateral)?;
        self.store.position(&PositionKey::new(collateral, *user))
    }

    pub fn posted(&self, collateral: CollateralType, user: &Pubkey) -> Result<u64, LedgerError> {
        Ok(self.position(collateral, user)?.posted)
    }

    pub fn debt_face(&self, collateral: CollateralType, user: &Pubkey) -> Result<u64, LedgerError> {
        Ok(self.position(collateral, user)?.debt_face)
    }

    /// Stable-asset value of the user's posted collateral
    pub fn power(&self, collateral: CollateralType, user: &Pubkey) -> Result<u64, LedgerError> {
        let position = self.position(collateral, user)?;
        let price = self.oracle.price(collateral)?;
        Ok(conversion::power(position.posted, price))
    }

    /// Stable asset the user would need today to clear their debt
    pub fn debt_in_stable_asset(&self, collateral: CollateralType, user: &Pubkey) -> Result<u64, LedgerError> {
        let position = self.position(collateral, user)?;
        conversion::present_value(position.debt_face, self.token.rate_differential()?)
    }

    /// yToken face value of `amount` stable asset at the current differential
    pub fn face_value_of(&self, amount: u64) -> Result<u64, LedgerError> {
        conversion::face_value(amount, self.token.rate_differential()?)
    }

    pub fn post(&mut self, collateral: CollateralType, user: &Pubkey, amount: u64) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let key = self.key(collateral, user)?;
        let mut position = self.store.position(&key)?;
        position.add_posted(amount)?;

        self.custodian.deposit_collateral(collateral, user, amount)?;
        self.store.save(&key, position)?;

        msg!("Posted {} {:?} for {}, total {}", amount, collateral, user, position.posted);
        Ok(())
    }

    pub fn withdraw(&mut self, collateral: CollateralType, user: &Pubkey, amount: u64) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let key = self.key(collateral, user)?;
        let mut position = self.store.position(&key)?;
        if amount > position.posted {
            msg!("Withdrawal of {} exceeds posted {}", amount, position.posted);
            return Err(LedgerError::InsufficientPosted);
        }
        position.remove_posted(amount)?;
        self.ensure_collateralized(collateral, &position)?;

        self.custodian.withdraw_collateral(collateral, amount, user)?;
        self.store.save(&key, position)?;

        msg!("Withdrew {} {:?} for {}, remaining {}", amount, collateral, user, position.posted);
        Ok(())
    }

    /// Borrow `amount` of stable-asset value as freshly minted yTokens
    pub fn borrow(&mut self, collateral: CollateralType, user: &Pubkey, amount: u64) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let key = self.key(collateral, user)?;
        if self.token.is_matured() {
            msg!("Borrowing closed, series has matured");
            return Err(LedgerError::SeriesMatured);
        }
        let mut position = self.store.position(&key)?;
        position.add_debt(self.face_value_of(amount)?)?;
        self.ensure_collateralized(collateral, &position)?;

        self.token.check_mint(user, amount)?;
        self.custodian.draw_debt(amount)?;
        self.token.mint(user, amount)?;
        self.store.save(&key, position)?;

        msg!("Borrowed {} against {:?} for {}, face debt {}", amount, collateral, user, position.debt_face);
        Ok(())
    }

    /// Repay with yTokens. Each token cancels one unit of present-value debt;
    /// tokens beyond what is owed are left with the user.
    pub fn repay_with_synthetic_token(
        &mut self,
        collateral: CollateralType,
        user: &Pubkey,
        amount: u64,
    ) -> Result<Repayment, LedgerError> {
        let key = self.key(collateral, user)?;
        let mut position = self.store.position(&key)?;
        let repayment = self.settle(&mut position, amount)?;
        if repayment.paid == 0 {
            return Ok(repayment);
        }

        self.token.burn(user, repayment.paid)?;
        self.store.save(&key, position)?;

        msg!(
            "Repaid {} yTokens against {:?} for {}, face debt {}",
            repayment.paid,
            collateral,
            user,
            position.debt_face
        );
        Ok(repayment)
    }

    /// Repay with the stable asset. Only what is owed is pulled from the user.
    pub fn repay_with_stable_asset(
        &mut self,
        collateral: CollateralType,
        user: &Pubkey,
        amount: u64,
    ) -> Result<Repayment, LedgerError> {
        let key = self.key(collateral, user)?;
        let mut position = self.store.position(&key)?;
        let repayment = self.settle(&mut position, amount)?;
        if repayment.paid == 0 {
            return Ok(repayment);
        }

        self.custodian.repay_debt(user, repayment.paid)?;
        self.store.save(&key, position)?;

        msg!(
            "Repaid {} stable against {:?} for {}, face debt {}",
            repayment.paid,
            collateral,
            user,
            position.debt_face
        );
        Ok(repayment)
    }

    /// Move the user's whole position into `destination`'s own platform position
    pub fn migrate(
        &mut self,
        collateral: CollateralType,
        user: &Pubkey,
        destination: &Pubkey,
    ) -> Result<Migration, LedgerError> {
        let key = self.key(collateral, user)?;
        let position = self.store.position(&key)?;
        if position.is_empty() {
            return Ok(Migration::default());
        }

        let debt = conversion::present_value(position.debt_face, self.token.rate_differential()?)?;
        let migration = self
            .custodian
            .migrate_position(collateral, position.posted, debt, destination)?;
        // The destination may owe up to one normalized unit more than was released
        if migration.collateral != position.posted || migration.debt < debt {
            return Err(LedgerError::InvariantViolation);
        }
        self.store.save(&key, Position::default())?;

        msg!(
            "Migrated {} {:?} and {} debt of {} to {}, shortfall {}",
            migration.collateral,
            collateral,
            migration.debt,
            user,
            destination,
            migration.shortfall
        );
        Ok(migration)
    }

    fn key(&self, collateral: CollateralType, user: &Pubkey) -> Result<PositionKey, LedgerError> {
        self.registry.get(collateral)?;
        Ok(PositionKey::new(collateral, *user))
    }

    fn ensure_collateralized(&self, collateral: CollateralType, position: &Position) -> Result<(), LedgerError> {
        if position.debt_face == 0 {
            return Ok(());
        }
        let differential = self.token.rate_differential()?;
        let price = self.oracle.price(collateral)?;
        if !conversion::is_collateralized(position, differential, price) {
            msg!(
                "Debt {} exceeds power {}",
                Wad::mul_ceil_wide(position.debt_face, differential),
                conversion::power(position.posted, price)
            );
            return Err(LedgerError::Undercollateralized);
        }
        Ok(())
    }

    /// Apply a payment of up to `offered` stable-asset value to `position`
    fn settle(&self, position: &mut Position, offered: u64) -> Result<Repayment, LedgerError> {
        if offered == 0 || position.debt_face == 0 {
            return Ok(Repayment {
                paid: 0,
                face_cancelled: 0,
                surplus: offered,
            });
        }

        let differential = self.token.rate_differential()?;
        let owed = conversion::present_value(position.debt_face, differential)?;
        let paid = offered.min(owed);
        let face_cancelled = conversion::face_cancelled(position.debt_face, paid, differential)?;
        position.remove_debt(face_cancelled)?;

        Ok(Repayment {
            paid,
            face_cancelled,
            surplus: offered - paid,
        })
    }
}
