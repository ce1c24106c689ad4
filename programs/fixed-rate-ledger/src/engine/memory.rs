//! In-memory underlying platform.
//!
//! One shared book stands in for every collaborator: the platform rate and
//! collateral prices, the custodian's pooled position and savings reserve,
//! users' own platform positions, token balances and the yToken series. The
//! handles returned by [`MemoryPlatform`] all point at the same book, so a
//! rate fold is seen by the custodian and the token alike.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};

use crate::{
    engine::{
        ledger::Ledger,
        traits::{Custodian, PositionBook, PriceOracle, SyntheticToken},
    },
    error::LedgerError,
    state::{CollateralRegistry, CollateralType, MaturitySeries, Migration, PlatformVault, TreasuryState},
};

/// Token kinds tracked in user wallets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Asset {
    Collateral(CollateralType),
    Stable,
    YToken,
}

#[derive(Debug)]
struct PlatformBook {
    now: UnixTimestamp,
    rate: u128,
    prices: BTreeMap<CollateralType, u128>,
    treasury: TreasuryState,
    vaults: BTreeMap<(CollateralType, Pubkey), PlatformVault>,
    wallets: BTreeMap<(Asset, Pubkey), u64>,
    series: MaturitySeries,
    debt_ceiling: Option<u64>,
}

impl PlatformBook {
    fn credit(&mut self, asset: Asset, owner: &Pubkey, amount: u64) -> Result<(), LedgerError> {
        let balance = self.wallets.entry((asset, *owner)).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(LedgerError::ArithmeticOverflow)?;
        Ok(())
    }

    fn debit(&mut self, asset: Asset, owner: &Pubkey, amount: u64) -> Result<(), LedgerError> {
        let balance = self.wallets.entry((asset, *owner)).or_insert(0);
        *balance = balance.checked_sub(amount).ok_or(LedgerError::InsufficientFunds)?;
        Ok(())
    }
}

/// Shared handle on the in-memory platform
#[derive(Debug, Clone)]
pub struct MemoryPlatform {
    book: Rc<RefCell<PlatformBook>>,
}

pub type MemoryLedger = Ledger<PositionBook, MemoryOracle, MemoryCustodian, MemoryToken>;

impl MemoryPlatform {
    /// Platform at time zero with accumulated `rate` and a yToken series maturing at `maturity`
    pub fn new(rate: u128, maturity: UnixTimestamp) -> Self {
        let book = PlatformBook {
            now: 0,
            rate,
            prices: BTreeMap::new(),
            treasury: TreasuryState::new(0),
            vaults: BTreeMap::new(),
            wallets: BTreeMap::new(),
            series: MaturitySeries::new(maturity),
            debt_ceiling: None,
        };
        Self {
            book: Rc::new(RefCell::new(book)),
        }
    }

    pub fn oracle(&self) -> MemoryOracle {
        MemoryOracle { book: self.book.clone() }
    }

    pub fn custodian(&self) -> MemoryCustodian {
        MemoryCustodian { book: self.book.clone() }
    }

    pub fn token(&self) -> MemoryToken {
        MemoryToken { book: self.book.clone() }
    }

    /// A ledger with an empty position book wired to this platform
    pub fn ledger(&self, registry: CollateralRegistry) -> MemoryLedger {
        Ledger::new(registry, PositionBook::new(), self.oracle(), self.custodian(), self.token())
    }

    pub fn set_price(&self, collateral: CollateralType, price: u128) {
        self.book.borrow_mut().prices.insert(collateral, price);
    }

    pub fn rate(&self) -> u128 {
        self.book.borrow().rate
    }

    /// Fold `increase` into the accumulated rate. The rate only moves up.
    pub fn fold(&self, increase: u128) {
        self.book.borrow_mut().rate += increase;
    }

    pub fn advance_time(&self, seconds: i64) {
        self.book.borrow_mut().now += seconds;
    }

    /// Mark the yToken matured at the current rate
    pub fn mature(&self) -> Result<(), LedgerError> {
        let mut book = self.book.borrow_mut();
        let (now, rate) = (book.now, book.rate);
        book.series.mature(now, rate)
    }

    pub fn series(&self) -> MaturitySeries {
        self.book.borrow().series
    }

    pub fn fund(&self, asset: Asset, owner: &Pubkey, amount: u64) -> Result<(), LedgerError> {
        self.book.borrow_mut().credit(asset, owner, amount)
    }

    pub fn balance(&self, asset: Asset, owner: &Pubkey) -> u64 {
        self.book
            .borrow()
            .wallets
            .get(&(asset, *owner))
            .copied()
            .unwrap_or(0)
    }

    pub fn treasury(&self) -> TreasuryState {
        self.book.borrow().treasury.clone()
    }

    /// `owner`'s own platform position for `collateral`
    pub fn vault(&self, collateral: CollateralType, owner: &Pubkey) -> Option<PlatformVault> {
        self.book.borrow().vaults.get(&(collateral, *owner)).cloned()
    }

    /// Limit on the pool's normalized debt
    pub fn set_debt_ceiling(&self, ceiling: Option<u64>) {
        self.book.borrow_mut().debt_ceiling = ceiling;
    }

    /// Use `amount` of the savings reserve to pay down pooled debt, as happens when
    /// yToken holders redeem against the pool
    pub fn settle_from_savings(&self, amount: u64) -> Result<(), LedgerError> {
        let mut book = self.book.borrow_mut();
        let rate = book.rate;
        let mut treasury = book.treasury.clone();
        treasury.savings = treasury
            .savings
            .checked_sub(amount)
            .ok_or(LedgerError::CustodianShortfall)?;
        treasury.repay_debt(amount, rate)?;
        book.treasury = treasury;
        Ok(())
    }

    /// Drop pooled collateral without touching the ledger, to model a custodian that lost track
    pub fn drain_pool(&self, collateral: CollateralType, amount: u64) -> Result<(), LedgerError> {
        self.book.borrow_mut().treasury.withdraw_collateral(collateral, amount)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryOracle {
    book: Rc<RefCell<PlatformBook>>,
}

impl PriceOracle for MemoryOracle {
    fn price(&self, collateral: CollateralType) -> Result<u128, LedgerError> {
        self.book
            .borrow()
            .prices
            .get(&collateral)
            .copied()
            .filter(|price| *price > 0)
            .ok_or(LedgerError::OracleUnavailable)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryCustodian {
    book: Rc<RefCell<PlatformBook>>,
}

impl Custodian for MemoryCustodian {
    fn deposit_collateral(
        &mut self,
        collateral: CollateralType,
        from: &Pubkey,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let mut book = self.book.borrow_mut();
        let mut treasury = book.treasury.clone();
        treasury.deposit_collateral(collateral, amount)?;
        book.debit(Asset::Collateral(collateral), from, amount)?;
        book.treasury = treasury;
        Ok(())
    }

    fn withdraw_collateral(
        &mut self,
        collateral: CollateralType,
        amount: u64,
        to: &Pubkey,
    ) -> Result<(), LedgerError> {
        let mut book = self.book.borrow_mut();
        let mut treasury = book.treasury.clone();
        treasury.withdraw_collateral(collateral, amount)?;
        book.credit(Asset::Collateral(collateral), to, amount)?;
        book.treasury = treasury;
        Ok(())
    }

    fn draw_debt(&mut self, amount: u64) -> Result<(), LedgerError> {
        let mut book = self.book.borrow_mut();
        let rate = book.rate;
        let mut treasury = book.treasury.clone();
        treasury.draw_debt(amount, rate)?;
        if let Some(ceiling) = book.debt_ceiling {
            if treasury.pooled_debt > ceiling {
                return Err(LedgerError::CustodianShortfall);
            }
        }
        book.treasury = treasury;
        Ok(())
    }

    fn repay_debt(&mut self, from: &Pubkey, amount: u64) -> Result<(), LedgerError> {
        let mut book = self.book.borrow_mut();
        let rate = book.rate;
        let mut treasury = book.treasury.clone();
        treasury.repay_debt(amount, rate)?;
        book.debit(Asset::Stable, from, amount)?;
        book.treasury = treasury;
        Ok(())
    }

    fn reserve_savings(&self) -> Result<u64, LedgerError> {
        Ok(self.book.borrow().treasury.savings)
    }

    fn migrate_position(
        &mut self,
        collateral: CollateralType,
        collateral_amount: u64,
        debt: u64,
        destination: &Pubkey,
    ) -> Result<Migration, LedgerError> {
        let mut book = self.book.borrow_mut();
        let rate = book.rate;

        let mut treasury = book.treasury.clone();
        let migration = treasury.migrate(collateral, collateral_amount, debt, rate)?;
        let mut vault = book
            .vaults
            .get(&(collateral, *destination))
            .cloned()
            .unwrap_or_else(|| PlatformVault::new(*destination, collateral, 0));
        vault.receive(&migration)?;

        book.treasury = treasury;
        book.vaults.insert((collateral, *destination), vault);
        Ok(migration)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryToken {
    book: Rc<RefCell<PlatformBook>>,
}

impl SyntheticToken for MemoryToken {
    fn check_mint(&self, to: &Pubkey, amount: u64) -> Result<(), LedgerError> {
        let book = self.book.borrow();
        let balance = book.wallets.get(&(Asset::YToken, *to)).copied().unwrap_or(0);
        balance.checked_add(amount).ok_or(LedgerError::ArithmeticOverflow)?;
        Ok(())
    }

    fn mint(&mut self, to: &Pubkey, amount: u64) -> Result<(), LedgerError> {
        self.book.borrow_mut().credit(Asset::YToken, to, amount)
    }

    fn burn(&mut self, from: &Pubkey, amount: u64) -> Result<(), LedgerError> {
        self.book.borrow_mut().debit(Asset::YToken, from, amount)
    }

    fn is_matured(&self) -> bool {
        self.book.borrow().series.is_matured()
    }

    fn rate_differential(&self) -> Result<u128, LedgerError> {
        let book = self.book.borrow();
        book.series.rate_differential(book.rate)
    }
}

impl MemoryPlatform {
    /// Stable-asset value of `owner`'s own platform debt at the current rate
    pub fn vault_debt(&self, collateral: CollateralType, owner: &Pubkey) -> Result<u64, LedgerError> {
        match self.vault(collateral, owner) {
            Some(vault) => vault.debt(self.rate()),
            None => Ok(0),
        }
    }
}
