//! Account-backed collaborators for the ledger engine.
//!
//! Each adapter is loaded from the instruction's accounts, mutated in memory by
//! the engine, and written back by `commit` once the operation has succeeded.
//! Token movements are SPL token CPIs signed by the user or by a ledger PDA.

use borsh::BorshSerialize;
use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
};

use crate::{
    constants::{MINT_AUTHORITY_SEED, TREASURY_SEED},
    engine::{Custodian, PositionStore, PriceOracle, SyntheticToken},
    error::LedgerError,
    math::Wad,
    state::{
        CollateralType, LedgerConfig, MaturitySeries, Migration, PlatformVault, Position, PositionAccount,
        PositionKey, PriceFeed, TreasuryState,
    },
};

fn token_cpi(result: ProgramResult, failure: LedgerError) -> Result<(), LedgerError> {
    result.map_err(|err| {
        msg!("Token program rejected the transfer: {:?}", err);
        failure
    })
}

/// Price of a single collateral type, read from its registered feed
pub struct FeedOracle {
    collateral: Option<CollateralType>,
    price: Option<u128>,
}

impl FeedOracle {
    /// Oracle for instructions that never price collateral
    pub fn unavailable() -> Self {
        Self {
            collateral: None,
            price: None,
        }
    }

    /// The feed must be the one registered for `collateral`. An unreadable or
    /// zero feed is only reported once the engine asks for a price.
    pub fn load(config: &LedgerConfig, collateral: CollateralType, feed_info: &AccountInfo) -> Result<Self, LedgerError> {
        let entry = config.registry.get(collateral)?;
        if entry.oracle != *feed_info.key {
            msg!("Price feed {} is not registered for {:?}", feed_info.key, collateral);
            return Err(LedgerError::InvalidAccount);
        }

        Ok(Self {
            collateral: Some(collateral),
            price: PriceFeed::load(feed_info).and_then(|feed| feed.ratio()).ok(),
        })
    }
}

impl PriceOracle for FeedOracle {
    fn price(&self, collateral: CollateralType) -> Result<u128, LedgerError> {
        if self.collateral != Some(collateral) {
            return Err(LedgerError::OracleUnavailable);
        }
        self.price.ok_or(LedgerError::OracleUnavailable)
    }
}

/// Read the platform rate, if the feed has one. Fails only on the wrong account.
pub fn load_rate(config: &LedgerConfig, rate_feed_info: &AccountInfo) -> Result<Option<u128>, LedgerError> {
    if config.rate_feed != *rate_feed_info.key {
        msg!("Rate feed {} does not match {}", rate_feed_info.key, config.rate_feed);
        return Err(LedgerError::InvalidAccount);
    }
    Ok(PriceFeed::load(rate_feed_info).and_then(|feed| feed.ratio()).ok())
}

/// Accounts for moving tokens between a user and a treasury-owned token account
pub struct TokenTransfer<'a, 'info> {
    pub token_program: &'a AccountInfo<'info>,
    pub user: &'a AccountInfo<'info>,
    pub user_token: &'a AccountInfo<'info>,
    pub vault_token: &'a AccountInfo<'info>,
}

/// Accounts for handing pooled collateral to a platform vault
pub struct VaultTransfer<'a, 'info> {
    pub token_program: &'a AccountInfo<'info>,
    pub treasury_token: &'a AccountInfo<'info>,
    pub vault_token: &'a AccountInfo<'info>,
}

/// The pooled platform position, kept in the treasury PDA
pub struct TreasuryCustodian<'a, 'info> {
    info: &'a AccountInfo<'info>,
    state: TreasuryState,
    rate: Option<u128>,
    transfer: Option<TokenTransfer<'a, 'info>>,
    destination: Option<(PlatformVault, VaultTransfer<'a, 'info>)>,
    dirty: bool,
}

impl<'a, 'info> TreasuryCustodian<'a, 'info> {
    pub fn new(info: &'a AccountInfo<'info>, state: TreasuryState) -> Self {
        Self {
            info,
            state,
            rate: None,
            transfer: None,
            destination: None,
            dirty: false,
        }
    }

    pub fn with_rate(mut self, rate: Option<u128>) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_transfer(mut self, transfer: TokenTransfer<'a, 'info>) -> Self {
        self.transfer = Some(transfer);
        self
    }

    /// Migrations land in `vault`, with collateral moved into `transfer.vault_token`
    pub fn with_destination(mut self, vault: PlatformVault, transfer: VaultTransfer<'a, 'info>) -> Self {
        self.destination = Some((vault, transfer));
        self
    }

    /// Write the treasury back if it changed and hand out the destination vault
    pub fn commit(self) -> Result<Option<PlatformVault>, ProgramError> {
        if self.dirty {
            self.state.serialize(&mut &mut self.info.data.borrow_mut()[..])?;
        }
        Ok(self.destination.map(|(vault, _)| vault))
    }

    fn rate(&self) -> Result<u128, LedgerError> {
        self.rate.ok_or(LedgerError::OracleUnavailable)
    }

    fn transfer_for(&self, user: &Pubkey) -> Result<&TokenTransfer<'a, 'info>, LedgerError> {
        let transfer = self.transfer.as_ref().ok_or(LedgerError::InvalidAccount)?;
        if transfer.user.key != user {
            return Err(LedgerError::InvalidAccount);
        }
        Ok(transfer)
    }

    fn pull(&self, from: &Pubkey, amount: u64) -> Result<(), LedgerError> {
        let transfer = self.transfer_for(from)?;
        let ix = spl_token::instruction::transfer(
            transfer.token_program.key,
            transfer.user_token.key,
            transfer.vault_token.key,
            transfer.user.key,
            &[],
            amount,
        )
        .map_err(|_| LedgerError::TokenFailure)?;

        token_cpi(
            invoke(
                &ix,
                &[
                    transfer.user_token.clone(),
                    transfer.vault_token.clone(),
                    transfer.user.clone(),
                    transfer.token_program.clone(),
                ],
            ),
            LedgerError::InsufficientFunds,
        )
    }

    fn push(&self, to: &Pubkey, amount: u64) -> Result<(), LedgerError> {
        let transfer = self.transfer_for(to)?;
        self.release(transfer.token_program, transfer.vault_token, transfer.user_token, amount)
    }

    /// Treasury-signed transfer out of a treasury-owned token account
    fn release(
        &self,
        token_program: &AccountInfo<'info>,
        source: &AccountInfo<'info>,
        destination: &AccountInfo<'info>,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let ix = spl_token::instruction::transfer(
            token_program.key,
            source.key,
            destination.key,
            self.info.key,
            &[],
            amount,
        )
        .map_err(|_| LedgerError::TokenFailure)?;

        token_cpi(
            invoke_signed(
                &ix,
                &[
                    source.clone(),
                    destination.clone(),
                    self.info.clone(),
                    token_program.clone(),
                ],
                &[&[TREASURY_SEED, &[self.state.bump]]],
            ),
            LedgerError::CustodianShortfall,
        )
    }
}

impl<'a, 'info> Custodian for TreasuryCustodian<'a, 'info> {
    fn deposit_collateral(&mut self, collateral: CollateralType, from: &Pubkey, amount: u64) -> Result<(), LedgerError> {
        let mut state = self.state.clone();
        state.deposit_collateral(collateral, amount)?;
        self.pull(from, amount)?;
        self.state = state;
        self.dirty = true;
        Ok(())
    }

    fn withdraw_collateral(&mut self, collateral: CollateralType, amount: u64, to: &Pubkey) -> Result<(), LedgerError> {
        let mut state = self.state.clone();
        state.withdraw_collateral(collateral, amount)?;
        self.push(to, amount)?;
        self.state = state;
        self.dirty = true;
        Ok(())
    }

    fn draw_debt(&mut self, amount: u64) -> Result<(), LedgerError> {
        let rate = self.rate()?;
        let normalized = self.state.draw_debt(amount, rate)?;
        self.dirty = true;
        msg!("Pool drew {} ({} normalized)", amount, normalized);
        Ok(())
    }

    fn repay_debt(&mut self, from: &Pubkey, amount: u64) -> Result<(), LedgerError> {
        let rate = self.rate()?;
        let mut state = self.state.clone();
        let repaid = state.repay_debt(amount, rate)?;
        self.pull(from, amount)?;
        self.state = state;
        self.dirty = true;
        msg!("Pool repaid {} normalized", repaid);
        Ok(())
    }

    fn reserve_savings(&self) -> Result<u64, LedgerError> {
        Ok(self.state.savings)
    }

    fn migrate_position(
        &mut self,
        collateral: CollateralType,
        collateral_amount: u64,
        debt: u64,
        destination: &Pubkey,
    ) -> Result<Migration, LedgerError> {
        let rate = self.rate()?;
        let (vault, transfer) = self.destination.as_ref().ok_or(LedgerError::InvalidAccount)?;
        if vault.owner != *destination || vault.collateral != collateral {
            return Err(LedgerError::InvalidAccount);
        }

        let mut vault = vault.clone();
        let mut state = self.state.clone();
        let migration = state.migrate(collateral, collateral_amount, debt, rate)?;
        vault.receive(&migration)?;
        if migration.collateral > 0 {
            self.release(transfer.token_program, transfer.treasury_token, transfer.vault_token, migration.collateral)?;
        }

        self.state = state;
        if let Some((stored, _)) = self.destination.as_mut() {
            *stored = vault;
        }
        self.dirty = true;
        Ok(migration)
    }
}

/// Accounts for minting and burning yTokens
pub struct MintAccounts<'a, 'info> {
    pub token_program: &'a AccountInfo<'info>,
    pub user: &'a AccountInfo<'info>,
    pub user_token: &'a AccountInfo<'info>,
    pub mint: &'a AccountInfo<'info>,
    /// Required for minting only
    pub mint_authority: Option<&'a AccountInfo<'info>>,
}

/// The yToken series: an SPL mint controlled by the mint authority PDA
pub struct SeriesToken<'a, 'info> {
    series: MaturitySeries,
    rate: Option<u128>,
    mint_authority_bump: u8,
    accounts: Option<MintAccounts<'a, 'info>>,
}

impl<'a, 'info> SeriesToken<'a, 'info> {
    pub fn new(config: &LedgerConfig, rate: Option<u128>) -> Self {
        Self {
            series: config.series,
            rate,
            mint_authority_bump: config.mint_authority_bump,
            accounts: None,
        }
    }

    pub fn with_accounts(mut self, accounts: MintAccounts<'a, 'info>) -> Self {
        self.accounts = Some(accounts);
        self
    }

    fn accounts_for(&self, user: &Pubkey) -> Result<&MintAccounts<'a, 'info>, LedgerError> {
        let accounts = self.accounts.as_ref().ok_or(LedgerError::InvalidAccount)?;
        if accounts.user.key != user {
            return Err(LedgerError::InvalidAccount);
        }
        Ok(accounts)
    }
}

impl<'a, 'info> SyntheticToken for SeriesToken<'a, 'info> {
    fn check_mint(&self, to: &Pubkey, amount: u64) -> Result<(), LedgerError> {
        let accounts = self.accounts_for(to)?;
        accounts.mint_authority.ok_or(LedgerError::InvalidAccount)?;

        let mint = spl_token::state::Mint::unpack(&accounts.mint.data.borrow()).map_err(|_| LedgerError::InvalidAccount)?;
        if mint.supply.checked_add(amount).is_none() {
            msg!("Minting {} would overflow supply {}", amount, mint.supply);
            return Err(LedgerError::ArithmeticOverflow);
        }
        Ok(())
    }

    fn mint(&mut self, to: &Pubkey, amount: u64) -> Result<(), LedgerError> {
        let accounts = self.accounts_for(to)?;
        let authority = accounts.mint_authority.ok_or(LedgerError::InvalidAccount)?;
        let ix = spl_token::instruction::mint_to(
            accounts.token_program.key,
            accounts.mint.key,
            accounts.user_token.key,
            authority.key,
            &[],
            amount,
        )
        .map_err(|_| LedgerError::TokenFailure)?;

        token_cpi(
            invoke_signed(
                &ix,
                &[
                    accounts.mint.clone(),
                    accounts.user_token.clone(),
                    authority.clone(),
                    accounts.token_program.clone(),
                ],
                &[&[MINT_AUTHORITY_SEED, &[self.mint_authority_bump]]],
            ),
            LedgerError::TokenFailure,
        )
    }

    fn burn(&mut self, from: &Pubkey, amount: u64) -> Result<(), LedgerError> {
        let accounts = self.accounts_for(from)?;
        let ix = spl_token::instruction::burn(
            accounts.token_program.key,
            accounts.user_token.key,
            accounts.mint.key,
            accounts.user.key,
            &[],
            amount,
        )
        .map_err(|_| LedgerError::TokenFailure)?;

        token_cpi(
            invoke(
                &ix,
                &[
                    accounts.user_token.clone(),
                    accounts.mint.clone(),
                    accounts.user.clone(),
                    accounts.token_program.clone(),
                ],
            ),
            LedgerError::InsufficientFunds,
        )
    }

    fn is_matured(&self) -> bool {
        self.series.is_matured()
    }

    fn rate_differential(&self) -> Result<u128, LedgerError> {
        match self.rate {
            Some(rate) => self.series.rate_differential(rate),
            None if !self.series.is_matured() => Ok(Wad::ONE),
            None => Err(LedgerError::OracleUnavailable),
        }
    }
}

/// A single position PDA
pub struct PositionAccountStore<'a, 'info> {
    info: &'a AccountInfo<'info>,
    account: PositionAccount,
    vacant: bool,
}

impl<'a, 'info> PositionAccountStore<'a, 'info> {
    pub fn new(info: &'a AccountInfo<'info>, account: PositionAccount) -> Self {
        Self {
            info,
            account,
            vacant: false,
        }
    }

    /// A position PDA that has not been created yet. It reads as empty and can
    /// only be committed while it stays empty.
    pub fn vacant(info: &'a AccountInfo<'info>, key: PositionKey) -> Self {
        Self {
            info,
            account: PositionAccount::new(key, 0),
            vacant: true,
        }
    }

    pub fn is_vacant(&self) -> bool {
        self.vacant
    }

    pub fn commit(self) -> ProgramResult {
        if self.vacant {
            if !self.account.position.is_empty() {
                msg!("Position account {} was never created", self.info.key);
                return Err(LedgerError::NotInitialized.into());
            }
            return Ok(());
        }
        self.account.serialize(&mut &mut self.info.data.borrow_mut()[..])?;
        Ok(())
    }

    fn check(&self, key: &PositionKey) -> Result<(), LedgerError> {
        if self.account.key != *key {
            msg!("Position account {} does not hold {:?}", self.info.key, key);
            return Err(LedgerError::InvalidAccount);
        }
        Ok(())
    }
}

impl<'a, 'info> PositionStore for PositionAccountStore<'a, 'info> {
    fn position(&self, key: &PositionKey) -> Result<Position, LedgerError> {
        self.check(key)?;
        Ok(self.account.position)
    }

    fn save(&mut self, key: &PositionKey, position: Position) -> Result<(), LedgerError> {
        self.check(key)?;
        self.account.position = position;
        Ok(())
    }
}
