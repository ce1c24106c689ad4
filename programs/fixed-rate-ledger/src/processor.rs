use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::invoke_signed,
    program_error::ProgramError,
    program_option::COption,
    program_pack::Pack,
    pubkey::Pubkey,
    system_instruction,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};

use crate::{
    adapters::{
        load_rate, FeedOracle, MintAccounts, PositionAccountStore, SeriesToken, TokenTransfer, TreasuryCustodian,
        VaultTransfer,
    },
    constants::{LEDGER_SEED, MINT_AUTHORITY_SEED, PLATFORM_VAULT_SEED, POSITION_SEED, TREASURY_SEED},
    engine::Ledger,
    error::LedgerError,
    instructions::{ledger_address, mint_authority_address, treasury_address, LedgerInstruction},
    state::{
        CollateralConfig, CollateralRegistry, CollateralType, LedgerConfig, PlatformVault, PositionAccount,
        PositionKey, TreasuryState,
    },
};

type AccountLedger<'a, 'info> =
    Ledger<PositionAccountStore<'a, 'info>, FeedOracle, TreasuryCustodian<'a, 'info>, SeriesToken<'a, 'info>>;

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    let instruction = LedgerInstruction::unpack(instruction_data)?;

    match instruction {
        LedgerInstruction::InitializeLedger { maturity, collaterals } => {
            msg!("Instruction: InitializeLedger");
            process_initialize_ledger(program_id, accounts, maturity, collaterals)
        }

        LedgerInstruction::Post { collateral, amount } => {
            msg!("Instruction: Post");
            process_post(program_id, accounts, CollateralType::try_from(collateral)?, amount)
        }

        LedgerInstruction::Withdraw { collateral, amount } => {
            msg!("Instruction: Withdraw");
            process_withdraw(program_id, accounts, CollateralType::try_from(collateral)?, amount)
        }

        LedgerInstruction::Borrow { collateral, amount } => {
            msg!("Instruction: Borrow");
            process_borrow(program_id, accounts, CollateralType::try_from(collateral)?, amount)
        }

        LedgerInstruction::RepayYToken { collateral, amount } => {
            msg!("Instruction: RepayYToken");
            process_repay_y_token(program_id, accounts, CollateralType::try_from(collateral)?, amount)
        }

        LedgerInstruction::RepayStable { collateral, amount } => {
            msg!("Instruction: RepayStable");
            process_repay_stable(program_id, accounts, CollateralType::try_from(collateral)?, amount)
        }

        LedgerInstruction::Split { collateral, destination } => {
            msg!("Instruction: Split");
            process_split(program_id, accounts, CollateralType::try_from(collateral)?, destination)
        }

        LedgerInstruction::Mature => {
            msg!("Instruction: Mature");
            process_mature(program_id, accounts)
        }
    }
}

/// Create the ledger configuration and treasury PDAs
fn process_initialize_ledger(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    maturity: i64,
    collaterals: Vec<CollateralConfig>,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let authority_info = next_account_info(account_info_iter)?;
    let config_info = next_account_info(account_info_iter)?;
    let treasury_info = next_account_info(account_info_iter)?;
    let stable_mint_info = next_account_info(account_info_iter)?;
    let y_token_mint_info = next_account_info(account_info_iter)?;
    let rate_feed_info = next_account_info(account_info_iter)?;
    let system_program = next_account_info(account_info_iter)?;

    if !authority_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    let (config_key, bump) = ledger_address(program_id);
    let (treasury_key, treasury_bump) = treasury_address(program_id);
    let (mint_authority, mint_authority_bump) = mint_authority_address(program_id);
    if config_key != *config_info.key || treasury_key != *treasury_info.key {
        return Err(LedgerError::InvalidAccount.into());
    }
    if !config_info.data_is_empty() || !treasury_info.data_is_empty() {
        return Err(LedgerError::AlreadyInitialized.into());
    }

    check_mint(stable_mint_info, None)?;
    check_mint(y_token_mint_info, Some(&mint_authority))?;

    let registry = CollateralRegistry::new(collaterals)?;
    for entry in registry.iter() {
        msg!("Registered {:?} with mint {}", entry.collateral, entry.mint);
    }

    let config = LedgerConfig::new(
        *authority_info.key,
        *stable_mint_info.key,
        *y_token_mint_info.key,
        *rate_feed_info.key,
        registry,
        maturity,
        bump,
        treasury_bump,
        mint_authority_bump,
    );
    config.validate()?;

    create_pda_account(
        authority_info,
        config_info,
        system_program,
        program_id,
        LedgerConfig::LEN,
        &[LEDGER_SEED, &[bump]],
    )?;
    config.serialize(&mut &mut config_info.data.borrow_mut()[..])?;

    create_pda_account(
        authority_info,
        treasury_info,
        system_program,
        program_id,
        TreasuryState::LEN,
        &[TREASURY_SEED, &[treasury_bump]],
    )?;
    TreasuryState::new(treasury_bump).serialize(&mut &mut treasury_info.data.borrow_mut()[..])?;

    msg!("Ledger initialized, series matures at {}", maturity);

    Ok(())
}

/// Post collateral into the pool
fn process_post<'a, 'info>(
    program_id: &Pubkey,
    accounts: &'a [AccountInfo<'info>],
    collateral: CollateralType,
    amount: u64,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let user_info = next_account_info(account_info_iter)?;
    let config_info = next_account_info(account_info_iter)?;
    let treasury_info = next_account_info(account_info_iter)?;
    let position_info = next_account_info(account_info_iter)?;
    let user_collateral_info = next_account_info(account_info_iter)?;
    let treasury_collateral_info = next_account_info(account_info_iter)?;
    let token_program = next_account_info(account_info_iter)?;
    let system_program = next_account_info(account_info_iter)?;

    if !user_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }
    check_token_program(token_program)?;

    let config = load_config(program_id, config_info)?;
    let entry = config.registry.get(collateral)?;
    check_token_account(treasury_collateral_info, treasury_info.key, &entry.mint)?;

    let key = PositionKey::new(collateral, *user_info.key);
    let store = if position_info.data_is_empty() {
        create_position(program_id, user_info, position_info, system_program, key)?
    } else {
        load_position(program_id, position_info, key)?
    };

    let custodian = load_treasury(program_id, treasury_info, &config)?.with_transfer(TokenTransfer {
        token_program,
        user: user_info,
        user_token: user_collateral_info,
        vault_token: treasury_collateral_info,
    });
    let token = SeriesToken::new(&config, None);

    let mut ledger = Ledger::new(config.registry.clone(), store, FeedOracle::unavailable(), custodian, token);
    ledger.post(collateral, user_info.key, amount)?;
    persist(ledger)?;

    Ok(())
}

/// Withdraw collateral, keeping the position collateralized
fn process_withdraw<'a, 'info>(
    program_id: &Pubkey,
    accounts: &'a [AccountInfo<'info>],
    collateral: CollateralType,
    amount: u64,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let user_info = next_account_info(account_info_iter)?;
    let config_info = next_account_info(account_info_iter)?;
    let treasury_info = next_account_info(account_info_iter)?;
    let position_info = next_account_info(account_info_iter)?;
    let user_collateral_info = next_account_info(account_info_iter)?;
    let treasury_collateral_info = next_account_info(account_info_iter)?;
    let price_feed_info = next_account_info(account_info_iter)?;
    let rate_feed_info = next_account_info(account_info_iter)?;
    let token_program = next_account_info(account_info_iter)?;

    if !user_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }
    check_token_program(token_program)?;

    let config = load_config(program_id, config_info)?;
    let entry = config.registry.get(collateral)?;
    check_token_account(treasury_collateral_info, treasury_info.key, &entry.mint)?;

    let store = load_position(program_id, position_info, PositionKey::new(collateral, *user_info.key))?;
    let oracle = FeedOracle::load(&config, collateral, price_feed_info)?;
    let rate = load_rate(&config, rate_feed_info)?;
    let custodian = load_treasury(program_id, treasury_info, &config)?
        .with_rate(rate)
        .with_transfer(TokenTransfer {
            token_program,
            user: user_info,
            user_token: user_collateral_info,
            vault_token: treasury_collateral_info,
        });
    let token = SeriesToken::new(&config, rate);

    let mut ledger = Ledger::new(config.registry.clone(), store, oracle, custodian, token);
    ledger.withdraw(collateral, user_info.key, amount)?;
    persist(ledger)?;

    Ok(())
}

/// Borrow yTokens against posted collateral
fn process_borrow<'a, 'info>(
    program_id: &Pubkey,
    accounts: &'a [AccountInfo<'info>],
    collateral: CollateralType,
    amount: u64,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let user_info = next_account_info(account_info_iter)?;
    let config_info = next_account_info(account_info_iter)?;
    let treasury_info = next_account_info(account_info_iter)?;
    let position_info = next_account_info(account_info_iter)?;
    let user_y_token_info = next_account_info(account_info_iter)?;
    let y_token_mint_info = next_account_info(account_info_iter)?;
    let mint_authority_info = next_account_info(account_info_iter)?;
    let price_feed_info = next_account_info(account_info_iter)?;
    let rate_feed_info = next_account_info(account_info_iter)?;
    let token_program = next_account_info(account_info_iter)?;

    if !user_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }
    check_token_program(token_program)?;

    let config = load_config(program_id, config_info)?;
    config.registry.get(collateral)?;
    if *y_token_mint_info.key != config.y_token_mint {
        return Err(LedgerError::InvalidAccount.into());
    }
    let mint_authority = Pubkey::create_program_address(&[MINT_AUTHORITY_SEED, &[config.mint_authority_bump]], program_id)?;
    if mint_authority != *mint_authority_info.key {
        return Err(LedgerError::InvalidAccount.into());
    }

    let store = load_position(program_id, position_info, PositionKey::new(collateral, *user_info.key))?;
    let oracle = FeedOracle::load(&config, collateral, price_feed_info)?;
    let rate = load_rate(&config, rate_feed_info)?;
    let custodian = load_treasury(program_id, treasury_info, &config)?.with_rate(rate);
    let token = SeriesToken::new(&config, rate).with_accounts(MintAccounts {
        token_program,
        user: user_info,
        user_token: user_y_token_info,
        mint: y_token_mint_info,
        mint_authority: Some(mint_authority_info),
    });

    let mut ledger = Ledger::new(config.registry.clone(), store, oracle, custodian, token);
    ledger.borrow(collateral, user_info.key, amount)?;
    persist(ledger)?;

    Ok(())
}

/// Repay by burning yTokens
fn process_repay_y_token<'a, 'info>(
    program_id: &Pubkey,
    accounts: &'a [AccountInfo<'info>],
    collateral: CollateralType,
    amount: u64,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let user_info = next_account_info(account_info_iter)?;
    let config_info = next_account_info(account_info_iter)?;
    let treasury_info = next_account_info(account_info_iter)?;
    let position_info = next_account_info(account_info_iter)?;
    let user_y_token_info = next_account_info(account_info_iter)?;
    let y_token_mint_info = next_account_info(account_info_iter)?;
    let rate_feed_info = next_account_info(account_info_iter)?;
    let token_program = next_account_info(account_info_iter)?;

    if !user_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }
    check_token_program(token_program)?;

    let config = load_config(program_id, config_info)?;
    if *y_token_mint_info.key != config.y_token_mint {
        return Err(LedgerError::InvalidAccount.into());
    }

    let store = load_position(program_id, position_info, PositionKey::new(collateral, *user_info.key))?;
    let rate = load_rate(&config, rate_feed_info)?;
    let custodian = load_treasury(program_id, treasury_info, &config)?.with_rate(rate);
    let token = SeriesToken::new(&config, rate).with_accounts(MintAccounts {
        token_program,
        user: user_info,
        user_token: user_y_token_info,
        mint: y_token_mint_info,
        mint_authority: None,
    });

    let mut ledger = Ledger::new(config.registry.clone(), store, FeedOracle::unavailable(), custodian, token);
    let repayment = ledger.repay_with_synthetic_token(collateral, user_info.key, amount)?;
    persist(ledger)?;

    msg!("Burned {}, returned {} unused", repayment.paid, repayment.surplus);

    Ok(())
}

/// Repay with the stable asset
fn process_repay_stable<'a, 'info>(
    program_id: &Pubkey,
    accounts: &'a [AccountInfo<'info>],
    collateral: CollateralType,
    amount: u64,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let user_info = next_account_info(account_info_iter)?;
    let config_info = next_account_info(account_info_iter)?;
    let treasury_info = next_account_info(account_info_iter)?;
    let position_info = next_account_info(account_info_iter)?;
    let user_stable_info = next_account_info(account_info_iter)?;
    let treasury_stable_info = next_account_info(account_info_iter)?;
    let rate_feed_info = next_account_info(account_info_iter)?;
    let token_program = next_account_info(account_info_iter)?;

    if !user_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }
    check_token_program(token_program)?;

    let config = load_config(program_id, config_info)?;
    check_token_account(treasury_stable_info, treasury_info.key, &config.stable_mint)?;

    let store = load_position(program_id, position_info, PositionKey::new(collateral, *user_info.key))?;
    let rate = load_rate(&config, rate_feed_info)?;
    let custodian = load_treasury(program_id, treasury_info, &config)?
        .with_rate(rate)
        .with_transfer(TokenTransfer {
            token_program,
            user: user_info,
            user_token: user_stable_info,
            vault_token: treasury_stable_info,
        });
    let token = SeriesToken::new(&config, rate);

    let mut ledger = Ledger::new(config.registry.clone(), store, FeedOracle::unavailable(), custodian, token);
    let repayment = ledger.repay_with_stable_asset(collateral, user_info.key, amount)?;
    persist(ledger)?;

    msg!("Pulled {}, left {} with the user", repayment.paid, repayment.surplus);

    Ok(())
}

/// Move a whole position into the destination's own platform vault
fn process_split<'a, 'info>(
    program_id: &Pubkey,
    accounts: &'a [AccountInfo<'info>],
    collateral: CollateralType,
    destination: Pubkey,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let user_info = next_account_info(account_info_iter)?;
    let config_info = next_account_info(account_info_iter)?;
    let treasury_info = next_account_info(account_info_iter)?;
    let position_info = next_account_info(account_info_iter)?;
    let vault_info = next_account_info(account_info_iter)?;
    let destination_info = next_account_info(account_info_iter)?;
    let treasury_collateral_info = next_account_info(account_info_iter)?;
    let vault_collateral_info = next_account_info(account_info_iter)?;
    let rate_feed_info = next_account_info(account_info_iter)?;
    let token_program = next_account_info(account_info_iter)?;
    let system_program = next_account_info(account_info_iter)?;

    if !user_info.is_signer || !destination_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }
    if *destination_info.key != destination {
        return Err(LedgerError::InvalidAccount.into());
    }
    check_token_program(token_program)?;

    let config = load_config(program_id, config_info)?;
    let entry = config.registry.get(collateral)?;

    let (vault_key, vault_bump) = PlatformVault::find_address(program_id, &entry.platform_id, &destination);
    if vault_key != *vault_info.key {
        return Err(LedgerError::InvalidAccount.into());
    }
    check_token_account(treasury_collateral_info, treasury_info.key, &entry.mint)?;
    check_token_account(vault_collateral_info, &vault_key, &entry.mint)?;

    let store = load_position(program_id, position_info, PositionKey::new(collateral, *user_info.key))?;
    if store.is_vacant() {
        msg!("No {:?} position for {}, nothing to split", collateral, user_info.key);
        return Ok(());
    }

    let vault = if vault_info.data_is_empty() {
        create_pda_account(
            user_info,
            vault_info,
            system_program,
            program_id,
            PlatformVault::LEN,
            &[PLATFORM_VAULT_SEED, &entry.platform_id, destination.as_ref(), &[vault_bump]],
        )?;
        PlatformVault::new(destination, collateral, vault_bump)
    } else {
        check_owner(program_id, vault_info)?;
        let vault = PlatformVault::deserialize(&mut &vault_info.data.borrow()[..])?;
        vault.validate()?;
        vault
    };

    let rate = load_rate(&config, rate_feed_info)?;
    let custodian = load_treasury(program_id, treasury_info, &config)?.with_rate(rate).with_destination(
        vault,
        VaultTransfer {
            token_program,
            treasury_token: treasury_collateral_info,
            vault_token: vault_collateral_info,
        },
    );
    let token = SeriesToken::new(&config, rate);

    let mut ledger = Ledger::new(config.registry.clone(), store, FeedOracle::unavailable(), custodian, token);
    let migration = ledger.migrate(collateral, user_info.key, &destination)?;
    if let Some(vault) = persist(ledger)? {
        vault.serialize(&mut &mut vault_info.data.borrow_mut()[..])?;
    }

    msg!(
        "Split {} collateral and {} debt to {}",
        migration.collateral,
        migration.debt,
        destination
    );

    Ok(())
}

/// Mature the series once its maturity time has passed
fn process_mature(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let config_info = next_account_info(account_info_iter)?;
    let rate_feed_info = next_account_info(account_info_iter)?;

    let mut config = load_config(program_id, config_info)?;
    let rate = load_rate(&config, rate_feed_info)?.ok_or(LedgerError::OracleUnavailable)?;
    let now = Clock::get()?.unix_timestamp;

    config.series.mature(now, rate)?;
    config.serialize(&mut &mut config_info.data.borrow_mut()[..])?;

    msg!("Series matured at {} with rate {}", now, rate);

    Ok(())
}

/// Write back every account the engine touched
fn persist<'a, 'info>(ledger: AccountLedger<'a, 'info>) -> Result<Option<PlatformVault>, ProgramError> {
    let (store, _, custodian, _) = ledger.into_parts();
    store.commit()?;
    custodian.commit()
}

fn create_pda_account<'info>(
    payer: &AccountInfo<'info>,
    target: &AccountInfo<'info>,
    system_program: &AccountInfo<'info>,
    program_id: &Pubkey,
    space: usize,
    seeds: &[&[u8]],
) -> ProgramResult {
    let rent = Rent::get()?;

    invoke_signed(
        &system_instruction::create_account(
            payer.key,
            target.key,
            rent.minimum_balance(space),
            space as u64,
            program_id,
        ),
        &[payer.clone(), target.clone(), system_program.clone()],
        &[seeds],
    )
}

fn check_owner(program_id: &Pubkey, info: &AccountInfo) -> ProgramResult {
    if info.owner != program_id {
        msg!("Account {} is not owned by the ledger", info.key);
        return Err(LedgerError::InvalidAccount.into());
    }
    Ok(())
}

fn check_token_program(info: &AccountInfo) -> ProgramResult {
    if *info.key != spl_token::id() {
        return Err(ProgramError::IncorrectProgramId);
    }
    Ok(())
}

fn check_mint(info: &AccountInfo, authority: Option<&Pubkey>) -> ProgramResult {
    if *info.owner != spl_token::id() {
        return Err(LedgerError::InvalidAccount.into());
    }
    let mint = spl_token::state::Mint::unpack(&info.data.borrow()).map_err(|_| LedgerError::InvalidAccount)?;
    if let Some(authority) = authority {
        if mint.mint_authority != COption::Some(*authority) {
            msg!("Mint {} must be controlled by {}", info.key, authority);
            return Err(LedgerError::InvalidAccount.into());
        }
    }
    Ok(())
}

/// A token account holding `mint` on behalf of `owner`
fn check_token_account(info: &AccountInfo, owner: &Pubkey, mint: &Pubkey) -> ProgramResult {
    if *info.owner != spl_token::id() {
        return Err(LedgerError::InvalidAccount.into());
    }
    let account = spl_token::state::Account::unpack(&info.data.borrow()).map_err(|_| LedgerError::InvalidAccount)?;
    if account.owner != *owner || account.mint != *mint {
        msg!("Token account {} does not hold {} for {}", info.key, mint, owner);
        return Err(LedgerError::InvalidAccount.into());
    }
    Ok(())
}

fn load_config(program_id: &Pubkey, info: &AccountInfo) -> Result<LedgerConfig, ProgramError> {
    check_owner(program_id, info)?;
    let config = LedgerConfig::deserialize(&mut &info.data.borrow()[..])?;
    config.validate()?;

    let expected = Pubkey::create_program_address(&[LEDGER_SEED, &[config.bump]], program_id)?;
    if expected != *info.key {
        return Err(LedgerError::InvalidAccount.into());
    }
    Ok(config)
}

fn load_treasury<'a, 'info>(
    program_id: &Pubkey,
    info: &'a AccountInfo<'info>,
    config: &LedgerConfig,
) -> Result<TreasuryCustodian<'a, 'info>, ProgramError> {
    check_owner(program_id, info)?;
    let expected = Pubkey::create_program_address(&[TREASURY_SEED, &[config.treasury_bump]], program_id)?;
    if expected != *info.key {
        return Err(LedgerError::InvalidAccount.into());
    }

    let state = TreasuryState::deserialize(&mut &info.data.borrow()[..])?;
    state.validate()?;
    Ok(TreasuryCustodian::new(info, state))
}

fn load_position<'a, 'info>(
    program_id: &Pubkey,
    info: &'a AccountInfo<'info>,
    key: PositionKey,
) -> Result<PositionAccountStore<'a, 'info>, ProgramError> {
    if info.data_is_empty() {
        if key.find_address(program_id).0 != *info.key {
            return Err(LedgerError::InvalidAccount.into());
        }
        return Ok(PositionAccountStore::vacant(info, key));
    }
    check_owner(program_id, info)?;

    let account = PositionAccount::deserialize(&mut &info.data.borrow()[..])?;
    account.validate()?;
    if account.key != key {
        return Err(LedgerError::InvalidAccount.into());
    }
    Ok(PositionAccountStore::new(info, account))
}

fn create_position<'a, 'info>(
    program_id: &Pubkey,
    payer: &'a AccountInfo<'info>,
    info: &'a AccountInfo<'info>,
    system_program: &'a AccountInfo<'info>,
    key: PositionKey,
) -> Result<PositionAccountStore<'a, 'info>, ProgramError> {
    let (address, bump) = key.find_address(program_id);
    if address != *info.key {
        return Err(LedgerError::InvalidAccount.into());
    }

    let tag = key.collateral.tag();
    create_pda_account(
        payer,
        info,
        system_program,
        program_id,
        PositionAccount::LEN,
        &[POSITION_SEED, &tag, key.owner.as_ref(), &[bump]],
    )?;
    msg!("Opened {:?} position for {}", key.collateral, key.owner);

    Ok(PositionAccountStore::new(info, PositionAccount::new(key, bump)))
}
