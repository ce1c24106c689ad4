use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::{
    constants::{LEDGER_SEED, MINT_AUTHORITY_SEED, TREASURY_SEED},
    state::{CollateralConfig, CollateralType, PlatformVault, PositionKey},
};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub enum LedgerInstruction {
    /// Create the ledger configuration and the treasury
    /// Accounts:
    /// 0. `[signer, writable]` Authority (payer)
    /// 1. `[writable]` Ledger config PDA
    /// 2. `[writable]` Treasury PDA
    /// 3. `[]` Stable asset mint
    /// 4. `[]` yToken mint (mint authority must be the mint authority PDA)
    /// 5. `[]` Platform rate feed
    /// 6. `[]` System program
    InitializeLedger {
        maturity: i64,
        collaterals: Vec<CollateralConfig>,
    },

    /// Post collateral
    /// Accounts:
    /// 0. `[signer, writable]` User (payer for a new position)
    /// 1. `[]` Ledger config PDA
    /// 2. `[writable]` Treasury PDA
    /// 3. `[writable]` Position PDA (created if missing)
    /// 4. `[writable]` User collateral token account
    /// 5. `[writable]` Treasury collateral token account
    /// 6. `[]` Token program
    /// 7. `[]` System program
    Post { collateral: u8, amount: u64 },

    /// Withdraw collateral
    /// Accounts:
    /// 0. `[signer]` User
    /// 1. `[]` Ledger config PDA
    /// 2. `[writable]` Treasury PDA
    /// 3. `[writable]` Position PDA (reads as empty if never created)
    /// 4. `[writable]` User collateral token account
    /// 5. `[writable]` Treasury collateral token account
    /// 6. `[]` Collateral price feed
    /// 7. `[]` Platform rate feed
    /// 8. `[]` Token program
    Withdraw { collateral: u8, amount: u64 },

    /// Borrow yTokens against posted collateral
    /// Accounts:
    /// 0. `[signer]` User
    /// 1. `[]` Ledger config PDA
    /// 2. `[writable]` Treasury PDA
    /// 3. `[writable]` Position PDA (reads as empty if never created)
    /// 4. `[writable]` User yToken account
    /// 5. `[writable]` yToken mint
    /// 6. `[]` Mint authority PDA
    /// 7. `[]` Collateral price feed
    /// 8. `[]` Platform rate feed
    /// 9. `[]` Token program
    Borrow { collateral: u8, amount: u64 },

    /// Repay debt by burning yTokens
    /// Accounts:
    /// 0. `[signer]` User
    /// 1. `[]` Ledger config PDA
    /// 2. `[]` Treasury PDA
    /// 3. `[writable]` Position PDA (reads as empty if never created)
    /// 4. `[writable]` User yToken account
    /// 5. `[writable]` yToken mint
    /// 6. `[]` Platform rate feed
    /// 7. `[]` Token program
    RepayYToken { collateral: u8, amount: u64 },

    /// Repay debt with the stable asset
    /// Accounts:
    /// 0. `[signer]` User
    /// 1. `[]` Ledger config PDA
    /// 2. `[writable]` Treasury PDA
    /// 3. `[writable]` Position PDA (reads as empty if never created)
    /// 4. `[writable]` User stable asset account
    /// 5. `[writable]` Treasury stable asset account
    /// 6. `[]` Platform rate feed
    /// 7. `[]` Token program
    RepayStable { collateral: u8, amount: u64 },

    /// Move a position into the destination's own platform vault
    /// Accounts:
    /// 0. `[signer, writable]` User (payer for a new platform vault)
    /// 1. `[]` Ledger config PDA
    /// 2. `[writable]` Treasury PDA
    /// 3. `[writable]` Position PDA (reads as empty if never created)
    /// 4. `[writable]` Destination platform vault PDA (created if missing)
    /// 5. `[signer]` Destination (may be the user)
    /// 6. `[writable]` Treasury collateral account
    /// 7. `[writable]` Vault collateral account, owned by the vault PDA
    /// 8. `[]` Platform rate feed
    /// 9. `[]` Token program
    /// 10. `[]` System program
    Split { collateral: u8, destination: Pubkey },

    /// Mark the series matured and snapshot the platform rate
    /// Accounts:
    /// 0. `[writable]` Ledger config PDA
    /// 1. `[]` Platform rate feed
    Mature,
}

impl LedgerInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (&variant, rest) = input
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;

        Ok(match variant {
            0 => {
                let payload = InitializeLedgerPayload::deserialize(&mut &rest[..])?;
                Self::InitializeLedger {
                    maturity: payload.maturity,
                    collaterals: payload.collaterals,
                }
            }
            1..=5 => {
                let payload = AmountPayload::deserialize(&mut &rest[..])?;
                let (collateral, amount) = (payload.collateral, payload.amount);
                match variant {
                    1 => Self::Post { collateral, amount },
                    2 => Self::Withdraw { collateral, amount },
                    3 => Self::Borrow { collateral, amount },
                    4 => Self::RepayYToken { collateral, amount },
                    _ => Self::RepayStable { collateral, amount },
                }
            }
            6 => {
                let payload = SplitPayload::deserialize(&mut &rest[..])?;
                Self::Split {
                    collateral: payload.collateral,
                    destination: payload.destination,
                }
            }
            7 => Self::Mature,
            _ => return Err(ProgramError::InvalidInstructionData),
        })
    }

    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        Ok(self.try_to_vec()?)
    }
}

// Payload structs, laid out as the matching variants
#[derive(BorshSerialize, BorshDeserialize)]
struct InitializeLedgerPayload {
    maturity: i64,
    collaterals: Vec<CollateralConfig>,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct AmountPayload {
    collateral: u8,
    amount: u64,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct SplitPayload {
    collateral: u8,
    destination: Pubkey,
}

pub fn ledger_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[LEDGER_SEED], program_id)
}

pub fn treasury_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[TREASURY_SEED], program_id)
}

pub fn mint_authority_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[MINT_AUTHORITY_SEED], program_id)
}

pub fn position_address(program_id: &Pubkey, collateral: CollateralType, owner: &Pubkey) -> Pubkey {
    PositionKey::new(collateral, *owner).find_address(program_id).0
}

// Helper functions to create instructions
pub fn initialize_ledger(
    program_id: &Pubkey,
    authority: &Pubkey,
    stable_mint: &Pubkey,
    y_token_mint: &Pubkey,
    rate_feed: &Pubkey,
    maturity: i64,
    collaterals: Vec<CollateralConfig>,
) -> Result<Instruction, ProgramError> {
    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(ledger_address(program_id).0, false),
        AccountMeta::new(treasury_address(program_id).0, false),
        AccountMeta::new_readonly(*stable_mint, false),
        AccountMeta::new_readonly(*y_token_mint, false),
        AccountMeta::new_readonly(*rate_feed, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    let data = LedgerInstruction::InitializeLedger {
        maturity,
        collaterals,
    };

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: data.pack()?,
    })
}

pub fn post(
    program_id: &Pubkey,
    user: &Pubkey,
    user_collateral: &Pubkey,
    treasury_collateral: &Pubkey,
    collateral: CollateralType,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let accounts = vec![
        AccountMeta::new(*user, true),
        AccountMeta::new_readonly(ledger_address(program_id).0, false),
        AccountMeta::new(treasury_address(program_id).0, false),
        AccountMeta::new(position_address(program_id, collateral, user), false),
        AccountMeta::new(*user_collateral, false),
        AccountMeta::new(*treasury_collateral, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    let data = LedgerInstruction::Post {
        collateral: collateral.index() as u8,
        amount,
    };

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: data.pack()?,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn withdraw(
    program_id: &Pubkey,
    user: &Pubkey,
    user_collateral: &Pubkey,
    treasury_collateral: &Pubkey,
    price_feed: &Pubkey,
    rate_feed: &Pubkey,
    collateral: CollateralType,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let accounts = vec![
        AccountMeta::new_readonly(*user, true),
        AccountMeta::new_readonly(ledger_address(program_id).0, false),
        AccountMeta::new(treasury_address(program_id).0, false),
        AccountMeta::new(position_address(program_id, collateral, user), false),
        AccountMeta::new(*user_collateral, false),
        AccountMeta::new(*treasury_collateral, false),
        AccountMeta::new_readonly(*price_feed, false),
        AccountMeta::new_readonly(*rate_feed, false),
        AccountMeta::new_readonly(spl_token::id(), false),
    ];
    let data = LedgerInstruction::Withdraw {
        collateral: collateral.index() as u8,
        amount,
    };

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: data.pack()?,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn borrow(
    program_id: &Pubkey,
    user: &Pubkey,
    user_y_token: &Pubkey,
    y_token_mint: &Pubkey,
    price_feed: &Pubkey,
    rate_feed: &Pubkey,
    collateral: CollateralType,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let accounts = vec![
        AccountMeta::new_readonly(*user, true),
        AccountMeta::new_readonly(ledger_address(program_id).0, false),
        AccountMeta::new(treasury_address(program_id).0, false),
        AccountMeta::new(position_address(program_id, collateral, user), false),
        AccountMeta::new(*user_y_token, false),
        AccountMeta::new(*y_token_mint, false),
        AccountMeta::new_readonly(mint_authority_address(program_id).0, false),
        AccountMeta::new_readonly(*price_feed, false),
        AccountMeta::new_readonly(*rate_feed, false),
        AccountMeta::new_readonly(spl_token::id(), false),
    ];
    let data = LedgerInstruction::Borrow {
        collateral: collateral.index() as u8,
        amount,
    };

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: data.pack()?,
    })
}

pub fn repay_y_token(
    program_id: &Pubkey,
    user: &Pubkey,
    user_y_token: &Pubkey,
    y_token_mint: &Pubkey,
    rate_feed: &Pubkey,
    collateral: CollateralType,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let accounts = vec![
        AccountMeta::new_readonly(*user, true),
        AccountMeta::new_readonly(ledger_address(program_id).0, false),
        AccountMeta::new_readonly(treasury_address(program_id).0, false),
        AccountMeta::new(position_address(program_id, collateral, user), false),
        AccountMeta::new(*user_y_token, false),
        AccountMeta::new(*y_token_mint, false),
        AccountMeta::new_readonly(*rate_feed, false),
        AccountMeta::new_readonly(spl_token::id(), false),
    ];
    let data = LedgerInstruction::RepayYToken {
        collateral: collateral.index() as u8,
        amount,
    };

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: data.pack()?,
    })
}

pub fn repay_stable(
    program_id: &Pubkey,
    user: &Pubkey,
    user_stable: &Pubkey,
    treasury_stable: &Pubkey,
    rate_feed: &Pubkey,
    collateral: CollateralType,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let accounts = vec![
        AccountMeta::new_readonly(*user, true),
        AccountMeta::new_readonly(ledger_address(program_id).0, false),
        AccountMeta::new(treasury_address(program_id).0, false),
        AccountMeta::new(position_address(program_id, collateral, user), false),
        AccountMeta::new(*user_stable, false),
        AccountMeta::new(*treasury_stable, false),
        AccountMeta::new_readonly(*rate_feed, false),
        AccountMeta::new_readonly(spl_token::id(), false),
    ];
    let data = LedgerInstruction::RepayStable {
        collateral: collateral.index() as u8,
        amount,
    };

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: data.pack()?,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn split(
    program_id: &Pubkey,
    user: &Pubkey,
    destination: &Pubkey,
    platform_id: &[u8; 32],
    treasury_collateral: &Pubkey,
    vault_collateral: &Pubkey,
    rate_feed: &Pubkey,
    collateral: CollateralType,
) -> Result<Instruction, ProgramError> {
    let vault = PlatformVault::find_address(program_id, platform_id, destination).0;
    let accounts = vec![
        AccountMeta::new(*user, true),
        AccountMeta::new_readonly(ledger_address(program_id).0, false),
        AccountMeta::new(treasury_address(program_id).0, false),
        AccountMeta::new(position_address(program_id, collateral, user), false),
        AccountMeta::new(vault, false),
        AccountMeta::new_readonly(*destination, true),
        AccountMeta::new(*treasury_collateral, false),
        AccountMeta::new(*vault_collateral, false),
        AccountMeta::new_readonly(*rate_feed, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    let data = LedgerInstruction::Split {
        collateral: collateral.index() as u8,
        destination: *destination,
    };

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: data.pack()?,
    })
}

pub fn mature(program_id: &Pubkey, rate_feed: &Pubkey) -> Result<Instruction, ProgramError> {
    let accounts = vec![
        AccountMeta::new(ledger_address(program_id).0, false),
        AccountMeta::new_readonly(*rate_feed, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: LedgerInstruction::Mature.pack()?,
    })
}
