use num_derive::FromPrimitive;
use solana_program::{
    decode_error::DecodeError,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

/// How a failure should be treated by the caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rejected request, nothing changed. The caller may retry with other parameters.
    Validation,
    /// Oracle, custodian or token could not serve the operation.
    Collaborator,
    /// Internal accounting is inconsistent. Never expected under correct logic.
    Invariant,
}

#[derive(Error, Debug, Copy, Clone, FromPrimitive, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid instruction")]
    InvalidInstruction = 0,

    #[error("Amount must be greater than zero")]
    ZeroAmount = 1,

    #[error("Withdrawal exceeds posted collateral")]
    InsufficientPosted = 2,

    #[error("Post more collateral")]
    Undercollateralized = 3,

    #[error("Collateral type is not registered")]
    UnregisteredCollateral = 4,

    #[error("Series has matured")]
    SeriesMatured = 5,

    #[error("Series has not reached maturity")]
    NotYetMature = 6,

    #[error("Series already matured")]
    AlreadyMatured = 7,

    #[error("Oracle unavailable")]
    OracleUnavailable = 8,

    #[error("Custodian cannot cover the transfer")]
    CustodianShortfall = 9,

    #[error("Insufficient token balance")]
    InsufficientFunds = 10,

    #[error("Synthetic token operation failed")]
    TokenFailure = 11,

    #[error("Invalid account")]
    InvalidAccount = 12,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow = 13,

    #[error("Division by zero")]
    DivisionByZero = 14,

    #[error("Ledger invariant violated")]
    InvariantViolation = 15,

    #[error("Account already initialized")]
    AlreadyInitialized = 16,

    #[error("Account not initialized")]
    NotInitialized = 17,
}

impl LedgerError {
    pub fn class(&self) -> ErrorClass {
        use LedgerError::*;

        match self {
            InvalidInstruction
            | ZeroAmount
            | InsufficientPosted
            | Undercollateralized
            | UnregisteredCollateral
            | SeriesMatured
            | NotYetMature
            | AlreadyMatured
            | AlreadyInitialized => ErrorClass::Validation,
            OracleUnavailable
            | CustodianShortfall
            | InsufficientFunds
            | TokenFailure
            | InvalidAccount
            | NotInitialized => ErrorClass::Collaborator,
            ArithmeticOverflow | DivisionByZero | InvariantViolation => ErrorClass::Invariant,
        }
    }
}

impl PrintProgramError for LedgerError {
    fn print<E>(&self) {
        use solana_program::msg;
        msg!("LedgerError ({:?}): {}", self.class(), self);
    }
}

impl From<LedgerError> for ProgramError {
    fn from(e: LedgerError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for LedgerError {
    fn type_of() -> &'static str {
        "LedgerError"
    }
}
