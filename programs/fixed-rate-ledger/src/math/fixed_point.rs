use crate::{constants::WAD, error::LedgerError};

/// Fixed point helpers for `u64` token amounts against `u128` ratios scaled by `WAD`.
///
/// Every operation names its rounding direction. Callers pick the direction
/// that favours the ledger, never the user.
pub struct Wad;

impl Wad {
    pub const ONE: u128 = WAD;

    /// Build a ratio from a decimal expressed as `numerator / 10^decimals`.
    pub fn from_decimal(numerator: u128, decimals: u32) -> Result<u128, LedgerError> {
        let scale = 10u128
            .checked_pow(decimals)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        numerator
            .checked_mul(WAD)
            .ok_or(LedgerError::ArithmeticOverflow)
            .map(|n| n / scale)
    }

    /// `floor(amount * ratio)`
    pub fn mul_floor(amount: u64, ratio: u128) -> Result<u64, LedgerError> {
        let product = Self::product(amount, ratio)?;
        Self::narrow(product / WAD)
    }

    /// `ceil(amount * ratio)`
    pub fn mul_ceil(amount: u64, ratio: u128) -> Result<u64, LedgerError> {
        let product = Self::product(amount, ratio)?;
        Self::narrow(Self::div_round_up(product, WAD))
    }

    /// `floor(amount * ratio)` without narrowing, saturating at `u128::MAX`
    pub fn mul_floor_wide(amount: u64, ratio: u128) -> u128 {
        let (whole, fraction) = Self::split_product(amount, ratio);
        whole.saturating_add(fraction / WAD)
    }

    /// `ceil(amount * ratio)` without narrowing, saturating at `u128::MAX`
    pub fn mul_ceil_wide(amount: u64, ratio: u128) -> u128 {
        let (whole, fraction) = Self::split_product(amount, ratio);
        whole.saturating_add(Self::div_round_up(fraction, WAD))
    }

    /// `floor(amount / ratio)`
    pub fn div_floor(amount: u64, ratio: u128) -> Result<u64, LedgerError> {
        if ratio == 0 {
            return Err(LedgerError::DivisionByZero);
        }
        Self::narrow(Self::product(amount, WAD)? / ratio)
    }

    /// `ceil(amount / ratio)`
    pub fn div_ceil(amount: u64, ratio: u128) -> Result<u64, LedgerError> {
        if ratio == 0 {
            return Err(LedgerError::DivisionByZero);
        }
        Self::narrow(Self::div_round_up(Self::product(amount, WAD)?, ratio))
    }

    /// `ceil(numerator / denominator)` for two ratios, result scaled by `WAD`
    pub fn ratio_ceil(numerator: u128, denominator: u128) -> Result<u128, LedgerError> {
        if denominator == 0 {
            return Err(LedgerError::DivisionByZero);
        }
        let scaled = numerator
            .checked_mul(WAD)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        Ok(Self::div_round_up(scaled, denominator))
    }

    fn product(amount: u64, ratio: u128) -> Result<u128, LedgerError> {
        (amount as u128)
            .checked_mul(ratio)
            .ok_or(LedgerError::ArithmeticOverflow)
    }

    // amount * ratio = amount * whole(ratio) * WAD + amount * frac(ratio).
    // The second product stays below 2^124.
    fn split_product(amount: u64, ratio: u128) -> (u128, u128) {
        let amount = amount as u128;
        (amount.saturating_mul(ratio / WAD), amount * (ratio % WAD))
    }

    fn div_round_up(n: u128, d: u128) -> u128 {
        let q = n / d;
        if n % d == 0 {
            q
        } else {
            q + 1
        }
    }

    fn narrow(value: u128) -> Result<u64, LedgerError> {
        u64::try_from(value).map_err(|_| LedgerError::ArithmeticOverflow)
    }
}
