//! Conversions between collateral, face-value debt and present-value debt.
//!
//! Rounding always favours the ledger: borrowing power and face credit round
//! down, present-value debt rounds up.

use crate::{error::LedgerError, math::Wad, state::Position};

/// Stable-asset value of `posted` collateral at `price`, capped at `u64::MAX`
pub fn power(posted: u64, price: u128) -> u64 {
    u64::try_from(Wad::mul_floor_wide(posted, price)).unwrap_or(u64::MAX)
}

/// Stable asset needed today to extinguish `face` yToken units of debt
pub fn present_value(face: u64, differential: u128) -> Result<u64, LedgerError> {
    Wad::mul_ceil(face, differential)
}

/// yToken face value that `stable` units of stable asset correspond to
pub fn face_value(stable: u64, differential: u128) -> Result<u64, LedgerError> {
    Wad::div_floor(stable, differential)
}

/// Face debt cancelled by paying `paid` stable-asset units against `face_owed`.
///
/// Paying the full present value clears the whole face, anything less is
/// credited at the floored face value.
pub fn face_cancelled(face_owed: u64, paid: u64, differential: u128) -> Result<u64, LedgerError> {
    if paid >= present_value(face_owed, differential)? {
        return Ok(face_owed);
    }
    Ok(face_value(paid, differential)?.min(face_owed))
}

/// `present_value(debt_face) <= power(posted)`, compared in `u128` so neither side can overflow
pub fn is_collateralized(position: &Position, differential: u128, price: u128) -> bool {
    if position.debt_face == 0 {
        return true;
    }
    Wad::mul_ceil_wide(position.debt_face, differential) <= Wad::mul_floor_wide(position.posted, price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(numerator: u128, decimals: u32) -> u128 {
        Wad::from_decimal(numerator, decimals).unwrap()
    }

    #[test]
    fn test_identity_before_maturity() {
        for face in [0u64, 1, 7, 150_000_000_000, u64::MAX] {
            assert_eq!(present_value(face, Wad::ONE).unwrap(), face);
            assert_eq!(face_value(face, Wad::ONE).unwrap(), face);
        }
    }

    #[test]
    fn test_present_value_grows_with_differential() {
        let face = 120_000_000_000u64;
        let mut last = present_value(face, Wad::ONE).unwrap();

        for step in 1..20u128 {
            let differential = Wad::ONE + step * ratio(1, 2);
            let value = present_value(face, differential).unwrap();
            assert!(value > last);
            last = value;
        }
        assert_eq!(present_value(face, ratio(12, 1)).unwrap(), 144_000_000_000);
    }

    #[test]
    fn test_round_trip_never_overstates_credit() {
        let differentials = [ratio(12, 1), ratio(1_000_001, 6), ratio(3, 0) / 2 + 7, ratio(17, 1)];
        for differential in differentials {
            for face in [1u64, 2, 3, 99, 1_000_003, 120_000_000_000] {
                let owed = present_value(face, differential).unwrap();
                assert!(face_value(owed, differential).unwrap() <= face);
                assert_eq!(face_cancelled(face, owed, differential).unwrap(), face);
            }
        }
    }

    #[test]
    fn test_partial_payment_credits_floor() {
        let differential = ratio(15, 1);
        // 10 / 1.5 = 6.66..
        assert_eq!(face_cancelled(100, 10, differential).unwrap(), 6);
        assert_eq!(face_cancelled(4, 10, differential).unwrap(), 4);
    }

    #[test]
    fn test_collateralization_boundary() {
        let price = ratio(15, 1);
        let at_capacity = Position::new(100, 150);
        let above_capacity = Position::new(100, 151);

        assert!(is_collateralized(&at_capacity, Wad::ONE, price));
        assert!(!is_collateralized(&above_capacity, Wad::ONE, price));
        assert!(is_collateralized(&Position::new(0, 0), Wad::ONE, 0));
    }

    #[test]
    fn test_large_collateral_saturates_power() {
        let price = ratio(15, 1);
        let posted = 13_000_000_000_000_000_000u64;

        assert_eq!(power(posted, price), u64::MAX);
        assert_eq!(power(u64::MAX, ratio(100, 0)), u64::MAX);
        assert!(is_collateralized(&Position::new(posted, 1), Wad::ONE, price));
        assert!(is_collateralized(&Position::new(posted, u64::MAX), Wad::ONE, price));
        assert!(!is_collateralized(&Position::new(1, u64::MAX), ratio(2, 0), price));
    }
}
