use fixed_rate_ledger::{
    engine::{
        memory::{Asset, MemoryLedger, MemoryPlatform},
        Custodian, Repayment,
    },
    error::LedgerError,
    math::Wad,
    state::{CollateralConfig, CollateralRegistry, CollateralType, Migration},
};
use solana_program::pubkey::Pubkey;

const WETH: CollateralType = CollateralType::Native;
const CHAI: CollateralType = CollateralType::Savings;

const MATURITY: i64 = 1_000;

fn ratio(numerator: u128, decimals: u32) -> u128 {
    Wad::from_decimal(numerator, decimals).unwrap()
}

fn registry(collaterals: &[CollateralType]) -> CollateralRegistry {
    CollateralRegistry::new(
        collaterals
            .iter()
            .map(|c| CollateralConfig::new(*c, Pubkey::new_unique(), Pubkey::new_unique(), "ETH-A"))
            .collect(),
    )
    .unwrap()
}

/// Spot 1.5, rate 1.25, one user holding 100 WETH
fn setup() -> (MemoryPlatform, MemoryLedger, Pubkey) {
    let platform = MemoryPlatform::new(ratio(125, 2), MATURITY);
    platform.set_price(WETH, ratio(15, 1));

    let user = Pubkey::new_unique();
    platform.fund(Asset::Collateral(WETH), &user, 100).unwrap();

    let ledger = platform.ledger(registry(&[WETH, CHAI]));
    (platform, ledger, user)
}

/// Posted 100 WETH and borrowed `amount`
fn setup_with_debt(amount: u64) -> (MemoryPlatform, MemoryLedger, Pubkey) {
    let (platform, mut ledger, user) = setup();
    ledger.post(WETH, &user, 100).unwrap();
    ledger.borrow(WETH, &user, amount).unwrap();
    (platform, ledger, user)
}

/// Matures the series at the current rate and folds 0.25 on top
fn mature_and_fold(platform: &MemoryPlatform) {
    platform.advance_time(MATURITY);
    platform.mature().unwrap();
    platform.fold(ratio(25, 2));
}

#[test]
fn test_post_and_withdraw() {
    let (platform, mut ledger, user) = setup();

    ledger.post(WETH, &user, 100).unwrap();
    assert_eq!(ledger.posted(WETH, &user).unwrap(), 100);
    assert_eq!(ledger.power(WETH, &user).unwrap(), 150);
    assert_eq!(platform.treasury().collateral(WETH), 100);
    assert_eq!(platform.balance(Asset::Collateral(WETH), &user), 0);

    ledger.withdraw(WETH, &user, 100).unwrap();
    assert_eq!(ledger.posted(WETH, &user).unwrap(), 0);
    assert_eq!(platform.treasury().collateral(WETH), 0);
    assert_eq!(platform.balance(Asset::Collateral(WETH), &user), 100);
}

#[test]
fn test_post_fails_without_tokens() {
    let (platform, mut ledger, user) = setup();

    assert_eq!(ledger.post(WETH, &user, 101), Err(LedgerError::InsufficientFunds));
    assert_eq!(ledger.posted(WETH, &user).unwrap(), 0);
    assert_eq!(platform.treasury().collateral(WETH), 0);
}

#[test]
fn test_withdraw_more_than_posted() {
    let (_, mut ledger, user) = setup();
    ledger.post(WETH, &user, 50).unwrap();

    assert_eq!(ledger.withdraw(WETH, &user, 51), Err(LedgerError::InsufficientPosted));
    assert_eq!(ledger.posted(WETH, &user).unwrap(), 50);
}

#[test]
fn test_borrow_up_to_power() {
    let (platform, mut ledger, user) = setup();
    ledger.post(WETH, &user, 100).unwrap();

    assert_eq!(ledger.borrow(WETH, &user, 151), Err(LedgerError::Undercollateralized));
    assert_eq!(platform.balance(Asset::YToken, &user), 0);
    assert_eq!(platform.treasury().pooled_debt, 0);

    ledger.borrow(WETH, &user, 150).unwrap();
    assert_eq!(platform.balance(Asset::YToken, &user), 150);
    assert_eq!(ledger.debt_face(WETH, &user).unwrap(), 150);
    assert_eq!(ledger.debt_in_stable_asset(WETH, &user).unwrap(), 150);

    // 150 drawn at rate 1.25, proceeds parked in savings
    let treasury = platform.treasury();
    assert_eq!(treasury.pooled_debt, 120);
    assert_eq!(treasury.savings, 150);
    assert_eq!(ledger.custodian().reserve_savings().unwrap(), 150);

    assert_eq!(ledger.borrow(WETH, &user, 1), Err(LedgerError::Undercollateralized));
}

#[test]
fn test_withdraw_blocked_by_debt() {
    let (platform, mut ledger, user) = setup_with_debt(150);

    assert_eq!(ledger.withdraw(WETH, &user, 1), Err(LedgerError::Undercollateralized));
    assert_eq!(ledger.posted(WETH, &user).unwrap(), 100);
    assert_eq!(platform.treasury().collateral(WETH), 100);
    assert_eq!(platform.balance(Asset::Collateral(WETH), &user), 0);
}

#[test]
fn test_withdraw_after_partial_repay() {
    let (platform, mut ledger, user) = setup_with_debt(150);
    ledger.repay_with_synthetic_token(WETH, &user, 50).unwrap();

    // 100 owed needs at least 67 WETH at 1.5
    assert_eq!(ledger.withdraw(WETH, &user, 34), Err(LedgerError::Undercollateralized));
    ledger.withdraw(WETH, &user, 33).unwrap();
    assert_eq!(ledger.posted(WETH, &user).unwrap(), 67);
    assert_eq!(platform.balance(Asset::Collateral(WETH), &user), 33);
}

#[test]
fn test_repay_with_y_token() {
    let (platform, mut ledger, user) = setup_with_debt(150);

    let repayment = ledger.repay_with_synthetic_token(WETH, &user, 150).unwrap();
    assert_eq!(
        repayment,
        Repayment {
            paid: 150,
            face_cancelled: 150,
            surplus: 0
        }
    );
    assert_eq!(ledger.debt_face(WETH, &user).unwrap(), 0);
    assert_eq!(platform.balance(Asset::YToken, &user), 0);
}

#[test]
fn test_excess_y_token_stays_with_user() {
    let (platform, mut ledger, user) = setup_with_debt(150);
    platform.fund(Asset::YToken, &user, 1).unwrap();

    let repayment = ledger.repay_with_synthetic_token(WETH, &user, 151).unwrap();
    assert_eq!(repayment.paid, 150);
    assert_eq!(repayment.surplus, 1);
    assert_eq!(ledger.debt_face(WETH, &user).unwrap(), 0);
    assert_eq!(platform.balance(Asset::YToken, &user), 1);
}

#[test]
fn test_repay_without_tokens_changes_nothing() {
    let (platform, mut ledger, user) = setup_with_debt(150);

    assert_eq!(
        ledger.repay_with_stable_asset(WETH, &user, 150),
        Err(LedgerError::InsufficientFunds)
    );
    assert_eq!(ledger.debt_face(WETH, &user).unwrap(), 150);
    assert_eq!(platform.treasury().pooled_debt, 120);

    let receiver = Pubkey::new_unique();
    platform.fund(Asset::YToken, &receiver, 0).unwrap();
    assert_eq!(
        ledger.repay_with_synthetic_token(WETH, &receiver, 150).unwrap().paid,
        0
    );
    assert_eq!(platform.balance(Asset::YToken, &user), 150);
}

#[test]
fn test_zero_amounts() {
    let (_, mut ledger, user) = setup_with_debt(100);

    assert_eq!(ledger.post(WETH, &user, 0), Err(LedgerError::ZeroAmount));
    assert_eq!(ledger.withdraw(WETH, &user, 0), Err(LedgerError::ZeroAmount));
    assert_eq!(ledger.borrow(WETH, &user, 0), Err(LedgerError::ZeroAmount));

    assert_eq!(
        ledger.repay_with_synthetic_token(WETH, &user, 0).unwrap(),
        Repayment::default()
    );
    assert_eq!(
        ledger.repay_with_stable_asset(WETH, &user, 0).unwrap(),
        Repayment::default()
    );
    assert_eq!(ledger.debt_face(WETH, &user).unwrap(), 100);
}

#[test]
fn test_repay_with_no_debt_is_noop() {
    let (platform, mut ledger, user) = setup();
    platform.fund(Asset::YToken, &user, 10).unwrap();

    let repayment = ledger.repay_with_synthetic_token(WETH, &user, 10).unwrap();
    assert_eq!(
        repayment,
        Repayment {
            paid: 0,
            face_cancelled: 0,
            surplus: 10
        }
    );
    assert_eq!(platform.balance(Asset::YToken, &user), 10);
}

#[test]
fn test_debt_grows_after_maturity() {
    let (platform, mut ledger, user) = setup_with_debt(120);
    assert_eq!(ledger.face_value_of(100).unwrap(), 100);

    mature_and_fold(&platform);
    // rate 1.25 -> 1.5, differential 1.2
    assert_eq!(ledger.debt_in_stable_asset(WETH, &user).unwrap(), 144);
    assert_eq!(ledger.face_value_of(144).unwrap(), 120);
    assert_eq!(ledger.debt_face(WETH, &user).unwrap(), 120);

    platform.fold(ratio(3, 1));
    assert!(ledger.debt_in_stable_asset(WETH, &user).unwrap() > 144);
}

#[test]
fn test_repay_y_token_after_maturity() {
    let (platform, mut ledger, user) = setup_with_debt(120);
    mature_and_fold(&platform);

    let repayment = ledger.repay_with_synthetic_token(WETH, &user, 120).unwrap();
    assert_eq!(repayment.paid, 120);
    assert_eq!(repayment.face_cancelled, 100);
    assert_eq!(ledger.debt_in_stable_asset(WETH, &user).unwrap(), 24);

    platform.fund(Asset::YToken, &user, 24).unwrap();
    let repayment = ledger.repay_with_synthetic_token(WETH, &user, 24).unwrap();
    assert_eq!(repayment.face_cancelled, 20);
    assert_eq!(ledger.debt_in_stable_asset(WETH, &user).unwrap(), 0);
    assert_eq!(platform.balance(Asset::YToken, &user), 0);
}

#[test]
fn test_repay_stable_after_maturity() {
    let (platform, mut ledger, user) = setup_with_debt(120);
    mature_and_fold(&platform);
    platform.fund(Asset::Stable, &user, 200).unwrap();

    let repayment = ledger.repay_with_stable_asset(WETH, &user, 200).unwrap();
    assert_eq!(
        repayment,
        Repayment {
            paid: 144,
            face_cancelled: 120,
            surplus: 56
        }
    );
    assert_eq!(platform.balance(Asset::Stable, &user), 56);
    assert_eq!(ledger.debt_face(WETH, &user).unwrap(), 0);

    // 120 drawn at 1.25 is 96 normalized, 144 at 1.5 clears exactly that
    assert_eq!(platform.treasury().pooled_debt, 0);
    assert_eq!(platform.treasury().savings, 120);

    ledger.withdraw(WETH, &user, 100).unwrap();
    assert_eq!(platform.balance(Asset::Collateral(WETH), &user), 100);
}

#[test]
fn test_partial_stable_repay_rounds_against_user() {
    let (platform, mut ledger, user) = setup_with_debt(120);
    mature_and_fold(&platform);
    platform.fund(Asset::Stable, &user, 5).unwrap();

    // 5 / 1.2 = 4.16, four face units cancelled
    let repayment = ledger.repay_with_stable_asset(WETH, &user, 5).unwrap();
    assert_eq!(repayment.face_cancelled, 4);
    assert_eq!(ledger.debt_face(WETH, &user).unwrap(), 116);
}

#[test]
fn test_borrow_closed_after_maturity() {
    let (platform, mut ledger, user) = setup_with_debt(10);
    mature_and_fold(&platform);

    assert_eq!(ledger.borrow(WETH, &user, 1), Err(LedgerError::SeriesMatured));
    assert_eq!(ledger.debt_face(WETH, &user).unwrap(), 10);
}

#[test]
fn test_maturity_is_set_once() {
    let (platform, _, _) = setup();

    assert_eq!(platform.mature(), Err(LedgerError::NotYetMature));
    platform.advance_time(MATURITY);
    platform.mature().unwrap();
    let series = platform.series();

    platform.fold(ratio(1, 1));
    assert_eq!(platform.mature(), Err(LedgerError::AlreadyMatured));
    assert_eq!(platform.series(), series);
}

#[test]
fn test_split_within_pool_debt() {
    let (platform, mut ledger, user) = setup_with_debt(120);

    let migration = ledger.migrate(WETH, &user, &user).unwrap();
    assert_eq!(
        migration,
        Migration {
            collateral: 100,
            debt: 120,
            normalized_debt: 96,
            shortfall: 0
        }
    );

    let vault = platform.vault(WETH, &user).unwrap();
    assert_eq!(vault.ink, 100);
    assert_eq!(vault.art, 96);
    assert_eq!(platform.vault_debt(WETH, &user).unwrap(), 120);

    let treasury = platform.treasury();
    assert_eq!(treasury.pooled_debt, 0);
    assert_eq!(treasury.collateral(WETH), 0);
    assert_eq!(treasury.savings, 120);

    assert_eq!(ledger.posted(WETH, &user).unwrap(), 0);
    assert_eq!(ledger.debt_face(WETH, &user).unwrap(), 0);
}

#[test]
fn test_split_beyond_pool_debt() {
    let (platform, mut ledger, user) = setup_with_debt(120);
    platform.settle_from_savings(120).unwrap();
    assert_eq!(platform.treasury().pooled_debt, 0);
    assert_eq!(platform.treasury().savings, 0);

    let migration = ledger.migrate(WETH, &user, &user).unwrap();
    assert_eq!(migration.shortfall, 120);

    let vault = platform.vault(WETH, &user).unwrap();
    assert_eq!(vault.ink, 100);
    assert_eq!(vault.art, 96);

    // debt drawn fresh for the user is matched by new savings
    assert_eq!(platform.treasury().savings, 120);
    assert_eq!(ledger.debt_face(WETH, &user).unwrap(), 0);
}

#[test]
fn test_split_after_maturity_moves_present_value() {
    let (platform, mut ledger, user) = setup_with_debt(120);
    mature_and_fold(&platform);

    let migration = ledger.migrate(WETH, &user, &user).unwrap();
    assert_eq!(migration.debt, 144);
    assert_eq!(migration.normalized_debt, 96);
    assert_eq!(platform.vault_debt(WETH, &user).unwrap(), 144);
}

#[test]
fn test_split_to_another_owner() {
    let (platform, mut ledger, user) = setup_with_debt(120);
    let destination = Pubkey::new_unique();

    ledger.migrate(WETH, &user, &destination).unwrap();
    assert!(platform.vault(WETH, &user).is_none());
    assert_eq!(platform.vault(WETH, &destination).unwrap().ink, 100);
}

#[test]
fn test_split_empty_position() {
    let (platform, mut ledger, user) = setup();

    assert_eq!(ledger.migrate(WETH, &user, &user).unwrap(), Migration::default());
    assert!(platform.vault(WETH, &user).is_none());
}

#[test]
fn test_failed_split_leaves_position() {
    let (platform, mut ledger, user) = setup_with_debt(120);
    platform.drain_pool(WETH, 1).unwrap();

    assert_eq!(ledger.migrate(WETH, &user, &user), Err(LedgerError::CustodianShortfall));
    assert_eq!(ledger.posted(WETH, &user).unwrap(), 100);
    assert_eq!(ledger.debt_face(WETH, &user).unwrap(), 120);
    assert!(platform.vault(WETH, &user).is_none());
    assert_eq!(platform.treasury().pooled_debt, 96);
}

#[test]
fn test_custodian_refusal_leaves_position() {
    let (platform, mut ledger, user) = setup();
    ledger.post(WETH, &user, 100).unwrap();
    platform.set_debt_ceiling(Some(50));

    assert_eq!(ledger.borrow(WETH, &user, 120), Err(LedgerError::CustodianShortfall));
    assert_eq!(ledger.debt_face(WETH, &user).unwrap(), 0);
    assert_eq!(platform.balance(Asset::YToken, &user), 0);

    ledger.borrow(WETH, &user, 60).unwrap();
    assert_eq!(platform.treasury().pooled_debt, 48);
}

#[test]
fn test_positions_are_independent() {
    let (platform, mut ledger, user) = setup_with_debt(150);
    let other = Pubkey::new_unique();
    platform.fund(Asset::Collateral(WETH), &other, 10).unwrap();
    platform.fund(Asset::Collateral(CHAI), &user, 10).unwrap();
    platform.set_price(CHAI, Wad::ONE);

    ledger.post(WETH, &other, 10).unwrap();
    ledger.post(CHAI, &user, 10).unwrap();
    ledger.borrow(CHAI, &user, 10).unwrap();

    assert_eq!(ledger.posted(WETH, &user).unwrap(), 100);
    assert_eq!(ledger.debt_face(WETH, &user).unwrap(), 150);
    assert_eq!(ledger.debt_face(CHAI, &user).unwrap(), 10);
    assert_eq!(ledger.posted(WETH, &other).unwrap(), 10);
    assert_eq!(ledger.debt_face(WETH, &other).unwrap(), 0);
    assert_eq!(platform.treasury().collateral(CHAI), 10);
}

#[test]
fn test_unregistered_collateral() {
    let platform = MemoryPlatform::new(Wad::ONE, MATURITY);
    let mut ledger = platform.ledger(registry(&[WETH]));
    let user = Pubkey::new_unique();
    platform.fund(Asset::Collateral(CHAI), &user, 10).unwrap();

    assert_eq!(ledger.post(CHAI, &user, 10), Err(LedgerError::UnregisteredCollateral));
    assert_eq!(ledger.power(CHAI, &user), Err(LedgerError::UnregisteredCollateral));
    assert_eq!(ledger.migrate(CHAI, &user, &user), Err(LedgerError::UnregisteredCollateral));
    assert_eq!(platform.balance(Asset::Collateral(CHAI), &user), 10);
}

#[test]
fn test_oracle_unavailable() {
    let platform = MemoryPlatform::new(Wad::ONE, MATURITY);
    let mut ledger = platform.ledger(registry(&[WETH]));
    let user = Pubkey::new_unique();
    platform.fund(Asset::Collateral(WETH), &user, 10).unwrap();

    ledger.post(WETH, &user, 10).unwrap();
    assert_eq!(ledger.power(WETH, &user), Err(LedgerError::OracleUnavailable));
    assert_eq!(ledger.borrow(WETH, &user, 1), Err(LedgerError::OracleUnavailable));

    // nothing owed, no price needed
    ledger.withdraw(WETH, &user, 10).unwrap();
    assert_eq!(platform.balance(Asset::Collateral(WETH), &user), 10);
}

#[test]
fn test_power_rounds_down() {
    let (_, mut ledger, user) = setup();
    ledger.post(WETH, &user, 3).unwrap();

    // 3 * 1.5 = 4.5
    assert_eq!(ledger.power(WETH, &user).unwrap(), 4);
    assert_eq!(ledger.borrow(WETH, &user, 5), Err(LedgerError::Undercollateralized));
    ledger.borrow(WETH, &user, 4).unwrap();
}

#[test]
fn test_large_collateral_keeps_power_available() {
    let (platform, mut ledger, user) = setup();
    let posted = 13_000_000_000_000_000_000u64;
    platform.fund(Asset::Collateral(WETH), &user, posted).unwrap();
    ledger.post(WETH, &user, posted).unwrap();

    // 13e18 * 1.5 does not fit in u64
    assert_eq!(ledger.power(WETH, &user).unwrap(), u64::MAX);
    ledger.borrow(WETH, &user, 1).unwrap();
    ledger.withdraw(WETH, &user, 100).unwrap();
    assert_eq!(ledger.debt_face(WETH, &user).unwrap(), 1);
}

#[test]
fn test_split_reports_rounded_destination_debt() {
    let (platform, mut ledger, user) = setup_with_debt(149);

    // 149 / 1.25 = 119.2, the vault carries 120 normalized
    let migration = ledger.migrate(WETH, &user, &user).unwrap();
    assert_eq!(migration.normalized_debt, 120);
    assert_eq!(migration.debt, 150);
    assert_eq!(platform.vault_debt(WETH, &user).unwrap(), migration.debt);
    assert_eq!(platform.vault(WETH, &user).unwrap().art, 120);
    assert_eq!(platform.treasury().pooled_debt, 0);
}

#[test]
fn test_failed_mint_leaves_pool_untouched() {
    let (platform, mut ledger, user) = setup();
    ledger.post(WETH, &user, 100).unwrap();
    platform.fund(Asset::YToken, &user, u64::MAX).unwrap();

    assert_eq!(ledger.borrow(WETH, &user, 10), Err(LedgerError::ArithmeticOverflow));
    assert_eq!(ledger.debt_face(WETH, &user).unwrap(), 0);
    assert_eq!(platform.treasury().pooled_debt, 0);
    assert_eq!(platform.treasury().savings, 0);
    assert_eq!(platform.balance(Asset::YToken, &user), u64::MAX);
}
