/// Fixed point scale for prices, rates and rate differentials (18 decimals)
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// PDA seeds
pub const LEDGER_SEED: &[u8] = b"ledger";
pub const TREASURY_SEED: &[u8] = b"treasury";
pub const POSITION_SEED: &[u8] = b"position";
pub const PLATFORM_VAULT_SEED: &[u8] = b"platform_vault";
pub const MINT_AUTHORITY_SEED: &[u8] = b"mint_authority";

/// Account discriminators
pub const LEDGER_DISCRIMINATOR: [u8; 8] = [76, 69, 68, 71, 69, 82, 67, 70]; // "LEDGERCF"
pub const TREASURY_DISCRIMINATOR: [u8; 8] = [84, 82, 69, 65, 83, 85, 82, 89]; // "TREASURY"
pub const POSITION_DISCRIMINATOR: [u8; 8] = [80, 79, 83, 73, 84, 73, 79, 78]; // "POSITION"
pub const PLATFORM_VAULT_DISCRIMINATOR: [u8; 8] = [80, 76, 84, 95, 86, 65, 85, 76]; // "PLT_VAUL"
pub const FEED_DISCRIMINATOR: [u8; 8] = [80, 82, 67, 95, 70, 69, 69, 68]; // "PRC_FEED"

/// Maximum number of collateral types the registry holds
pub const MAX_COLLATERAL_TYPES: usize = 2;
