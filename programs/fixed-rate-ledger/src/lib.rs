// Fixed-rate borrowing ledger over a variable-rate CDP platform
// Native Solana implementation - NO ANCHOR

use solana_program::entrypoint;

pub mod adapters;
pub mod constants;
pub mod engine;
pub mod error;
pub mod instructions;
pub mod math;
pub mod processor;
pub mod state;

use processor::process_instruction;

// Declare program ID
solana_program::declare_id!("FxRtLedger111111111111111111111111111111111");

#[cfg(not(feature = "no-entrypoint"))]
entrypoint!(process_instruction);
