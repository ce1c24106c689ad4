pub mod conversion;
pub mod ledger;
pub mod memory;
pub mod traits;

pub use ledger::{Ledger, Repayment};
pub use traits::{Custodian, PositionBook, PositionStore, PriceOracle, SyntheticToken};
