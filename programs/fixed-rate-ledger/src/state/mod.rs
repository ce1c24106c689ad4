pub mod collateral;
pub mod feed;
pub mod ledger_config;
pub mod platform_vault;
pub mod position;
pub mod series;
pub mod treasury;

pub use collateral::*;
pub use feed::*;
pub use ledger_config::*;
pub use platform_vault::*;
pub use position::*;
pub use series::*;
pub use treasury::*;
