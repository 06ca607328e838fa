//! Domain layer containing core types, fee arithmetic, traits, and error definitions.

pub mod error;
pub mod fees;
pub mod traits;
pub mod types;

pub use error::{AppError, BlockchainError, ConfigError, ProgramError, ValidationError};
pub use fees::{FeeQuote, NetworkFeeEstimate, compute_base_fee};
pub use traits::PaymasterRpc;
pub use types::{ComputeBudgetPolicy, SponsoredTransaction};
