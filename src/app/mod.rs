//! Application layer: fee estimation, sponsored transaction assembly and helpers.

pub mod balances;
pub mod config;
pub mod estimator;
pub mod handoff;
pub mod service;

pub use balances::{BalanceSnapshot, TokenAccounts, format_sol, print_balances};
pub use config::ClientConfig;
pub use estimator::estimate_network_fee_for_ixs;
pub use handoff::{CosignedTransaction, PartiallySignedTransaction, SponsorCosigner};
pub use service::PaymasterService;
