//! Client library for fee-sponsored transactions against the Solana paymaster program.
//!
//! A sponsor pays the network fee of a user's transaction and is reimbursed in the same
//! transaction through the program's `sol_pay` instruction.

pub mod app;
pub mod domain;
pub mod infra;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
