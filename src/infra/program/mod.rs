//! Interface of the on-chain paymaster program.
//!
//! The program itself is deployed separately; this module only reproduces the pieces
//! of its wire format the client needs: the config PDA, instruction encoding and the
//! config account layout.

pub mod instructions;
pub mod pda;
pub mod state;

use solana_sdk::pubkey::Pubkey;

pub use instructions::{
    InitializeConfigParams, SolPayArgs, TokenPayAccounts, UsdtPayArgs, initialize, sol_pay,
    usdt_pay,
};
pub use pda::{CONFIG_SEED, find_config_address};
pub use state::PaymasterConfigAccount;

/// Program id of the deployed paymaster program
pub const PAYMASTER_PROGRAM_ID: Pubkey =
    Pubkey::from_str_const("6DhkLufYgd7G6K78eXQ5MD5N4pV7qFCQga17xivdtxKY");

pub const SYSTEM_PROGRAM_ID: Pubkey = solana_system_interface::program::ID;

pub const RENT_SYSVAR_ID: Pubkey =
    Pubkey::from_str_const("SysvarRent111111111111111111111111111111111");
