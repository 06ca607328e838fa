//! Infrastructure layer implementations.

pub mod blockchain;
pub mod program;

pub use blockchain::{RpcClientConfig, RpcPaymasterClient, keypair_from_secret};
pub use program::{PAYMASTER_PROGRAM_ID, PaymasterConfigAccount, find_config_address};
