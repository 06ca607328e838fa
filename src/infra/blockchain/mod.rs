//! Blockchain client implementations.
//!
//! This module provides the Solana RPC adapter and the compute-unit price strategies
//! used during fee estimation.

pub mod solana;
pub mod strategies;

pub use solana::{
    RpcClientConfig, RpcPaymasterClient, keypair_from_secret, map_solana_client_error,
};

pub use strategies::{
    ComputeUnitPriceStrategy, FixedPriceStrategy, RecentPrioritizationFeesStrategy,
};
