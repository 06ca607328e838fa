//! Domain traits defining contracts for external systems.

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    message::v0,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, VersionedTransaction},
};

use super::error::AppError;

/// Network RPC operations consumed by the paymaster client.
///
/// Implemented over the Solana nonblocking RPC client in
/// [`crate::infra::RpcPaymasterClient`] and by `MockPaymasterRpc` in tests.
#[async_trait]
pub trait PaymasterRpc: Send + Sync {
    /// Latest blockhash at the client's commitment
    async fn get_latest_blockhash(&self) -> Result<Hash, AppError>;

    /// Fee the cluster charges for this exact message, in lamports
    async fn get_fee_for_message(&self, message: &v0::Message) -> Result<u64, AppError>;

    /// Simulate an unsigned transaction and report compute units consumed.
    ///
    /// Returns `Ok(None)` when the node answered without a unit count.
    async fn simulate_compute_units(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Option<u64>, AppError>;

    /// Submit a signed transaction without waiting for confirmation
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, AppError>;

    /// Wait until the signature reaches the client's commitment
    async fn confirm_transaction(&self, signature: &Signature) -> Result<(), AppError>;

    /// Native balance in lamports
    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, AppError>;

    /// Raw account data; errors when the account does not exist
    async fn get_account_data(&self, pubkey: &Pubkey) -> Result<Vec<u8>, AppError>;

    /// Recent per-compute-unit prioritization fees (micro-lamports) paid by
    /// transactions that locked any of `addresses`
    async fn get_recent_prioritization_fees(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<u64>, AppError> {
        let _ = addresses;
        Err(AppError::NotSupported(
            "get_recent_prioritization_fees not implemented".to_string(),
        ))
    }
}
