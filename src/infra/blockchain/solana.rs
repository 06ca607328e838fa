//! Solana RPC adapter for the paymaster client.
//!
//! Wraps the nonblocking SDK client behind [`PaymasterRpc`] and maps SDK errors into
//! [`AppError`]. No retries are performed here; timeouts come from the transport.

use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use solana_client::nonblocking::rpc_client::RpcClient as SolanaRpcClient;
use solana_client::rpc_config::RpcSimulateTransactionConfig;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::{
    hash::Hash,
    message::v0,
    pubkey::Pubkey,
    signature::Signature,
    signer::keypair::Keypair,
    transaction::{Transaction, VersionedTransaction},
};

use crate::domain::{AppError, BlockchainError, PaymasterRpc};

/// Configuration for the RPC client
#[derive(Debug, Clone)]
pub struct RpcClientConfig {
    pub timeout: Duration,
    pub commitment: CommitmentConfig,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            commitment: CommitmentConfig::confirmed(),
        }
    }
}

/// Solana RPC client implementing [`PaymasterRpc`]
pub struct RpcPaymasterClient {
    client: SolanaRpcClient,
    config: RpcClientConfig,
}

impl RpcPaymasterClient {
    pub fn new(rpc_url: &str, config: RpcClientConfig) -> Self {
        let client = SolanaRpcClient::new_with_timeout_and_commitment(
            rpc_url.to_string(),
            config.timeout,
            config.commitment,
        );
        info!(rpc_url = %rpc_url, commitment = ?config.commitment.commitment, "Created paymaster RPC client");
        Self { client, config }
    }

    pub fn with_defaults(rpc_url: &str) -> Self {
        Self::new(rpc_url, RpcClientConfig::default())
    }

    /// Underlying SDK client, for calls this crate does not wrap
    #[must_use]
    pub fn sdk_client(&self) -> &SolanaRpcClient {
        &self.client
    }

    #[must_use]
    pub fn url(&self) -> String {
        self.client.url()
    }
}

#[async_trait]
impl PaymasterRpc for RpcPaymasterClient {
    #[instrument(skip(self))]
    async fn get_latest_blockhash(&self) -> Result<Hash, AppError> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(map_solana_client_error)
    }

    #[instrument(skip(self, message))]
    async fn get_fee_for_message(&self, message: &v0::Message) -> Result<u64, AppError> {
        self.client
            .get_fee_for_message(message)
            .await
            .map_err(map_solana_client_error)
    }

    #[instrument(skip(self, transaction))]
    async fn simulate_compute_units(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Option<u64>, AppError> {
        let config = RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: true,
            commitment: Some(self.config.commitment),
            ..Default::default()
        };
        let response = self
            .client
            .simulate_transaction_with_config(transaction, config)
            .await
            .map_err(map_solana_client_error)?;

        if let Some(err) = &response.value.err {
            debug!(error = ?err, "Simulation reported a transaction error");
        }
        Ok(response.value.units_consumed)
    }

    #[instrument(skip(self, transaction))]
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, AppError> {
        self.client
            .send_transaction(transaction)
            .await
            .map_err(map_solana_client_error)
    }

    #[instrument(skip(self))]
    async fn confirm_transaction(&self, signature: &Signature) -> Result<(), AppError> {
        let commitment = self.config.commitment;
        self.client
            .poll_for_signature_with_commitment(signature, commitment)
            .await
            .map_err(map_solana_client_error)?;

        // polling stops at any status, including a failed execution
        let status = self
            .client
            .get_signature_status_with_commitment(signature, commitment)
            .await
            .map_err(map_solana_client_error)?;
        match status {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => {
                warn!(error = %e, "Transaction failed on-chain");
                Err(AppError::Blockchain(BlockchainError::TransactionFailed(
                    format!("Transaction {} failed: {}", signature, e),
                )))
            }
            None => Err(AppError::Blockchain(BlockchainError::Timeout(format!(
                "Transaction {} has no status at {:?} commitment",
                signature, commitment.commitment
            )))),
        }
    }

    #[instrument(skip(self))]
    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, AppError> {
        self.client
            .get_balance(pubkey)
            .await
            .map_err(map_solana_client_error)
    }

    #[instrument(skip(self))]
    async fn get_account_data(&self, pubkey: &Pubkey) -> Result<Vec<u8>, AppError> {
        let response = self
            .client
            .get_account_with_commitment(pubkey, self.config.commitment)
            .await
            .map_err(map_solana_client_error)?;

        response
            .value
            .map(|account| account.data)
            .ok_or_else(|| AppError::Blockchain(BlockchainError::AccountNotFound(pubkey.to_string())))
    }

    #[instrument(skip(self, addresses), fields(count = addresses.len()))]
    async fn get_recent_prioritization_fees(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<u64>, AppError> {
        let fees = self
            .client
            .get_recent_prioritization_fees(addresses)
            .await
            .map_err(map_solana_client_error)?;
        Ok(fees.into_iter().map(|f| f.prioritization_fee).collect())
    }
}

/// Map Solana client errors to our AppError types
pub fn map_solana_client_error(err: solana_client::client_error::ClientError) -> AppError {
    use solana_client::client_error::ClientErrorKind;

    let msg = err.to_string();

    if msg.contains("Blockhash not found") || msg.contains("Invalid blockhash") {
        return AppError::Blockchain(BlockchainError::BlockhashNotFound);
    }

    match err.kind() {
        ClientErrorKind::RpcError(_) => {
            if msg.contains("insufficient") || msg.contains("InsufficientFunds") {
                AppError::Blockchain(BlockchainError::InsufficientFunds)
            } else {
                AppError::Blockchain(BlockchainError::RpcError(msg))
            }
        }
        ClientErrorKind::Io(_) => AppError::Blockchain(BlockchainError::Connection(msg)),
        ClientErrorKind::Reqwest(_) => {
            if msg.contains("timeout") || msg.contains("timed out") {
                AppError::Blockchain(BlockchainError::Timeout(msg))
            } else {
                AppError::Blockchain(BlockchainError::Connection(msg))
            }
        }
        ClientErrorKind::SerdeJson(_) => AppError::Blockchain(BlockchainError::RpcError(msg)),
        _ => AppError::Blockchain(BlockchainError::TransactionFailed(msg)),
    }
}

/// Parse a secret key into a Solana keypair.
///
/// Accepts base58 (32-byte seed or 64-byte keypair) or the JSON byte array written by
/// `solana-keygen`.
pub fn keypair_from_secret(secret: &SecretString) -> Result<Keypair, AppError> {
    let raw = secret.expose_secret().trim();

    let key_bytes = if raw.starts_with('[') {
        serde_json::from_str::<Vec<u8>>(raw).map_err(|e| {
            AppError::Blockchain(BlockchainError::InvalidSignature(format!(
                "Invalid keypair JSON: {}",
                e
            )))
        })?
    } else {
        bs58::decode(raw)
            .into_vec()
            .map_err(|e| AppError::Blockchain(BlockchainError::InvalidSignature(e.to_string())))?
    };

    let keypair_bytes: Vec<u8> = match key_bytes.len() {
        64 => key_bytes,
        32 => {
            let seed: [u8; 32] = key_bytes.as_slice().try_into().map_err(|_| {
                AppError::Blockchain(BlockchainError::InvalidSignature(
                    "Invalid seed format".to_string(),
                ))
            })?;
            SigningKey::from_bytes(&seed).to_keypair_bytes().to_vec()
        }
        n => {
            return Err(AppError::Blockchain(BlockchainError::InvalidSignature(
                format!("Key must be 32 or 64 bytes, got {}", n),
            )));
        }
    };

    Keypair::try_from(keypair_bytes.as_slice()).map_err(|e| {
        AppError::Blockchain(BlockchainError::InvalidSignature(format!(
            "Failed to create keypair: {}",
            e
        )))
    })
}
