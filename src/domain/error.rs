//! Error types for the paymaster client.

use thiserror::Error;

/// Top-level error returned by every fallible library operation
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Blockchain error: {0}")]
    Blockchain(#[from] BlockchainError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Program error: {0}")]
    Program(#[from] ProgramError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures at the RPC boundary
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Invalid signature or key: {0}")]
    InvalidSignature(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Blockhash not found or expired")]
    BlockhashNotFound,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Validation failed: {0}")]
    Multiple(String),
}

/// Errors decoding or encoding data for the on-chain paymaster program
#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("Account discriminator mismatch")]
    InvalidDiscriminator,

    #[error("Invalid account data: {0}")]
    InvalidAccountData(String),

    #[error("At most {max} supported tokens allowed, got {actual}")]
    TooManySupportedTokens { max: usize, actual: usize },

    #[error("Arithmetic overflow computing {0}")]
    Overflow(&'static str),
}

impl AppError {
    /// Whether the underlying failure came from the network rather than local validation
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            AppError::Blockchain(
                BlockchainError::Connection(_)
                    | BlockchainError::RpcError(_)
                    | BlockchainError::Timeout(_)
            )
        )
    }
}
