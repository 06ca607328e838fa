//! Client configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::{pubkey::Pubkey, signature::Keypair};
use validator::Validate;

use crate::domain::{AppError, ConfigError, ValidationError};
use crate::infra::blockchain::{RpcClientConfig, keypair_from_secret};
use crate::infra::program::PAYMASTER_PROGRAM_ID;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8899";
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;

/// Paymaster client configuration
#[derive(Debug, Validate)]
pub struct ClientConfig {
    #[validate(url)]
    pub rpc_url: String,
    pub program_id: Pubkey,
    #[validate(range(min = 1, max = 600))]
    pub rpc_timeout_secs: u64,
    pub commitment: CommitmentConfig,
    /// Fixed compute-unit price; the minimal positive price is used when unset
    pub compute_unit_price_micro_lamports: Option<u64>,
    /// Signed surcharge added to the estimated network fee
    pub extra_service_fee_lamports: i64,
    /// Config authority passed to `sol_pay`; defaults to the sponsor
    pub authority: Option<Pubkey>,
    pub user_private_key: Option<SecretString>,
    pub sponsor_private_key: Option<SecretString>,
    pub json_logs: bool,
}

impl ClientConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve variable names. Empty values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let config = Self {
            rpc_url: get("SOLANA_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            program_id: parse_optional(&get, "PAYMASTER_PROGRAM_ID")?
                .unwrap_or(PAYMASTER_PROGRAM_ID),
            rpc_timeout_secs: parse_optional(&get, "RPC_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_RPC_TIMEOUT_SECS),
            commitment: match get("COMMITMENT") {
                Some(value) => parse_commitment(&value)?,
                None => CommitmentConfig::confirmed(),
            },
            compute_unit_price_micro_lamports: parse_optional(
                &get,
                "COMPUTE_UNIT_PRICE_MICRO_LAMPORTS",
            )?,
            extra_service_fee_lamports: parse_optional(&get, "EXTRA_SERVICE_FEE_LAMPORTS")?
                .unwrap_or(0),
            authority: parse_optional(&get, "PAYMASTER_AUTHORITY")?,
            user_private_key: get("USER_PRIVATE_KEY").map(SecretString::from),
            sponsor_private_key: get("SPONSOR_PRIVATE_KEY").map(SecretString::from),
            json_logs: get("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
        };

        config
            .validate()
            .map_err(|e| AppError::Validation(ValidationError::Multiple(e.to_string())))?;
        Ok(config)
    }

    #[must_use]
    pub fn rpc_client_config(&self) -> RpcClientConfig {
        RpcClientConfig {
            timeout: Duration::from_secs(self.rpc_timeout_secs),
            commitment: self.commitment,
        }
    }

    pub fn user_keypair(&self) -> Result<Keypair, AppError> {
        load_keypair(self.user_private_key.as_ref(), "USER_PRIVATE_KEY")
    }

    pub fn sponsor_keypair(&self) -> Result<Keypair, AppError> {
        load_keypair(self.sponsor_private_key.as_ref(), "SPONSOR_PRIVATE_KEY")
    }
}

fn load_keypair(secret: Option<&SecretString>, name: &str) -> Result<Keypair, AppError> {
    let secret = secret.ok_or_else(|| ConfigError::MissingVar(name.to_string()))?;
    keypair_from_secret(secret).map_err(|e| {
        ConfigError::InvalidValue {
            name: name.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

fn parse_optional<T, G>(get: &G, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|value| {
            value.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                name: name.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}

fn parse_commitment(value: &str) -> Result<CommitmentConfig, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "processed" => Ok(CommitmentConfig::processed()),
        "confirmed" => Ok(CommitmentConfig::confirmed()),
        "finalized" => Ok(CommitmentConfig::finalized()),
        other => Err(ConfigError::InvalidValue {
            name: "COMMITMENT".to_string(),
            message: format!("unknown commitment level '{}'", other),
        }),
    }
}
