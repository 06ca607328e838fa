//! Mock implementations for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use solana_sdk::{
    hash::Hash,
    message::v0,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, VersionedTransaction},
};

use crate::domain::{AppError, BlockchainError, PaymasterRpc};

/// Fee returned by [`MockPaymasterRpc`] unless overridden
pub const MOCK_FEE_LAMPORTS: u64 = 5_000;

/// Configuration for mock behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub should_fail: bool,
    pub error_message: Option<String>,
}

impl MockConfig {
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            error_message: Some(message.into()),
        }
    }
}

/// How the mock answers `simulate_compute_units`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationBehavior {
    Units(u64),
    NoUnits,
    Fail,
}

/// Mock RPC connection for testing
pub struct MockPaymasterRpc {
    config: MockConfig,
    fee_lamports: u64,
    simulation: SimulationBehavior,
    prioritization_fees: Option<Vec<u64>>,
    blockhash: Mutex<Option<Hash>>,
    balances: Mutex<HashMap<Pubkey, u64>>,
    accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
    quoted: Mutex<Vec<v0::Message>>,
    sent: Mutex<Vec<Transaction>>,
    confirmed: Mutex<Vec<Signature>>,
    fail_sends: AtomicBool,
    fail_confirmations: AtomicBool,
}

impl MockPaymasterRpc {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockConfig::success())
    }

    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            fee_lamports: MOCK_FEE_LAMPORTS,
            simulation: SimulationBehavior::Units(300),
            prioritization_fees: None,
            blockhash: Mutex::new(None),
            balances: Mutex::new(HashMap::new()),
            accounts: Mutex::new(HashMap::new()),
            quoted: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            confirmed: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
            fail_confirmations: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_config(MockConfig::failure(message))
    }

    #[must_use]
    pub fn with_fee(mut self, fee_lamports: u64) -> Self {
        self.fee_lamports = fee_lamports;
        self
    }

    #[must_use]
    pub fn with_simulation(mut self, simulation: SimulationBehavior) -> Self {
        self.simulation = simulation;
        self
    }

    #[must_use]
    pub fn with_prioritization_fees(mut self, fees: Vec<u64>) -> Self {
        self.prioritization_fees = Some(fees);
        self
    }

    /// Pin the blockhash; otherwise every call returns a fresh one
    #[must_use]
    pub fn with_blockhash(self, blockhash: Hash) -> Self {
        *self.blockhash.lock().unwrap() = Some(blockhash);
        self
    }

    #[must_use]
    pub fn with_balance(self, pubkey: Pubkey, lamports: u64) -> Self {
        self.set_balance(pubkey, lamports);
        self
    }

    #[must_use]
    pub fn with_account(self, pubkey: Pubkey, data: Vec<u8>) -> Self {
        self.accounts.lock().unwrap().insert(pubkey, data);
        self
    }

    pub fn set_balance(&self, pubkey: Pubkey, lamports: u64) {
        self.balances.lock().unwrap().insert(pubkey, lamports);
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Relaxed);
    }

    /// Report every sent transaction as failed on-chain
    pub fn set_fail_confirmations(&self, fail: bool) {
        self.fail_confirmations.store(fail, Ordering::Relaxed);
    }

    /// Messages passed to `get_fee_for_message` (for testing)
    pub fn quoted_messages(&self) -> Vec<v0::Message> {
        self.quoted.lock().unwrap().clone()
    }

    /// Transactions passed to `send_transaction` (for testing)
    pub fn sent_transactions(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn confirmed_signatures(&self) -> Vec<Signature> {
        self.confirmed.lock().unwrap().clone()
    }

    fn check_should_fail(&self) -> Result<(), AppError> {
        if self.config.should_fail {
            let msg = self
                .config
                .error_message
                .clone()
                .unwrap_or_else(|| "Mock error".to_string());
            return Err(AppError::Blockchain(BlockchainError::RpcError(msg)));
        }
        Ok(())
    }
}

impl Default for MockPaymasterRpc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymasterRpc for MockPaymasterRpc {
    async fn get_latest_blockhash(&self) -> Result<Hash, AppError> {
        self.check_should_fail()?;
        Ok(self
            .blockhash
            .lock()
            .unwrap()
            .unwrap_or_else(Hash::new_unique))
    }

    async fn get_fee_for_message(&self, message: &v0::Message) -> Result<u64, AppError> {
        self.check_should_fail()?;
        self.quoted.lock().unwrap().push(message.clone());
        Ok(self.fee_lamports)
    }

    async fn simulate_compute_units(
        &self,
        _transaction: &VersionedTransaction,
    ) -> Result<Option<u64>, AppError> {
        self.check_should_fail()?;
        match self.simulation {
            SimulationBehavior::Units(units) => Ok(Some(units)),
            SimulationBehavior::NoUnits => Ok(None),
            SimulationBehavior::Fail => Err(AppError::Blockchain(
                BlockchainError::TransactionFailed("Mock simulation failure".to_string()),
            )),
        }
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, AppError> {
        self.check_should_fail()?;
        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(AppError::Blockchain(BlockchainError::TransactionFailed(
                "Mock send failure".to_string(),
            )));
        }
        if !transaction.is_signed() {
            return Err(AppError::Blockchain(BlockchainError::InvalidSignature(
                "Transaction is missing required signatures".to_string(),
            )));
        }
        self.sent.lock().unwrap().push(transaction.clone());
        Ok(transaction.signatures.first().copied().unwrap_or_default())
    }

    async fn confirm_transaction(&self, signature: &Signature) -> Result<(), AppError> {
        self.check_should_fail()?;
        if self.fail_confirmations.load(Ordering::Relaxed) {
            return Err(AppError::Blockchain(BlockchainError::TransactionFailed(
                format!("Transaction {} failed: mock execution failure", signature),
            )));
        }
        self.confirmed.lock().unwrap().push(*signature);
        Ok(())
    }

    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, AppError> {
        self.check_should_fail()?;
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(pubkey)
            .copied()
            .unwrap_or(0))
    }

    async fn get_account_data(&self, pubkey: &Pubkey) -> Result<Vec<u8>, AppError> {
        self.check_should_fail()?;
        self.accounts
            .lock()
            .unwrap()
            .get(pubkey)
            .cloned()
            .ok_or_else(|| {
                AppError::Blockchain(BlockchainError::AccountNotFound(pubkey.to_string()))
            })
    }

    async fn get_recent_prioritization_fees(
        &self,
        _addresses: &[Pubkey],
    ) -> Result<Vec<u64>, AppError> {
        self.check_should_fail()?;
        self.prioritization_fees
            .clone()
            .ok_or_else(|| AppError::NotSupported("prioritization fees".to_string()))
    }
}
