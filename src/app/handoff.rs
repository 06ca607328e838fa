//! Co-signing handoff between the transaction originator and the sponsor.
//!
//! The originator builds the sponsored transaction and signs it with the user key
//! only ([`PaymasterService::prepare_for_sponsor`](super::PaymasterService::prepare_for_sponsor)).
//! The serialized transaction travels to the sponsor, which checks that the
//! reimbursement instruction pays it before adding the fee payer signature.
//! The reimbursement must cover the signature fees and the prioritization fee the
//! message's compute-budget instructions make the fee payer pay.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_sdk::{
    message::Message,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use tracing::{info, instrument, warn};

use crate::domain::fees::{
    LAMPORTS_PER_SIGNATURE, MAX_COMPUTE_UNIT_LIMIT, default_compute_unit_limit,
    prioritization_fee,
};
use crate::domain::{AppError, NetworkFeeEstimate, ValidationError};
use crate::infra::program::{SolPayArgs, find_config_address};

use super::service::partial_sign;

/// Sponsored transaction carrying only the user's signature
#[derive(Debug, Clone)]
pub struct PartiallySignedTransaction {
    pub transaction: Transaction,
    pub base_fee: u64,
    pub estimate: NetworkFeeEstimate,
}

impl PartiallySignedTransaction {
    /// Wire encoding: base64 of the bincode-serialized transaction
    pub fn to_base64(&self) -> Result<String, AppError> {
        encode_transaction(&self.transaction)
    }
}

/// Encode a transaction for transport
pub fn encode_transaction(transaction: &Transaction) -> Result<String, AppError> {
    let bytes = bincode::serialize(transaction)
        .map_err(|e| AppError::Serialization(format!("Failed to encode transaction: {}", e)))?;
    Ok(BASE64.encode(bytes))
}

/// Decode a transaction received from the originator
pub fn decode_transaction(encoded: &str) -> Result<Transaction, AppError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| AppError::Serialization(format!("Invalid base64: {}", e)))?;
    bincode::deserialize(&bytes)
        .map_err(|e| AppError::Serialization(format!("Failed to decode transaction: {}", e)))
}

/// Transaction after the sponsor signature was added
#[derive(Debug, Clone)]
pub struct CosignedTransaction {
    pub transaction: Transaction,
    /// Base fee the user reimburses through `sol_pay`
    pub base_fee: u64,
}

/// Highest compute-unit price the cosigner accepts unless configured otherwise
pub const DEFAULT_MAX_COMPUTE_UNIT_PRICE_MICRO_LAMPORTS: u64 = 1_000_000;

/// Sponsor side of the handoff
pub struct SponsorCosigner {
    sponsor: Keypair,
    program_id: Pubkey,
    min_base_fee: u64,
    max_compute_unit_price: u64,
}

impl SponsorCosigner {
    pub fn new(sponsor: Keypair, program_id: Pubkey) -> Self {
        Self {
            sponsor,
            program_id,
            min_base_fee: 0,
            max_compute_unit_price: DEFAULT_MAX_COMPUTE_UNIT_PRICE_MICRO_LAMPORTS,
        }
    }

    /// Refuse transactions whose reimbursement is below `min_base_fee`
    #[must_use]
    pub fn with_min_base_fee(mut self, min_base_fee: u64) -> Self {
        self.min_base_fee = min_base_fee;
        self
    }

    /// Refuse transactions that set a compute-unit price above `micro_lamports`
    #[must_use]
    pub fn with_max_compute_unit_price(mut self, micro_lamports: u64) -> Self {
        self.max_compute_unit_price = micro_lamports;
        self
    }

    pub fn sponsor(&self) -> Pubkey {
        self.sponsor.pubkey()
    }

    /// Decode a base64 transaction and co-sign it
    pub fn cosign_base64(&self, encoded: &str) -> Result<CosignedTransaction, AppError> {
        self.cosign(decode_transaction(encoded)?)
    }

    /// Validate the transaction and add the sponsor signature
    #[instrument(skip(self, transaction), fields(sponsor = %self.sponsor.pubkey()))]
    pub fn cosign(&self, mut transaction: Transaction) -> Result<CosignedTransaction, AppError> {
        let base_fee = match self.validate(&transaction) {
            Ok(base_fee) => base_fee,
            Err(e) => {
                warn!(error = %e, "Refusing to co-sign transaction");
                return Err(e.into());
            }
        };

        let blockhash = transaction.message.recent_blockhash;
        partial_sign(&mut transaction, &self.sponsor, blockhash)?;
        info!(base_fee, "Transaction co-signed");

        Ok(CosignedTransaction {
            transaction,
            base_fee,
        })
    }

    fn validate(&self, transaction: &Transaction) -> Result<u64, ValidationError> {
        let sponsor = self.sponsor.pubkey();
        let message = &transaction.message;
        let keys = &message.account_keys;

        if keys.first() != Some(&sponsor) {
            return Err(invalid("fee_payer", "fee payer is not the sponsor"));
        }

        let Some((pay, business)) = message.instructions.split_last() else {
            return Err(invalid("instructions", "transaction has no instructions"));
        };

        let program = keys.get(usize::from(pay.program_id_index));
        if program != Some(&self.program_id) {
            return Err(invalid(
                "instructions",
                "last instruction does not target the paymaster program",
            ));
        }
        let args = SolPayArgs::parse(&pay.data)
            .ok_or_else(|| invalid("instructions", "last instruction is not sol_pay"))?;

        // sol_pay accounts: [config, user, paymaster_recv, authority, system_program]
        let account = |i: usize| pay.accounts.get(i).and_then(|&k| keys.get(usize::from(k)));
        let config = account(0).ok_or_else(|| invalid("sol_pay", "missing config account"))?;
        let user = account(1).ok_or_else(|| invalid("sol_pay", "missing user account"))?;
        let recv = account(2).ok_or_else(|| invalid("sol_pay", "missing recipient account"))?;

        if *config != find_config_address(&self.program_id).0 {
            return Err(invalid("sol_pay", "config account is not the program config"));
        }
        if *recv != sponsor {
            return Err(invalid("sol_pay", "fee recipient is not the sponsor"));
        }
        if *user == sponsor {
            return Err(invalid("sol_pay", "sponsor cannot be the paying user"));
        }

        // the sponsor account may only appear as fee payer and pay recipient
        let sponsor_in_business = business
            .iter()
            .any(|ix| ix.accounts.contains(&0) || ix.program_id_index == 0);
        if sponsor_in_business {
            return Err(invalid(
                "instructions",
                "sponsor account is referenced outside the pay instruction",
            ));
        }

        let budget = RequestedBudget::from_message(message)?;
        if budget.price > self.max_compute_unit_price {
            return Err(invalid(
                "compute_unit_price",
                &format!(
                    "compute unit price {} exceeds the maximum {}",
                    budget.price, self.max_compute_unit_price
                ),
            ));
        }

        if args.base_fee < self.min_base_fee {
            return Err(invalid(
                "base_fee",
                &format!(
                    "base fee {} is below the minimum {}",
                    args.base_fee, self.min_base_fee
                ),
            ));
        }
        let fee_payer_cost = budget.fee_payer_cost(message);
        if args.base_fee < fee_payer_cost {
            return Err(invalid(
                "base_fee",
                &format!(
                    "base fee {} does not cover the {} lamports charged to the fee payer",
                    args.base_fee, fee_payer_cost
                ),
            ));
        }

        let user_index = keys
            .iter()
            .position(|k| k == user)
            .filter(|&i| message.is_signer(i))
            .ok_or_else(|| invalid("signatures", "user is not a signer"))?;
        let results = transaction.verify_with_results();
        if !results.get(user_index).copied().unwrap_or(false) {
            return Err(invalid("signatures", "user signature does not verify"));
        }

        Ok(args.base_fee)
    }
}

/// Compute budget a message requests through the compute-budget program
#[derive(Debug, Default)]
struct RequestedBudget {
    limit: Option<u32>,
    price: u64,
    instruction_count: usize,
}

impl RequestedBudget {
    fn from_message(message: &Message) -> Result<Self, ValidationError> {
        let mut budget = Self::default();
        let mut price = None;

        for ix in &message.instructions {
            let program = message.account_keys.get(usize::from(ix.program_id_index));
            if program != Some(&solana_compute_budget_interface::ID) {
                continue;
            }
            budget.instruction_count += 1;

            let parsed = borsh::from_slice::<ComputeBudgetInstruction>(&ix.data)
                .map_err(|_| invalid("compute_budget", "malformed compute budget instruction"))?;
            let duplicate = match parsed {
                ComputeBudgetInstruction::SetComputeUnitLimit(units) => {
                    budget.limit.replace(units).is_some()
                }
                ComputeBudgetInstruction::SetComputeUnitPrice(micro_lamports) => {
                    price.replace(micro_lamports).is_some()
                }
                _ => false,
            };
            if duplicate {
                return Err(invalid(
                    "compute_budget",
                    "duplicate compute budget instruction",
                ));
            }
        }

        budget.price = price.unwrap_or(0);
        Ok(budget)
    }

    /// Signature fees plus the prioritization fee, both paid by the fee payer
    fn fee_payer_cost(&self, message: &Message) -> u64 {
        let limit = self
            .limit
            .unwrap_or_else(|| {
                default_compute_unit_limit(message.instructions.len() - self.instruction_count)
            })
            .min(MAX_COMPUTE_UNIT_LIMIT);
        LAMPORTS_PER_SIGNATURE
            .saturating_mul(u64::from(message.header.num_required_signatures))
            .saturating_add(prioritization_fee(limit, self.price))
    }
}

fn invalid(field: &str, message: &str) -> ValidationError {
    ValidationError::InvalidField {
        field: field.to_string(),
        message: message.to_string(),
    }
}
