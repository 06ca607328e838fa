//! Domain types for sponsored transactions.

use serde::{Deserialize, Serialize};
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_sdk::{
    instruction::Instruction, pubkey::Pubkey, signature::Signature, transaction::Transaction,
};

use super::fees::{NetworkFeeEstimate, compute_unit_limit_with_margin};

/// Compute-unit limit used when simulation did not report a value
pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 200_000;

/// Extra compute budget added over a simulated value, in percent
pub const DEFAULT_COMPUTE_UNIT_MARGIN_PERCENT: u32 = 10;

/// Whether the sponsored builder prepends compute-budget instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComputeBudgetPolicy {
    /// No compute-budget instructions; the cluster defaults apply
    #[default]
    None,
    /// Size the limit from the simulated compute units plus a margin
    FromSimulation {
        margin_percent: u32,
        price_micro_lamports: u64,
        fallback_units: u32,
    },
}

impl ComputeBudgetPolicy {
    /// Simulation-sized limit with the default margin and fallback
    #[must_use]
    pub fn from_simulation(price_micro_lamports: u64) -> Self {
        Self::FromSimulation {
            margin_percent: DEFAULT_COMPUTE_UNIT_MARGIN_PERCENT,
            price_micro_lamports,
            fallback_units: DEFAULT_COMPUTE_UNIT_LIMIT,
        }
    }

    /// Instructions to place in front of the business instructions
    #[must_use]
    pub fn instructions(&self, estimate: &NetworkFeeEstimate) -> Vec<Instruction> {
        match *self {
            Self::None => vec![],
            Self::FromSimulation {
                margin_percent,
                price_micro_lamports,
                fallback_units,
            } => {
                let limit = estimate
                    .compute_units
                    .map(|units| compute_unit_limit_with_margin(units, margin_percent))
                    .unwrap_or(fallback_units);
                vec![
                    ComputeBudgetInstruction::set_compute_unit_limit(limit),
                    ComputeBudgetInstruction::set_compute_unit_price(price_micro_lamports),
                ]
            }
        }
    }
}

/// A transaction whose network fee is paid by a sponsor, signed but not yet submitted
#[derive(Debug, Clone)]
pub struct SponsoredTransaction {
    pub transaction: Transaction,
    /// Base fee passed to the program's `sol_pay` instruction
    pub base_fee: u64,
    pub estimate: NetworkFeeEstimate,
}

impl SponsoredTransaction {
    /// Declared fee payer (first account key of the message)
    #[must_use]
    pub fn fee_payer(&self) -> Option<&Pubkey> {
        self.transaction.message.account_keys.first()
    }

    /// True once every required signature is present
    #[must_use]
    pub fn is_fully_signed(&self) -> bool {
        self.transaction.is_signed()
    }

    /// Fee payer signature, which identifies the transaction on-chain
    #[must_use]
    pub fn signature(&self) -> Option<&Signature> {
        self.transaction.signatures.first()
    }

    /// Program id invoked by each top-level instruction, in execution order
    #[must_use]
    pub fn instruction_programs(&self) -> Vec<Pubkey> {
        let message = &self.transaction.message;
        message
            .instructions
            .iter()
            .filter_map(|ix| message.account_keys.get(usize::from(ix.program_id_index)))
            .copied()
            .collect()
    }
}
