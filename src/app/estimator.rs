//! Network fee estimation for unsigned instruction lists.

use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_sdk::{
    instruction::Instruction,
    message::{VersionedMessage, v0},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use tracing::{debug, instrument};

use crate::domain::fees::MIN_COMPUTE_UNIT_PRICE_MICRO_LAMPORTS;
use crate::domain::{AppError, NetworkFeeEstimate, PaymasterRpc};

/// Estimate the network fee of `business_instructions` paid by `payer`.
///
/// The quoted message is `[set_compute_unit_price(price)] ++ business_instructions`
/// compiled against the latest blockhash. The cluster's fee for that message is
/// required; the compute-unit count from simulation is best-effort and is `None`
/// whenever simulation fails.
#[instrument(skip(rpc, business_instructions), fields(payer = %payer, count = business_instructions.len()))]
pub async fn estimate_network_fee_for_ixs(
    rpc: &dyn PaymasterRpc,
    payer: &Pubkey,
    business_instructions: &[Instruction],
    price_micro_lamports: u64,
) -> Result<NetworkFeeEstimate, AppError> {
    let blockhash = rpc.get_latest_blockhash().await?;

    let price = price_micro_lamports.max(MIN_COMPUTE_UNIT_PRICE_MICRO_LAMPORTS);
    let instructions: Vec<Instruction> =
        std::iter::once(ComputeBudgetInstruction::set_compute_unit_price(price))
            .chain(business_instructions.iter().cloned())
            .collect();

    let message = v0::Message::try_compile(payer, &instructions, &[], blockhash)
        .map_err(|e| AppError::Internal(format!("Failed to compile message: {}", e)))?;

    let fee_lamports = rpc.get_fee_for_message(&message).await?;
    let compute_units = simulate_compute_units(rpc, message).await;

    debug!(fee_lamports, compute_units = ?compute_units, price, "Network fee estimated");

    Ok(NetworkFeeEstimate {
        fee_lamports,
        compute_units,
    })
}

async fn simulate_compute_units(rpc: &dyn PaymasterRpc, message: v0::Message) -> Option<u64> {
    let required = usize::from(message.header.num_required_signatures);
    let transaction = VersionedTransaction {
        signatures: vec![Signature::default(); required],
        message: VersionedMessage::V0(message),
    };

    match rpc.simulate_compute_units(&transaction).await {
        Ok(units) => units,
        Err(e) => {
            debug!(error = %e, "Simulation failed, compute units unknown");
            None
        }
    }
}
