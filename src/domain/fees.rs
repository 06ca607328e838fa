//! Fee arithmetic shared by the estimator, the sponsored builder and the quote helpers.
//!
//! All amounts are lamports unless stated otherwise. The service-fee and token
//! formulas mirror what the paymaster program computes on-chain so that callers can
//! preview the exact amount that will move from the user to the sponsor.

use serde::{Deserialize, Serialize};

use super::error::ProgramError;

/// Denominator of the program's service-fee rate (rate is expressed in 1/10000).
pub const FEE_RATE_DENOMINATOR: u64 = 10_000;

/// Denominator of the SOL/token exchange rate passed to `usdt_pay`.
pub const EXCHANGE_RATE_DENOMINATOR: u64 = 10_000;

/// Decimals of the stable-coin mint accepted by `usdt_pay`.
pub const STABLE_TOKEN_DECIMALS: u32 = 6;

/// Lowest compute-unit price used when quoting a message fee.
///
/// A zero price would make the price-setting instruction a no-op and the quoted
/// fee would not reflect any prioritization component.
pub const MIN_COMPUTE_UNIT_PRICE_MICRO_LAMPORTS: u64 = 1;

/// Lamports the cluster charges per transaction signature.
pub const LAMPORTS_PER_SIGNATURE: u64 = 5_000;

/// Compute units granted per instruction when no limit is requested.
pub const DEFAULT_INSTRUCTION_COMPUTE_UNIT_LIMIT: u32 = 200_000;

/// Highest compute-unit limit a transaction can request.
pub const MAX_COMPUTE_UNIT_LIMIT: u32 = 1_400_000;

/// Result of a network fee estimation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkFeeEstimate {
    /// Fee quoted by the cluster for the exact message
    pub fee_lamports: u64,
    /// Compute units consumed in simulation; `None` when simulation was unavailable
    pub compute_units: Option<u64>,
}

/// Combine the network fee with a signed flat surcharge.
///
/// The result never goes below zero and saturates at `u64::MAX`.
#[must_use]
pub fn compute_base_fee(network_fee_lamports: u64, surcharge_lamports: i64) -> u64 {
    let total = i128::from(network_fee_lamports) + i128::from(surcharge_lamports);
    total.clamp(0, i128::from(u64::MAX)) as u64
}

/// Service fee the program adds on top of the base fee.
pub fn service_fee(base_fee: u64, service_fee_rate: u64) -> Result<u64, ProgramError> {
    base_fee
        .checked_mul(service_fee_rate)
        .map(|v| v / FEE_RATE_DENOMINATOR)
        .ok_or(ProgramError::Overflow("service fee"))
}

/// Preview of what a `sol_pay` call will charge the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub base_fee: u64,
    pub service_fee: u64,
    pub total_fee: u64,
}

impl FeeQuote {
    pub fn new(base_fee: u64, service_fee_rate: u64) -> Result<Self, ProgramError> {
        let service_fee = service_fee(base_fee, service_fee_rate)?;
        let total_fee = base_fee
            .checked_add(service_fee)
            .ok_or(ProgramError::Overflow("total fee"))?;
        Ok(Self {
            base_fee,
            service_fee,
            total_fee,
        })
    }

    /// Amount in stable-token base units that `usdt_pay` charges for this quote.
    ///
    /// Integer division happens before scaling to token decimals, matching the program.
    pub fn token_amount(&self, sol_token_rate: u64) -> Result<u64, ProgramError> {
        self.total_fee
            .checked_mul(sol_token_rate)
            .map(|v| v / EXCHANGE_RATE_DENOMINATOR)
            .and_then(|v| v.checked_mul(10u64.pow(STABLE_TOKEN_DECIMALS)))
            .ok_or(ProgramError::Overflow("token fee"))
    }
}

/// Compute-unit limit with a percentage margin over a simulated value, rounded up.
#[must_use]
pub fn compute_unit_limit_with_margin(units: u64, margin_percent: u32) -> u32 {
    let scaled = u128::from(units) * (100 + u128::from(margin_percent));
    let limit = scaled.div_ceil(100);
    u32::try_from(limit).unwrap_or(u32::MAX)
}

/// Prioritization fee in lamports for `limit` units at `price_micro_lamports`, rounded up.
#[must_use]
pub fn prioritization_fee(limit: u32, price_micro_lamports: u64) -> u64 {
    let micro_lamports = u128::from(limit) * u128::from(price_micro_lamports);
    u64::try_from(micro_lamports.div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

/// Compute-unit limit the runtime applies to `instruction_count` instructions
/// when the transaction does not set one.
#[must_use]
pub fn default_compute_unit_limit(instruction_count: usize) -> u32 {
    u32::try_from(instruction_count)
        .unwrap_or(u32::MAX)
        .saturating_mul(DEFAULT_INSTRUCTION_COMPUTE_UNIT_LIMIT)
        .min(MAX_COMPUTE_UNIT_LIMIT)
}
