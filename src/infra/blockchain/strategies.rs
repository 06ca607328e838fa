//! Compute-unit price strategies used when quoting a message fee.
//!
//! The estimator places a `set_compute_unit_price` instruction in front of the business
//! instructions. The price comes from one of these strategies; every strategy returns at
//! least [`MIN_COMPUTE_UNIT_PRICE_MICRO_LAMPORTS`] so the quoted fee is never artificially
//! zero on the prioritization component.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

use crate::domain::PaymasterRpc;
use crate::domain::fees::MIN_COMPUTE_UNIT_PRICE_MICRO_LAMPORTS;

/// Strategy for choosing a compute-unit price (micro-lamports per CU)
#[async_trait]
pub trait ComputeUnitPriceStrategy: Send + Sync {
    /// Price for a message carrying `instructions`
    async fn compute_unit_price(&self, instructions: &[Instruction]) -> u64;

    /// Human-readable strategy name for logging
    fn name(&self) -> &'static str;
}

// ============================================================================
// FIXED PRICE
// ============================================================================

/// Static price, floored at the minimum
pub struct FixedPriceStrategy {
    price: u64,
}

impl FixedPriceStrategy {
    /// Minimal positive price (1 micro-lamport)
    pub fn new() -> Self {
        Self::with_price(MIN_COMPUTE_UNIT_PRICE_MICRO_LAMPORTS)
    }

    pub fn with_price(price: u64) -> Self {
        Self {
            price: price.max(MIN_COMPUTE_UNIT_PRICE_MICRO_LAMPORTS),
        }
    }
}

impl Default for FixedPriceStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ComputeUnitPriceStrategy for FixedPriceStrategy {
    async fn compute_unit_price(&self, _instructions: &[Instruction]) -> u64 {
        self.price
    }

    fn name(&self) -> &'static str {
        "Fixed"
    }
}

// ============================================================================
// RECENT PRIORITIZATION FEES
// ============================================================================

/// Percentile of `getRecentPrioritizationFees` over the writable accounts of the message.
///
/// Falls back to the floor when the node does not answer or reports no fees.
pub struct RecentPrioritizationFeesStrategy {
    rpc: Arc<dyn PaymasterRpc>,
    percentile: u8,
    floor: u64,
}

impl RecentPrioritizationFeesStrategy {
    pub fn new(rpc: Arc<dyn PaymasterRpc>, percentile: u8) -> Self {
        Self {
            rpc,
            percentile: percentile.min(100),
            floor: MIN_COMPUTE_UNIT_PRICE_MICRO_LAMPORTS,
        }
    }

    #[must_use]
    pub fn with_floor(mut self, floor: u64) -> Self {
        self.floor = floor.max(MIN_COMPUTE_UNIT_PRICE_MICRO_LAMPORTS);
        self
    }
}

/// Writable accounts referenced by `instructions`, deduplicated in first-seen order
#[must_use]
pub fn writable_accounts(instructions: &[Instruction]) -> Vec<Pubkey> {
    let mut accounts: Vec<Pubkey> = Vec::new();
    for meta in instructions.iter().flat_map(|ix| ix.accounts.iter()) {
        if meta.is_writable && !accounts.contains(&meta.pubkey) {
            accounts.push(meta.pubkey);
        }
    }
    accounts
}

/// Nearest-rank percentile of `values`; `None` when empty
#[must_use]
pub fn percentile(values: &mut [u64], pct: u8) -> Option<u64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let rank = (usize::from(pct.min(100)) * values.len()).div_ceil(100);
    Some(values[rank.saturating_sub(1)])
}

#[async_trait]
impl ComputeUnitPriceStrategy for RecentPrioritizationFeesStrategy {
    async fn compute_unit_price(&self, instructions: &[Instruction]) -> u64 {
        let accounts = writable_accounts(instructions);
        match self.rpc.get_recent_prioritization_fees(&accounts).await {
            Ok(mut fees) => match percentile(&mut fees, self.percentile) {
                Some(fee) => {
                    let price = fee.max(self.floor);
                    info!(
                        price = %price,
                        percentile = self.percentile,
                        samples = fees.len(),
                        "Using recent prioritization fee (micro-lamports)"
                    );
                    price
                }
                None => {
                    debug!("No recent prioritization fees reported, using floor");
                    self.floor
                }
            },
            Err(e) => {
                debug!(error = %e, "Prioritization fee lookup failed, using floor");
                self.floor
            }
        }
    }

    fn name(&self) -> &'static str {
        "Recent prioritization fees"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::instruction::AccountMeta;

    #[tokio::test]
    async fn test_fixed_strategy_default_is_minimal_positive() {
        let strategy = FixedPriceStrategy::new();
        assert_eq!(strategy.compute_unit_price(&[]).await, 1);
        assert_eq!(strategy.name(), "Fixed");
    }

    #[tokio::test]
    async fn test_fixed_strategy_floors_zero() {
        let strategy = FixedPriceStrategy::with_price(0);
        assert_eq!(strategy.compute_unit_price(&[]).await, 1);
        let strategy = FixedPriceStrategy::with_price(500);
        assert_eq!(strategy.compute_unit_price(&[]).await, 500);
    }

    #[test]
    fn test_percentile() {
        assert_eq!(percentile(&mut [], 50), None);
        assert_eq!(percentile(&mut [5], 0), Some(5));
        assert_eq!(percentile(&mut [30, 10, 20, 40], 50), Some(20));
        assert_eq!(percentile(&mut [30, 10, 20, 40], 75), Some(30));
        assert_eq!(percentile(&mut [30, 10, 20, 40], 100), Some(40));
    }

    #[test]
    fn test_writable_accounts_dedup() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let program = Pubkey::new_unique();
        let ixs = vec![
            Instruction::new_with_bytes(
                program,
                &[],
                vec![AccountMeta::new(a, true), AccountMeta::new_readonly(b, false)],
            ),
            Instruction::new_with_bytes(program, &[], vec![AccountMeta::new(a, false)]),
        ];
        assert_eq!(writable_accounts(&ixs), vec![a]);
    }
}
