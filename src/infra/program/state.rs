//! Client-side view of the program's config account.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

use super::instructions::sighash;
use crate::domain::{FeeQuote, ProgramError};

/// Decoded `PaymasterConfig` account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, BorshSerialize, BorshDeserialize)]
pub struct PaymasterConfigAccount {
    pub authority: Pubkey,
    pub service_fee_rate: u64,
    pub supported_tokens: Vec<Pubkey>,
    pub bump: u8,
}

impl PaymasterConfigAccount {
    /// Anchor account discriminator
    #[must_use]
    pub fn discriminator() -> [u8; 8] {
        sighash("account", "PaymasterConfig")
    }

    /// Decode raw account data. Trailing bytes (unused capacity) are ignored.
    pub fn try_from_account_data(data: &[u8]) -> Result<Self, ProgramError> {
        let (disc, mut body) = data.split_first_chunk::<8>().ok_or_else(|| {
            ProgramError::InvalidAccountData(format!(
                "account data is {} bytes, shorter than the discriminator",
                data.len()
            ))
        })?;
        if *disc != Self::discriminator() {
            return Err(ProgramError::InvalidDiscriminator);
        }
        BorshDeserialize::deserialize(&mut body)
            .map_err(|e| ProgramError::InvalidAccountData(format!("Failed to decode config: {}", e)))
    }

    /// Whether `usdt_pay` accepts this mint
    #[must_use]
    pub fn supports_token(&self, mint: &Pubkey) -> bool {
        self.supported_tokens.contains(mint)
    }

    /// Charge the program will apply for `base_fee`
    pub fn quote(&self, base_fee: u64) -> Result<FeeQuote, ProgramError> {
        FeeQuote::new(base_fee, self.service_fee_rate)
    }

    /// Encode in the on-chain layout; used to seed test accounts
    pub fn to_account_data(&self) -> Result<Vec<u8>, ProgramError> {
        let mut data = Self::discriminator().to_vec();
        BorshSerialize::serialize(self, &mut data)
            .map_err(|e| ProgramError::InvalidAccountData(format!("Failed to encode config: {}", e)))?;
        Ok(data)
    }
}
