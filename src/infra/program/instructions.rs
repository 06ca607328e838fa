//! Instruction builders for the paymaster program's entry points.
//!
//! Instruction data is the Anchor layout: an 8-byte sighash discriminator followed by
//! the Borsh-encoded arguments.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use validator::Validate;

use super::pda::find_config_address;
use super::{RENT_SYSVAR_ID, SYSTEM_PROGRAM_ID};
use crate::domain::{AppError, ProgramError, ValidationError};

/// Capacity the program allocates for the supported token list
pub const MAX_SUPPORTED_TOKENS: usize = 10;

/// First eight bytes of `sha256("<namespace>:<name>")`
#[must_use]
pub fn sighash(namespace: &str, name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// Discriminator of a global instruction handler
#[must_use]
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    sighash("global", name)
}

/// Arguments of the program's `initialize` entry point
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, BorshSerialize, BorshDeserialize,
)]
pub struct InitializeConfigParams {
    /// Service fee in 1/10000 of the base fee (100 = 1%); at most 100%
    #[validate(range(max = 10_000))]
    pub service_fee_rate: u64,
    #[validate(length(max = 10))]
    pub supported_tokens: Vec<Pubkey>,
}

impl InitializeConfigParams {
    fn check(&self) -> Result<(), AppError> {
        if self.supported_tokens.len() > MAX_SUPPORTED_TOKENS {
            return Err(ProgramError::TooManySupportedTokens {
                max: MAX_SUPPORTED_TOKENS,
                actual: self.supported_tokens.len(),
            }
            .into());
        }
        self.validate()
            .map_err(|e| AppError::Validation(ValidationError::Multiple(e.to_string())))
    }
}

/// Build the `initialize` instruction creating the config account.
///
/// The authority signs and pays for the account.
pub fn initialize(
    program_id: &Pubkey,
    authority: &Pubkey,
    params: &InitializeConfigParams,
) -> Result<Instruction, AppError> {
    params.check()?;
    let (config, _) = find_config_address(program_id);

    Ok(Instruction::new_with_borsh(
        *program_id,
        &(instruction_discriminator("initialize"), params),
        vec![
            AccountMeta::new(config, false),
            AccountMeta::new(*authority, true),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new_readonly(RENT_SYSVAR_ID, false),
        ],
    ))
}

/// Build `sol_pay`: the user transfers `base_fee` plus the service fee to `paymaster_recv`.
#[must_use]
pub fn sol_pay(
    program_id: &Pubkey,
    user: &Pubkey,
    paymaster_recv: &Pubkey,
    authority: &Pubkey,
    base_fee: u64,
) -> Instruction {
    let (config, _) = find_config_address(program_id);

    Instruction::new_with_borsh(
        *program_id,
        &(instruction_discriminator("sol_pay"), SolPayArgs { base_fee }),
        vec![
            AccountMeta::new_readonly(config, false),
            AccountMeta::new(*user, true),
            AccountMeta::new(*paymaster_recv, false),
            AccountMeta::new_readonly(*authority, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
    )
}

/// Accounts of a token-denominated fee payment
#[derive(Debug, Clone, Copy)]
pub struct TokenPayAccounts {
    pub user: Pubkey,
    pub user_token: Pubkey,
    pub paymaster_token: Pubkey,
    pub mint: Pubkey,
    pub authority: Pubkey,
}

/// Build `usdt_pay`: the fee is converted with `sol_token_rate` and paid in the stable token.
#[must_use]
pub fn usdt_pay(
    program_id: &Pubkey,
    accounts: &TokenPayAccounts,
    base_fee: u64,
    sol_token_rate: u64,
) -> Instruction {
    let (config, _) = find_config_address(program_id);

    let args = UsdtPayArgs {
        base_fee,
        sol_token_rate,
    };

    Instruction::new_with_borsh(
        *program_id,
        &(instruction_discriminator("usdt_pay"), args),
        vec![
            AccountMeta::new_readonly(config, false),
            AccountMeta::new(accounts.user_token, false),
            AccountMeta::new(accounts.paymaster_token, false),
            AccountMeta::new_readonly(accounts.mint, false),
            AccountMeta::new(accounts.user, true),
            AccountMeta::new_readonly(accounts.authority, false),
            AccountMeta::new_readonly(spl_token_interface::ID, false),
        ],
    )
}

/// Arguments of a `sol_pay` instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SolPayArgs {
    pub base_fee: u64,
}

impl SolPayArgs {
    /// Parse instruction data; `None` when it is not a `sol_pay` call
    #[must_use]
    pub fn parse(data: &[u8]) -> Option<Self> {
        let (disc, mut rest) = data.split_first_chunk::<8>()?;
        if *disc != instruction_discriminator("sol_pay") {
            return None;
        }
        Self::deserialize(&mut rest).ok()
    }
}

/// Arguments of a `usdt_pay` instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct UsdtPayArgs {
    pub base_fee: u64,
    /// Token base units per SOL, scaled by 10^6
    pub sol_token_rate: u64,
}
