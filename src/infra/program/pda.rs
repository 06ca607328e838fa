//! Program-derived addresses of the paymaster program.

use solana_sdk::pubkey::Pubkey;

/// Seed of the config account. Must match the program byte for byte.
pub const CONFIG_SEED: &[u8] = b"paymaster_config";

/// Config account address and bump for `program_id`
#[must_use]
pub fn find_config_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CONFIG_SEED], program_id)
}
