//! Balance lookups used for diagnostics and integration-test assertions.

use std::collections::BTreeMap;

use solana_program_pack::Pack;
use solana_sdk::{native_token::LAMPORTS_PER_SOL, pubkey::Pubkey};
use spl_token_interface::state::Account as TokenAccount;
use tracing::info;

use crate::domain::fees::STABLE_TOKEN_DECIMALS;
use crate::domain::{AppError, PaymasterRpc, ProgramError};

/// Lamport balances of a set of accounts at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceSnapshot {
    balances: BTreeMap<Pubkey, u64>,
}

impl BalanceSnapshot {
    /// Read the balance of every account in `accounts`; any failed lookup is an error
    pub async fn capture(rpc: &dyn PaymasterRpc, accounts: &[Pubkey]) -> Result<Self, AppError> {
        let mut balances = BTreeMap::new();
        for account in accounts {
            let lamports = rpc.get_balance(account).await?;
            balances.insert(*account, lamports);
        }
        Ok(Self { balances })
    }

    #[must_use]
    pub fn get(&self, account: &Pubkey) -> Option<u64> {
        self.balances.get(account).copied()
    }

    /// Signed lamport change of `account` from `earlier` to `self`
    #[must_use]
    pub fn delta_since(&self, earlier: &Self, account: &Pubkey) -> Option<i128> {
        let now = self.get(account)?;
        let before = earlier.get(account)?;
        Some(i128::from(now) - i128::from(before))
    }
}

/// Token balances to print next to the SOL balances
#[derive(Debug, Clone, Copy)]
pub struct TokenAccounts {
    pub user: Pubkey,
    pub sponsor: Pubkey,
}

/// Log the SOL balances of `user` and `sponsor`, and optionally their token balances
pub async fn print_balances(
    rpc: &dyn PaymasterRpc,
    user: &Pubkey,
    sponsor: &Pubkey,
    tokens: Option<TokenAccounts>,
) -> Result<(), AppError> {
    let user_sol = rpc.get_balance(user).await?;
    let sponsor_sol = rpc.get_balance(sponsor).await?;
    info!(account = %user, balance = %format_sol(user_sol), "User SOL balance");
    info!(account = %sponsor, balance = %format_sol(sponsor_sol), "Sponsor SOL balance");

    if let Some(tokens) = tokens {
        let user_amount = token_account_amount(&rpc.get_account_data(&tokens.user).await?)?;
        let sponsor_amount = token_account_amount(&rpc.get_account_data(&tokens.sponsor).await?)?;
        info!(
            account = %tokens.user,
            balance = %format_token(user_amount, STABLE_TOKEN_DECIMALS),
            "User token balance"
        );
        info!(
            account = %tokens.sponsor,
            balance = %format_token(sponsor_amount, STABLE_TOKEN_DECIMALS),
            "Sponsor token balance"
        );
    }
    Ok(())
}

/// Raw `amount` of an initialized SPL token account
pub fn token_account_amount(data: &[u8]) -> Result<u64, ProgramError> {
    let account = TokenAccount::unpack(data).map_err(|e| {
        ProgramError::InvalidAccountData(format!(
            "not a token account ({} bytes): {}",
            data.len(),
            e
        ))
    })?;
    Ok(account.amount)
}

/// Lamports rendered as SOL with nine decimals
#[must_use]
pub fn format_sol(lamports: u64) -> String {
    format!(
        "{}.{:09} SOL",
        lamports / LAMPORTS_PER_SOL,
        lamports % LAMPORTS_PER_SOL
    )
}

#[must_use]
pub fn format_token(amount: u64, decimals: u32) -> String {
    let scale = 10u64.pow(decimals);
    format!(
        "{}.{:0width$}",
        amount / scale,
        amount % scale,
        width = decimals as usize
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockPaymasterRpc;
    use spl_token_interface::state::{AccountState, Mint};

    fn token_account(amount: u64) -> Vec<u8> {
        let account = TokenAccount {
            mint: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            amount,
            state: AccountState::Initialized,
            ..TokenAccount::default()
        };
        let mut data = vec![0u8; TokenAccount::LEN];
        TokenAccount::pack(account, &mut data).unwrap();
        data
    }

    #[test]
    fn test_format_sol() {
        assert_eq!(format_sol(0), "0.000000000 SOL");
        assert_eq!(format_sol(1_500_000_000), "1.500000000 SOL");
        assert_eq!(format_sol(5_000), "0.000005000 SOL");
    }

    #[test]
    fn test_format_token() {
        assert_eq!(format_token(1_234_567, 6), "1.234567");
        assert_eq!(format_token(50, 6), "0.000050");
    }

    #[test]
    fn test_token_account_amount() {
        let data = token_account(42_000_000);
        assert_eq!(data.len(), 165);
        assert_eq!(token_account_amount(&data).unwrap(), 42_000_000);
        assert!(token_account_amount(&data[..70]).is_err());
    }

    #[test]
    fn test_token_account_amount_rejects_other_accounts() {
        // mint-sized data
        assert!(matches!(
            token_account_amount(&[0u8; Mint::LEN]),
            Err(ProgramError::InvalidAccountData(_))
        ));
        // right size but never initialized
        assert!(token_account_amount(&[0u8; TokenAccount::LEN]).is_err());
        // trailing bytes are not a token account either
        let mut data = token_account(1);
        data.push(0);
        assert!(token_account_amount(&data).is_err());
    }

    #[tokio::test]
    async fn test_print_balances_reads_token_accounts() {
        let tokens = TokenAccounts {
            user: Pubkey::new_unique(),
            sponsor: Pubkey::new_unique(),
        };
        let rpc = MockPaymasterRpc::new()
            .with_account(tokens.user, token_account(1_500_000))
            .with_account(tokens.sponsor, token_account(0));
        let result =
            print_balances(&rpc, &Pubkey::new_unique(), &Pubkey::new_unique(), Some(tokens)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_snapshot_delta() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let rpc = MockPaymasterRpc::new()
            .with_balance(a, 10_000)
            .with_balance(b, 0);

        let before = BalanceSnapshot::capture(&rpc, &[a, b]).await.unwrap();
        rpc.set_balance(a, 8_999);
        rpc.set_balance(b, 1);
        let after = BalanceSnapshot::capture(&rpc, &[a, b]).await.unwrap();

        assert_eq!(after.delta_since(&before, &a), Some(-1_001));
        assert_eq!(after.delta_since(&before, &b), Some(1));
        assert_eq!(after.delta_since(&before, &Pubkey::new_unique()), None);
    }

    #[tokio::test]
    async fn test_print_balances_fails_on_lookup_error() {
        let rpc = MockPaymasterRpc::failing("unreachable");
        let result = print_balances(&rpc, &Pubkey::new_unique(), &Pubkey::new_unique(), None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_print_balances_missing_token_account() {
        let rpc = MockPaymasterRpc::new();
        let tokens = TokenAccounts {
            user: Pubkey::new_unique(),
            sponsor: Pubkey::new_unique(),
        };
        let result =
            print_balances(&rpc, &Pubkey::new_unique(), &Pubkey::new_unique(), Some(tokens)).await;
        assert!(result.is_err());
    }
}
