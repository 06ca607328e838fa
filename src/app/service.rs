//! Paymaster client service: fee estimation, sponsored transaction assembly and
//! direct program calls.

use std::sync::Arc;
use tracing::{info, instrument};

use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::Message,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};

use crate::domain::{
    AppError, BlockchainError, ComputeBudgetPolicy, NetworkFeeEstimate, PaymasterRpc,
    SponsoredTransaction, compute_base_fee,
};
use crate::infra::blockchain::{ComputeUnitPriceStrategy, FixedPriceStrategy};
use crate::infra::program::{
    self, InitializeConfigParams, PaymasterConfigAccount, TokenPayAccounts, find_config_address,
};

use super::estimator;
use super::handoff::PartiallySignedTransaction;

/// Client for the paymaster program over a [`PaymasterRpc`] connection
pub struct PaymasterService {
    rpc: Arc<dyn PaymasterRpc>,
    program_id: Pubkey,
    price_strategy: Arc<dyn ComputeUnitPriceStrategy>,
    budget_policy: ComputeBudgetPolicy,
}

/// Unsigned sponsored transaction with its blockhash and fee inputs
struct Assembled {
    transaction: Transaction,
    blockhash: Hash,
    base_fee: u64,
    estimate: NetworkFeeEstimate,
}

impl PaymasterService {
    #[must_use]
    pub fn new(rpc: Arc<dyn PaymasterRpc>, program_id: Pubkey) -> Self {
        Self {
            rpc,
            program_id,
            price_strategy: Arc::new(FixedPriceStrategy::new()),
            budget_policy: ComputeBudgetPolicy::None,
        }
    }

    #[must_use]
    pub fn with_price_strategy(mut self, strategy: Arc<dyn ComputeUnitPriceStrategy>) -> Self {
        self.price_strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_budget_policy(mut self, policy: ComputeBudgetPolicy) -> Self {
        self.budget_policy = policy;
        self
    }

    #[must_use]
    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    #[must_use]
    pub fn rpc(&self) -> &Arc<dyn PaymasterRpc> {
        &self.rpc
    }

    #[must_use]
    pub fn config_address(&self) -> Pubkey {
        find_config_address(&self.program_id).0
    }

    /// Estimate the network fee of `business_instructions` with `payer` as fee payer.
    ///
    /// `price_micro_lamports` overrides the configured price strategy.
    pub async fn estimate_network_fee_for_ixs(
        &self,
        payer: &Pubkey,
        business_instructions: &[Instruction],
        price_micro_lamports: Option<u64>,
    ) -> Result<NetworkFeeEstimate, AppError> {
        let price = match price_micro_lamports {
            Some(price) => price,
            None => {
                self.price_strategy
                    .compute_unit_price(business_instructions)
                    .await
            }
        };
        estimator::estimate_network_fee_for_ixs(
            self.rpc.as_ref(),
            payer,
            business_instructions,
            price,
        )
        .await
    }

    /// Build a transaction whose network fee is paid by `sponsor`, reimbursed by `user`
    /// through the program's `sol_pay` instruction.
    ///
    /// Instruction order is `[compute budget] ++ business ++ [sol_pay]`. The returned
    /// transaction carries both signatures and is ready for submission.
    #[instrument(
        skip(self, user, sponsor, business_instructions),
        fields(user = %user.pubkey(), sponsor = %sponsor.pubkey())
    )]
    pub async fn build_sponsored_tx_with_network_fee(
        &self,
        user: &Keypair,
        sponsor: &Keypair,
        business_instructions: &[Instruction],
        authority: &Pubkey,
        extra_service_fee_lamports: i64,
    ) -> Result<SponsoredTransaction, AppError> {
        let Assembled {
            mut transaction,
            blockhash,
            base_fee,
            estimate,
        } = self
            .assemble(
                &user.pubkey(),
                &sponsor.pubkey(),
                business_instructions,
                authority,
                extra_service_fee_lamports,
            )
            .await?;

        partial_sign(&mut transaction, user, blockhash)?;
        partial_sign(&mut transaction, sponsor, blockhash)?;

        info!(base_fee, fee_lamports = estimate.fee_lamports, "Sponsored transaction signed");

        Ok(SponsoredTransaction {
            transaction,
            base_fee,
            estimate,
        })
    }

    /// Originator half of the co-signing handoff: same transaction as
    /// [`Self::build_sponsored_tx_with_network_fee`], signed by the user only.
    #[instrument(skip(self, user, business_instructions), fields(user = %user.pubkey()))]
    pub async fn prepare_for_sponsor(
        &self,
        user: &Keypair,
        sponsor: &Pubkey,
        business_instructions: &[Instruction],
        authority: &Pubkey,
        extra_service_fee_lamports: i64,
    ) -> Result<PartiallySignedTransaction, AppError> {
        let Assembled {
            mut transaction,
            blockhash,
            base_fee,
            estimate,
        } = self
            .assemble(
                &user.pubkey(),
                sponsor,
                business_instructions,
                authority,
                extra_service_fee_lamports,
            )
            .await?;

        partial_sign(&mut transaction, user, blockhash)?;

        Ok(PartiallySignedTransaction {
            transaction,
            base_fee,
            estimate,
        })
    }

    async fn assemble(
        &self,
        user: &Pubkey,
        sponsor: &Pubkey,
        business_instructions: &[Instruction],
        authority: &Pubkey,
        extra_service_fee_lamports: i64,
    ) -> Result<Assembled, AppError> {
        let estimate = self
            .estimate_network_fee_for_ixs(user, business_instructions, None)
            .await?;

        let base_fee = compute_base_fee(estimate.fee_lamports, extra_service_fee_lamports);
        info!(
            fee_lamports = estimate.fee_lamports,
            compute_units = ?estimate.compute_units,
            extra_service_fee_lamports,
            base_fee,
            "Computed base fee"
        );

        let pay_ix = program::sol_pay(&self.program_id, user, sponsor, authority, base_fee);

        let instructions: Vec<Instruction> = self
            .budget_policy
            .instructions(&estimate)
            .into_iter()
            .chain(business_instructions.iter().cloned())
            .chain(std::iter::once(pay_ix))
            .collect();

        let blockhash = self.rpc.get_latest_blockhash().await?;
        let message = Message::new_with_blockhash(&instructions, Some(sponsor), &blockhash);

        Ok(Assembled {
            transaction: Transaction::new_unsigned(message),
            blockhash,
            base_fee,
            estimate,
        })
    }

    /// Submit a signed transaction and wait for confirmation
    #[instrument(skip(self, transaction))]
    pub async fn submit_and_confirm(&self, transaction: &Transaction) -> Result<Signature, AppError> {
        let signature = self.rpc.send_transaction(transaction).await?;
        info!(signature = %signature, "Transaction submitted");
        self.rpc.confirm_transaction(&signature).await?;
        info!(signature = %signature, "Transaction confirmed");
        Ok(signature)
    }

    /// Fetch and decode the program's config account
    #[instrument(skip(self))]
    pub async fn fetch_config(&self) -> Result<PaymasterConfigAccount, AppError> {
        let data = self.rpc.get_account_data(&self.config_address()).await?;
        Ok(PaymasterConfigAccount::try_from_account_data(&data)?)
    }

    /// Create the config account. The authority pays and signs.
    #[instrument(skip(self, authority, params), fields(authority = %authority.pubkey()))]
    pub async fn initialize_config(
        &self,
        authority: &Keypair,
        params: &InitializeConfigParams,
    ) -> Result<Signature, AppError> {
        let ix = program::initialize(&self.program_id, &authority.pubkey(), params)?;
        info!(
            service_fee_rate = params.service_fee_rate,
            supported_tokens = params.supported_tokens.len(),
            config = %self.config_address(),
            "Initializing paymaster config"
        );
        self.sign_and_submit(authority, &[authority], &[ix]).await
    }

    /// User pays `base_fee` (plus service fee) to `paymaster_recv` in its own transaction
    #[instrument(skip(self, user), fields(user = %user.pubkey()))]
    pub async fn sol_pay(
        &self,
        user: &Keypair,
        base_fee: u64,
        paymaster_recv: &Pubkey,
        authority: &Pubkey,
    ) -> Result<Signature, AppError> {
        let ix = program::sol_pay(
            &self.program_id,
            &user.pubkey(),
            paymaster_recv,
            authority,
            base_fee,
        );
        self.sign_and_submit(user, &[user], &[ix]).await
    }

    /// User pays the fee in the stable token at `sol_token_rate`
    #[instrument(skip(self, user, accounts), fields(user = %user.pubkey(), mint = %accounts.mint))]
    pub async fn usdt_pay(
        &self,
        user: &Keypair,
        accounts: &TokenPayAccounts,
        base_fee: u64,
        sol_token_rate: u64,
    ) -> Result<Signature, AppError> {
        if accounts.user != user.pubkey() {
            return Err(AppError::Validation(
                crate::domain::ValidationError::InvalidField {
                    field: "user".to_string(),
                    message: "token pay accounts belong to a different user".to_string(),
                },
            ));
        }
        let ix = program::usdt_pay(&self.program_id, accounts, base_fee, sol_token_rate);
        self.sign_and_submit(user, &[user], &[ix]).await
    }

    async fn sign_and_submit(
        &self,
        payer: &Keypair,
        signers: &[&Keypair],
        instructions: &[Instruction],
    ) -> Result<Signature, AppError> {
        let blockhash = self.rpc.get_latest_blockhash().await?;
        let mut transaction = Transaction::new_with_payer(instructions, Some(&payer.pubkey()));
        transaction.try_sign(signers, blockhash).map_err(|e| {
            AppError::Blockchain(BlockchainError::InvalidSignature(format!(
                "Failed to sign transaction: {}",
                e
            )))
        })?;
        self.submit_and_confirm(&transaction).await
    }
}

pub(crate) fn partial_sign(
    transaction: &mut Transaction,
    signer: &Keypair,
    blockhash: Hash,
) -> Result<(), AppError> {
    transaction
        .try_partial_sign(&[signer], blockhash)
        .map_err(|e| {
            AppError::Blockchain(BlockchainError::InvalidSignature(format!(
                "Failed to sign with {}: {}",
                signer.pubkey(),
                e
            )))
        })
}
