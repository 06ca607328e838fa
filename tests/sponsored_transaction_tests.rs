//! Integration tests for fee estimation and sponsored transaction assembly.

use std::sync::Arc;

use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use solana_system_interface::instruction as system_instruction;

use solana_paymaster_client::app::{PaymasterService, SponsorCosigner};
use solana_paymaster_client::domain::{
    AppError, ComputeBudgetPolicy, PaymasterRpc, SponsoredTransaction, compute_base_fee,
};
use solana_paymaster_client::infra::blockchain::RecentPrioritizationFeesStrategy;
use solana_paymaster_client::infra::find_config_address;
use solana_paymaster_client::infra::program::{PAYMASTER_PROGRAM_ID, SolPayArgs};
use solana_paymaster_client::test_utils::{MockConfig, MockPaymasterRpc, SimulationBehavior};

fn create_service(rpc: MockPaymasterRpc) -> (PaymasterService, Arc<MockPaymasterRpc>) {
    let rpc = Arc::new(rpc);
    let service = PaymasterService::new(rpc.clone() as Arc<dyn PaymasterRpc>, PAYMASTER_PROGRAM_ID);
    (service, rpc)
}

fn transfers(from: &Pubkey, count: usize) -> Vec<Instruction> {
    (0..count)
        .map(|i| system_instruction::transfer(from, &Pubkey::new_unique(), 1 + i as u64))
        .collect()
}

async fn build(
    service: &PaymasterService,
    user: &Keypair,
    sponsor: &Keypair,
    business: &[Instruction],
    surcharge: i64,
) -> SponsoredTransaction {
    service
        .build_sponsored_tx_with_network_fee(user, sponsor, business, &Pubkey::new_unique(), surcharge)
        .await
        .unwrap()
}

// ============================================================================
// BASE FEE
// ============================================================================

#[test]
fn test_base_fee_with_non_negative_surcharge() {
    for fee in [0u64, 5_000, 10_000, u64::MAX - 1] {
        for surcharge in [0i64, 1, 1_000, i64::MAX] {
            let base = compute_base_fee(fee, surcharge);
            assert!(base >= fee);
            if let Some(expected) = fee.checked_add(surcharge as u64) {
                assert_eq!(base, expected);
            } else {
                assert_eq!(base, u64::MAX);
            }
        }
    }
}

#[test]
fn test_base_fee_clamps_negative_to_zero() {
    assert_eq!(compute_base_fee(5_000, -5_001), 0);
    assert_eq!(compute_base_fee(0, -1), 0);
    assert_eq!(compute_base_fee(5_000, i64::MIN), 0);
    assert_eq!(compute_base_fee(5_000, -1_000), 4_000);
}

#[tokio::test]
async fn test_base_fee_follows_estimate_and_surcharge() {
    let (service, _) = create_service(MockPaymasterRpc::new().with_fee(7_500));
    let user = Keypair::new();
    let sponsor = Keypair::new();

    let sponsored = build(&service, &user, &sponsor, &[], 2_500).await;
    assert_eq!(sponsored.estimate.fee_lamports, 7_500);
    assert_eq!(sponsored.base_fee, 10_000);

    let sponsored = build(&service, &user, &sponsor, &[], -10_000).await;
    assert_eq!(sponsored.base_fee, 0);
}

// ============================================================================
// PDA
// ============================================================================

#[test]
fn test_config_address_is_stable() {
    let first = find_config_address(&PAYMASTER_PROGRAM_ID);
    for _ in 0..5 {
        assert_eq!(find_config_address(&PAYMASTER_PROGRAM_ID), first);
    }
    let (service, _) = create_service(MockPaymasterRpc::new());
    assert_eq!(service.config_address(), first.0);
}

// ============================================================================
// ASSEMBLY
// ============================================================================

#[tokio::test]
async fn test_pay_instruction_is_last() {
    let (service, _) = create_service(MockPaymasterRpc::new());
    let user = Keypair::new();
    let sponsor = Keypair::new();

    for count in [0usize, 1, 4] {
        let business = transfers(&user.pubkey(), count);
        let sponsored = build(&service, &user, &sponsor, &business, 0).await;

        let programs = sponsored.instruction_programs();
        assert_eq!(programs.len(), count + 1);
        assert_eq!(programs.last(), Some(&PAYMASTER_PROGRAM_ID));
        assert!(
            programs[..count]
                .iter()
                .all(|p| *p == solana_system_interface::program::ID)
        );

        let pay = sponsored.transaction.message.instructions.last().unwrap();
        assert!(SolPayArgs::parse(&pay.data).is_some());
    }
}

#[tokio::test]
async fn test_fee_payer_is_sponsor() {
    let (service, _) = create_service(MockPaymasterRpc::new());
    let user = Keypair::new();
    let sponsor = Keypair::new();
    let business = transfers(&user.pubkey(), 2);

    let sponsored = build(&service, &user, &sponsor, &business, 0).await;

    assert_eq!(sponsored.fee_payer(), Some(&sponsor.pubkey()));
    assert_ne!(sponsored.fee_payer(), Some(&user.pubkey()));
    assert!(sponsored.is_fully_signed());

    let message = &sponsored.transaction.message;
    assert_eq!(message.header.num_required_signatures, 2);
    assert_eq!(message.account_keys[1], user.pubkey());
    assert!(sponsored.transaction.verify().is_ok());
}

#[tokio::test]
async fn test_pay_instruction_targets_sponsor() {
    let (service, _) = create_service(MockPaymasterRpc::new());
    let user = Keypair::new();
    let sponsor = Keypair::new();

    let sponsored = build(&service, &user, &sponsor, &[], 0).await;
    let message = &sponsored.transaction.message;
    let pay = message.instructions.last().unwrap();
    let key = |i: usize| message.account_keys[usize::from(pay.accounts[i])];

    assert_eq!(key(0), find_config_address(&PAYMASTER_PROGRAM_ID).0);
    assert_eq!(key(1), user.pubkey());
    assert_eq!(key(2), sponsor.pubkey());
}

#[tokio::test]
async fn test_estimate_quotes_business_instructions_with_user_as_payer() {
    let (service, rpc) = create_service(MockPaymasterRpc::new());
    let user = Keypair::new();
    let sponsor = Keypair::new();
    let business = transfers(&user.pubkey(), 2);

    build(&service, &user, &sponsor, &business, 0).await;

    let quoted = rpc.quoted_messages();
    assert_eq!(quoted.len(), 1);
    assert_eq!(quoted[0].account_keys[0], user.pubkey());
    // compute price + business, no pay instruction
    assert_eq!(quoted[0].instructions.len(), 3);
}

#[tokio::test]
async fn test_budget_policy_sizes_limit_from_simulation() {
    let (service, _) = create_service(
        MockPaymasterRpc::new().with_simulation(SimulationBehavior::Units(1_000)),
    );
    let service = service.with_budget_policy(ComputeBudgetPolicy::from_simulation(5));
    let user = Keypair::new();
    let sponsor = Keypair::new();

    let sponsored = build(&service, &user, &sponsor, &transfers(&user.pubkey(), 1), 0).await;

    let first = &sponsored.transaction.message.instructions[0];
    assert_eq!(
        first.data,
        solana_compute_budget_interface::ComputeBudgetInstruction::set_compute_unit_limit(1_100)
            .data
    );
    assert_eq!(
        sponsored.instruction_programs().last(),
        Some(&PAYMASTER_PROGRAM_ID)
    );
}

// ============================================================================
// FAILURE PROPAGATION
// ============================================================================

#[tokio::test]
async fn test_simulation_failure_is_absent_units() {
    let (service, _) = create_service(
        MockPaymasterRpc::new()
            .with_fee(5_000)
            .with_simulation(SimulationBehavior::Fail),
    );
    let estimate = service
        .estimate_network_fee_for_ixs(&Pubkey::new_unique(), &[], None)
        .await
        .unwrap();
    assert_eq!(estimate.fee_lamports, 5_000);
    assert_eq!(estimate.compute_units, None);
}

#[tokio::test]
async fn test_rpc_failure_propagates() {
    let (service, rpc) = create_service(MockPaymasterRpc::with_config(MockConfig::failure(
        "node unreachable",
    )));
    let result = service
        .build_sponsored_tx_with_network_fee(
            &Keypair::new(),
            &Keypair::new(),
            &[],
            &Pubkey::new_unique(),
            0,
        )
        .await;

    let err = result.unwrap_err();
    assert!(err.is_network());
    assert!(err.to_string().contains("node unreachable"));
    assert!(rpc.sent_transactions().is_empty());
}

#[tokio::test]
async fn test_submission_failure_propagates() {
    let (service, rpc) = create_service(MockPaymasterRpc::new());
    let user = Keypair::new();
    let sponsor = Keypair::new();
    let sponsored = build(&service, &user, &sponsor, &[], 0).await;

    rpc.set_fail_sends(true);
    let result = service.submit_and_confirm(&sponsored.transaction).await;
    assert!(matches!(result, Err(AppError::Blockchain(_))));
    assert!(rpc.confirmed_signatures().is_empty());
}

#[tokio::test]
async fn test_confirmation_failure_propagates() {
    let (service, rpc) = create_service(MockPaymasterRpc::new());
    let user = Keypair::new();
    let sponsor = Keypair::new();
    let sponsored = build(&service, &user, &sponsor, &transfers(&user.pubkey(), 1), 0).await;

    rpc.set_fail_confirmations(true);
    let err = service
        .submit_and_confirm(&sponsored.transaction)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Blockchain(_)));
    assert!(!err.is_network());
}

// ============================================================================
// PRICE STRATEGY AND HANDOFF
// ============================================================================

#[tokio::test]
async fn test_prioritization_fee_strategy_sets_quoted_price() {
    let rpc = Arc::new(MockPaymasterRpc::new().with_prioritization_fees(vec![10, 20, 30, 40]));
    let strategy = RecentPrioritizationFeesStrategy::new(rpc.clone() as Arc<dyn PaymasterRpc>, 75);
    let service = PaymasterService::new(rpc.clone() as Arc<dyn PaymasterRpc>, PAYMASTER_PROGRAM_ID)
        .with_price_strategy(Arc::new(strategy));

    service
        .estimate_network_fee_for_ixs(&Pubkey::new_unique(), &[], None)
        .await
        .unwrap();

    let quoted = rpc.quoted_messages();
    assert_eq!(
        quoted[0].instructions[0].data,
        solana_compute_budget_interface::ComputeBudgetInstruction::set_compute_unit_price(30).data
    );
}

#[tokio::test]
async fn test_prioritization_fee_strategy_falls_back_to_floor() {
    let rpc = Arc::new(MockPaymasterRpc::new());
    let strategy = RecentPrioritizationFeesStrategy::new(rpc.clone() as Arc<dyn PaymasterRpc>, 50)
        .with_floor(7);
    let service = PaymasterService::new(rpc.clone() as Arc<dyn PaymasterRpc>, PAYMASTER_PROGRAM_ID)
        .with_price_strategy(Arc::new(strategy));

    service
        .estimate_network_fee_for_ixs(&Pubkey::new_unique(), &[], None)
        .await
        .unwrap();

    assert_eq!(
        rpc.quoted_messages()[0].instructions[0].data,
        solana_compute_budget_interface::ComputeBudgetInstruction::set_compute_unit_price(7).data
    );
}

#[tokio::test]
async fn test_two_phase_handoff_matches_local_build() {
    let (service, rpc) = create_service(MockPaymasterRpc::new().with_fee(10_000));
    let user = Keypair::new();
    let sponsor = Keypair::new();
    let sponsor_pubkey = sponsor.pubkey();
    let business = transfers(&user.pubkey(), 1);

    let prepared = service
        .prepare_for_sponsor(&user, &sponsor_pubkey, &business, &Pubkey::new_unique(), 500)
        .await
        .unwrap();
    assert_eq!(prepared.base_fee, 10_500);

    let cosigner = SponsorCosigner::new(sponsor, PAYMASTER_PROGRAM_ID).with_min_base_fee(5_000);
    let cosigned = cosigner
        .cosign_base64(&prepared.to_base64().unwrap())
        .unwrap();
    assert_eq!(cosigned.base_fee, 10_500);
    assert_eq!(cosigned.transaction.message.account_keys[0], sponsor_pubkey);

    service.submit_and_confirm(&cosigned.transaction).await.unwrap();
    assert_eq!(rpc.sent_transactions().len(), 1);
}

#[tokio::test]
async fn test_cosigner_rejects_simulation_budget_it_is_not_paid_for() {
    // the policy adds limit and price instructions the fee payer pays for
    let (service, _) = create_service(
        MockPaymasterRpc::new()
            .with_fee(10_000)
            .with_simulation(SimulationBehavior::Units(1_000_000)),
    );
    let service = service.with_budget_policy(ComputeBudgetPolicy::from_simulation(100_000));
    let user = Keypair::new();
    let sponsor = Keypair::new();
    let sponsor_pubkey = sponsor.pubkey();

    let prepared = service
        .prepare_for_sponsor(
            &user,
            &sponsor_pubkey,
            &transfers(&user.pubkey(), 1),
            &Pubkey::new_unique(),
            0,
        )
        .await
        .unwrap();

    // 1.1M units at 100_000 micro-lamports is 110_000 lamports on top of the signatures
    let result = SponsorCosigner::new(sponsor, PAYMASTER_PROGRAM_ID).cosign(prepared.transaction);
    assert!(matches!(result, Err(AppError::Validation(_))));
}
