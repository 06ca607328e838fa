//! Paymaster client demo: sends a sponsored SOL transfer configured from the environment.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use solana_sdk::{pubkey::Pubkey, signature::Signer};
use solana_system_interface::instruction as system_instruction;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use solana_paymaster_client::app::handoff::encode_transaction;
use solana_paymaster_client::app::{ClientConfig, PaymasterService, format_sol, print_balances};
use solana_paymaster_client::domain::PaymasterRpc;
use solana_paymaster_client::infra::blockchain::FixedPriceStrategy;
use solana_paymaster_client::infra::{RpcPaymasterClient, find_config_address};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Fee-sponsored transactions against the Solana paymaster program",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Transfer options when no command is given
    #[command(flatten)]
    transfer: TransferArgs,
}

impl Cli {
    fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Transfer(self.transfer))
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the config account address and its bump
    ConfigAddress,
    /// Fetch and print the program's config account
    ShowConfig,
    /// Send a sponsored SOL transfer (the default)
    Transfer(TransferArgs),
}

#[derive(Args, Debug, Clone, Copy)]
struct TransferArgs {
    /// Recipient of the transfer; a fresh address when omitted
    #[arg(long)]
    to: Option<Pubkey>,

    /// Lamports to transfer
    #[arg(long, default_value_t = 1)]
    lamports: u64,

    /// Print the signed transaction instead of submitting it
    #[arg(long)]
    dry_run: bool,
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,solana_rpc_client=warn"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_service(config: &ClientConfig) -> (Arc<dyn PaymasterRpc>, PaymasterService) {
    let rpc: Arc<dyn PaymasterRpc> = Arc::new(RpcPaymasterClient::new(
        &config.rpc_url,
        config.rpc_client_config(),
    ));
    let service = PaymasterService::new(Arc::clone(&rpc), config.program_id).with_price_strategy(
        Arc::new(FixedPriceStrategy::with_price(
            config.compute_unit_price_micro_lamports.unwrap_or_default(),
        )),
    );
    (rpc, service)
}

#[tokio::main]
async fn main() -> Result<()> {
    let command = Cli::parse().into_command();

    dotenv().ok();
    let config = ClientConfig::from_env().context("Failed to load configuration")?;
    init_tracing(config.json_logs);

    info!("Solana paymaster client v{}", env!("CARGO_PKG_VERSION"));

    let TransferArgs {
        to,
        lamports,
        dry_run,
    } = match command {
        Command::ConfigAddress => {
            let (address, bump) = find_config_address(&config.program_id);
            println!("{} (bump {})", address, bump);
            return Ok(());
        }
        Command::ShowConfig => {
            let service = build_service(&config).1;
            let account = service.fetch_config().await?;
            println!("{}", serde_json::to_string_pretty(&account)?);
            return Ok(());
        }
        Command::Transfer(args) => args,
    };

    let (rpc, service) = build_service(&config);
    let user = config.user_keypair()?;
    let sponsor = config.sponsor_keypair()?;
    let authority = config.authority.unwrap_or_else(|| sponsor.pubkey());
    let recipient = to.unwrap_or_else(Pubkey::new_unique);

    info!(
        rpc_url = %config.rpc_url,
        program_id = %config.program_id,
        user = %user.pubkey(),
        sponsor = %sponsor.pubkey(),
        recipient = %recipient,
        lamports,
        "Building sponsored transfer"
    );

    if user.pubkey() == sponsor.pubkey() {
        warn!("User and sponsor are the same account");
    }

    print_balances(rpc.as_ref(), &user.pubkey(), &sponsor.pubkey(), None).await?;

    let transfer = system_instruction::transfer(&user.pubkey(), &recipient, lamports);
    let sponsored = service
        .build_sponsored_tx_with_network_fee(
            &user,
            &sponsor,
            &[transfer],
            &authority,
            config.extra_service_fee_lamports,
        )
        .await?;

    info!(
        network_fee = %format_sol(sponsored.estimate.fee_lamports),
        base_fee = %format_sol(sponsored.base_fee),
        "Sponsored transaction ready"
    );

    if dry_run {
        println!("{}", encode_transaction(&sponsored.transaction)?);
        return Ok(());
    }

    let signature = service.submit_and_confirm(&sponsored.transaction).await?;
    println!("{}", signature);

    print_balances(rpc.as_ref(), &user.pubkey(), &sponsor.pubkey(), None).await?;
    Ok(())
}
