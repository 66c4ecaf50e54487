use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod keypair;
mod launch;
mod ledger;
mod storage;
#[cfg(test)]
mod testing;
mod token;
mod token_metadata;
mod utils;

use config::{Cluster, Config};
use keypair::{initialize_keypair, KeypairSource};
use launch::{launch_token, LaunchParams};
use ledger::Ledger;
use storage::BundlrStorage;
use token_metadata::TokenDetails;
use utils::Explorer;

#[derive(Parser, Debug)]
#[command(name = "token-launcher")]
#[command(about = "Create a token with Metaplex metadata and Arweave-hosted assets")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cluster to run against
    #[arg(long, value_enum)]
    cluster: Option<Cluster>,

    /// RPC URL, overrides the cluster's public endpoint
    #[arg(short, long)]
    url: Option<String>,

    /// Keypair file; defaults to PRIVATE_KEY from the environment or .env
    #[arg(short, long)]
    keypair: Option<PathBuf>,

    /// Do not request an airdrop when the balance is below 1 SOL
    #[arg(long)]
    skip_airdrop: bool,

    /// Create mints under the Token-2022 program
    #[arg(long)]
    token_2022: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Debug, Default, Clone)]
struct DetailsArgs {
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    symbol: Option<String>,

    #[arg(long)]
    description: Option<String>,

    /// Image uploaded alongside the metadata document
    #[arg(long)]
    image: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the mint, its metadata and the initial supply in one transaction
    Launch {
        #[command(flatten)]
        details: DetailsArgs,

        #[arg(long)]
        decimals: Option<u8>,

        /// Whole tokens to mint to the creator
        #[arg(long)]
        amount: Option<u64>,
    },
    /// Attach a metadata account to an existing mint
    CreateMetadata {
        #[arg(long)]
        mint: Pubkey,

        #[command(flatten)]
        details: DetailsArgs,
    },
    /// Replace the metadata of an existing mint
    UpdateMetadata {
        #[arg(long)]
        mint: Pubkey,

        #[command(flatten)]
        details: DetailsArgs,
    },
    /// Create a bare mint
    CreateMint {
        #[arg(long)]
        decimals: Option<u8>,
    },
    /// Get or create an associated token account
    CreateAccount {
        #[arg(long)]
        mint: Pubkey,

        /// Defaults to the signer
        #[arg(long)]
        owner: Option<Pubkey>,
    },
    /// Mint whole tokens into an owner's associated token account
    Mint {
        #[arg(long)]
        mint: Pubkey,

        #[arg(long)]
        amount: u64,

        /// Defaults to the signer
        #[arg(long)]
        owner: Option<Pubkey>,
    },
    /// Transfer whole tokens from the signer to a recipient
    Transfer {
        #[arg(long)]
        mint: Pubkey,

        #[arg(long)]
        to: Pubkey,

        #[arg(long)]
        amount: u64,
    },
    /// Burn whole tokens from the signer's account
    Burn {
        #[arg(long)]
        mint: Pubkey,

        #[arg(long)]
        amount: u64,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("token_launcher={}", default_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

impl DetailsArgs {
    fn resolve(self, config: &Config, default_image: PathBuf) -> (TokenDetails, PathBuf) {
        let token = &config.token;
        (
            TokenDetails {
                name: self.name.unwrap_or_else(|| token.name.clone()),
                symbol: self.symbol.unwrap_or_else(|| token.symbol.clone()),
                description: self.description.unwrap_or_else(|| token.description.clone()),
            },
            self.image.unwrap_or(default_image),
        )
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(cluster) = cli.cluster {
        config.cluster = cluster;
    }
    if let Some(url) = cli.url {
        config.rpc_url = Some(url);
    }
    let explorer = Explorer::new(config.cluster);
    let token_program = if cli.token_2022 {
        spl_token_2022::ID
    } else {
        spl_token::ID
    };

    info!("RPC URL: {}", config.rpc_url());
    let client: Arc<dyn Ledger> = Arc::new(RpcClient::new_with_commitment(
        config.rpc_url(),
        CommitmentConfig::confirmed(),
    ));

    let source = match cli.keypair {
        Some(path) => KeypairSource::File(path),
        None => KeypairSource::Env {
            env_file: PathBuf::from(".env"),
        },
    };
    let user = Arc::new(initialize_keypair(client.as_ref(), &source, !cli.skip_airdrop).await?);
    println!("PublicKey: {}", user.pubkey());

    let storage = || BundlrStorage::new(config.storage.clone(), client.clone(), user.clone());

    match cli.command.unwrap_or(Command::Launch {
        details: DetailsArgs::default(),
        decimals: None,
        amount: None,
    }) {
        Command::Launch {
            details,
            decimals,
            amount,
        } => {
            let (details, image) = details.resolve(&config, config.token.image.clone());
            let params = LaunchParams {
                details,
                decimals: decimals.unwrap_or(config.token.decimals),
                amount: amount.unwrap_or(config.token.amount),
                image,
                token_program,
            };
            let report = launch_token(
                client.as_ref(),
                &storage()?,
                &user,
                &Keypair::new(),
                &params,
            )
            .await?;
            report.print(&explorer);
        }
        Command::CreateMetadata { mint, details } => {
            let (details, image) = details.resolve(&config, config.metadata.create_image.clone());
            token_metadata::create_token_metadata(
                client.as_ref(),
                &storage()?,
                &explorer,
                &mint,
                &user,
                &details,
                &image,
            )
            .await?;
        }
        Command::UpdateMetadata { mint, details } => {
            let (details, image) = details.resolve(&config, config.metadata.update_image.clone());
            token_metadata::update_token_metadata(
                client.as_ref(),
                &storage()?,
                &explorer,
                &mint,
                &user,
                &details,
                &image,
            )
            .await?;
        }
        Command::CreateMint { decimals } => {
            token::create_new_mint(
                client.as_ref(),
                &explorer,
                &user,
                &user.pubkey(),
                decimals.unwrap_or(config.token.decimals),
                &token_program,
            )
            .await?;
        }
        Command::CreateAccount { mint, owner } => {
            let owner = owner.unwrap_or_else(|| user.pubkey());
            token::create_token_account(client.as_ref(), &explorer, &user, &mint, &owner).await?;
        }
        Command::Mint {
            mint,
            amount,
            owner,
        } => {
            let owner = owner.unwrap_or_else(|| user.pubkey());
            token::mint_tokens(client.as_ref(), &explorer, &user, &mint, &owner, &user, amount)
                .await?;
        }
        Command::Transfer { mint, to, amount } => {
            token::transfer_tokens(client.as_ref(), &explorer, &user, &mint, &user, &to, amount)
                .await?;
        }
        Command::Burn { mint, amount } => {
            token::burn_tokens(client.as_ref(), &explorer, &user, &mint, &user, amount).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    finish(run(cli).await)
}

fn finish(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => {
            println!("Finished successfully");
            ExitCode::SUCCESS
        }
        Err(err) => {
            println!("{:?}", err);
            ExitCode::FAILURE
        }
    }
}
