//! Multisig wallet CLI
//!
//! A command-line interface for deploying and driving a multisig wallet.

use clap::{Args, Parser, Subcommand};
use msig_client::cli::{self, AppState, ClientConfig, SignOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "msig")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Typed command layer for a multisig wallet contract", long_about = None)]
struct Cli {
    /// Data directory for ledger state
    #[arg(short, long, default_value = ".msig_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SignArgs {
    /// Private key (hex)
    #[arg(short, long)]
    key: String,

    /// Evaluate locally without submitting
    #[arg(long)]
    local: bool,

    /// Message lifetime in seconds
    #[arg(long)]
    ttl: Option<u32>,

    /// Write the message hash to this file once accepted
    #[arg(long)]
    save: Option<PathBuf>,
}

impl From<SignArgs> for SignOptions {
    fn from(args: SignArgs) -> Self {
        Self {
            key: args.key,
            local: args.local,
            ttl: args.ttl,
            save: args.save,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new key pair
    Generate,

    /// Deploy the wallet
    Deploy {
        /// Custodian public keys (x-only hex); defaults to the signing key
        #[arg(short, long)]
        owner: Vec<String>,

        /// Confirmations required to execute a transfer
        #[arg(short, long, default_value = "1")]
        confirms: u8,

        #[command(flatten)]
        sign: SignArgs,
    },

    /// Propose a transfer
    Submit {
        /// Destination address (workchain:hex)
        #[arg(long)]
        dest: String,

        /// Amount to send
        #[arg(long)]
        value: u128,

        /// Bounce if the destination does not exist
        #[arg(long)]
        bounce: bool,

        /// Send the whole wallet balance
        #[arg(long)]
        all_balance: bool,

        /// Message body to attach (hex)
        #[arg(long)]
        payload: Option<String>,

        #[command(flatten)]
        sign: SignArgs,
    },

    /// Confirm a queued transfer
    Confirm {
        /// Transaction id
        #[arg(long)]
        id: u64,

        #[command(flatten)]
        sign: SignArgs,
    },

    /// Check a custodian's bit in a confirmation mask
    IsConfirmed {
        #[arg(long)]
        mask: u32,

        #[arg(long)]
        index: u8,
    },

    /// Show wallet parameters
    Parameters,

    /// Show one queued transaction
    Transaction {
        #[arg(long)]
        id: u64,
    },

    /// List queued transactions
    Transactions,

    /// List queued transaction ids
    TransactionIds,

    /// List custodians
    Custodians,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Key generation doesn't need the ledger
    if let Commands::Generate = cli.command {
        return cli::cmd_generate();
    }

    let config = ClientConfig {
        data_dir: cli.data_dir,
        ..Default::default()
    };
    let state = AppState::new(config)?;
    let command = cli.command;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        match command {
            Commands::Generate => unreachable!(),

            Commands::Deploy {
                owner,
                confirms,
                sign,
            } => cli::cmd_deploy(&state, &owner, confirms, &sign.into()).await,

            Commands::Submit {
                dest,
                value,
                bounce,
                all_balance,
                payload,
                sign,
            } => {
                cli::cmd_submit(
                    &state,
                    &dest,
                    value,
                    bounce,
                    all_balance,
                    payload.as_deref(),
                    &sign.into(),
                )
                .await
            }

            Commands::Confirm { id, sign } => cli::cmd_confirm(&state, id, &sign.into()).await,

            Commands::IsConfirmed { mask, index } => {
                cli::cmd_is_confirmed(&state, mask, index).await
            }

            Commands::Parameters => cli::cmd_parameters(&state).await,

            Commands::Transaction { id } => cli::cmd_transaction(&state, id).await,

            Commands::Transactions => cli::cmd_transactions(&state).await,

            Commands::TransactionIds => cli::cmd_transaction_ids(&state).await,

            Commands::Custodians => cli::cmd_custodians(&state).await,
        }
    })
}
