//! CLI commands for the multisig wallet
//!
//! Implements all command handlers for the `msig` binary. Each handler
//! builds one action, runs it against the local ledger and prints the
//! result as JSON.

use bytes::Bytes;
use serde::Serialize;
use std::path::PathBuf;

use crate::abi::{Address, JsonCodec, Uint256};
use crate::action::{self, channel, Action, ResultHandle, Signing, SubmitTransaction};
use crate::crypto::{KeyPair, PrivateKey, Secp256k1Signer};
use crate::ledger::{LedgerConfig, LedgerStorage, LocalLedger, StorageConfig};
use crate::multisig::{Confirmation, Custodian, Parameters, Transaction, TransactionSent};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub data_dir: PathBuf,
    pub state_file: String,
    /// Default message lifetime in seconds
    pub ttl: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".msig_data"),
            state_file: "contract.json".to_string(),
            ttl: 60,
        }
    }
}

/// Signing flags shared by the mutating commands
#[derive(Debug, Clone, Default)]
pub struct SignOptions {
    /// Hex private key
    pub key: String,
    /// Evaluate locally without submitting
    pub local: bool,
    pub ttl: Option<u32>,
    /// Where to write the message hash once accepted
    pub save: Option<PathBuf>,
}

/// Application state
pub struct AppState {
    pub config: ClientConfig,
    pub ledger: LocalLedger,
}

impl AppState {
    /// Open the ledger stored under the configured data directory
    pub fn new(config: ClientConfig) -> CliResult<Self> {
        let storage = LedgerStorage::new(StorageConfig {
            data_dir: config.data_dir.clone(),
            state_file: config.state_file.clone(),
        })?;
        let ledger = LocalLedger::open(LedgerConfig::default(), storage)?;
        Ok(Self { config, ledger })
    }

    fn signing(&self, options: &SignOptions) -> CliResult<Signing> {
        let key = PrivateKey::from_hex(&options.key)?;
        let mut signing = Signing::with_ttl(key, options.ttl.unwrap_or(self.config.ttl))
            .force_local(options.local);
        if let Some(path) = &options.save {
            signing = signing.save_message_info(path);
        }
        Ok(signing)
    }

    async fn run<T>(&self, action: Action, handle: ResultHandle<T>) -> CliResult<T> {
        action::execute(action, &JsonCodec, &Secp256k1Signer, &self.ledger).await;
        Ok(handle.recv().await?)
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct GeneratedKeys {
    private_key: String,
    public_key: String,
    custodian_key: Uint256,
}

/// Generate a new key pair
pub fn cmd_generate() -> CliResult<()> {
    let keys = KeyPair::generate();
    print_json(&GeneratedKeys {
        private_key: keys.private_key_hex(),
        public_key: keys.public_key_hex(),
        custodian_key: keys.custodian_key(),
    })
}

/// Deploy the wallet. With no owners, the signing key is the only custodian.
pub async fn cmd_deploy(
    state: &AppState,
    owners: &[String],
    req_confirms: u8,
    options: &SignOptions,
) -> CliResult<()> {
    let owners = if owners.is_empty() {
        vec![KeyPair::from_private_key_hex(&options.key)?.custodian_key()]
    } else {
        owners
            .iter()
            .map(|o| Uint256::from_hex(o))
            .collect::<Result<Vec<_>, _>>()?
    };

    let (tx, rx) = channel();
    let action = Action::constructor(owners, req_confirms, state.signing(options)?, tx);
    state.run(action, rx).await?;

    if options.local {
        println!("Dry run succeeded, nothing was deployed");
    } else {
        println!("✅ Wallet deployed");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn cmd_submit(
    state: &AppState,
    dest: &str,
    value: u128,
    bounce: bool,
    all_balance: bool,
    payload: Option<&str>,
    options: &SignOptions,
) -> CliResult<()> {
    let payload = match payload {
        Some(hex_payload) => Bytes::from(hex::decode(hex_payload)?),
        None => Bytes::new(),
    };
    let method = SubmitTransaction {
        dest: dest.parse::<Address>()?,
        value,
        bounce,
        all_balance,
        payload,
    };

    let (tx, rx) = channel::<TransactionSent>();
    let action = Action::submit_transaction(method, state.signing(options)?, tx);
    let sent = state.run(action, rx).await?;
    print_json(&sent)
}

pub async fn cmd_confirm(state: &AppState, transaction_id: u64, options: &SignOptions) -> CliResult<()> {
    let (tx, rx) = channel();
    let action = Action::confirm_transaction(transaction_id, state.signing(options)?, tx);
    state.run(action, rx).await?;

    if options.local {
        println!("Dry run of confirmation for {} succeeded", transaction_id);
    } else {
        println!("✅ Transaction {} confirmed", transaction_id);
    }
    Ok(())
}

pub async fn cmd_is_confirmed(state: &AppState, mask: u32, index: u8) -> CliResult<()> {
    let (tx, rx) = channel::<Confirmation>();
    let confirmation = state.run(Action::is_confirmed(mask, index, tx), rx).await?;
    print_json(&confirmation)
}

pub async fn cmd_parameters(state: &AppState) -> CliResult<()> {
    let (tx, rx) = channel::<Parameters>();
    let parameters = state.run(Action::get_parameters(tx), rx).await?;
    print_json(&parameters)
}

pub async fn cmd_transaction(state: &AppState, transaction_id: u64) -> CliResult<()> {
    let (tx, rx) = channel::<Transaction>();
    let transaction = state
        .run(Action::get_transaction(transaction_id, tx), rx)
        .await?;
    print_json(&transaction)
}

pub async fn cmd_transactions(state: &AppState) -> CliResult<()> {
    let (tx, rx) = channel::<Vec<Transaction>>();
    let transactions = state.run(Action::get_transactions(tx), rx).await?;
    print_json(&transactions)
}

pub async fn cmd_transaction_ids(state: &AppState) -> CliResult<()> {
    let (tx, rx) = channel::<Vec<u64>>();
    let ids = state.run(Action::get_transaction_ids(tx), rx).await?;
    print_json(&ids)
}

pub async fn cmd_custodians(state: &AppState) -> CliResult<()> {
    let (tx, rx) = channel::<Vec<Custodian>>();
    let custodians = state.run(Action::get_custodians(tx), rx).await?;
    print_json(&custodians)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(dir: &tempfile::TempDir) -> AppState {
        AppState::new(ClientConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap()
    }

    fn options(keys: &KeyPair) -> SignOptions {
        SignOptions {
            key: keys.private_key_hex(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_deploy_persists_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let keys = KeyPair::generate();

        cmd_deploy(&state(&dir), &[], 1, &options(&keys))
            .await
            .unwrap();

        let reopened = state(&dir);
        let contract = reopened.ledger.snapshot().await;
        assert_eq!(contract.custodians.len(), 1);
        assert_eq!(contract.custodians[0].pubkey, keys.custodian_key());
        assert!(cmd_custodians(&reopened).await.is_ok());
    }

    #[tokio::test]
    async fn test_local_deploy_leaves_no_wallet() {
        let dir = tempfile::tempdir().unwrap();
        let keys = KeyPair::generate();
        let opts = SignOptions {
            local: true,
            ..options(&keys)
        };

        let app = state(&dir);
        cmd_deploy(&app, &[], 1, &opts).await.unwrap();
        assert!(!app.ledger.snapshot().await.is_deployed());
        assert!(cmd_parameters(&app).await.is_err());
    }

    #[tokio::test]
    async fn test_submit_rejects_bad_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let keys = KeyPair::generate();
        let app = state(&dir);

        assert!(cmd_submit(&app, "not-an-address", 1, false, false, None, &options(&keys))
            .await
            .is_err());

        let bad_key = SignOptions {
            key: "zz".to_string(),
            ..Default::default()
        };
        assert!(cmd_confirm(&app, 1, &bad_key).await.is_err());
    }
}
