//! In-process ledger
//!
//! [`LocalLedger`] runs the multisig wallet contract in memory and answers
//! dispatched messages the way a node would: get-methods and dry runs are
//! evaluated on a scratch copy, external messages are checked for expiry
//! and replay, announced through the prepared hook, then executed and
//! committed.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::RwLock;

use super::contract::{ContractState, LedgerConfig};
use super::dispatcher::{CallMode, DispatchError, Dispatcher, PreparedHook, PreparedMessage};
use super::storage::{LedgerStorage, StorageError};
use crate::abi::{multisig, AbiValue, DecodedCall, EncodedMessage, Function, JsonCodec, Uint256};
use crate::crypto::custodian_key;

/// Everything the ledger persists between runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerState {
    pub contract: ContractState,
    /// Hashes of accepted external messages, with their expiry
    pub processed: HashMap<String, u32>,
}

pub struct LocalLedger {
    config: LedgerConfig,
    codec: JsonCodec,
    functions: Vec<Function>,
    state: RwLock<LedgerState>,
    storage: Option<LedgerStorage>,
    /// Fixed ledger time in unix seconds, 0 for the system clock
    time_override: AtomicU32,
}

impl LocalLedger {
    /// Create an empty, memory-only ledger
    pub fn new(config: LedgerConfig) -> Self {
        Self::with_state(config, LedgerState::default(), None)
    }

    /// Open a ledger backed by `storage`, loading any saved state
    pub fn open(config: LedgerConfig, storage: LedgerStorage) -> Result<Self, StorageError> {
        let state = if storage.exists() {
            storage.load()?
        } else {
            LedgerState::default()
        };
        Ok(Self::with_state(config, state, Some(storage)))
    }

    fn with_state(config: LedgerConfig, state: LedgerState, storage: Option<LedgerStorage>) -> Self {
        Self {
            config,
            codec: JsonCodec,
            functions: multisig::functions(),
            state: RwLock::new(state),
            storage,
            time_override: AtomicU32::new(0),
        }
    }

    /// Pin the ledger clock to `unix_secs`
    pub fn set_time(&self, unix_secs: u32) {
        self.time_override.store(unix_secs, Ordering::SeqCst);
    }

    /// Current ledger time in unix seconds
    pub fn now(&self) -> u32 {
        match self.time_override.load(Ordering::SeqCst) {
            0 => u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX),
            pinned => pinned,
        }
    }

    /// Copy of the committed contract state
    pub async fn snapshot(&self) -> ContractState {
        self.state.read().await.contract.clone()
    }

    /// Check the signature of a signed call and return the signer's
    /// custodian key
    fn authenticate(
        &self,
        message: &EncodedMessage,
        call: &DecodedCall,
    ) -> Result<Option<Uint256>, DispatchError> {
        if !call.function.signed {
            return Ok(None);
        }

        let signature = message
            .signature
            .as_ref()
            .ok_or_else(|| DispatchError::Rejected("missing signature".to_string()))?;
        let valid = signature
            .verify(&message.body)
            .map_err(|e| DispatchError::Rejected(e.to_string()))?;
        if !valid {
            return Err(DispatchError::Rejected("invalid signature".to_string()));
        }

        let public_key = signature
            .signer_key()
            .map_err(|e| DispatchError::Rejected(e.to_string()))?;
        Ok(Some(custodian_key(&public_key)))
    }

    fn run(
        &self,
        contract: &mut ContractState,
        call: DecodedCall,
        sender: Option<Uint256>,
        now: u32,
    ) -> Result<Vec<AbiValue>, DispatchError> {
        let name = call.function.name;
        contract
            .execute(&self.config, &name, call.args, sender, now)
            .map_err(|err| {
                log::warn!("{} failed with exit code {}: {}", name, err.code(), err);
                DispatchError::from(err)
            })
    }
}

#[async_trait]
impl Dispatcher for LocalLedger {
    async fn dispatch(
        &self,
        message: &EncodedMessage,
        mode: CallMode,
        on_prepared: Option<PreparedHook<'_>>,
    ) -> Result<Vec<AbiValue>, DispatchError> {
        let call = self
            .codec
            .decode_call(&self.functions, &message.body)
            .map_err(|e| DispatchError::Rejected(e.to_string()))?;

        let signed_mode = !matches!(mode, CallMode::GetMethod);
        if call.function.signed != signed_mode {
            return Err(DispatchError::Rejected(format!(
                "{} cannot be run as {:?}",
                call.function.name, mode
            )));
        }

        let sender = self.authenticate(message, &call)?;
        let now = self.now();

        if mode.is_local() {
            let mut scratch = self.state.read().await.contract.clone();
            log::debug!("Evaluating {} locally ({:?})", call.function.name, mode);
            return self.run(&mut scratch, call, sender, now);
        }

        let expire_at = message.expires_at();
        if expire_at < now {
            return Err(DispatchError::Expired { expire_at, now });
        }

        let message_hash = message.hash();
        if self.state.read().await.processed.contains_key(&message_hash) {
            return Err(DispatchError::Duplicate(message_hash));
        }

        // No state lock is held while the hook runs
        if let Some(hook) = on_prepared {
            let prepared = PreparedMessage {
                message_hash: message_hash.clone(),
                expire_at,
            };
            hook(&prepared).map_err(DispatchError::Aborted)?;
        }

        let mut state = self.state.write().await;
        // A concurrent copy of the message may have committed meanwhile
        if state.processed.contains_key(&message_hash) {
            return Err(DispatchError::Duplicate(message_hash));
        }

        let name = call.function.name.clone();
        let mut next = state.clone();
        let output = self.run(&mut next.contract, call, sender, now)?;
        next.processed.retain(|_, expire| *expire >= now);
        next.processed.insert(message_hash.clone(), expire_at);

        if let Some(storage) = &self.storage {
            storage
                .save(&next)
                .map_err(|e| DispatchError::Aborted(Box::new(e)))?;
        }
        *state = next;

        log::info!("Message {} ({}) committed", message_hash, name);
        Ok(output)
    }
}
