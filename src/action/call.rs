//! Generic action lifecycle
//!
//! A [`Call`] pairs one operation's inputs with a one-shot [`Responder`].
//! It builds the outbound message, reacts to the ledger accepting it, and
//! turns the ledger's answer (or failure) into exactly one delivery.

use chrono::Utc;
use std::fs;
use std::io;
use std::path::PathBuf;
use tokio::sync::oneshot;

use super::error::ActionError;
use crate::abi::{AbiValue, Codec, DecodingError, EncodedMessage, Function, Header, Param};
use crate::crypto::{PrivateKey, Signer};
use crate::ledger::{CallMode, PreparedMessage};

// =============================================================================
// Result channel
// =============================================================================

/// Write-once sending half of an action's result channel
#[derive(Debug)]
pub struct Responder<T> {
    tx: oneshot::Sender<Result<T, ActionError>>,
}

/// Receiving half of an action's result channel
#[derive(Debug)]
pub struct ResultHandle<T> {
    rx: oneshot::Receiver<Result<T, ActionError>>,
}

/// Create a connected responder / handle pair
pub fn channel<T>() -> (Responder<T>, ResultHandle<T>) {
    let (tx, rx) = oneshot::channel();
    (Responder { tx }, ResultHandle { rx })
}

impl<T> Responder<T> {
    /// Deliver the outcome. Consumes the responder, so it happens at most once.
    pub fn deliver(self, outcome: Result<T, ActionError>) {
        if self.tx.send(outcome).is_err() {
            log::debug!("Result consumer went away before delivery");
        }
    }
}

impl<T> ResultHandle<T> {
    /// Wait for the outcome
    pub async fn recv(self) -> Result<T, ActionError> {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(ActionError::Abandoned),
        }
    }

    /// Take the outcome if it has already been delivered
    pub fn try_recv(&mut self) -> Option<Result<T, ActionError>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(ActionError::Abandoned)),
        }
    }
}

// =============================================================================
// Operation contract
// =============================================================================

/// One contract operation: its function, its arguments, and how to read
/// its outputs
pub trait Method: Send + Sync {
    type Output: Send + 'static;

    fn function() -> Function;

    /// Output schema handed to the codec
    fn output_type() -> Vec<Param> {
        Self::function().outputs
    }

    /// Ordered input values
    fn args(&self) -> Vec<AbiValue>;

    /// Map schema-checked output values onto the result type
    fn decode(values: Vec<AbiValue>) -> Result<Self::Output, DecodingError>;
}

/// Key and time window for a signed (mutating) call
#[derive(Debug)]
pub struct Signing {
    key: Option<PrivateKey>,
    /// Creation time in milliseconds
    pub time: u64,
    /// Last unix second at which the ledger may accept the message
    pub expire: u32,
    /// Evaluate locally instead of broadcasting
    pub force_local: bool,
    /// Where to record the outbound message hash once accepted
    pub msg_info_path: Option<PathBuf>,
}

impl Signing {
    pub fn new(key: PrivateKey, time: u64, expire: u32) -> Self {
        Self {
            key: Some(key),
            time,
            expire,
            force_local: false,
            msg_info_path: None,
        }
    }

    /// Stamp with the current time and expire `ttl` seconds from now
    pub fn with_ttl(key: PrivateKey, ttl: u32) -> Self {
        let now = Utc::now();
        let expire = u32::try_from(now.timestamp())
            .unwrap_or(u32::MAX)
            .saturating_add(ttl);
        Self::new(key, now.timestamp_millis().max(0) as u64, expire)
    }

    pub fn force_local(mut self, force_local: bool) -> Self {
        self.force_local = force_local;
        self
    }

    pub fn save_message_info(mut self, path: impl Into<PathBuf>) -> Self {
        self.msg_info_path = Some(path.into());
        self
    }
}

/// Where an action is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallState {
    Created,
    MessageBuilt,
}

// =============================================================================
// Call
// =============================================================================

/// An operation bound to its result channel
pub struct Call<M: Method> {
    method: M,
    signing: Option<Signing>,
    state: CallState,
    responder: Responder<M::Output>,
}

impl<M: Method> Call<M> {
    /// Unsigned, read-only call
    pub fn get(method: M, responder: Responder<M::Output>) -> Self {
        Self {
            method,
            signing: None,
            state: CallState::Created,
            responder,
        }
    }

    /// Signed, mutating call
    pub fn signed(method: M, signing: Signing, responder: Responder<M::Output>) -> Self {
        Self {
            method,
            signing: Some(signing),
            state: CallState::Created,
            responder,
        }
    }

    pub fn method(&self) -> &M {
        &self.method
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    /// Build the outbound message.
    ///
    /// Only the first call can succeed; the private key is released as
    /// soon as the message is signed, or as soon as building fails.
    pub fn create_message(
        &mut self,
        codec: &dyn Codec,
        signer: &dyn Signer,
    ) -> Result<EncodedMessage, ActionError> {
        if self.state != CallState::Created {
            return Err(ActionError::MessageAlreadyBuilt);
        }
        self.state = CallState::MessageBuilt;

        let function = M::function();
        let header = self.signing.as_ref().map(|s| Header {
            time: s.time,
            expire: s.expire,
        });
        let key = self.signing.as_mut().and_then(|s| s.key.take());

        let body = codec.encode(&function, header.as_ref(), self.method.args())?;

        let signature = match (&self.signing, key) {
            (Some(_), Some(key)) => Some(signer.sign(&key, &body)?),
            (Some(_), None) => return Err(ActionError::MessageAlreadyBuilt),
            (None, _) => None,
        };

        log::debug!("Built {} message ({} bytes)", function.name, body.len());
        Ok(EncodedMessage {
            function,
            header,
            body,
            signature,
        })
    }

    /// React to the ledger accepting the submitted message
    pub fn handle_prepared(&self, prepared: &PreparedMessage) -> Result<(), ActionError> {
        log::info!(
            "{} accepted, message hash {} (expires at {})",
            M::function().name,
            prepared.message_hash,
            prepared.expire_at
        );

        if let Some(path) = self.signing.as_ref().and_then(|s| s.msg_info_path.as_ref()) {
            let data = serde_json::to_string_pretty(prepared).map_err(io::Error::from)?;
            fs::write(path, data)?;
            log::debug!("Message info written to {:?}", path);
        }
        Ok(())
    }

    /// Decode the ledger's answer and deliver it.
    ///
    /// A decode failure is delivered to the consumer as well as returned.
    pub fn handle_result(self, codec: &dyn Codec, raw: Vec<AbiValue>) -> Result<(), DecodingError> {
        let decoded = codec.decode(&M::output_type(), raw).and_then(M::decode);
        match decoded {
            Ok(value) => {
                self.responder.deliver(Ok(value));
                Ok(())
            }
            Err(err) => {
                log::warn!("Failed to decode {} result: {}", M::function().name, err);
                self.responder
                    .deliver(Err(ActionError::Decoding(err.clone())));
                Err(err)
            }
        }
    }

    /// Deliver a failure
    pub fn handle_error(self, error: ActionError) {
        log::warn!("{} failed: {}", M::function().name, error);
        self.responder.deliver(Err(error));
    }

    pub fn created_at(&self) -> u64 {
        self.signing.as_ref().map(|s| s.time).unwrap_or(0)
    }

    pub fn expires_at(&self) -> u32 {
        self.signing.as_ref().map(|s| s.expire).unwrap_or(u32::MAX)
    }

    pub fn call_mode(&self) -> CallMode {
        match &self.signing {
            None => CallMode::GetMethod,
            Some(s) if s.force_local => CallMode::DryRun,
            Some(_) => CallMode::External,
        }
    }

    pub fn is_get_method(&self) -> bool {
        self.call_mode().is_local()
    }
}
