//! Runs an action end to end
//!
//! Build the message, hand it to a dispatcher, and route the outcome into
//! the action's result channel. Every path ends in exactly one delivery.

use super::error::{ActionError, ErrorClass};
use super::Action;
use crate::abi::Codec;
use crate::crypto::Signer;
use crate::ledger::{BoxError, Dispatcher, PreparedHook, PreparedMessage};

/// What was delivered to the action's consumer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Result,
    Error(ErrorClass),
}

pub async fn execute(
    mut action: Action,
    codec: &dyn Codec,
    signer: &dyn Signer,
    dispatcher: &dyn Dispatcher,
) -> Delivery {
    let message = match action.create_message(codec, signer) {
        Ok(message) => message,
        Err(err) => return fail(action, err),
    };

    let mode = action.call_mode();
    log::debug!("Dispatching {} as {:?}", action.name(), mode);

    let outcome = {
        let pending = &action;
        let hook = move |prepared: &PreparedMessage| -> Result<(), BoxError> {
            pending
                .handle_prepared(prepared)
                .map_err(|err| Box::new(err) as BoxError)
        };
        let on_prepared: Option<PreparedHook<'_>> = if mode.is_local() {
            None
        } else {
            Some(&hook)
        };
        dispatcher.dispatch(&message, mode, on_prepared).await
    };

    match outcome {
        Ok(raw) => match action.handle_result(codec, raw) {
            Ok(()) => Delivery::Result,
            Err(_) => Delivery::Error(ErrorClass::Interpret),
        },
        Err(err) => fail(action, err.into()),
    }
}

fn fail(action: Action, error: ActionError) -> Delivery {
    let class = error.class();
    action.handle_error(error);
    Delivery::Error(class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{Address, JsonCodec, Uint256};
    use crate::action::{channel, Signing, SubmitTransaction};
    use crate::crypto::{KeyPair, Secp256k1Signer};
    use crate::abi::{AbiValue, EncodedMessage};
    use crate::ledger::{CallMode, DispatchError, LedgerConfig, LocalLedger};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicBool, Ordering};

    const NOW: u32 = 1_700_000_000;

    fn ledger() -> LocalLedger {
        let ledger = LocalLedger::new(LedgerConfig::default());
        ledger.set_time(NOW);
        ledger
    }

    fn signing(keys: &KeyPair) -> Signing {
        Signing::new(keys.private_key(), u64::from(NOW) * 1000, NOW + 60)
    }

    fn transfer(value: u128) -> SubmitTransaction {
        SubmitTransaction {
            dest: Address::new(0, Uint256::from_u128(0xdead)),
            value,
            bounce: false,
            all_balance: false,
            payload: Bytes::new(),
        }
    }

    async fn run(ledger: &LocalLedger, action: Action) -> Delivery {
        execute(action, &JsonCodec, &Secp256k1Signer, ledger).await
    }

    async fn deploy(ledger: &LocalLedger, owners: &[&KeyPair], required: u8) {
        let (tx, rx) = channel();
        let keys = owners.iter().map(|k| k.custodian_key()).collect();
        let action = Action::constructor(keys, required, signing(owners[0]), tx);
        assert_eq!(run(ledger, action).await, Delivery::Result);
        rx.recv().await.unwrap();
    }

    #[tokio::test]
    async fn test_deploy_submit_confirm_flow() {
        let ledger = ledger();
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        deploy(&ledger, &[&alice, &bob], 2).await;

        let (tx, rx) = channel();
        let submit = Action::submit_transaction(transfer(2_000_000), signing(&alice), tx);
        assert_eq!(run(&ledger, submit).await, Delivery::Result);
        let id = rx.recv().await.unwrap().transaction_id;

        let (tx, rx) = channel();
        run(&ledger, Action::get_transaction(id, tx)).await;
        let pending = rx.recv().await.unwrap();
        assert_eq!(pending.signs_received, 1);
        assert_eq!(pending.creator, alice.custodian_key());

        let (tx, rx) = channel();
        let confirm = Action::confirm_transaction(id, signing(&bob), tx);
        assert_eq!(run(&ledger, confirm).await, Delivery::Result);
        rx.recv().await.unwrap();

        let (tx, rx) = channel();
        run(&ledger, Action::get_transactions(tx)).await;
        assert!(rx.recv().await.unwrap().is_empty());
        assert_eq!(ledger.snapshot().await.transfers.len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_submit_returns_id_without_commit() {
        let ledger = ledger();
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        deploy(&ledger, &[&alice, &bob], 2).await;

        let dir = tempfile::tempdir().unwrap();
        let info = dir.path().join("msg.json");
        let signing = signing(&alice)
            .force_local(true)
            .save_message_info(&info);

        let (tx, rx) = channel();
        let action = Action::submit_transaction(transfer(2_000_000), signing, tx);
        assert_eq!(action.call_mode(), CallMode::DryRun);
        assert_eq!(run(&ledger, action).await, Delivery::Result);

        let sent = rx.recv().await.unwrap();
        assert_eq!(sent.transaction_id >> 32, u64::from(NOW));
        assert!(!info.exists());
        assert!(ledger.snapshot().await.transactions.is_empty());
    }

    #[tokio::test]
    async fn test_external_submit_writes_message_info() {
        let ledger = ledger();
        let alice = KeyPair::generate();
        deploy(&ledger, &[&alice], 1).await;

        let dir = tempfile::tempdir().unwrap();
        let info = dir.path().join("msg.json");

        let (tx, rx) = channel();
        let action = Action::submit_transaction(
            transfer(2_000_000),
            signing(&alice).save_message_info(&info),
            tx,
        );
        assert_eq!(run(&ledger, action).await, Delivery::Result);
        assert_eq!(rx.recv().await.unwrap().transaction_id, 0);

        let written: PreparedMessage =
            serde_json::from_str(&std::fs::read_to_string(&info).unwrap()).unwrap();
        assert_eq!(written.expire_at, NOW + 60);
        assert_eq!(written.message_hash.len(), 64);
    }

    #[tokio::test]
    async fn test_expired_submit_is_classified() {
        let ledger = ledger();
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        deploy(&ledger, &[&alice, &bob], 2).await;

        ledger.set_time(NOW + 120);
        let (tx, rx) = channel();
        let action = Action::submit_transaction(transfer(2_000_000), signing(&alice), tx);
        assert_eq!(
            run(&ledger, action).await,
            Delivery::Error(ErrorClass::Ledger)
        );
        assert!(rx.recv().await.unwrap_err().is_expired());
    }

    #[tokio::test]
    async fn test_build_failure_never_dispatches() {
        let ledger = ledger();
        let (tx, rx) = channel();
        let bad_key = crate::crypto::PrivateKey::from_bytes([0u8; 32]);
        let action = Action::confirm_transaction(1, Signing::new(bad_key, 0, NOW + 60), tx);

        assert_eq!(run(&ledger, action).await, Delivery::Error(ErrorClass::Build));
        assert!(matches!(
            rx.recv().await,
            Err(ActionError::Signing(_))
        ));
    }

    #[tokio::test]
    async fn test_contract_failure_is_ledger_error() {
        let ledger = ledger();
        let alice = KeyPair::generate();
        deploy(&ledger, &[&alice], 1).await;

        let (tx, rx) = channel();
        run(&ledger, Action::get_transaction(77, tx)).await;
        match rx.recv().await {
            Err(ActionError::Dispatch(err)) => assert_eq!(err.exit_code(), Some(102)),
            other => panic!("unexpected outcome: {:?}", other.map(|t| t.id)),
        }
    }

    #[tokio::test]
    async fn test_is_confirmed_answers() {
        let ledger = ledger();
        let alice = KeyPair::generate();
        deploy(&ledger, &[&alice], 1).await;

        let (tx, rx) = channel();
        run(&ledger, Action::is_confirmed(0b0101, 0, tx)).await;
        assert!(rx.recv().await.unwrap().confirmed);

        let (tx, rx) = channel();
        run(&ledger, Action::is_confirmed(0b0101, 1, tx)).await;
        assert!(!rx.recv().await.unwrap().confirmed);
    }

    #[tokio::test]
    async fn test_custodians_and_parameters() {
        let ledger = ledger();
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        deploy(&ledger, &[&alice, &bob], 2).await;

        let (tx, rx) = channel();
        run(&ledger, Action::get_custodians(tx)).await;
        let custodians = rx.recv().await.unwrap();
        assert_eq!(custodians.len(), 2);
        assert_eq!(custodians[0].pubkey, alice.custodian_key());
        assert_eq!(custodians[1].index, 1);

        let (tx, rx) = channel();
        run(&ledger, Action::get_parameters(tx)).await;
        let params = rx.recv().await.unwrap();
        assert_eq!(params.required_txn_confirms, 2);
        assert_eq!(params.min_value, 1_000_000);

        let (tx, rx) = channel();
        run(&ledger, Action::get_transaction_ids(tx)).await;
        assert!(rx.recv().await.unwrap().is_empty());
    }

    /// Dispatcher whose node is down
    #[derive(Default)]
    struct Offline {
        prepared: AtomicBool,
    }

    #[async_trait]
    impl Dispatcher for Offline {
        async fn dispatch(
            &self,
            _message: &EncodedMessage,
            _mode: CallMode,
            on_prepared: Option<PreparedHook<'_>>,
        ) -> Result<Vec<AbiValue>, DispatchError> {
            self.prepared.store(on_prepared.is_some(), Ordering::SeqCst);
            Err(DispatchError::Transport("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_transport_failure_reaches_consumer() {
        let offline = Offline::default();
        let alice = KeyPair::generate();

        let (tx, rx) = channel();
        let action = Action::confirm_transaction(1, signing(&alice), tx);
        let delivery = execute(action, &JsonCodec, &Secp256k1Signer, &offline).await;
        assert_eq!(delivery, Delivery::Error(ErrorClass::Ledger));
        assert!(offline.prepared.load(Ordering::SeqCst));

        match rx.recv().await {
            Err(ActionError::Dispatch(err @ DispatchError::Transport(_))) => {
                assert!(!err.is_expired());
                assert_eq!(err.exit_code(), None);
            }
            other => panic!("unexpected outcome: {:?}", other.is_ok()),
        }
    }
}
