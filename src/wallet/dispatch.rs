//! Transaction dispatcher for the registry's register/renew/cancel calls

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::Address;
use thiserror::Error;

use crate::domain::{ContractCallParams, FormInputs, InvalidInput, Operation};
use crate::infrastructure::ethereum::{TxOutcome, WalletProvider};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0} already in flight")]
    InFlight(Operation),
    #[error("no wallet account connected")]
    NotConnected,
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),
    #[error("{operation} failed: {error:#}")]
    Provider {
        operation: Operation,
        error: anyhow::Error,
    },
}

/// Sends contract calls from the connected account. Clones share the
/// in-flight set, so one operation can only be pending once at a time.
#[derive(Clone)]
pub struct Dispatcher {
    provider: Arc<dyn WalletProvider>,
    contract: Address,
    gas_limit: u64,
    in_flight: Arc<Mutex<HashSet<Operation>>>,
}

struct InFlightGuard {
    set: Arc<Mutex<HashSet<Operation>>>,
    operation: Operation,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.set).remove(&self.operation);
    }
}

fn lock(set: &Mutex<HashSet<Operation>>) -> MutexGuard<'_, HashSet<Operation>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn WalletProvider>, contract: Address, gas_limit: u64) -> Self {
        Self {
            provider,
            contract,
            gas_limit,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn pending(&self) -> Vec<Operation> {
        let mut ops: Vec<Operation> = lock(&self.in_flight).iter().copied().collect();
        ops.sort();
        ops
    }

    pub async fn register(
        &self,
        from: Option<Address>,
        inputs: &FormInputs,
    ) -> Result<TxOutcome, DispatchError> {
        self.dispatch(Operation::Register, from, inputs).await
    }

    pub async fn renew(
        &self,
        from: Option<Address>,
        inputs: &FormInputs,
    ) -> Result<TxOutcome, DispatchError> {
        self.dispatch(Operation::Renew, from, inputs).await
    }

    pub async fn cancel(
        &self,
        from: Option<Address>,
        inputs: &FormInputs,
    ) -> Result<TxOutcome, DispatchError> {
        self.dispatch(Operation::Cancel, from, inputs).await
    }

    /// Build the call for `operation`, submit it and wait for the receipt.
    pub async fn dispatch(
        &self,
        operation: Operation,
        from: Option<Address>,
        inputs: &FormInputs,
    ) -> Result<TxOutcome, DispatchError> {
        let _guard = self.begin(operation)?;
        let from = from.ok_or(DispatchError::NotConnected)?;
        let params = ContractCallParams::from_inputs(operation, inputs, self.gas_limit)?;

        tracing::info!(
            %operation,
            method = operation.signature(),
            name = %inputs.name,
            name_hash = %params.name_hash,
            value = %params.value,
            gas = params.gas,
            "submitting transaction"
        );

        let request = params.into_request(from, self.contract);
        match self.provider.send_transaction(request).await {
            Ok(outcome) => {
                tracing::info!(
                    %operation,
                    tx = %outcome.hash,
                    block = ?outcome.block_number,
                    gas_used = outcome.gas_used,
                    success = outcome.success,
                    "transaction receipt"
                );
                Ok(outcome)
            }
            Err(error) => {
                tracing::warn!(%operation, error = %format!("{error:#}"), "transaction failed");
                Err(DispatchError::Provider { operation, error })
            }
        }
    }

    fn begin(&self, operation: Operation) -> Result<InFlightGuard, DispatchError> {
        if !lock(&self.in_flight).insert(operation) {
            tracing::debug!(%operation, "rejecting duplicate submission");
            return Err(DispatchError::InFlight(operation));
        }
        Ok(InFlightGuard {
            set: self.in_flight.clone(),
            operation,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use alloy::primitives::{keccak256, U256};
    use alloy_sol_types::SolCall;

    use super::*;
    use crate::config::DEFAULT_CONTRACT;
    use crate::domain::registrar::INameRegistry;
    use crate::wallet::mock::MockWallet;

    fn dispatcher(wallet: &Arc<MockWallet>) -> Dispatcher {
        Dispatcher::new(wallet.clone(), DEFAULT_CONTRACT.parse().unwrap(), 210_000)
    }

    async fn wait_pending(dispatcher: &Dispatcher, op: Operation) {
        while !dispatcher.pending().contains(&op) {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_register_sends_value_and_gas() {
        let wallet = Arc::new(MockWallet::new(1));
        let dispatcher = dispatcher(&wallet);

        let outcome = dispatcher
            .register(Some(wallet.account), &FormInputs::default())
            .await
            .unwrap();
        assert!(outcome.success);

        let sent = wallet.sent();
        assert_eq!(sent.len(), 1);
        let tx = &sent[0];
        assert_eq!(tx.from, Some(wallet.account));
        assert_eq!(tx.gas, Some(210_000));
        assert_eq!(tx.value, Some(U256::from(10_000_000_000_000_000u64)));

        let input = tx.input.input().unwrap();
        let call = INameRegistry::registerCall::abi_decode(input).unwrap();
        assert_eq!(call.name, keccak256("Tester"));
        assert_eq!(call.blockCount, U256::from(10));
        assert!(dispatcher.pending().is_empty());
    }

    #[tokio::test]
    async fn test_renew_forwards_zero_blocks() {
        let wallet = Arc::new(MockWallet::new(1));
        let dispatcher = dispatcher(&wallet);
        let inputs = FormInputs {
            block_count: "0".into(),
            ..FormInputs::default()
        };

        dispatcher.renew(Some(wallet.account), &inputs).await.unwrap();

        let tx = &wallet.sent()[0];
        assert_eq!(tx.gas, Some(210_000));
        assert_eq!(tx.value, Some(U256::from(10_000_000_000_000_000u64)));
        let call = INameRegistry::renewCall::abi_decode(tx.input.input().unwrap()).unwrap();
        assert_eq!(call.blockCount, U256::ZERO);
    }

    #[tokio::test]
    async fn test_cancel_sends_zero_value() {
        let wallet = Arc::new(MockWallet::new(1));
        let dispatcher = dispatcher(&wallet);
        let inputs = FormInputs {
            amount_wei: "999999999999999999999".into(),
            ..FormInputs::default()
        };

        dispatcher.cancel(Some(wallet.account), &inputs).await.unwrap();

        let tx = &wallet.sent()[0];
        assert_eq!(tx.value, Some(U256::ZERO));
        assert_eq!(tx.gas, Some(210_000));
        let call = INameRegistry::cancelCall::abi_decode(tx.input.input().unwrap()).unwrap();
        assert_eq!(call.name, keccak256("Tester"));
    }

    #[tokio::test]
    async fn test_requires_account() {
        let wallet = Arc::new(MockWallet::new(1));
        let dispatcher = dispatcher(&wallet);

        let err = dispatcher
            .register(None, &FormInputs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotConnected));
        assert!(wallet.sent().is_empty());
        assert!(dispatcher.pending().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_block_count_is_not_sent() {
        let wallet = Arc::new(MockWallet::new(1));
        let dispatcher = dispatcher(&wallet);
        let inputs = FormInputs {
            block_count: "ten".into(),
            ..FormInputs::default()
        };

        let err = dispatcher
            .register(Some(wallet.account), &inputs)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidInput(_)));
        assert!(wallet.sent().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_releases_guard() {
        let wallet = Arc::new(MockWallet::new(1));
        wallet.fail_send.store(true, Ordering::SeqCst);
        let dispatcher = dispatcher(&wallet);

        let err = dispatcher
            .register(Some(wallet.account), &FormInputs::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Provider {
                operation: Operation::Register,
                ..
            }
        ));
        assert!(dispatcher.pending().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_in_flight_rejected() {
        let (wallet, gate) = MockWallet::gated(1);
        let wallet = Arc::new(wallet);
        let dispatcher = dispatcher(&wallet);
        let account = wallet.account;

        let first = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.register(Some(account), &FormInputs::default()).await }
        });
        wait_pending(&dispatcher, Operation::Register).await;

        let err = dispatcher
            .register(Some(account), &FormInputs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InFlight(Operation::Register)));

        gate.add_permits(1);
        assert!(first.await.unwrap().is_ok());
        assert_eq!(wallet.sent().len(), 1);
        assert!(dispatcher.pending().is_empty());
    }

    #[tokio::test]
    async fn test_different_operations_overlap() {
        let (wallet, gate) = MockWallet::gated(1);
        let wallet = Arc::new(wallet);
        let dispatcher = dispatcher(&wallet);
        let account = wallet.account;

        let register = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.register(Some(account), &FormInputs::default()).await }
        });
        let cancel = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.cancel(Some(account), &FormInputs::default()).await }
        });
        wait_pending(&dispatcher, Operation::Register).await;
        wait_pending(&dispatcher, Operation::Cancel).await;
        assert_eq!(
            dispatcher.pending(),
            vec![Operation::Register, Operation::Cancel]
        );

        gate.add_permits(2);
        assert!(register.await.unwrap().is_ok());
        assert!(cancel.await.unwrap().is_ok());
        assert_eq!(wallet.sent().len(), 2);
    }
}
