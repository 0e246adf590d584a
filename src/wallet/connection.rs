//! Wallet connection state and the connect/disconnect toggle

use std::fmt;
use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::{Context, Result};

use crate::infrastructure::ethereum::{Connector, WalletProvider};
use crate::store::{KeyValueStore, USER_DISCONNECTED_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disconnected,
    AwaitingChainSwitch,
    Connected,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Disconnected => f.write_str("disconnected"),
            Phase::AwaitingChainSwitch => f.write_str("awaiting chain switch"),
            Phase::Connected => f.write_str("connected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    pub account: Option<Address>,
    /// Persisted; survives restarts
    pub user_disconnected: bool,
    pub phase: Phase,
}

/// What a single `toggle` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Disconnected,
    ChainSwitchRequested { current: u64, target: u64 },
    Connected(Address),
}

/// Reconnect rule: connect whenever no account is held and the user has
/// not explicitly disconnected. No attempt cap, no backoff.
pub fn should_attempt_connect(state: &ConnectionState) -> bool {
    state.account.is_none() && !state.user_disconnected
}

pub struct ConnectionManager {
    provider: Arc<dyn WalletProvider>,
    store: Box<dyn KeyValueStore>,
    target_chain_id: u64,
    connector: Connector,
    state: ConnectionState,
    reconnect_attempts: u64,
}

impl ConnectionManager {
    pub fn new(
        provider: Arc<dyn WalletProvider>,
        store: Box<dyn KeyValueStore>,
        target_chain_id: u64,
        connector: Connector,
    ) -> Self {
        let user_disconnected = store
            .get_bool(USER_DISCONNECTED_KEY, true)
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "could not read persisted flag, assuming disconnected");
                true
            });

        Self {
            provider,
            store,
            target_chain_id,
            connector,
            state: ConnectionState {
                account: None,
                user_disconnected,
                phase: Phase::Disconnected,
            },
            reconnect_attempts: 0,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn account(&self) -> Option<Address> {
        self.state.account
    }

    pub fn target_chain_id(&self) -> u64 {
        self.target_chain_id
    }

    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts
    }

    /// Disconnect when an account is held; otherwise reconcile the chain
    /// id and connect.
    ///
    /// A chain mismatch only produces a switch request. The user has to
    /// toggle again once the wallet is on the right chain.
    pub async fn toggle(&mut self) -> Result<ToggleOutcome> {
        if self.state.account.is_some() {
            self.set_user_disconnected(true);
            self.provider.reset().await;
            self.state.account = None;
            self.state.phase = Phase::Disconnected;
            tracing::info!("wallet disconnected by user");
            return Ok(ToggleOutcome::Disconnected);
        }

        let current = self
            .provider
            .chain_id()
            .await
            .context("read wallet chain id")?;

        if current != self.target_chain_id {
            tracing::info!(current, target = self.target_chain_id, "requesting chain switch");
            self.provider
                .request_chain_switch(self.target_chain_id)
                .await
                .context("chain switch request rejected")?;
            self.state.phase = Phase::AwaitingChainSwitch;
            return Ok(ToggleOutcome::ChainSwitchRequested {
                current,
                target: self.target_chain_id,
            });
        }

        // Chain matches, so no switch is pending any more
        self.state.phase = Phase::Disconnected;
        self.set_user_disconnected(false);
        let account = self
            .provider
            .connect(self.connector)
            .await
            .context("wallet connection rejected")?;
        self.state.account = Some(account);
        self.state.phase = Phase::Connected;
        tracing::info!(%account, connector = %self.connector, "wallet connected");
        Ok(ToggleOutcome::Connected(account))
    }

    /// Evaluate the reconnect rule once and dispatch at most one attempt.
    ///
    /// Returns `None` when the rule does not fire. A failed attempt leaves
    /// the state untouched, so the rule stays quiet until the next change.
    pub async fn reconcile(&mut self) -> Option<Result<Address>> {
        if !should_attempt_connect(&self.state) {
            return None;
        }

        self.reconnect_attempts += 1;
        tracing::info!(attempt = self.reconnect_attempts, "reconnecting wallet");
        match self.provider.connect(self.connector).await {
            Ok(account) => {
                self.state.account = Some(account);
                self.state.phase = Phase::Connected;
                tracing::info!(%account, "wallet reconnected");
                Some(Ok(account))
            }
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "reconnect attempt failed");
                Some(Err(err))
            }
        }
    }

    fn set_user_disconnected(&mut self, value: bool) {
        self.state.user_disconnected = value;
        if let Err(err) = self.store.set_bool(USER_DISCONNECTED_KEY, value) {
            tracing::warn!(error = %err, "could not persist disconnect flag");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::wallet::mock::MockWallet;

    const TARGET: u64 = 56;

    fn manager(wallet: &Arc<MockWallet>, store: &MemoryStore) -> ConnectionManager {
        ConnectionManager::new(
            wallet.clone(),
            Box::new(store.clone()),
            TARGET,
            Connector::Injected,
        )
    }

    #[test]
    fn test_should_attempt_connect_truth_table() {
        let account = Some(Address::repeat_byte(1));
        for (account, user_disconnected, expected) in [
            (None, false, true),
            (None, true, false),
            (account, false, false),
            (account, true, false),
        ] {
            let state = ConnectionState {
                account,
                user_disconnected,
                phase: Phase::Disconnected,
            };
            assert_eq!(should_attempt_connect(&state), expected);
        }
    }

    #[tokio::test]
    async fn test_flag_defaults_to_disconnected() {
        let wallet = Arc::new(MockWallet::new(TARGET));
        let store = MemoryStore::new();
        let mut manager = manager(&wallet, &store);

        assert!(manager.state().user_disconnected);
        assert!(manager.reconcile().await.is_none());
        assert_eq!(wallet.connects(), 0);
    }

    #[tokio::test]
    async fn test_toggle_on_matching_chain_connects_once() {
        let wallet = Arc::new(MockWallet::new(TARGET));
        let store = MemoryStore::new();
        let mut manager = manager(&wallet, &store);

        let outcome = manager.toggle().await.unwrap();
        assert_eq!(outcome, ToggleOutcome::Connected(wallet.account));
        assert!(!manager.state().user_disconnected);
        assert_eq!(manager.state().phase, Phase::Connected);
        assert_eq!(wallet.connects(), 1);
        assert_eq!(*wallet.connectors.lock().unwrap(), vec![Connector::Injected]);
        assert!(!store.get_bool(USER_DISCONNECTED_KEY, true).unwrap());

        // account now held, rule stays quiet
        assert!(manager.reconcile().await.is_none());
        assert_eq!(wallet.connects(), 1);
    }

    #[tokio::test]
    async fn test_toggle_on_wrong_chain_only_requests_switch() {
        let wallet = Arc::new(MockWallet::new(1));
        let store = MemoryStore::new();
        let mut manager = manager(&wallet, &store);

        let outcome = manager.toggle().await.unwrap();
        assert_eq!(
            outcome,
            ToggleOutcome::ChainSwitchRequested {
                current: 1,
                target: TARGET
            }
        );
        assert_eq!(*wallet.switch_requests.lock().unwrap(), vec![TARGET]);
        assert_eq!(wallet.connects(), 0);
        assert!(manager.state().user_disconnected);
        assert_eq!(manager.state().phase, Phase::AwaitingChainSwitch);
        assert_eq!(store.get(USER_DISCONNECTED_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_switch_does_not_auto_connect() {
        let wallet = Arc::new(MockWallet::new(1));
        let store = MemoryStore::new();
        let mut manager = manager(&wallet, &store);

        manager.toggle().await.unwrap();
        // wallet accepted the switch out of band
        wallet.chain_id.store(TARGET, std::sync::atomic::Ordering::SeqCst);
        assert!(manager.reconcile().await.is_none());
        assert_eq!(wallet.connects(), 0);

        let outcome = manager.toggle().await.unwrap();
        assert!(matches!(outcome, ToggleOutcome::Connected(_)));
        assert_eq!(wallet.connects(), 1);
    }

    #[tokio::test]
    async fn test_rejected_connect_after_switch_clears_awaiting() {
        let wallet = Arc::new(MockWallet::new(1));
        let store = MemoryStore::new();
        let mut manager = manager(&wallet, &store);

        manager.toggle().await.unwrap();
        assert_eq!(manager.state().phase, Phase::AwaitingChainSwitch);

        wallet.chain_id.store(TARGET, std::sync::atomic::Ordering::SeqCst);
        wallet
            .reject_connect
            .store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(manager.toggle().await.is_err());
        assert_eq!(manager.state().phase, Phase::Disconnected);
        assert_eq!(manager.account(), None);
    }

    #[tokio::test]
    async fn test_rejected_switch_keeps_state() {
        let wallet = Arc::new(MockWallet::new(1));
        wallet
            .reject_switch
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let store = MemoryStore::new();
        let mut manager = manager(&wallet, &store);

        assert!(manager.toggle().await.is_err());
        assert_eq!(manager.state().phase, Phase::Disconnected);
        assert!(manager.state().user_disconnected);
    }

    #[tokio::test]
    async fn test_toggle_with_account_disconnects() {
        let wallet = Arc::new(MockWallet::new(TARGET));
        let store = MemoryStore::new();
        let mut manager = manager(&wallet, &store);

        manager.toggle().await.unwrap();
        let outcome = manager.toggle().await.unwrap();

        assert_eq!(outcome, ToggleOutcome::Disconnected);
        assert_eq!(manager.account(), None);
        assert!(manager.state().user_disconnected);
        assert_eq!(manager.state().phase, Phase::Disconnected);
        assert_eq!(
            wallet.reset_calls.load(std::sync::atomic::Ordering::SeqCst),
            1
        );
        assert!(store.get_bool(USER_DISCONNECTED_KEY, false).unwrap());
        assert!(manager.reconcile().await.is_none());
    }

    #[tokio::test]
    async fn test_persisted_connected_flag_reconnects_on_start() {
        let wallet = Arc::new(MockWallet::new(TARGET));
        let store = MemoryStore::new();
        store.set_bool(USER_DISCONNECTED_KEY, false).unwrap();
        let mut manager = manager(&wallet, &store);

        let result = manager.reconcile().await.unwrap();
        assert_eq!(result.unwrap(), wallet.account);
        assert_eq!(manager.reconnect_attempts(), 1);
        assert_eq!(manager.state().phase, Phase::Connected);
    }

    #[tokio::test]
    async fn test_failed_connect_is_retried_once_per_change() {
        let wallet = Arc::new(MockWallet::new(TARGET));
        wallet
            .reject_connect
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let store = MemoryStore::new();
        let mut manager = manager(&wallet, &store);

        // toggle flips the flag, then its own connect fails
        assert!(manager.toggle().await.is_err());
        assert!(!manager.state().user_disconnected);
        assert_eq!(wallet.connects(), 1);

        // the flag change fires the rule once
        assert!(manager.reconcile().await.unwrap().is_err());
        assert_eq!(wallet.connects(), 2);
        assert_eq!(manager.reconnect_attempts(), 1);
        assert_eq!(manager.account(), None);
    }
}
