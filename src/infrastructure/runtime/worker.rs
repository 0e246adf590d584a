//! Async worker - runs in Tokio runtime and owns the wallet session

use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinSet;
use tokio::time::interval;

use crate::infrastructure::ethereum::{create_wallet, WalletProvider};
use crate::infrastructure::runtime::bridge::{
    ConnectionSnapshot, RuntimeCommand, RuntimeEvent, WorkerSettings,
};
use crate::store::KeyValueStore;
use crate::wallet::{ConnectionManager, DispatchError, Dispatcher, ToggleOutcome};

/// Run the async worker loop
pub async fn run_async_worker(
    settings: WorkerSettings,
    store: Box<dyn KeyValueStore>,
    cmd_rx: Receiver<RuntimeCommand>,
    evt_tx: Sender<RuntimeEvent>,
) -> Result<()> {
    let wallet = loop {
        match create_wallet(settings.endpoint.clone(), settings.private_key_env.clone()).await {
            Ok(wallet) => break wallet,
            Err(err) => {
                tracing::warn!(endpoint = %settings.endpoint.display(), error = %format!("{err:#}"), "provider unavailable");
                let _ = evt_tx.send(RuntimeEvent::Error {
                    message: format!(
                        "Connection failed ({}): {:#}",
                        settings.endpoint.display(),
                        err
                    ),
                });

                loop {
                    match cmd_rx.try_recv() {
                        Ok(RuntimeCommand::Shutdown) | Err(TryRecvError::Disconnected) => {
                            return Ok(())
                        }
                        Ok(RuntimeCommand::Submit { operation, .. }) => {
                            let _ = evt_tx.send(RuntimeEvent::TxFailed {
                                operation,
                                message: format!("{operation}: wallet provider not reachable yet"),
                            });
                        }
                        Ok(RuntimeCommand::Toggle) => {
                            let _ = evt_tx.send(RuntimeEvent::Error {
                                message: "Wallet provider not reachable yet".to_string(),
                            });
                        }
                        Err(TryRecvError::Empty) => break,
                    }
                }

                tokio::time::sleep(Duration::from_millis(900)).await;
            }
        }
    };

    drive(Arc::new(wallet), &settings, store, cmd_rx, evt_tx).await
}

/// Process commands against a live provider until shutdown.
///
/// The connection manager is only touched from this loop, so its state
/// changes are serialized. Submissions run as separate tasks and may
/// overlap; the dispatcher's in-flight set rejects duplicates.
pub(crate) async fn drive(
    provider: Arc<dyn WalletProvider>,
    settings: &WorkerSettings,
    store: Box<dyn KeyValueStore>,
    cmd_rx: Receiver<RuntimeCommand>,
    evt_tx: Sender<RuntimeEvent>,
) -> Result<()> {
    let mut manager = ConnectionManager::new(
        provider.clone(),
        store,
        settings.target_chain_id,
        settings.connector,
    );
    let dispatcher = Dispatcher::new(provider.clone(), settings.contract, settings.gas_limit);
    let mut submissions: JoinSet<()> = JoinSet::new();

    tracing::info!(
        endpoint = %provider.endpoint_name(),
        chain_id = manager.target_chain_id(),
        contract = %dispatcher.contract(),
        "worker ready"
    );
    let _ = evt_tx.send(RuntimeEvent::Ready {
        endpoint: provider.endpoint_name(),
    });

    // The persisted flag may already say "connected"
    reconcile(&mut manager, &evt_tx).await;
    publish(&manager, &evt_tx);

    let mut poll_interval = interval(Duration::from_millis(50));

    loop {
        poll_interval.tick().await;

        loop {
            let cmd = match cmd_rx.try_recv() {
                Ok(cmd) => cmd,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(()),
            };

            match cmd {
                RuntimeCommand::Shutdown => {
                    while submissions.join_next().await.is_some() {}
                    tracing::info!("worker shut down");
                    return Ok(());
                }

                RuntimeCommand::Toggle => {
                    match manager.toggle().await {
                        Ok(ToggleOutcome::ChainSwitchRequested { current, target }) => {
                            let _ = evt_tx.send(RuntimeEvent::ChainSwitchRequested { current, target });
                        }
                        Ok(_) => {}
                        Err(err) => {
                            tracing::warn!(error = %format!("{err:#}"), "toggle failed");
                            let _ = evt_tx.send(RuntimeEvent::Error {
                                message: format!("{:#}", err),
                            });
                        }
                    }
                    reconcile(&mut manager, &evt_tx).await;
                    publish(&manager, &evt_tx);
                }

                RuntimeCommand::Submit { operation, inputs } => {
                    let dispatcher = dispatcher.clone();
                    let from = manager.account();
                    let evt_tx = evt_tx.clone();
                    submissions.spawn(async move {
                        let event = match dispatcher.dispatch(operation, from, &inputs).await {
                            Ok(outcome) => RuntimeEvent::TxConfirmed { operation, outcome },
                            Err(err @ DispatchError::InFlight(_)) => RuntimeEvent::TxRejected {
                                operation,
                                message: err.to_string(),
                            },
                            Err(err) => RuntimeEvent::TxFailed {
                                operation,
                                message: err.to_string(),
                            },
                        };
                        let _ = evt_tx.send(event);
                    });
                }
            }
        }

        while let Some(joined) = submissions.try_join_next() {
            if let Err(err) = joined {
                tracing::error!(error = %err, "submission task panicked");
            }
        }
    }
}

async fn reconcile(manager: &mut ConnectionManager, evt_tx: &Sender<RuntimeEvent>) {
    if let Some(Err(err)) = manager.reconcile().await {
        let _ = evt_tx.send(RuntimeEvent::Error {
            message: format!("Reconnect failed: {:#}", err),
        });
    }
}

fn publish(manager: &ConnectionManager, evt_tx: &Sender<RuntimeEvent>) {
    let state = manager.state();
    let _ = evt_tx.send(RuntimeEvent::Connection(ConnectionSnapshot {
        account: state.account,
        user_disconnected: state.user_disconnected,
        phase: state.phase,
        reconnect_attempts: manager.reconnect_attempts(),
    }));
}
