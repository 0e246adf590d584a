//! Runtime bridge - connects sync TUI thread with async Tokio runtime
//!
//! The worker thread owns the connection manager and the dispatcher; the
//! TUI only ever sees snapshots and results through `RuntimeEvent`s.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use alloy::primitives::Address;
use tokio::runtime::Runtime;

use crate::domain::{FormInputs, Operation};
use crate::infrastructure::ethereum::{Connector, ProviderConfig, TxOutcome};
use crate::infrastructure::runtime::worker::run_async_worker;
use crate::store::KeyValueStore;
use crate::wallet::Phase;

/// Commands sent from the TUI to the async worker
#[derive(Debug, Clone)]
pub enum RuntimeCommand {
    /// Connect or disconnect depending on the current state
    Toggle,
    /// Send one of the registry calls with a snapshot of the form
    Submit {
        operation: Operation,
        inputs: FormInputs,
    },
    /// Shutdown the worker
    Shutdown,
}

/// Events sent from the async worker to the TUI
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Wallet provider is reachable
    Ready { endpoint: String },
    /// Connection state after any change
    Connection(ConnectionSnapshot),
    /// Wallet is on another chain; a switch was requested
    ChainSwitchRequested { current: u64, target: u64 },
    /// Transaction included
    TxConfirmed {
        operation: Operation,
        outcome: TxOutcome,
    },
    /// Transaction could not be built, sent or included
    TxFailed { operation: Operation, message: String },
    /// Submission refused because the same operation is still pending
    TxRejected { operation: Operation, message: String },
    /// Error occurred
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub account: Option<Address>,
    pub user_disconnected: bool,
    pub phase: Phase,
    pub reconnect_attempts: u64,
}

/// Everything the worker needs to build its provider and dispatcher
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub endpoint: ProviderConfig,
    pub target_chain_id: u64,
    pub contract: Address,
    pub gas_limit: u64,
    pub connector: Connector,
    pub private_key_env: String,
}

/// Bridge between sync TUI thread and async Tokio runtime
pub struct RuntimeBridge {
    cmd_tx: Sender<RuntimeCommand>,
    evt_rx: Receiver<RuntimeEvent>,
}

impl RuntimeBridge {
    /// Spawn the worker thread with its own Tokio runtime
    pub fn new(settings: WorkerSettings, store: Box<dyn KeyValueStore>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<RuntimeCommand>();
        let (evt_tx, evt_rx) = mpsc::channel::<RuntimeEvent>();

        thread::spawn(move || {
            let rt = match Runtime::new() {
                Ok(rt) => rt,
                Err(err) => {
                    let _ = evt_tx.send(RuntimeEvent::Error {
                        message: format!("Failed to create Tokio runtime: {err}"),
                    });
                    return;
                }
            };
            rt.block_on(async {
                if let Err(err) = run_async_worker(settings, store, cmd_rx, evt_tx.clone()).await {
                    tracing::error!(error = %format!("{err:#}"), "worker exited");
                    let _ = evt_tx.send(RuntimeEvent::Error {
                        message: format!("Worker exited: {:#}", err),
                    });
                }
            });
        });

        Self { cmd_tx, evt_rx }
    }

    /// Send a command to the async worker
    pub fn send(&self, cmd: RuntimeCommand) -> anyhow::Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| anyhow::anyhow!("Worker channel closed"))
    }

    /// Poll for events (non-blocking)
    pub fn poll_events(&self) -> Vec<RuntimeEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.evt_rx.try_recv() {
            events.push(evt);
        }
        events
    }
}

impl Drop for RuntimeBridge {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(RuntimeCommand::Shutdown);
    }
}
