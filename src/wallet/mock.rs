//! Scriptable wallet provider for tests

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, B256};
use alloy::rpc::types::TransactionRequest;
use anyhow::Result;
use tokio::sync::Semaphore;

use crate::infrastructure::ethereum::{Connector, TxOutcome, WalletProvider};

pub struct MockWallet {
    pub chain_id: AtomicU64,
    pub account: Address,
    pub connect_calls: AtomicUsize,
    pub reset_calls: AtomicUsize,
    pub reject_connect: AtomicBool,
    pub reject_switch: AtomicBool,
    pub fail_send: AtomicBool,
    pub switch_requests: Mutex<Vec<u64>>,
    pub connectors: Mutex<Vec<Connector>>,
    pub sent: Mutex<Vec<TransactionRequest>>,
    /// When set, each send waits for one permit before completing.
    pub gate: Option<Arc<Semaphore>>,
}

impl MockWallet {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id: AtomicU64::new(chain_id),
            account: Address::repeat_byte(0xab),
            connect_calls: AtomicUsize::new(0),
            reset_calls: AtomicUsize::new(0),
            reject_connect: AtomicBool::new(false),
            reject_switch: AtomicBool::new(false),
            fail_send: AtomicBool::new(false),
            switch_requests: Mutex::new(Vec::new()),
            connectors: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn gated(chain_id: u64) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mut wallet = Self::new(chain_id);
        wallet.gate = Some(gate.clone());
        (wallet, gate)
    }

    pub fn connects(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl WalletProvider for MockWallet {
    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn request_chain_switch(&self, chain_id: u64) -> Result<()> {
        self.switch_requests.lock().unwrap().push(chain_id);
        if self.reject_switch.load(Ordering::SeqCst) {
            anyhow::bail!("user rejected chain switch");
        }
        Ok(())
    }

    async fn connect(&self, connector: Connector) -> Result<Address> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.connectors.lock().unwrap().push(connector);
        if self.reject_connect.load(Ordering::SeqCst) {
            anyhow::bail!("user rejected the request");
        }
        Ok(self.account)
    }

    async fn reset(&self) {
        self.reset_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxOutcome> {
        self.sent.lock().unwrap().push(request);
        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }
        if self.fail_send.load(Ordering::SeqCst) {
            anyhow::bail!("execution reverted");
        }
        let count = self.sent.lock().unwrap().len() as u64;
        Ok(TxOutcome {
            hash: B256::with_last_byte(count as u8),
            block_number: Some(100 + count),
            gas_used: 50_000,
            success: true,
        })
    }

    fn endpoint_name(&self) -> String {
        "mock".to_string()
    }
}
