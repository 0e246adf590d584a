//! Wallet provider abstraction and its Alloy implementation
//!
//! The provider plays the role of a browser-injected wallet: it reports
//! the chain it points at, accepts chain-switch requests, hands out an
//! account on connect, and submits transactions from that account.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, B256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use tokio::sync::RwLock;

/// Provider configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    /// HTTP JSON-RPC endpoint
    Http(String),
    /// WebSocket endpoint
    WebSocket(String),
    /// IPC socket path (Unix only)
    #[cfg(unix)]
    Ipc(PathBuf),
}

impl ProviderConfig {
    /// Get display name for this endpoint
    pub fn display(&self) -> String {
        match self {
            ProviderConfig::Http(url) => url.clone(),
            ProviderConfig::WebSocket(url) => url.clone(),
            #[cfg(unix)]
            ProviderConfig::Ipc(path) => path.display().to_string(),
        }
    }
}

/// How an account is obtained when connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    /// Accounts managed by the node (`eth_requestAccounts` / `eth_accounts`)
    #[default]
    Injected,
    /// Private key read from the environment, signing locally
    Local,
}

impl FromStr for Connector {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "injected" | "node" => Ok(Connector::Injected),
            "local" | "key" | "private-key" => Ok(Connector::Local),
            other => anyhow::bail!("unknown connector {other:?} (expected injected or local)"),
        }
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connector::Injected => f.write_str("injected"),
            Connector::Local => f.write_str("local"),
        }
    }
}

/// Receipt summary for a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub success: bool,
}

/// Wallet operations the connection manager and dispatcher rely on.
#[async_trait::async_trait]
pub trait WalletProvider: Send + Sync + 'static {
    /// Chain id the wallet is currently pointed at
    async fn chain_id(&self) -> Result<u64>;

    /// Ask the wallet to switch to `chain_id`. Does not connect.
    async fn request_chain_switch(&self, chain_id: u64) -> Result<()>;

    /// Request account access through the given connector
    async fn connect(&self, connector: Connector) -> Result<Address>;

    /// Drop the current session
    async fn reset(&self);

    /// Submit a transaction and wait for its inclusion receipt
    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxOutcome>;

    /// Get endpoint display name
    fn endpoint_name(&self) -> String;
}

/// Alloy-backed wallet. Reads go through `base`; sends go through the
/// provider established by the last successful `connect`.
pub struct AlloyWallet {
    config: ProviderConfig,
    base: DynProvider,
    private_key_env: String,
    session: RwLock<Option<DynProvider>>,
}

/// Create a wallet provider from configuration
pub async fn create_wallet(
    config: ProviderConfig,
    private_key_env: impl Into<String>,
) -> Result<AlloyWallet> {
    let base = connect_transport(&config, None).await?;
    Ok(AlloyWallet {
        config,
        base,
        private_key_env: private_key_env.into(),
        session: RwLock::new(None),
    })
}

async fn connect_transport(
    config: &ProviderConfig,
    wallet: Option<EthereumWallet>,
) -> Result<DynProvider> {
    match config {
        ProviderConfig::Http(url) => {
            let rpc_url = url.parse().context("Invalid HTTP URL")?;
            let provider = match wallet {
                Some(wallet) => ProviderBuilder::new()
                    .wallet(wallet)
                    .connect_http(rpc_url)
                    .erased(),
                None => ProviderBuilder::new().connect_http(rpc_url).erased(),
            };
            Ok(provider)
        }
        ProviderConfig::WebSocket(url) => {
            let provider = match wallet {
                Some(wallet) => ProviderBuilder::new()
                    .wallet(wallet)
                    .connect(url)
                    .await
                    .context("Failed to create WebSocket provider")?
                    .erased(),
                None => ProviderBuilder::new()
                    .connect(url)
                    .await
                    .context("Failed to create WebSocket provider")?
                    .erased(),
            };
            Ok(provider)
        }
        #[cfg(unix)]
        ProviderConfig::Ipc(path) => {
            use alloy::providers::IpcConnect;
            let ipc = IpcConnect::new(path.to_string_lossy().to_string());
            let provider = match wallet {
                Some(wallet) => ProviderBuilder::new()
                    .wallet(wallet)
                    .connect_ipc(ipc)
                    .await
                    .context("Failed to create IPC provider")?
                    .erased(),
                None => ProviderBuilder::new()
                    .connect_ipc(ipc)
                    .await
                    .context("Failed to create IPC provider")?
                    .erased(),
            };
            Ok(provider)
        }
    }
}

impl AlloyWallet {
    async fn injected_account(&self) -> Result<Address> {
        // eth_requestAccounts is the wallet-facing method; plain nodes only know eth_accounts
        let accounts: Vec<Address> = match self
            .base
            .raw_request("eth_requestAccounts".into(), ())
            .await
        {
            Ok(accounts) => accounts,
            Err(err) => {
                tracing::debug!(error = %err, "eth_requestAccounts unsupported, using eth_accounts");
                self.base
                    .get_accounts()
                    .await
                    .context("eth_accounts failed")?
            }
        };
        accounts
            .first()
            .copied()
            .context("wallet exposed no accounts")
    }

    fn local_signer(&self) -> Result<PrivateKeySigner> {
        let raw = std::env::var(&self.private_key_env)
            .with_context(|| format!("{} is not set", self.private_key_env))?;
        let trimmed = raw.trim();
        let key = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        key.parse::<PrivateKeySigner>()
            .with_context(|| format!("{} is not a valid private key", self.private_key_env))
    }
}

#[async_trait::async_trait]
impl WalletProvider for AlloyWallet {
    async fn chain_id(&self) -> Result<u64> {
        Ok(self.base.get_chain_id().await?)
    }

    async fn request_chain_switch(&self, chain_id: u64) -> Result<()> {
        let params = serde_json::json!({ "chainId": format!("0x{:x}", chain_id) });
        let _: serde_json::Value = self
            .base
            .raw_request("wallet_switchEthereumChain".into(), (params,))
            .await?;
        Ok(())
    }

    async fn connect(&self, connector: Connector) -> Result<Address> {
        let (account, provider) = match connector {
            Connector::Injected => (self.injected_account().await?, self.base.clone()),
            Connector::Local => {
                let signer = self.local_signer()?;
                let account = signer.address();
                let provider =
                    connect_transport(&self.config, Some(EthereumWallet::from(signer))).await?;
                (account, provider)
            }
        };
        *self.session.write().await = Some(provider);
        Ok(account)
    }

    async fn reset(&self) {
        *self.session.write().await = None;
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxOutcome> {
        let provider = self
            .session
            .read()
            .await
            .clone()
            .context("wallet not connected")?;

        let pending = provider.send_transaction(request).await?;
        tracing::debug!(tx = %pending.tx_hash(), "transaction submitted");
        let receipt = pending.get_receipt().await?;

        Ok(TxOutcome {
            hash: receipt.transaction_hash(),
            block_number: receipt.block_number(),
            gas_used: receipt.gas_used(),
            success: receipt.status(),
        })
    }

    fn endpoint_name(&self) -> String {
        self.config.display()
    }
}
