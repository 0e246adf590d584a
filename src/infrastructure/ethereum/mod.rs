//! Ethereum infrastructure - Alloy wallet provider

mod provider;

pub use provider::{
    create_wallet, AlloyWallet, Connector, ProviderConfig, TxOutcome, WalletProvider,
};
