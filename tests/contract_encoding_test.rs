//! Registry call encoding checks
//!
//! Verifies the calldata layout the registrar form produces:
//! 1. Selectors match the registry's Solidity signatures
//! 2. register/renew carry [keccak256(name), blockCount]
//! 3. cancel carries only the name hash
//!
//! The last test needs a dev node (anvil) and is ignored by default.

use alloy::primitives::{keccak256, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy_sol_types::{sol, SolCall};

sol! {
    interface INameRegistry {
        function register(bytes32 name, uint256 blockCount) external payable;
        function renew(bytes32 name, uint256 blockCount) external payable;
        function cancel(bytes32 name) external;
    }
}

#[test]
fn test_selectors_follow_signatures() {
    let cases: [(&str, [u8; 4]); 3] = [
        ("register(bytes32,uint256)", INameRegistry::registerCall::SELECTOR),
        ("renew(bytes32,uint256)", INameRegistry::renewCall::SELECTOR),
        ("cancel(bytes32)", INameRegistry::cancelCall::SELECTOR),
    ];

    for (signature, selector) in cases {
        let digest = keccak256(signature.as_bytes());
        assert_eq!(&digest[..4], &selector[..], "selector for {signature}");
    }
}

#[test]
fn test_register_calldata_layout() {
    let name = keccak256("Tester".as_bytes());
    let call = INameRegistry::registerCall {
        name,
        blockCount: U256::from(10u64),
    };
    let data = call.abi_encode();

    // selector + two static words
    assert_eq!(data.len(), 4 + 32 + 32);
    assert_eq!(&data[..4], &INameRegistry::registerCall::SELECTOR[..]);
    assert_eq!(B256::from_slice(&data[4..36]), name);
    assert_eq!(U256::from_be_slice(&data[36..68]), U256::from(10u64));

    let decoded = INameRegistry::registerCall::abi_decode(&data).expect("decode register");
    assert_eq!(decoded.name, name);
    assert_eq!(decoded.blockCount, U256::from(10u64));
}

#[test]
fn test_cancel_calldata_layout() {
    let name = keccak256("Tester".as_bytes());
    let data = INameRegistry::cancelCall { name }.abi_encode();

    assert_eq!(data.len(), 4 + 32);
    assert_eq!(B256::from_slice(&data[4..]), name);
}

#[test]
fn test_zero_block_renewal_encodes() {
    let data = INameRegistry::renewCall {
        name: keccak256("Tester".as_bytes()),
        blockCount: U256::ZERO,
    }
    .abi_encode();

    assert!(data[36..68].iter().all(|byte| *byte == 0));
}

#[tokio::test]
#[ignore = "requires a dev node at RPC_URL (default http://127.0.0.1:8545)"]
async fn test_dev_node_reports_chain() {
    let rpc_url_str =
        std::env::var("RPC_URL").unwrap_or_else(|_| "http://127.0.0.1:8545".to_string());
    let rpc_url = rpc_url_str.parse().expect("valid url");
    let provider = ProviderBuilder::new().connect_http(rpc_url);

    let chain_id = provider.get_chain_id().await.expect("should get chain id");
    println!("✓ Chain id: {}", chain_id);

    let accounts = provider.get_accounts().await.expect("should list accounts");
    println!("✓ Node accounts: {}", accounts.len());
    assert!(!accounts.is_empty(), "dev node should expose unlocked accounts");
}
