//! Name registry contract bindings and call construction

use std::fmt;

use alloy::network::TransactionBuilder;
use alloy::rpc::types::TransactionRequest;
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall};
use thiserror::Error;

sol! {
    /// Registry surface the form drives. Everything else on the contract is opaque.
    interface INameRegistry {
        function register(bytes32 name, uint256 blockCount) external payable;
        function renew(bytes32 name, uint256 blockCount) external payable;
        function cancel(bytes32 name) external;
    }
}

/// The three contract methods the dispatcher can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    Register,
    Renew,
    Cancel,
}

impl Operation {
    pub const ALL: [Operation; 3] = [Operation::Register, Operation::Renew, Operation::Cancel];

    pub fn method(&self) -> &'static str {
        match self {
            Operation::Register => "register",
            Operation::Renew => "renew",
            Operation::Cancel => "cancel",
        }
    }

    pub fn signature(&self) -> &'static str {
        match self {
            Operation::Register => INameRegistry::registerCall::SIGNATURE,
            Operation::Renew => INameRegistry::renewCall::SIGNATURE,
            Operation::Cancel => INameRegistry::cancelCall::SIGNATURE,
        }
    }

    /// Whether the call carries the amount field as its value.
    pub fn is_payable(&self) -> bool {
        !matches!(self, Operation::Cancel)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

/// Raw form contents. Any string is accepted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormInputs {
    pub name: String,
    pub block_count: String,
    pub amount_wei: String,
}

impl Default for FormInputs {
    fn default() -> Self {
        Self {
            name: "Tester".to_string(),
            block_count: "10".to_string(),
            amount_wei: "10000000000000000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} is not an unsigned integer: {value:?}")]
pub struct InvalidInput {
    pub field: &'static str,
    pub value: String,
}

/// Fully resolved arguments for one contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCallParams {
    pub operation: Operation,
    pub name_hash: B256,
    /// Absent for `cancel`
    pub block_count: Option<U256>,
    pub value: U256,
    pub gas: u64,
}

impl ContractCallParams {
    pub fn from_inputs(
        operation: Operation,
        inputs: &FormInputs,
        gas: u64,
    ) -> Result<Self, InvalidInput> {
        let name_hash = name_hash(&inputs.name);
        let (block_count, value) = if operation.is_payable() {
            (
                Some(parse_uint("block count", &inputs.block_count)?),
                parse_uint("amount", &inputs.amount_wei)?,
            )
        } else {
            (None, U256::ZERO)
        };

        Ok(Self {
            operation,
            name_hash,
            block_count,
            value,
            gas,
        })
    }

    pub fn calldata(&self) -> Bytes {
        let block_count = self.block_count.unwrap_or_default();
        let encoded = match self.operation {
            Operation::Register => INameRegistry::registerCall {
                name: self.name_hash,
                blockCount: block_count,
            }
            .abi_encode(),
            Operation::Renew => INameRegistry::renewCall {
                name: self.name_hash,
                blockCount: block_count,
            }
            .abi_encode(),
            Operation::Cancel => INameRegistry::cancelCall {
                name: self.name_hash,
            }
            .abi_encode(),
        };
        Bytes::from(encoded)
    }

    pub fn into_request(self, from: Address, contract: Address) -> TransactionRequest {
        let input = self.calldata();
        TransactionRequest::default()
            .with_from(from)
            .with_to(contract)
            .with_input(input)
            .with_value(self.value)
            .with_gas_limit(self.gas)
    }
}

/// Keccak-256 of a name. A lowercase `0x` followed only by hex digits is
/// hashed as the bytes it encodes, left-padded to whole bytes.
pub fn name_hash(name: &str) -> B256 {
    if let Some(digits) = name.strip_prefix("0x") {
        if digits.chars().all(|c| c.is_ascii_hexdigit()) {
            let padded = if digits.len() % 2 == 1 {
                format!("0{digits}")
            } else {
                digits.to_string()
            };
            if let Ok(bytes) = hex::decode(padded) {
                return keccak256(bytes);
            }
        }
    }
    keccak256(name.as_bytes())
}

fn parse_uint(field: &'static str, raw: &str) -> Result<U256, InvalidInput> {
    raw.trim().parse::<U256>().map_err(|_| InvalidInput {
        field,
        value: raw.to_string(),
    })
}
