//! Wallet connection and contract call dispatch

pub mod connection;
pub mod dispatch;
#[cfg(test)]
pub(crate) mod mock;

pub use connection::{
    should_attempt_connect, ConnectionManager, ConnectionState, Phase, ToggleOutcome,
};
pub use dispatch::{DispatchError, Dispatcher};
