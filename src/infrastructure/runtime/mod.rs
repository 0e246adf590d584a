//! Runtime infrastructure - Tokio runtime bridge for async operations

mod bridge;
mod worker;

pub use bridge::{
    ConnectionSnapshot, RuntimeBridge, RuntimeCommand, RuntimeEvent, WorkerSettings,
};
