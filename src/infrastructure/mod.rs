//! Infrastructure layer - External service integrations
//!
//! This layer contains:
//! - Alloy-based wallet provider implementation
//! - Tokio runtime bridge for async operations

pub mod ethereum;
pub mod runtime;
