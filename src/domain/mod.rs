//! Domain layer - contract bindings and form-to-call mapping

pub mod registrar;

pub use registrar::{name_hash, ContractCallParams, FormInputs, InvalidInput, Operation};
