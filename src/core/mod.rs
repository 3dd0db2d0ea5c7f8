pub mod config;
pub mod domain;
pub mod errors;
pub mod validation;

pub use domain::{Transfer, TransferIntent, TransferLookup, TransferPatch, TransferStatus};
pub use errors::BorderHopError;
