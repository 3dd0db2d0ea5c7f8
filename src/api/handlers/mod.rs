//! HTTP handlers, split by route group.

pub mod analytics;
pub mod circle;
pub mod defi;
pub mod health;
pub mod remittance;

pub use health::{health_check, metrics, not_found, service_info};
