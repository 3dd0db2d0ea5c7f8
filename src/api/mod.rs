// src/api/mod.rs

pub mod handlers;
pub mod server;
pub mod server_config; // Server limits
pub mod types;

pub use server::{AppState, BorderHopServer};
