#![allow(clippy::needless_return)]
#![allow(clippy::len_zero)]
// src/lib.rs

pub mod analytics;
pub mod api;
pub mod circle;
pub mod core;
pub mod defi;
pub mod routing;
pub mod simulation;
pub mod storage;

// Monitoring module
pub mod monitoring;
pub mod network;
