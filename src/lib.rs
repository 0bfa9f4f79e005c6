// src/lib.rs
pub mod checker;
pub mod config;
pub mod controller;
pub mod health;
pub mod metrics;
pub mod notify;
pub mod probe;
pub mod server;
