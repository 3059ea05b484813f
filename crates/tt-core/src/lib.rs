//! Core domain + application logic for the Transmission Telegram bot.
//!
//! This crate is framework-agnostic. Telegram and the Transmission RPC live
//! behind ports (traits) implemented in adapter crates.

pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod live;
pub mod logging;
pub mod manager;
pub mod messaging;
pub mod notifier;
pub mod router;
pub mod security;
pub mod sorting;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use errors::{Error, Result};
