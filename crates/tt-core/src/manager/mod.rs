//! Download-manager abstraction (Transmission today).

pub mod port;
pub mod types;
