//! Cross-messenger abstractions (Telegram today).

pub mod dispatcher;
pub mod port;
pub mod types;
