/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so command handlers
/// can report failures consistently (command-scoped reply vs log-only).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no torrent with id {0}")]
    TorrentNotFound(i64),

    #[error("transmission: {0}")]
    Rpc(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
