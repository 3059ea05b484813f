use async_trait::async_trait;

use crate::{
    manager::types::{AddedTorrent, Selection, SessionStats, Torrent, TorrentAction},
    Result,
};

/// Port to the download manager.
///
/// Every call is an independent request; implementations must be safe to use
/// from many tasks at once. Collections are returned in ascending id order.
#[async_trait]
pub trait TorrentManager: Send + Sync {
    async fn torrents(&self) -> Result<Vec<Torrent>>;

    /// Fails with `Error::TorrentNotFound` when no torrent has this id.
    async fn torrent(&self, id: i64) -> Result<Torrent>;

    async fn add_url(&self, url: &str) -> Result<AddedTorrent>;

    /// Returns the manager's result text (e.g. `success`).
    async fn apply(&self, action: TorrentAction, selection: Selection) -> Result<String>;

    /// Removes a torrent and returns its name.
    async fn remove(&self, id: i64, delete_data: bool) -> Result<String>;

    async fn session_stats(&self) -> Result<SessionStats>;

    async fn version(&self) -> Result<String>;
}
