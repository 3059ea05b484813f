//! Transmission adapter (JSON-RPC over HTTP).
//!
//! Implements the `tt-core` TorrentManager port. Transmission guards its RPC
//! endpoint with a session id: the first request answers 409 with the id in
//! `X-Transmission-Session-Id`, and the request is replayed with it.

use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

use tt_core::{
    errors::Error,
    manager::{
        port::TorrentManager,
        types::{
            AddedTorrent, Selection, SessionStats, Torrent, TorrentAction, TorrentStatus,
            TransferStats,
        },
    },
    Result,
};

const SESSION_HEADER: &str = "X-Transmission-Session-Id";

/// Fields requested by every `torrent-get`.
const TORRENT_FIELDS: &[&str] = &[
    "id",
    "name",
    "status",
    "addedDate",
    "sizeWhenDone",
    "leftUntilDone",
    "percentDone",
    "downloadedEver",
    "uploadedEver",
    "rateDownload",
    "rateUpload",
    "uploadRatio",
    "eta",
    "error",
    "errorString",
    "trackers",
];

#[derive(Debug)]
pub struct TransmissionClient {
    url: String,
    username: Option<String>,
    password: Option<String>,
    session_id: Mutex<Option<String>>,
    http: reqwest::Client,
}

impl TransmissionClient {
    pub fn new(
        url: impl Into<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Rpc(format!("http client: {e}")))?;
        Ok(Self {
            url: url.into(),
            username,
            password,
            session_id: Mutex::new(None),
            http,
        })
    }

    fn current_session(&self) -> Option<String> {
        self.session_id
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn store_session(&self, id: String) {
        *self.session_id.lock().unwrap_or_else(|e| e.into_inner()) = Some(id);
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response> {
        let mut req = self.http.post(&self.url).json(body);
        if let Some(user) = &self.username {
            req = req.basic_auth(user, self.password.as_deref());
        }
        if let Some(id) = self.current_session() {
            req = req.header(SESSION_HEADER, id);
        }
        req.send().await.map_err(|e| Error::Rpc(e.to_string()))
    }

    /// Run one RPC method and return its `arguments` object.
    async fn call(&self, method: &str, arguments: Value) -> Result<Value> {
        let body = json!({ "method": method, "arguments": arguments });

        let mut resp = self.post(&body).await?;
        if resp.status() == StatusCode::CONFLICT {
            let id = resp
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| Error::Rpc("409 without a session id".to_string()))?
                .to_string();
            tracing::debug!("transmission session id refreshed");
            self.store_session(id);
            resp = self.post(&body).await?;
        }

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Rpc("unauthorized, check TR_AUTH".to_string()));
        }
        if !status.is_success() {
            return Err(Error::Rpc(format!("{method}: http {status}")));
        }

        let v: Value = resp
            .json()
            .await
            .map_err(|e| Error::Rpc(format!("{method}: {e}")))?;
        unwrap_response(v)
    }

    async fn query(&self, ids: Option<&[i64]>) -> Result<Vec<Torrent>> {
        let mut args = json!({ "fields": TORRENT_FIELDS });
        if let Some(ids) = ids {
            args["ids"] = json!(ids);
        }
        parse_torrents(self.call("torrent-get", args).await?)
    }
}

/// `arguments` of a successful response; `result` other than `success` is an error.
fn unwrap_response(v: Value) -> Result<Value> {
    let result = v.get("result").and_then(Value::as_str).unwrap_or("");
    if result != "success" {
        let msg = if result.is_empty() { "malformed response" } else { result };
        return Err(Error::Rpc(msg.to_string()));
    }
    Ok(v.get("arguments").cloned().unwrap_or(Value::Null))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTracker {
    announce: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTorrent {
    id: i64,
    #[serde(default)]
    name: String,
    status: i64,
    #[serde(default)]
    added_date: i64,
    #[serde(default)]
    size_when_done: u64,
    #[serde(default)]
    left_until_done: u64,
    #[serde(default)]
    percent_done: f64,
    #[serde(default)]
    downloaded_ever: u64,
    #[serde(default)]
    uploaded_ever: u64,
    #[serde(default)]
    rate_download: u64,
    #[serde(default)]
    rate_upload: u64,
    #[serde(default)]
    upload_ratio: f64,
    #[serde(default)]
    eta: i64,
    #[serde(default)]
    error: i64,
    #[serde(default)]
    error_string: String,
    #[serde(default)]
    trackers: Vec<RawTracker>,
}

impl From<RawTorrent> for Torrent {
    fn from(raw: RawTorrent) -> Self {
        let status = TorrentStatus::from_code(raw.status).unwrap_or_else(|| {
            tracing::warn!(id = raw.id, code = raw.status, "unknown torrent status");
            TorrentStatus::Stopped
        });
        Torrent {
            id: raw.id,
            name: raw.name,
            status,
            added_date: raw.added_date,
            size_when_done: raw.size_when_done,
            left_until_done: raw.left_until_done,
            percent_done: raw.percent_done,
            downloaded_ever: raw.downloaded_ever,
            uploaded_ever: raw.uploaded_ever,
            rate_download: raw.rate_download,
            rate_upload: raw.rate_upload,
            upload_ratio: raw.upload_ratio,
            eta: raw.eta,
            error: raw.error,
            error_string: raw.error_string,
            trackers: raw.trackers.into_iter().map(|t| t.announce).collect(),
        }
    }
}

/// `torrent-get` arguments, in ascending id order.
fn parse_torrents(args: Value) -> Result<Vec<Torrent>> {
    #[derive(Deserialize)]
    struct Args {
        #[serde(default)]
        torrents: Vec<RawTorrent>,
    }
    let args: Args = serde_json::from_value(args)?;
    let mut out: Vec<Torrent> = args.torrents.into_iter().map(Torrent::from).collect();
    out.sort_by_key(|t| t.id);
    Ok(out)
}

/// `torrent-add` arguments: either `torrent-added` or `torrent-duplicate`.
fn parse_added(args: Value) -> Result<AddedTorrent> {
    #[derive(Deserialize)]
    struct Entry {
        id: i64,
        #[serde(default)]
        name: String,
    }
    #[derive(Deserialize)]
    struct Args {
        #[serde(rename = "torrent-added")]
        added: Option<Entry>,
        #[serde(rename = "torrent-duplicate")]
        duplicate: Option<Entry>,
    }

    let args: Args = serde_json::from_value(args)?;
    match (args.added, args.duplicate) {
        (Some(e), _) => Ok(AddedTorrent {
            id: e.id,
            name: e.name,
            duplicate: false,
        }),
        (None, Some(e)) => Ok(AddedTorrent {
            id: e.id,
            name: e.name,
            duplicate: true,
        }),
        (None, None) => Ok(AddedTorrent {
            id: 0,
            name: String::new(),
            duplicate: false,
        }),
    }
}

fn parse_stats(args: Value) -> Result<SessionStats> {
    #[derive(Deserialize, Default)]
    #[serde(rename_all = "camelCase", default)]
    struct RawTransfer {
        uploaded_bytes: u64,
        downloaded_bytes: u64,
        files_added: u64,
        session_count: u64,
        seconds_active: u64,
    }
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RawStats {
        #[serde(default)]
        torrent_count: u64,
        #[serde(default)]
        active_torrent_count: u64,
        #[serde(default)]
        paused_torrent_count: u64,
        #[serde(default)]
        download_speed: u64,
        #[serde(default)]
        upload_speed: u64,
        #[serde(rename = "current-stats", default)]
        current: RawTransfer,
        #[serde(rename = "cumulative-stats", default)]
        cumulative: RawTransfer,
    }

    fn transfer(raw: RawTransfer) -> TransferStats {
        TransferStats {
            uploaded_bytes: raw.uploaded_bytes,
            downloaded_bytes: raw.downloaded_bytes,
            files_added: raw.files_added,
            session_count: raw.session_count,
            seconds_active: raw.seconds_active,
        }
    }

    let raw: RawStats = serde_json::from_value(args)?;
    Ok(SessionStats {
        torrent_count: raw.torrent_count,
        active_torrent_count: raw.active_torrent_count,
        paused_torrent_count: raw.paused_torrent_count,
        download_speed: raw.download_speed,
        upload_speed: raw.upload_speed,
        current: transfer(raw.current),
        cumulative: transfer(raw.cumulative),
    })
}

fn action_method(action: TorrentAction) -> &'static str {
    match action {
        TorrentAction::Start => "torrent-start",
        TorrentAction::Stop => "torrent-stop",
        TorrentAction::Verify => "torrent-verify",
    }
}

fn selection_args(selection: Selection) -> Value {
    match selection {
        Selection::All => json!({}),
        Selection::One(id) => json!({ "ids": [id] }),
    }
}

#[async_trait]
impl TorrentManager for TransmissionClient {
    async fn torrents(&self) -> Result<Vec<Torrent>> {
        self.query(None).await
    }

    async fn torrent(&self, id: i64) -> Result<Torrent> {
        self.query(Some(&[id]))
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or(Error::TorrentNotFound(id))
    }

    async fn add_url(&self, url: &str) -> Result<AddedTorrent> {
        let args = self.call("torrent-add", json!({ "filename": url })).await?;
        let added = parse_added(args)?;
        tracing::info!(id = added.id, name = %added.name, duplicate = added.duplicate, "torrent added");
        Ok(added)
    }

    async fn apply(&self, action: TorrentAction, selection: Selection) -> Result<String> {
        self.call(action_method(action), selection_args(selection))
            .await?;
        Ok("success".to_string())
    }

    async fn remove(&self, id: i64, delete_data: bool) -> Result<String> {
        let torrent = self.torrent(id).await?;
        self.call(
            "torrent-remove",
            json!({ "ids": [id], "delete-local-data": delete_data }),
        )
        .await?;
        tracing::info!(id, name = %torrent.name, delete_data, "torrent removed");
        Ok(torrent.name)
    }

    async fn session_stats(&self) -> Result<SessionStats> {
        parse_stats(self.call("session-stats", json!({})).await?)
    }

    async fn version(&self) -> Result<String> {
        let args = self.call("session-get", json!({ "fields": ["version"] })).await?;
        args.get("version")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Rpc("session-get: no version".to_string()))
    }
}
