//! In-memory messenger and manager used by the unit tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    config::{Config, LiveConfig, TELEGRAM_MESSAGE_LIMIT},
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    manager::{
        port::TorrentManager,
        types::{AddedTorrent, Selection, SessionStats, Torrent, TorrentAction, TorrentStatus},
    },
    messaging::{
        port::MessagingPort,
        types::{ChatAction, MessagingCapabilities, TextFormat},
    },
    router::AppContext,
    Result,
};

pub fn torrent(id: i64, name: &str, size: u64) -> Torrent {
    Torrent {
        id,
        name: name.to_string(),
        status: TorrentStatus::Downloading,
        added_date: id * 100,
        size_when_done: size,
        left_until_done: 0,
        percent_done: 0.0,
        downloaded_ever: 0,
        uploaded_ever: 0,
        rate_download: 0,
        rate_upload: 0,
        upload_ratio: 0.0,
        eta: -1,
        error: 0,
        error_string: String::new(),
        trackers: Vec::new(),
    }
}

pub fn torrent_with(id: i64, name: &str, f: impl FnOnce(&mut Torrent)) -> Torrent {
    let mut t = torrent(id, name, 0);
    f(&mut t);
    t
}

#[derive(Default)]
struct MessengerState {
    next_id: i32,
    send_attempts: usize,
    fail_send_numbers: Vec<usize>,
    fail_actions: bool,
    no_chat_actions: bool,
    fail_edits: bool,
    file_urls: HashMap<String, String>,
}

#[derive(Default)]
pub struct FakeMessenger {
    state: Mutex<MessengerState>,
    pub actions: Mutex<Vec<ChatId>>,
    sends: Mutex<Vec<(ChatId, String, TextFormat)>>,
    edits: Mutex<Vec<(MessageRef, String)>>,
}

impl FakeMessenger {
    pub fn new() -> Self {
        let api = Self::default();
        api.state.lock().unwrap().next_id = 1;
        api
    }

    pub fn message_ref(&self, chat: i64, msg: i32) -> MessageRef {
        MessageRef {
            chat_id: ChatId(chat),
            message_id: MessageId(msg),
        }
    }

    pub fn sent(&self) -> Vec<(ChatId, String, TextFormat)> {
        self.sends.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, text, _)| text).collect()
    }

    pub fn edit_texts(&self) -> Vec<String> {
        self.edits
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn fail_actions(&self, fail: bool) {
        self.state.lock().unwrap().fail_actions = fail;
    }

    /// Report no chat-action support; applies to dispatchers built afterwards.
    pub fn disable_chat_actions(&self) {
        self.state.lock().unwrap().no_chat_actions = true;
    }

    /// Fail the `n`th send attempt (1-based).
    pub fn fail_send_number(&self, n: usize) {
        self.state.lock().unwrap().fail_send_numbers.push(n);
    }

    pub fn fail_edits(&self, fail: bool) {
        self.state.lock().unwrap().fail_edits = fail;
    }

    pub fn set_file_url(&self, file_id: &str, url: &str) {
        self.state
            .lock()
            .unwrap()
            .file_urls
            .insert(file_id.to_string(), url.to_string());
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_html: true,
            supports_edit: true,
            supports_chat_actions: !self.state.lock().unwrap().no_chat_actions,
            max_message_len: TELEGRAM_MESSAGE_LIMIT,
        }
    }

    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        format: TextFormat,
    ) -> Result<MessageRef> {
        let id = {
            let mut st = self.state.lock().unwrap();
            st.send_attempts += 1;
            if st.fail_send_numbers.contains(&st.send_attempts) {
                return Err(Error::External("send failed".to_string()));
            }
            let id = st.next_id;
            st.next_id += 1;
            id
        };
        self.sends
            .lock()
            .unwrap()
            .push((chat_id, text.to_string(), format));
        Ok(self.message_ref(chat_id.0, id))
    }

    async fn edit_message(&self, msg: MessageRef, text: &str, _format: TextFormat) -> Result<()> {
        if self.state.lock().unwrap().fail_edits {
            return Err(Error::External("edit failed".to_string()));
        }
        self.edits.lock().unwrap().push((msg, text.to_string()));
        Ok(())
    }

    async fn send_chat_action(&self, chat_id: ChatId, _action: ChatAction) -> Result<()> {
        if self.state.lock().unwrap().fail_actions {
            return Err(Error::External("action failed".to_string()));
        }
        self.actions.lock().unwrap().push(chat_id);
        Ok(())
    }

    async fn file_url(&self, file_id: &str) -> Result<String> {
        self.state
            .lock()
            .unwrap()
            .file_urls
            .get(file_id)
            .cloned()
            .ok_or_else(|| Error::External("no such file".to_string()))
    }
}

#[derive(Default)]
struct ManagerState {
    torrents: Vec<Torrent>,
    stats: SessionStats,
    /// Outcome of upcoming queries; exhausted means success.
    script: VecDeque<bool>,
    duplicates: HashMap<String, i64>,
    fail_applies: bool,
}

#[derive(Default)]
pub struct FakeManager {
    state: Mutex<ManagerState>,
    pub added: Mutex<Vec<String>>,
    pub applied: Mutex<Vec<(TorrentAction, Selection)>>,
    pub removed: Mutex<Vec<(i64, bool)>>,
}

impl FakeManager {
    pub fn new(torrents: Vec<Torrent>) -> Self {
        let manager = Self::default();
        manager.set_torrents(torrents);
        manager
    }

    pub fn set_torrents(&self, torrents: Vec<Torrent>) {
        self.state.lock().unwrap().torrents = torrents;
    }

    pub fn set_stats(&self, stats: SessionStats) {
        self.state.lock().unwrap().stats = stats;
    }

    pub fn fail_next_queries(&self, n: usize) {
        let mut st = self.state.lock().unwrap();
        st.script.extend(std::iter::repeat(false).take(n));
    }

    /// Queue outcomes for upcoming queries (`torrents`, `torrent`, `session_stats`).
    pub fn script_queries(&self, outcomes: &[bool]) {
        self.state.lock().unwrap().script.extend(outcomes.iter().copied());
    }

    pub fn set_duplicate_url(&self, url: &str, id: i64) {
        self.state
            .lock()
            .unwrap()
            .duplicates
            .insert(url.to_string(), id);
    }

    pub fn fail_applies(&self, fail: bool) {
        self.state.lock().unwrap().fail_applies = fail;
    }

    fn query(&self) -> Result<()> {
        match self.state.lock().unwrap().script.pop_front() {
            Some(false) => Err(Error::Rpc("connection refused".to_string())),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl TorrentManager for FakeManager {
    async fn torrents(&self) -> Result<Vec<Torrent>> {
        self.query()?;
        Ok(self.state.lock().unwrap().torrents.clone())
    }

    async fn torrent(&self, id: i64) -> Result<Torrent> {
        self.query()?;
        self.state
            .lock()
            .unwrap()
            .torrents
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(Error::TorrentNotFound(id))
    }

    async fn add_url(&self, url: &str) -> Result<AddedTorrent> {
        self.added.lock().unwrap().push(url.to_string());
        let mut st = self.state.lock().unwrap();

        if let Some(id) = st.duplicates.get(url).copied() {
            let name = st
                .torrents
                .iter()
                .find(|t| t.id == id)
                .map(|t| t.name.clone())
                .unwrap_or_default();
            return Ok(AddedTorrent {
                id,
                name,
                duplicate: true,
            });
        }
        if url.contains("bad") {
            return Err(Error::Rpc("invalid or corrupt torrent file".to_string()));
        }

        let id = st.torrents.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let name = if url.contains("empty") {
            String::new()
        } else {
            url.rsplit('/').next().unwrap_or(url).to_string()
        };
        st.torrents.push(torrent(id, &name, 0));
        Ok(AddedTorrent {
            id,
            name,
            duplicate: false,
        })
    }

    async fn apply(&self, action: TorrentAction, selection: Selection) -> Result<String> {
        if self.state.lock().unwrap().fail_applies {
            return Err(Error::Rpc("method failed".to_string()));
        }
        self.applied.lock().unwrap().push((action, selection));
        Ok("success".to_string())
    }

    async fn remove(&self, id: i64, delete_data: bool) -> Result<String> {
        let mut st = self.state.lock().unwrap();
        let pos = st
            .torrents
            .iter()
            .position(|t| t.id == id)
            .ok_or(Error::TorrentNotFound(id))?;
        let removed = st.torrents.remove(pos);
        self.removed.lock().unwrap().push((id, delete_data));
        Ok(removed.name)
    }

    async fn session_stats(&self) -> Result<SessionStats> {
        self.query()?;
        Ok(self.state.lock().unwrap().stats)
    }

    async fn version(&self) -> Result<String> {
        Ok("4.0.5".to_string())
    }
}

pub fn test_config() -> Config {
    Config {
        telegram_bot_token: "test-token".to_string(),
        masters: vec!["bob".to_string()],
        message_limit: TELEGRAM_MESSAGE_LIMIT,
        rpc_url: "http://localhost:9091/transmission/rpc".to_string(),
        rpc_username: None,
        rpc_password: None,
        transmission_log_file: None,
        live: LiveConfig {
            enabled: true,
            interval: Duration::from_millis(1),
            ticks: 2,
        },
        log_file: None,
        audit_log_path: None,
        audit_log_json: false,
    }
}

pub fn context(
    torrents: Vec<Torrent>,
) -> (Arc<AppContext>, Arc<FakeMessenger>, Arc<FakeManager>) {
    context_with(torrents, |_| {})
}

pub fn context_with(
    torrents: Vec<Torrent>,
    configure: impl FnOnce(&mut Config),
) -> (Arc<AppContext>, Arc<FakeMessenger>, Arc<FakeManager>) {
    let mut cfg = test_config();
    configure(&mut cfg);
    let api = Arc::new(FakeMessenger::new());
    let manager = Arc::new(FakeManager::new(torrents));
    let ctx = Arc::new(AppContext::new(cfg, manager.clone(), api.clone()));
    (ctx, api, manager)
}
