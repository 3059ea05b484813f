//! Live messages: timed in-place re-renders that end in one frozen edit.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    config::LiveConfig,
    domain::MessageRef,
    formatting::Rates,
    messaging::{dispatcher::MessageDispatcher, types::TextFormat},
    Result,
};

/// What a live message shows: how to re-query and how to render.
///
/// A view captures everything the command decided at entry (count, id, sort
/// order), so every tick renders with the same parameters.
#[async_trait]
pub trait LiveView: Send + Sync + 'static {
    type Snapshot: Send + 'static;

    async fn fetch(&self) -> Result<Self::Snapshot>;

    fn render(&self, snapshot: &Self::Snapshot, rates: Rates) -> String;

    fn format(&self) -> TextFormat {
        TextFormat::Html
    }
}

/// Session lifecycle: `Active(n)` → … → `Active(0)` → `Frozen`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiveState {
    Active { ticks_remaining: u32 },
    Frozen,
}

/// Handle to a running session.
pub struct LiveHandle {
    pub anchor: MessageRef,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl LiveHandle {
    /// Stop following; the session issues its frozen edit right away.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait until the frozen edit has been issued.
    pub async fn finished(self) {
        if let Err(e) = self.task.await {
            tracing::error!("live session task failed: {e}");
        }
    }
}

type Registry = Arc<Mutex<HashMap<MessageRef, (u64, CancellationToken)>>>;

/// Spawns and tracks live sessions.
///
/// At most one session exists per anchor message: starting a new one cancels
/// the previous. `shutdown` cancels every session.
pub struct LiveRefresher {
    dispatcher: MessageDispatcher,
    cfg: LiveConfig,
    root: CancellationToken,
    sessions: Registry,
    next_generation: AtomicU64,
}

impl LiveRefresher {
    pub fn new(dispatcher: MessageDispatcher, cfg: LiveConfig) -> Self {
        Self {
            dispatcher,
            cfg,
            root: CancellationToken::new(),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.cfg.enabled && !self.root.is_cancelled() && self.dispatcher.supports_edit()
    }

    /// Sessions that have not reached `Frozen` yet.
    pub fn active_sessions(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Keep `anchor` live. `initial` is the snapshot the first render used; it
    /// backs the frozen edit if every re-query fails.
    ///
    /// Returns `None` when live mode is off.
    pub fn start<V: LiveView>(
        &self,
        anchor: MessageRef,
        view: V,
        initial: V::Snapshot,
    ) -> Option<LiveHandle> {
        if !self.is_enabled() {
            return None;
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = self.root.child_token();
        {
            let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((_, previous)) = sessions.insert(anchor, (generation, cancel.clone())) {
                tracing::debug!(
                    chat_id = anchor.chat_id.0,
                    message_id = anchor.message_id.0,
                    "replacing live session"
                );
                previous.cancel();
            }
        }

        let session = Session {
            dispatcher: self.dispatcher.clone(),
            interval: self.cfg.interval,
            anchor,
            view,
            last: initial,
            cancel: cancel.clone(),
        };
        let sessions = self.sessions.clone();
        let ticks = self.cfg.ticks;

        let task = tokio::spawn(async move {
            session.run(ticks).await;

            let mut sessions = sessions.lock().unwrap_or_else(PoisonError::into_inner);
            if sessions.get(&anchor).is_some_and(|(g, _)| *g == generation) {
                sessions.remove(&anchor);
            }
        });

        Some(LiveHandle {
            anchor,
            cancel,
            task,
        })
    }

    pub fn shutdown(&self) {
        self.root.cancel();
    }

    /// Wait until every session has frozen, up to `timeout`.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.active_sessions() > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        true
    }
}

struct Session<V: LiveView> {
    dispatcher: MessageDispatcher,
    interval: Duration,
    anchor: MessageRef,
    view: V,
    last: V::Snapshot,
    cancel: CancellationToken,
}

impl<V: LiveView> Session<V> {
    async fn run(mut self, ticks: u32) {
        let mut state = LiveState::Active {
            ticks_remaining: ticks,
        };
        while let LiveState::Active { ticks_remaining } = state {
            state = self.step(ticks_remaining).await;
        }
        tracing::debug!(
            chat_id = self.anchor.chat_id.0,
            message_id = self.anchor.message_id.0,
            "live session frozen"
        );
    }

    async fn step(&mut self, ticks_remaining: u32) -> LiveState {
        let cancelled = tokio::select! {
            _ = self.cancel.cancelled() => true,
            _ = tokio::time::sleep(self.interval) => false,
        };

        if cancelled || ticks_remaining == 0 {
            let text = self.view.render(&self.last, Rates::Frozen);
            self.dispatcher
                .edit(self.anchor, &text, self.view.format())
                .await;
            return LiveState::Frozen;
        }

        match self.view.fetch().await {
            Ok(snapshot) => {
                let text = self.view.render(&snapshot, Rates::Live);
                self.dispatcher
                    .edit(self.anchor, &text, self.view.format())
                    .await;
                self.last = snapshot;
            }
            Err(e) => {
                tracing::warn!(
                    chat_id = self.anchor.chat_id.0,
                    ticks_remaining,
                    "live refresh skipped: {e}"
                );
            }
        }

        LiveState::Active {
            ticks_remaining: ticks_remaining - 1,
        }
    }
}
