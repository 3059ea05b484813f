//! Inbound message routing: access check, tokenizing, fire-and-forget handlers.

use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::{
    commands::{self, Command},
    config::Config,
    domain::{ChatId, InboundMessage},
    live::LiveRefresher,
    manager::port::TorrentManager,
    messaging::{
        dispatcher::{Delivery, MessageDispatcher},
        port::MessagingPort,
        types::TextFormat,
    },
    security::is_authorized,
    sorting::SortState,
    utils::{AuditEvent, AuditLogger},
};

pub const UNKNOWN_COMMAND: &str = "No such command, try /help";

/// Everything a handler needs, shared by every in-flight task.
pub struct AppContext {
    pub cfg: Config,
    pub manager: Arc<dyn TorrentManager>,
    pub dispatcher: MessageDispatcher,
    pub live: LiveRefresher,
    pub sort: SortState,
    pub audit: Option<AuditLogger>,
    /// Most recent chat that issued an authorized command; 0 when none yet.
    last_chat: AtomicI64,
}

impl AppContext {
    pub fn new(
        cfg: Config,
        manager: Arc<dyn TorrentManager>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        let dispatcher = MessageDispatcher::new(messenger, cfg.message_limit);
        let live = LiveRefresher::new(dispatcher.clone(), cfg.live);
        let audit = cfg
            .audit_log_path
            .as_ref()
            .map(|p| AuditLogger::new(p, cfg.audit_log_json));
        Self {
            cfg,
            manager,
            dispatcher,
            live,
            sort: SortState::default(),
            audit,
            last_chat: AtomicI64::new(0),
        }
    }

    pub async fn reply(&self, chat: ChatId, text: &str) -> Delivery {
        self.dispatcher.send(chat, text, TextFormat::Plain).await
    }

    pub async fn reply_html(&self, chat: ChatId, html: &str) -> Delivery {
        self.dispatcher.send(chat, html, TextFormat::Html).await
    }

    pub fn last_chat(&self) -> Option<ChatId> {
        match self.last_chat.load(Ordering::Relaxed) {
            0 => None,
            id => Some(ChatId(id)),
        }
    }

    fn remember_chat(&self, chat: ChatId) {
        self.last_chat.store(chat.0, Ordering::Relaxed);
    }

    fn audit(&self, event: AuditEvent) {
        if let Some(audit) = &self.audit {
            audit.record(event);
        }
    }
}

/// Route one inbound message.
///
/// Returns the spawned handler task, or `None` when the message was dropped.
/// Callers are not expected to await it.
pub fn dispatch(ctx: &Arc<AppContext>, msg: InboundMessage) -> Option<JoinHandle<()>> {
    let authorized = is_authorized(msg.username.as_deref(), &ctx.cfg.masters);
    ctx.audit(AuditEvent::auth(
        msg.chat_id.0,
        msg.user_id.map(|u| u.0),
        msg.username.as_deref(),
        authorized,
    ));
    if !authorized {
        tracing::info!(
            chat_id = msg.chat_id.0,
            username = msg.username.as_deref().unwrap_or("<none>"),
            "ignored message from unauthorized sender"
        );
        return None;
    }

    ctx.remember_chat(msg.chat_id);
    let chat = msg.chat_id;

    let Some((token, args)) = commands::tokenize(&msg.text) else {
        let attachment = msg.attachment?;
        let ctx = ctx.clone();
        let span = tracing::info_span!("command", chat_id = chat.0, command = "receive-file");
        return Some(tokio::spawn(
            async move { commands::receive_file(&ctx, chat, &attachment).await }.instrument(span),
        ));
    };

    ctx.audit(AuditEvent::command(
        chat.0,
        msg.username.as_deref(),
        msg.text.trim(),
    ));

    let ctx = ctx.clone();
    let Some(cmd) = Command::resolve(&token) else {
        let span = tracing::info_span!("command", chat_id = chat.0, command = %token);
        return Some(tokio::spawn(
            async move {
                tracing::debug!("unknown command");
                ctx.reply(chat, UNKNOWN_COMMAND).await;
            }
            .instrument(span),
        ));
    };

    let span = tracing::info_span!("command", chat_id = chat.0, command = cmd.name());
    Some(tokio::spawn(
        async move {
            tracing::debug!(args = ?args, "handling");
            cmd.execute(&ctx, chat, &args).await;
        }
        .instrument(span),
    ))
}
