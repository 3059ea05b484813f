use std::{sync::Arc, time::Duration};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tt_core::{
    config::Config, manager::port::TorrentManager, messaging::port::MessagingPort,
    notifier::watch_completions, router::AppContext,
};

use crate::handlers;
use crate::TelegramMessenger;

/// How long frozen edits may take after the dispatcher stops.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub async fn run_polling(cfg: Config, manager: Arc<dyn TorrentManager>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let me = bot.get_me().await?;
    tracing::info!(
        bot = %me.username(),
        masters = cfg.masters.len(),
        live = cfg.live.enabled,
        "transmission-telegram started"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let ctx = Arc::new(AppContext::new(cfg, manager, messenger));

    let notifier_cancel = CancellationToken::new();
    let notifier = ctx.cfg.transmission_log_file.clone().map(|path| {
        tokio::spawn(watch_completions(
            ctx.clone(),
            path,
            notifier_cancel.clone(),
        ))
    });

    let handler = Update::filter_message().endpoint(handlers::handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![ctx.clone()])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("shutting down");
    if let Some(task) = notifier {
        stop_notifier(&notifier_cancel, task).await;
    }

    ctx.live.shutdown();
    if !ctx.live.wait_idle(SHUTDOWN_GRACE).await {
        tracing::warn!(
            sessions = ctx.live.active_sessions(),
            "live sessions still running at exit"
        );
    }

    Ok(())
}

/// Cancel the completion notifier and wait for it. Returns false if the task
/// panicked or was aborted.
async fn stop_notifier(cancel: &CancellationToken, task: JoinHandle<()>) -> bool {
    cancel.cancel();
    match task.await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("completion notifier task failed: {e}");
            false
        }
    }
}
