use std::{process::ExitCode, sync::Arc};

use tt_core::{
    config::{Config, USAGE},
    manager::port::TorrentManager,
};
use tt_transmission::TransmissionClient;

#[tokio::main]
async fn main() -> ExitCode {
    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = tt_core::logging::init("tt", cfg.log_file.as_deref()) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: Config) -> anyhow::Result<()> {
    let client = TransmissionClient::new(
        cfg.rpc_url.clone(),
        cfg.rpc_username.clone(),
        cfg.rpc_password.clone(),
    )?;

    // Fail fast on a wrong URL or credentials.
    let version = client
        .version()
        .await
        .map_err(|e| anyhow::anyhow!("can't reach transmission at {}: {e}", cfg.rpc_url))?;
    tracing::info!(%version, url = %cfg.rpc_url, "connected to transmission");

    let manager: Arc<dyn TorrentManager> = Arc::new(client);
    tt_telegram::router::run_polling(cfg, manager).await
}
