use anyhow::Result;

mod watch_logic;
use watch_logic::{config, session};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = config::load_config()?;
    let log_path = lib_feedsync::loggers::setup_logging(&settings.log_dir, "feed_watch", &settings.log_level)?;
    log::info!("logging to {}", log_path.display());

    session::run(settings).await
}
