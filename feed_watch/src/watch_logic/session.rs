use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use lib_feedsync::core::{EngineHandle, FeedEngine, Trigger};
use lib_feedsync::endpoints::{AuthClient, CacheStatsEndpoint, FeedEndpoint, TweetComposer, UserSearch};
use lib_feedsync::ingestors::TelemetryReader;
use lib_feedsync::model::{Credential, Record, TelemetrySnapshot};
use lib_feedsync::retrieve::ApiClient;

use super::commands::{Command, HELP, simulated_scroll};
use super::config::{Login, Settings};

/// Runs the watcher until Ctrl-C, SIGTERM, `quit`, or a fatal engine halt.
pub async fn run(settings: Settings) -> Result<()> {
    let anonymous = ApiClient::new(&settings.base_url, None, settings.client.clone())?;
    let credential = obtain_credential(&settings.login, &anonymous).await?;
    let client = anonymous.with_credential(Some(credential));
    let shutdown = CancellationToken::new();

    // --- Feed engine ---
    let engine = Arc::new(FeedEngine::new(FeedEndpoint::new(client.clone()), settings.engine.clone()));
    log::info!("watching {} in {} mode", client.base_url(), engine.config().mode);
    let handle = Arc::clone(&engine).mount();
    let view_task = tokio::spawn(log_view_changes(engine.subscribe(), shutdown.clone()));

    // --- Cache telemetry ---
    let reader = Arc::new(TelemetryReader::new(
        CacheStatsEndpoint::new(client.clone()),
        settings.telemetry_interval,
    ));
    let telemetry_task = tokio::spawn({
        let reader = Arc::clone(&reader);
        let shutdown = shutdown.clone();
        async move { reader.run(shutdown).await }
    });
    let telemetry_log_task = tokio::spawn(log_telemetry_changes(reader.subscribe(), shutdown.clone()));

    // --- Console commands ---
    let console = Console {
        handle: &handle,
        composer: TweetComposer::new(client.clone()),
        search: UserSearch::new(client),
    };

    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = terminate() => {
            log::info!("SIGTERM received, initiating shutdown.");
        }
        _ = console.read_stdin() => {
            log::info!("quit requested, initiating shutdown.");
        }
        _ = engine.unmounted() => {
            log::error!("feed synchronization halted: {}", engine.sync_state().last_error.unwrap_or_default());
        }
    }

    shutdown.cancel();
    handle.shutdown().await;
    let (view, telemetry, telemetry_log) = tokio::join!(view_task, telemetry_task, telemetry_log_task);
    check_task("view logger", view);
    check_task("telemetry reader", telemetry);
    check_task("telemetry logger", telemetry_log);

    log::info!("Shutdown complete.");
    Ok(())
}

/// Logs a task that panicked or was aborted. Returns whether it ended cleanly.
fn check_task(name: &str, outcome: Result<(), JoinError>) -> bool {
    match outcome {
        Ok(()) => true,
        Err(e) => {
            log::warn!("{name} task ended abnormally: {e}");
            false
        }
    }
}

async fn obtain_credential(login: &Login, client: &ApiClient) -> Result<Credential> {
    match login {
        Login::Token(token) => Ok(Credential::new(token.clone())),
        Login::Password { username, password } => {
            let session = AuthClient::new(client)
                .login(username, password)
                .await
                .with_context(|| format!("login as {username} failed"))?;
            Ok(session.credential)
        }
    }
}

async fn terminate() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term_signal) => {
                term_signal.recv().await;
            }
            Err(e) => {
                log::warn!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        // On non-unix platforms, just wait forever.
        std::future::pending::<()>().await;
    }
}

struct Console<'a> {
    handle: &'a EngineHandle<FeedEndpoint>,
    composer: TweetComposer,
    search: UserSearch,
}

impl Console<'_> {
    /// Reads commands until `quit`. End of input only stops reading.
    async fn read_stdin(&self) {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match line.parse::<Command>() {
                    Ok(Command::Quit) => return,
                    Ok(command) => self.execute(command).await,
                    Err(message) => log::warn!("{message}"),
                },
                Ok(None) => {
                    log::debug!("stdin closed; console commands disabled");
                    std::future::pending::<()>().await;
                }
                Err(e) => {
                    log::warn!("cannot read stdin: {e}");
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    async fn execute(&self, command: Command) {
        let engine = self.handle.engine();
        match command {
            Command::End | Command::Top => {
                let position = simulated_scroll(engine.records().len(), command == Command::End);
                if !self.handle.scroll(position) {
                    log::warn!("feed engine is no longer mounted");
                }
            }
            Command::Post(text) => match self.composer.create(&text).await {
                Ok(record) => engine.insert_created(record),
                Err(e) => log::warn!("post failed: {e}"),
            },
            Command::Search(name) => match self.search.search(&name).await {
                Ok(found) => {
                    log::info!(
                        "{} ({}) has {} tweets",
                        found.user.username,
                        found.user.role.as_deref().unwrap_or("no role"),
                        found.tweets.len()
                    );
                    for record in found.tweets.iter().take(5) {
                        log::info!("  {}", describe(record));
                    }
                }
                Err(e) => log::warn!("search failed: {e}"),
            },
            Command::Status => {
                let state = engine.sync_state();
                log::info!(
                    "{} records | in flight: {} | exhausted: {} | error: {}",
                    engine.records().len(),
                    state.in_flight,
                    state.exhausted,
                    state.last_error.as_deref().unwrap_or("none")
                );
            }
            Command::Dismiss => engine.dismiss_error(),
            Command::Help => log::info!("{HELP}"),
            Command::Refresh => match engine.synchronize(Trigger::Manual).await {
                Ok(outcome) => log::info!("refresh: {outcome:?}"),
                Err(e) => log::warn!("refresh failed: {e}"),
            },
            Command::Quit => {}
        }
    }
}

async fn log_view_changes(mut view: watch::Receiver<Arc<[Record]>>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let records = Arc::clone(&view.borrow_and_update());
                match records.first() {
                    Some(head) => log::info!("feed: {} records, newest {}", records.len(), describe(head)),
                    None => log::info!("feed: empty"),
                }
            }
        }
    }
}

async fn log_telemetry_changes(mut snapshot: watch::Receiver<Option<TelemetrySnapshot>>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = snapshot.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(stats) = snapshot.borrow_and_update().as_ref() {
                    log::info!("cache: {}", stats.summary());
                }
            }
        }
    }
}

fn describe(record: &Record) -> String {
    let when = record
        .created_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "undated".to_string());
    format!("#{} by {} at {}: {}", record.id, record.author, when, record.content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn panicked_task_is_reported_at_shutdown() {
        let clean = tokio::spawn(async {});
        let panicked = tokio::spawn(async { panic!("telemetry poll exploded") });
        assert!(check_task("clean", clean.await));
        assert!(!check_task("telemetry reader", panicked.await));
    }

    #[test]
    fn describe_marks_undated_records() {
        let record = Record::new(3_i64, "hello", "ada");
        assert_eq!(describe(&record), "#3 by ada at undated: hello");
    }
}
