use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use calconduit_core::{paths, ConfigError, Settings};
use calconduit_sync::{pipeline, RunOptions, RunReport};

use crate::error::{io_err, DaemonError};

const ROTATION_PERIOD: Duration = Duration::from_secs(5);

/// Set to `json` to emit JSON lines instead of human-readable output.
pub const ENV_LOG_FORMAT: &str = "CALCONDUIT_LOG_FORMAT";

#[derive(Debug, Clone, Default)]
pub struct DaemonOptions {
    /// Overrides `interval_secs` from settings.
    pub interval: Option<Duration>,
    /// Overrides `<home>/.calconduit/calendars.yaml`.
    pub registry: Option<PathBuf>,
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path, options: DaemonOptions) -> Result<(), DaemonError> {
    init_tracing("info");
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf(), options))
}

/// Run the scheduler, log rotation and signal tasks until ctrl-c.
pub async fn run(home: PathBuf, options: DaemonOptions) -> Result<(), DaemonError> {
    let logs = paths::logs_dir(&home);
    fs::create_dir_all(&logs).map_err(|e| io_err(&logs, e))?;

    let period = match options.interval {
        Some(period) => period,
        None => Settings::load_at(&home)?.interval(),
    };
    tracing::info!(
        home = %home.display(),
        interval_secs = period.as_secs(),
        "calconduit daemon starting"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let scheduler_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let registry = options.registry.clone();
        tokio::spawn(async move {
            let tick = move || pipeline::run_at(&home, registry.as_deref(), &RunOptions::default());
            let result = scheduler_task(period, tick, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let rotation_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        tokio::spawn(async move {
            let result = log_rotation_task(home, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => match signal {
                    Ok(()) => {
                        tracing::info!("received ctrl-c, shutting down daemon");
                        let _ = shutdown.send(());
                        Ok(())
                    }
                    Err(err) => Err(io_err("ctrl-c handler", err)),
                },
            }
        })
    };

    let (scheduler_result, rotation_result, signal_result) =
        tokio::join!(scheduler_handle, rotation_handle, signal_handle);

    handle_join("scheduler", scheduler_result)?;
    handle_join("log_rotation", rotation_result)?;
    handle_join("signal_handler", signal_result)?;
    tracing::info!("calconduit daemon stopped");
    Ok(())
}

/// Call `tick` on the blocking pool now and then every `period`.
///
/// A tick that fails with a `ConfigError` is logged and the schedule goes on.
/// Shutdown is only observed between ticks, so a run in flight completes.
async fn scheduler_task<F>(
    period: Duration,
    tick: F,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError>
where
    F: Fn() -> Result<RunReport, ConfigError> + Send + Sync + 'static,
{
    let tick = Arc::new(tick);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                let tick = tick.clone();
                let result = tokio::task::spawn_blocking(move || tick())
                    .await
                    .map_err(|err| DaemonError::Join(format!("sync run join error: {err}")))?;
                match result {
                    Ok(report) => tracing::info!(
                        calendars = report.results.len(),
                        failed = report.failed(),
                        notable = report.notable(),
                        "scheduled sync complete"
                    ),
                    Err(err) => tracing::error!(
                        error = %err,
                        "scheduled sync skipped; retrying next interval"
                    ),
                }
            }
        }
    }
    Ok(())
}

async fn log_rotation_task(
    home: PathBuf,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut interval = tokio::time::interval(ROTATION_PERIOD);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await; // the first tick is immediate

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                let home = home.clone();
                tokio::task::spawn_blocking(move || crate::log_rotation::rotate_sync_log(&home))
                    .await
                    .ok();
            }
        }
    }
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Join(format!("{task} task join failure: {err}"))),
    }
}

/// Install the global stderr subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Later calls are no-ops.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let json = std::env::var(ENV_LOG_FORMAT).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.with_target(false).try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use calconduit_core::StaticRegistry;
    use calconduit_sync::fakes::{FakeFetcher, FakePublisher};
    use calconduit_sync::MemorySyncLog;
    use tempfile::TempDir;

    fn empty_run() -> Result<RunReport, ConfigError> {
        calconduit_sync::run(
            &StaticRegistry::default(),
            &FakeFetcher::new(),
            &FakePublisher::new(),
            &mut MemorySyncLog::new(),
            &RunOptions::default(),
        )
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn scheduler_keeps_ticking_after_config_errors() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

        let counter = ticks.clone();
        let handle = tokio::spawn(scheduler_task(
            Duration::from_secs(60),
            move || {
                if counter.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                    Err(ConfigError::MissingCredentials)
                } else {
                    empty_run()
                }
            },
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_secs(150)).await;
        shutdown_tx.send(()).expect("send shutdown");
        handle.await.expect("join").expect("scheduler");

        assert!(
            ticks.load(Ordering::SeqCst) >= 2,
            "a failed tick must not stop the schedule"
        );
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn scheduler_exits_on_shutdown() {
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        let handle = tokio::spawn(scheduler_task(
            Duration::from_secs(3600),
            empty_run,
            shutdown_rx,
        ));
        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown_tx.send(()).expect("send shutdown");
        assert!(handle.await.expect("join").is_ok());
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn rotation_task_exits_on_shutdown() {
        let home = TempDir::new().expect("home");
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        let handle = tokio::spawn(log_rotation_task(home.path().to_path_buf(), shutdown_rx));

        tokio::time::sleep(ROTATION_PERIOD * 3).await;
        shutdown_tx.send(()).expect("send shutdown");
        assert!(handle.await.expect("join").is_ok());
    }

    #[test]
    fn join_failure_names_the_task() {
        let ok: Result<Result<(), DaemonError>, tokio::task::JoinError> = Ok(Ok(()));
        assert!(handle_join("scheduler", ok).is_ok());
        let inner: Result<Result<(), DaemonError>, tokio::task::JoinError> =
            Ok(Err(DaemonError::Join("boom".into())));
        assert!(handle_join("scheduler", inner).is_err());
    }
}
