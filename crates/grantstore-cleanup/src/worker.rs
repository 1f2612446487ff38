//! Background worker for continuous token cleanup

use crate::{CleanupError, CleanupMetrics, TokenCleanup};
use grantstore_domain::OperationalStore;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Lifecycle state of a [`CleanupWorker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No loop is running
    Stopped,

    /// The scheduling loop is running
    Running,

    /// Cancellation was requested and the loop is finishing its current batch
    Stopping,
}

struct RunningLoop<S> {
    cancellation_token: CancellationToken,
    handle: JoinHandle<TokenCleanup<S>>,
}

/// Background worker that runs [`TokenCleanup`] on a schedule
///
/// The worker owns a single scheduling loop. After the startup delay it runs
/// a sweep, waits for the interval, and repeats. A new sweep never starts
/// before the previous one has returned, so sweeps of one worker never
/// overlap.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use grantstore_cleanup::{CleanupConfig, CleanupWorker, TokenCleanup};
/// use grantstore_store::SqliteStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = Arc::new(SqliteStore::new("grants.db")?);
///     let cleanup = TokenCleanup::new(CleanupConfig::default(), store)?;
///     let mut worker = CleanupWorker::new(cleanup);
///
///     worker.start()?;
///     tokio::signal::ctrl_c().await?;
///     worker.stop().await?;
///     Ok(())
/// }
/// ```
pub struct CleanupWorker<S> {
    cleanup: Option<TokenCleanup<S>>,
    shutdown_token: CancellationToken,
    running: Option<RunningLoop<S>>,
    state: WorkerState,
    metrics: Arc<watch::Sender<CleanupMetrics>>,
}

impl<S: OperationalStore + 'static> CleanupWorker<S> {
    /// Create a stopped worker around a sweeper
    pub fn new(cleanup: TokenCleanup<S>) -> Self {
        let (metrics, _) = watch::channel(cleanup.metrics().clone());
        Self {
            cleanup: Some(cleanup),
            shutdown_token: CancellationToken::new(),
            running: None,
            state: WorkerState::Stopped,
            metrics: Arc::new(metrics),
        }
    }

    /// Tie the loop to the host's shutdown token
    ///
    /// Cancelling `token` stops the loop as if [`stop`](Self::stop) had been
    /// called; `stop` must still be awaited to reap the task.
    #[must_use]
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown_token = token;
        self
    }

    /// Current lifecycle state
    ///
    /// Reports [`WorkerState::Stopping`] once the loop has exited on its own,
    /// for example after the host shutdown token was cancelled. Await
    /// [`stop`](Self::stop) to reap it before starting again.
    pub fn state(&self) -> WorkerState {
        match &self.running {
            Some(running) if self.state == WorkerState::Running && running.handle.is_finished() => {
                WorkerState::Stopping
            }
            _ => self.state,
        }
    }

    /// Whether the loop is running and has not exited on its own
    pub fn is_running(&self) -> bool {
        self.state == WorkerState::Running
            && self
                .running
                .as_ref()
                .is_some_and(|running| !running.handle.is_finished())
    }

    /// Latest metrics, updated after each sweep
    pub fn metrics(&self) -> CleanupMetrics {
        self.metrics.borrow().clone()
    }

    /// Watch metrics as sweeps complete
    pub fn subscribe(&self) -> watch::Receiver<CleanupMetrics> {
        self.metrics.subscribe()
    }

    /// Spawn the scheduling loop
    ///
    /// Does nothing if the worker is already running, or if cleanup is
    /// disabled in the configuration. Must be called from within a tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the loop exited on its own and has not been reaped
    /// with [`stop`](Self::stop) yet, or if a previous loop panicked and took
    /// the sweeper with it.
    pub fn start(&mut self) -> Result<(), CleanupError> {
        match self.state() {
            WorkerState::Stopped => {}
            WorkerState::Running => {
                tracing::debug!("Token cleanup worker already running");
                return Ok(());
            }
            WorkerState::Stopping => {
                return Err(CleanupError::Worker(
                    "cleanup loop has exited; await stop() before starting again".to_string(),
                ));
            }
        }

        let Some(cleanup) = self.cleanup.take() else {
            return Err(CleanupError::Worker(
                "sweeper was lost when a previous loop failed".to_string(),
            ));
        };

        if !cleanup.config().enabled {
            tracing::info!("Token cleanup is disabled, worker not started");
            self.cleanup = Some(cleanup);
            return Ok(());
        }

        let cancellation_token = self.shutdown_token.child_token();
        let handle = tokio::spawn(run_loop(
            cleanup,
            cancellation_token.clone(),
            self.metrics.clone(),
        ));

        self.running = Some(RunningLoop {
            cancellation_token,
            handle,
        });
        self.state = WorkerState::Running;
        Ok(())
    }

    /// Stop the scheduling loop and wait for it to exit
    ///
    /// A batch already being deleted finishes first. Safe to call when the
    /// worker was never started.
    ///
    /// # Errors
    ///
    /// Returns an error if the loop task panicked.
    pub async fn stop(&mut self) -> Result<(), CleanupError> {
        let Some(running) = self.running.as_mut() else {
            self.state = WorkerState::Stopped;
            return Ok(());
        };

        self.state = WorkerState::Stopping;
        running.cancellation_token.cancel();
        let result = (&mut running.handle).await;

        self.running = None;
        self.state = WorkerState::Stopped;

        match result {
            Ok(cleanup) => {
                self.cleanup = Some(cleanup);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Token cleanup worker task failed");
                Err(CleanupError::Worker(e.to_string()))
            }
        }
    }
}

impl<S> Drop for CleanupWorker<S> {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.cancellation_token.cancel();
        }
    }
}

/// The scheduling loop; hands the sweeper back when it exits
async fn run_loop<S: OperationalStore>(
    mut cleanup: TokenCleanup<S>,
    cancellation_token: CancellationToken,
    metrics: Arc<watch::Sender<CleanupMetrics>>,
) -> TokenCleanup<S> {
    let interval = cleanup.config().interval();
    let startup_delay = cleanup.config().startup_delay();

    tracing::info!(
        interval_secs = interval.as_secs(),
        startup_delay_secs = startup_delay.as_secs(),
        batch_size = cleanup.config().batch_size,
        "Token cleanup worker started"
    );

    let mut wait = startup_delay;
    loop {
        tokio::select! {
            biased;
            () = cancellation_token.cancelled() => break,
            () = sleep(wait) => {}
        }

        cleanup.sweep(&cancellation_token).await;
        metrics.send_replace(cleanup.metrics().clone());

        wait = interval;
    }

    tracing::info!(
        "Token cleanup worker stopped. Final metrics:\n{}",
        cleanup.metrics().summary()
    );

    cleanup
}
