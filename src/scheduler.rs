//! Monitor scheduler.
//!
//! A [`Monitor`] owns one background worker that runs a tick every period:
//! the monitoring chain followed by the cleanup chain. Ticks never overlap.
//! Timer fires that come due while a tick is running are dropped, so the
//! next tick after a slow one waits for the next period slot.
//!
//! ```text
//!   Stopped --start()--> Running --stop()--> Stopped
//! ```

use crate::config::ConfigError;
use crate::executor::MonitorClient;
use crate::models::monitor::MonitorDefinition;
use crate::runner::{run_tick, TickReport};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, info_span, Instrument};

/// Handle to a running worker.
struct Worker {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

/// A periodically executed monitor.
pub struct Monitor {
    definition: Arc<MonitorDefinition>,
    client: MonitorClient,
    worker: Option<Worker>,
}

impl Monitor {
    /// Creates a stopped monitor.
    ///
    /// Fails if the definition's period is zero.
    pub fn new(definition: MonitorDefinition, client: MonitorClient) -> Result<Self, ConfigError> {
        if definition.period.is_zero() {
            return Err(ConfigError::Invalid(format!(
                "monitor '{}': period must be greater than 0",
                definition.name
            )));
        }

        Ok(Self {
            definition: Arc::new(definition),
            client,
            worker: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Starts the background worker. The first tick fires one period from now.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if the monitor is already running.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            panic!("monitor '{}' already started", self.definition.name);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let definition = Arc::clone(&self.definition);
        let client = self.client.clone();
        let span = info_span!("monitor", name = %self.definition.name);

        let handle = tokio::spawn(run_monitor_loop(definition, client, shutdown_rx).instrument(span));

        self.worker = Some(Worker {
            handle,
            shutdown_tx,
        });

        info!(
            monitor = %self.definition.name,
            period = %humantime::format_duration(self.definition.period),
            "monitor started"
        );
    }

    /// Stops the worker and waits for it to exit.
    ///
    /// A tick in progress is allowed to finish, cleanup chain included. No
    /// tick starts once this returns. Stopping a monitor that is not running
    /// does nothing.
    pub async fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            debug!(monitor = %self.definition.name, "stop requested but monitor is not running");
            return;
        };

        let _ = worker.shutdown_tx.send(true);
        if let Err(e) = worker.handle.await {
            error!(monitor = %self.definition.name, error = %e, "monitor worker ended abnormally");
        }

        info!(monitor = %self.definition.name, "monitor stopped");
    }

    /// Runs one tick on the caller's task, outside the schedule.
    pub async fn run_once(&self) -> TickReport {
        run_tick(&self.client, &self.definition).await
    }

    fn signal_shutdown(&self) {
        if let Some(worker) = &self.worker {
            let _ = worker.shutdown_tx.send(true);
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        // The worker exits on its own once it sees the signal.
        self.signal_shutdown();
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("name", &self.definition.name)
            .field("period", &self.definition.period)
            .field("running", &self.is_running())
            .finish()
    }
}

/// The tick loop of a single monitor.
async fn run_monitor_loop(
    definition: Arc<MonitorDefinition>,
    client: MonitorClient,
    mut shutdown: watch::Receiver<bool>,
) {
    let period = definition.period;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // End of the previous tick. A fire scheduled before it came due while
    // that tick was running.
    let mut busy_until: Option<Instant> = None;

    debug!("monitor loop starting");

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("monitor loop shutting down");
                    break;
                }
            }
            scheduled = ticker.tick() => {
                if busy_until.is_some_and(|finished| scheduled < finished) {
                    debug!("timer fired during previous tick, dropped");
                    continue;
                }
                run_tick(&client, &definition).await;
                busy_until = Some(Instant::now());
            }
        }
    }
}

/// A group of monitors started and stopped together.
#[derive(Debug, Default)]
pub struct MonitorSet {
    monitors: Vec<Monitor>,
}

impl MonitorSet {
    /// Creates one stopped monitor per definition, all sharing `client`.
    pub fn new<I>(definitions: I, client: &MonitorClient) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = MonitorDefinition>,
    {
        let monitors = definitions
            .into_iter()
            .map(|definition| Monitor::new(definition, client.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { monitors })
    }

    /// Starts every monitor that is not already running.
    pub fn start_all(&mut self) {
        for monitor in self.monitors.iter_mut().filter(|m| !m.is_running()) {
            monitor.start();
        }
        info!(count = self.monitors.len(), "all monitors started");
    }

    /// Stops every monitor, waiting for in-flight ticks to finish.
    pub async fn stop_all(&mut self) {
        for monitor in &self.monitors {
            monitor.signal_shutdown();
        }
        for monitor in &mut self.monitors {
            monitor.stop().await;
        }
        info!("all monitors stopped");
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    pub fn running_count(&self) -> usize {
        self.monitors.iter().filter(|m| m.is_running()).count()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Monitor> {
        self.monitors.iter()
    }
}
