//! Chain runner.
//!
//! Executes an ordered list of [`RequestSpec`]s, threading one
//! [`VariableStore`] through them. A monitoring chain stops at its first
//! failure; a cleanup chain reports failures and keeps going. One tick runs
//! the monitoring chain from a freshly seeded store and then the cleanup
//! chain from whatever store the monitoring chain ended with.

use crate::executor::{execute, ExecutionError, MonitorClient};
use crate::models::monitor::MonitorDefinition;
use crate::models::request::RequestSpec;
use crate::variables::{builtin_variables, Variable, VariableStore};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Which chain of a monitor is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    Monitoring,
    Cleanup,
}

impl ChainKind {
    /// Whether the first failure ends the chain.
    pub fn stop_on_error(self) -> bool {
        matches!(self, ChainKind::Monitoring)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChainKind::Monitoring => "monitoring",
            ChainKind::Cleanup => "cleanup",
        }
    }
}

impl std::fmt::Display for ChainKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed chain step.
#[derive(Debug)]
pub struct StepFailure {
    /// Name of the request that failed.
    pub request: String,
    pub error: ExecutionError,
}

/// Result of running one chain.
#[derive(Debug)]
pub struct ChainOutcome {
    /// The store after the last executed request.
    pub store: VariableStore,

    /// First failure of the chain, if any.
    pub first_error: Option<StepFailure>,

    /// Number of requests that were sent (successful or not).
    pub executed: usize,

    /// Number of requests that failed.
    pub failed: usize,

    /// Number of requests never attempted because the chain stopped early.
    pub skipped: usize,
}

impl ChainOutcome {
    pub fn is_success(&self) -> bool {
        self.first_error.is_none()
    }
}

/// Creates the initial store for a tick: built-ins first, then the
/// monitor's own variables in key order.
pub fn seed_store(variables: &BTreeMap<String, String>) -> VariableStore {
    let mut store: VariableStore = builtin_variables().into_iter().collect();
    store.extend(
        variables
            .iter()
            .map(|(name, value)| Variable::provided(name.clone(), value.clone())),
    );
    store
}

/// Runs `specs` in order starting from `store`.
pub async fn run_chain(
    client: &MonitorClient,
    kind: ChainKind,
    specs: &[RequestSpec],
    mut store: VariableStore,
) -> ChainOutcome {
    let mut first_error: Option<StepFailure> = None;
    let mut executed = 0;
    let mut failed = 0;

    for spec in specs {
        debug!(request = %spec.name, chain = %kind, phase = "executing", "executing request");
        let started = Instant::now();
        executed += 1;

        match execute(client, spec, &store).await {
            Ok(extracted) => {
                debug!(
                    request = %spec.name,
                    chain = %kind,
                    phase = "succeeded",
                    extracted = extracted.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "request completed"
                );
                store.extend(extracted);
            }
            Err(err) => {
                failed += 1;
                error!(
                    request = %spec.name,
                    chain = %kind,
                    phase = "failed",
                    error_kind = err.kind(),
                    error = %err,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "failed to complete {} request",
                    kind
                );

                if first_error.is_none() {
                    first_error = Some(StepFailure {
                        request: spec.name.clone(),
                        error: err,
                    });
                }

                if kind.stop_on_error() {
                    break;
                }
            }
        }
    }

    let skipped = specs.len() - executed;
    if skipped > 0 {
        debug!(chain = %kind, skipped, "remaining requests skipped for this tick");
    }

    ChainOutcome {
        store,
        first_error,
        executed,
        failed,
        skipped,
    }
}

/// Result of one tick.
#[derive(Debug)]
pub struct TickReport {
    pub monitoring: ChainOutcome,
    pub cleanup: ChainOutcome,
    pub elapsed: Duration,
}

impl TickReport {
    /// A tick is healthy when the monitoring chain completed without error.
    /// Cleanup failures are reported but do not affect health.
    pub fn is_healthy(&self) -> bool {
        self.monitoring.is_success()
    }
}

/// Runs the monitoring chain, then the cleanup chain, for `definition`.
pub async fn run_tick(client: &MonitorClient, definition: &MonitorDefinition) -> TickReport {
    let started = Instant::now();

    let monitoring = run_chain(
        client,
        ChainKind::Monitoring,
        &definition.requests,
        seed_store(&definition.variables),
    )
    .await;

    let cleanup = run_chain(
        client,
        ChainKind::Cleanup,
        &definition.cleanup,
        monitoring.store.snapshot(),
    )
    .await;

    let report = TickReport {
        monitoring,
        cleanup,
        elapsed: started.elapsed(),
    };

    let elapsed_ms = report.elapsed.as_millis() as u64;
    match &report.monitoring.first_error {
        None => info!(
            monitor = %definition.name,
            requests = report.monitoring.executed,
            cleanup_failures = report.cleanup.failed,
            elapsed_ms,
            "tick completed"
        ),
        Some(failure) => warn!(
            monitor = %definition.name,
            failed_request = %failure.request,
            error = %failure.error,
            skipped = report.monitoring.skipped,
            cleanup_failures = report.cleanup.failed,
            elapsed_ms,
            "tick failed"
        ),
    }

    report
}
