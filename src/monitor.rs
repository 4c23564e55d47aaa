use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::MonitorConfig;
use crate::health::{Observation, Policy, classify};
use crate::notify::{Dispatcher, Transition, TransitionKind};
use crate::runtime::{ContainerRuntime, ContainerSummary, RuntimeError};
use crate::scheduler::Job;

/// Upper bound for a single runtime call (list or inspect).
pub const RUNTIME_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Unable to list containers: {0}")]
    List(RuntimeError),
}

/// Debounce state of one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Consecutive failed cycles so far, no notification sent yet.
    /// `Failing(0)` is the healthy state.
    Failing(u32),
    /// A failure notification was sent for the current run of failures.
    Notified,
}

impl Default for EntryState {
    fn default() -> Self {
        Self::Failing(0)
    }
}

/// Per-container debounce state, keyed by container id.
#[derive(Debug, Default)]
pub struct StateStore {
    entries: HashMap<String, EntryState>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the store hold exactly `current`: forget containers that are
    /// gone and start new ones at `Failing(0)`.
    pub fn reconcile<'a>(&mut self, current: impl IntoIterator<Item = &'a str>) {
        let current: HashSet<&str> = current.into_iter().collect();

        self.entries.retain(|id, _| current.contains(id.as_str()));
        for id in current {
            if !self.entries.contains_key(id) {
                self.entries.insert(id.to_string(), EntryState::default());
            }
        }
    }

    /// Apply one cycle's verdict and return the notification it triggers.
    pub fn record(
        &mut self,
        id: &str,
        healthy: bool,
        fail_limit: i64,
        notify_healthy: bool,
    ) -> Option<TransitionKind> {
        let entry = self.entries.entry(id.to_string()).or_default();

        if healthy {
            let recovered = *entry == EntryState::Notified;
            *entry = EntryState::Failing(0);
            return (recovered && notify_healthy).then_some(TransitionKind::Recovery);
        }

        match *entry {
            EntryState::Notified => None,
            EntryState::Failing(count) => {
                let count = count.saturating_add(1);
                if i64::from(count) >= fail_limit {
                    *entry = EntryState::Notified;
                    Some(TransitionKind::Failure)
                } else {
                    *entry = EntryState::Failing(count);
                    None
                }
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<EntryState> {
        self.entries.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub fail_limit: i64,
    pub notify_healthy: bool,
    pub filter_by_label: bool,
    pub include_stopped: bool,
    pub policy: Policy,
    pub call_timeout: Duration,
}

impl From<&MonitorConfig> for MonitorSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            fail_limit: config.fail_limit,
            notify_healthy: config.notify_healthy,
            filter_by_label: config.use_labels,
            include_stopped: config.check_stopped,
            policy: Policy {
                check_exit_code: config.check_exit_code,
            },
            call_timeout: RUNTIME_CALL_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub observed: usize,
    pub unhealthy: usize,
    pub failures: usize,
    pub recoveries: usize,
}

/// Runs polling cycles against a container runtime. Owns the state store, so
/// cycles are serialized by `&mut self`.
pub struct Monitor<R> {
    runtime: R,
    dispatcher: Dispatcher,
    settings: MonitorSettings,
    store: StateStore,
}

impl<R: ContainerRuntime> Monitor<R> {
    pub fn new(runtime: R, dispatcher: Dispatcher, settings: MonitorSettings) -> Self {
        Self {
            runtime,
            dispatcher,
            settings,
            store: StateStore::new(),
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// One polling cycle. A failed listing aborts the cycle and leaves the
    /// store untouched.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, MonitorError> {
        let containers = self.list().await.map_err(MonitorError::List)?;

        self.store.reconcile(containers.iter().map(|c| c.id.as_str()));
        if self.store.is_empty() {
            log::debug!("No containers to check");
        }

        let mut report = CycleReport {
            observed: containers.len(),
            ..Default::default()
        };

        for container in containers {
            let observation = self.observe(container).await;
            let healthy = classify(&observation, &self.settings.policy);
            if !healthy {
                report.unhealthy += 1;
            }
            let health = observation.inspection.and_then(|i| i.health);
            log::debug!(
                "Container {} ({}, health check: {}) is {}",
                observation.name,
                observation.state.as_ref(),
                health.as_ref().map_or("unknown", |h| h.as_ref()),
                if healthy { "healthy" } else { "unhealthy" }
            );

            let transition = self.store.record(
                &observation.id,
                healthy,
                self.settings.fail_limit,
                self.settings.notify_healthy,
            );
            log::trace!(
                "Container {} is now {:?}",
                observation.name,
                self.store.get(&observation.id)
            );

            if let Some(kind) = transition {
                match kind {
                    TransitionKind::Failure => report.failures += 1,
                    TransitionKind::Recovery => report.recoveries += 1,
                }
                let transition = Transition {
                    name: observation.name,
                    kind,
                };
                self.dispatcher.dispatch(&transition).await;
            }
        }

        Ok(report)
    }

    async fn list(&self) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let timeout = self.settings.call_timeout;
        let listing = self
            .runtime
            .list_containers(self.settings.filter_by_label, self.settings.include_stopped);
        tokio::time::timeout(timeout, listing)
            .await
            .map_err(|_| RuntimeError::Timeout("list", timeout))?
    }

    async fn observe(&self, container: ContainerSummary) -> Observation {
        let timeout = self.settings.call_timeout;
        let inspection = tokio::time::timeout(timeout, self.runtime.inspect(&container.id))
            .await
            .map_err(|_| RuntimeError::Timeout("inspect", timeout))
            .and_then(|result| result);

        let inspection = match inspection {
            Ok(inspection) => Some(inspection),
            Err(e) => {
                log::warn!(
                    "Unable to inspect container {}: {e}",
                    container.display_name()
                );
                None
            }
        };

        Observation {
            name: container.display_name().to_string(),
            id: container.id,
            state: container.state,
            inspection,
        }
    }
}

#[async_trait]
impl<R: ContainerRuntime> Job for Monitor<R> {
    async fn run(&mut self) {
        let started = std::time::Instant::now();
        match self.run_cycle().await {
            Ok(report) => log::debug!(
                "Checked {} containers in {:?}, tracking {} ({} unhealthy, {} failure and {} recovery notifications)",
                report.observed,
                started.elapsed(),
                self.store().len(),
                report.unhealthy,
                report.failures,
                report.recoveries
            ),
            Err(e) => log::error!("Error checking containers: {e}"),
        }
    }
}
