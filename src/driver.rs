//! Two-worker load pattern driver.
//!
//! For each cluster behind the shared base address the driver launches
//! exactly two workers: one issuing a single large burst, one issuing a
//! smaller burst, pausing, then issuing a second burst. Both workers are
//! joined before the next cluster is started, so two clusters never have
//! requests in flight at the same time.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::config::DriverConfig;

/// A single logical cluster reachable through the shared base address.
///
/// Immutable once constructed; the caller resolves the base address (for
/// example from infrastructure state) and hands it in explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    base: String,
    cluster: String,
}

impl Target {
    pub fn new(base: impl Into<String>, cluster: impl Into<String>) -> Self {
        let base = base.into();
        let mut cluster = cluster.into();
        if !cluster.starts_with('/') {
            cluster.insert(0, '/');
        }
        Self { base, cluster }
    }

    /// Path suffix identifying the cluster, e.g. `/cluster1`.
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn url(&self) -> String {
        format!("http://{}{}", self.base, self.cluster)
    }
}

/// Errors a burst can abort with when `continue_on_error` is off.
#[derive(Debug, Error)]
pub enum BurstError {
    #[error("request {index} of {count} to {url} failed: {source}")]
    Request {
        index: usize,
        count: usize,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request {index} of {count} to {url} returned status {status}")]
    Status {
        index: usize,
        count: usize,
        url: String,
        status: StatusCode,
    },
}

/// Client-side counts for one burst (or one worker, once merged).
#[derive(Debug, Clone, Copy, Default)]
pub struct BurstStats {
    pub sent: usize,
    pub ok: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl BurstStats {
    fn merge(&mut self, other: BurstStats) {
        self.sent += other.sent;
        self.ok += other.ok;
        self.failed += other.failed;
        self.elapsed += other.elapsed;
    }
}

/// One independently scheduled execution unit: one or two bursts with an
/// optional pause in between.
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    pub name: &'static str,
    pub bursts: Vec<usize>,
    pub pause: Duration,
}

#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub worker: &'static str,
    pub stats: BurstStats,
    pub elapsed: Duration,
}

/// Terminal status of one worker after the cluster's join barrier.
#[derive(Debug, Clone)]
pub enum WorkerOutcome {
    Completed(WorkerReport),
    Failed { worker: &'static str, error: String },
}

impl WorkerOutcome {
    pub fn worker(&self) -> &str {
        match self {
            WorkerOutcome::Completed(report) => report.worker,
            WorkerOutcome::Failed { worker, .. } => worker,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, WorkerOutcome::Failed { .. })
    }

    pub fn report(&self) -> Option<&WorkerReport> {
        match self {
            WorkerOutcome::Completed(report) => Some(report),
            WorkerOutcome::Failed { .. } => None,
        }
    }
}

/// Result of one complete two-worker run against a single cluster.
#[derive(Debug, Clone)]
pub struct ClusterReport {
    pub cluster: String,
    pub workers: Vec<WorkerOutcome>,
    pub elapsed: Duration,
}

impl ClusterReport {
    pub fn has_failure(&self) -> bool {
        self.workers.iter().any(WorkerOutcome::is_failure)
    }

    pub fn total_sent(&self) -> usize {
        self.workers.iter().filter_map(|w| w.report()).map(|r| r.stats.sent).sum()
    }

    pub fn total_ok(&self) -> usize {
        self.workers.iter().filter_map(|w| w.report()).map(|r| r.stats.ok).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.workers.iter().filter_map(|w| w.report()).map(|r| r.stats.failed).sum()
    }
}

/// Issues the fixed two-worker load pattern against one or more clusters.
///
/// The HTTP client is built once and shared by both workers; it is the only
/// resource the workers share.
#[derive(Debug, Clone)]
pub struct LoadDriver {
    client: Client,
    config: DriverConfig,
}

impl LoadDriver {
    pub fn new(config: DriverConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout())
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Single burst of `primary_burst` requests.
    pub fn worker_a(&self) -> WorkerSpec {
        WorkerSpec {
            name: "worker-a",
            bursts: vec![self.config.primary_burst],
            pause: Duration::ZERO,
        }
    }

    /// Burst of `split_burst` requests, a pause, then `second_burst` more.
    pub fn worker_b(&self) -> WorkerSpec {
        WorkerSpec {
            name: "worker-b",
            bursts: vec![self.config.split_burst, self.config.second_burst],
            pause: self.config.pause(),
        }
    }

    /// Sends `count` GET requests sequentially to `target` with no delay
    /// between them. Responses are discarded; status codes only feed the
    /// returned stats and the log. With `continue_on_error` unset a failed
    /// request aborts the burst instead.
    pub async fn run_burst(&self, target: &Target, count: usize) -> Result<BurstStats, BurstError> {
        let url = target.url();
        let started = Instant::now();
        let mut stats = BurstStats::default();

        for index in 0..count {
            stats.sent += 1;
            match self.client.get(url.as_str()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() || status.is_redirection() {
                        stats.ok += 1;
                    } else if self.config.continue_on_error {
                        stats.failed += 1;
                        warn!(%url, %status, index, "request returned error status");
                    } else {
                        return Err(BurstError::Status { index, count, url, status });
                    }
                }
                Err(source) => {
                    if self.config.continue_on_error {
                        stats.failed += 1;
                        warn!(%url, error = %source, index, "request failed");
                    } else {
                        return Err(BurstError::Request { index, count, url, source });
                    }
                }
            }
        }

        stats.elapsed = started.elapsed();
        Ok(stats)
    }

    /// Runs exactly one burst of `primary_burst` requests against `target`.
    pub async fn run_worker_a(&self, target: &Target) -> Result<WorkerReport, BurstError> {
        self.run_worker(target, &self.worker_a()).await
    }

    /// Runs `split_burst` requests, pauses, then runs `second_burst` more
    /// against the same `target`.
    pub async fn run_worker_b(&self, target: &Target) -> Result<WorkerReport, BurstError> {
        self.run_worker(target, &self.worker_b()).await
    }

    async fn run_worker(
        &self,
        target: &Target,
        spec: &WorkerSpec,
    ) -> Result<WorkerReport, BurstError> {
        let cluster = target.cluster();
        let started = Instant::now();
        let mut stats = BurstStats::default();

        for (burst_index, &count) in spec.bursts.iter().enumerate() {
            if burst_index > 0 && !spec.pause.is_zero() {
                info!(
                    cluster,
                    worker = spec.name,
                    pause_secs = spec.pause.as_secs_f64(),
                    "pausing between bursts"
                );
                tokio::time::sleep(spec.pause).await;
                info!(cluster, worker = spec.name, "pause over, resuming");
            }

            info!(cluster, worker = spec.name, count, "starting burst");
            let burst = self.run_burst(target, count).await?;
            info!(
                cluster,
                worker = spec.name,
                sent = burst.sent,
                ok = burst.ok,
                failed = burst.failed,
                elapsed_ms = burst.elapsed.as_millis() as u64,
                "burst finished"
            );
            stats.merge(burst);
        }

        let elapsed = started.elapsed();
        info!(cluster, worker = spec.name, sent = stats.sent, "worker finished");
        Ok(WorkerReport { worker: spec.name, stats, elapsed })
    }

    /// Starts both workers for `target` back-to-back and blocks until both
    /// have terminated. A failure in one worker never cancels the sibling;
    /// it is recorded in the returned report instead of being rethrown.
    pub async fn run_cluster(&self, target: &Target) -> ClusterReport {
        let cluster = target.cluster().to_string();
        info!(cluster = %cluster, "starting cluster run with two workers");
        let started = Instant::now();

        let worker_a = {
            let driver = self.clone();
            let target = target.clone();
            tokio::spawn(async move { driver.run_worker_a(&target).await })
        };
        let worker_b = {
            let driver = self.clone();
            let target = target.clone();
            tokio::spawn(async move { driver.run_worker_b(&target).await })
        };

        // Join barrier: both handles are awaited even if one errors first.
        let (joined_a, joined_b) = tokio::join!(worker_a, worker_b);
        let workers = vec![
            join_outcome("worker-a", joined_a),
            join_outcome("worker-b", joined_b),
        ];

        let elapsed = started.elapsed();
        for outcome in &workers {
            info!(
                cluster = %cluster,
                worker = outcome.worker(),
                failed = outcome.is_failure(),
                "worker joined"
            );
        }
        info!(cluster = %cluster, elapsed_secs = elapsed.as_secs_f64(), "cluster run complete");

        ClusterReport { cluster, workers, elapsed }
    }

    /// Runs `run_cluster` strictly one target at a time, in the order given.
    /// The next cluster's workers are not spawned until the previous
    /// cluster's join barrier has released. A failed cluster run does not
    /// stop later clusters.
    pub async fn run_all(&self, targets: &[Target]) -> Vec<ClusterReport> {
        let mut reports = Vec::with_capacity(targets.len());
        for target in targets {
            reports.push(self.run_cluster(target).await);
        }
        reports
    }
}

fn join_outcome(
    worker: &'static str,
    joined: Result<Result<WorkerReport, BurstError>, JoinError>,
) -> WorkerOutcome {
    match joined {
        Ok(Ok(report)) => WorkerOutcome::Completed(report),
        Ok(Err(err)) => {
            error!(worker, error = %err, "worker aborted");
            WorkerOutcome::Failed { worker, error: err.to_string() }
        }
        Err(err) => {
            error!(worker, error = %err, "worker task did not finish");
            WorkerOutcome::Failed { worker, error: err.to_string() }
        }
    }
}
