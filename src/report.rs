//! Human-readable benchmark summary, printed once after a full run.

use std::fmt::Write as _;

use chrono::Local;

use crate::driver::{ClusterReport, WorkerOutcome};

const BANNER_WIDTH: usize = 88;
const SECTION_WIDTH: usize = 80;

pub fn print_summary(reports: &[ClusterReport]) {
    print!("{}", render(reports));
}

fn render(reports: &[ClusterReport]) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", "=".repeat(BANNER_WIDTH));
    let _ = writeln!(out, "Benchmark results");
    let _ = writeln!(out, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "{}", "=".repeat(BANNER_WIDTH));
    let _ = writeln!(out);

    for report in reports {
        let _ = writeln!(out, "{}", "-".repeat(SECTION_WIDTH));
        let _ = writeln!(out, "Results for {}", report.cluster);
        let _ = writeln!(out, "{}", "-".repeat(SECTION_WIDTH));
        let _ = writeln!(out, "Total: {}", report.total_sent());
        let _ = writeln!(out, "Successful: {}", report.total_ok());
        let _ = writeln!(out, "Failed: {}", report.total_failed());

        for outcome in &report.workers {
            match outcome {
                WorkerOutcome::Completed(worker) => {
                    let _ = writeln!(
                        out,
                        "{}: {} requests in {:.1}s",
                        worker.worker,
                        worker.stats.sent,
                        worker.elapsed.as_secs_f64()
                    );
                }
                WorkerOutcome::Failed { worker, error } => {
                    let _ = writeln!(out, "{worker}: FAILED ({error})");
                }
            }
        }

        let _ = writeln!(
            out,
            "Cluster run took {:.1}s",
            report.elapsed.as_secs_f64()
        );
        let _ = writeln!(out);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{BurstStats, WorkerReport};
    use std::time::Duration;

    fn sample_report() -> ClusterReport {
        ClusterReport {
            cluster: "/cluster1".to_string(),
            workers: vec![
                WorkerOutcome::Completed(WorkerReport {
                    worker: "worker-a",
                    stats: BurstStats { sent: 1000, ok: 1000, failed: 0, elapsed: Duration::from_secs(12) },
                    elapsed: Duration::from_secs(12),
                }),
                WorkerOutcome::Completed(WorkerReport {
                    worker: "worker-b",
                    stats: BurstStats { sent: 1500, ok: 1499, failed: 1, elapsed: Duration::from_secs(18) },
                    elapsed: Duration::from_secs(78),
                }),
            ],
            elapsed: Duration::from_secs(78),
        }
    }

    #[test]
    fn summary_contains_per_cluster_totals() {
        let rendered = render(&[sample_report()]);
        assert!(rendered.contains("Results for /cluster1"));
        assert!(rendered.contains("Total: 2500"));
        assert!(rendered.contains("Successful: 2499"));
        assert!(rendered.contains("Failed: 1"));
        assert!(rendered.contains("worker-a: 1000 requests"));
        assert!(rendered.contains("worker-b: 1500 requests"));
    }

    #[test]
    fn failed_worker_is_called_out() {
        let mut report = sample_report();
        report.workers[1] = WorkerOutcome::Failed {
            worker: "worker-b",
            error: "connection refused".to_string(),
        };
        let rendered = render(&[report]);
        assert!(rendered.contains("worker-b: FAILED (connection refused)"));
    }
}
