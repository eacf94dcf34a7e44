//! Audit orchestration
//!
//! ## Responsibilities
//!
//! - Expand the address specification into a concrete target list
//! - Launch one independent workflow per host (optionally capped)
//! - Finalize each host: console block plus persisted report
//! - Join all workflows and log the run summary
//!
//! Host workflows interleave freely; console output reflects completion
//! order, not address order.

mod report;
mod workflow;

pub use report::{HostReport, SnapshotOutcome};
pub use workflow::{audit_host, HostTarget};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::address;
use crate::error::Result;

/// One audit pass over an address specification.
#[derive(Debug, Clone)]
pub struct AuditRunner {
    pub port: u16,
    pub username: String,
    pub password: String,
    pub connect_timeout: Duration,
    /// Maximum simultaneously running host workflows; None means
    /// unbounded, which over large ranges means one outstanding
    /// connection attempt per address.
    pub concurrency: Option<usize>,
    pub report_dir: PathBuf,
}

impl AuditRunner {
    /// Expand `spec` and audit every resulting host. Fails only on a
    /// malformed specification; every per-host failure is contained to
    /// that host. Returns per-host reports in target order.
    pub async fn run(&self, spec: &str) -> Result<Vec<HostReport>> {
        let targets = address::expand_spec(spec)?;
        tracing::info!(spec = %spec, targets = targets.len(), "Audit started");

        let semaphore = self
            .concurrency
            .map(|n| Arc::new(Semaphore::new(n.max(1))));
        let mut handles = Vec::with_capacity(targets.len());

        for host in targets {
            let target = HostTarget {
                host,
                port: self.port,
                username: self.username.clone(),
                password: self.password.clone(),
                connect_timeout: self.connect_timeout,
            };
            let report_dir = self.report_dir.clone();
            let permit = match &semaphore {
                Some(semaphore) => Some(semaphore.clone().acquire_owned().await.unwrap()),
                None => None,
            };
            handles.push(tokio::spawn(async move {
                let report = audit_host(target, report_dir.clone()).await;
                if report.connected {
                    report.print();
                    if let Err(e) = report.write(&report_dir).await {
                        tracing::error!(host = %report.host, error = %e, "Cannot write report file");
                    }
                }
                drop(permit);
                report
            }));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => tracing::error!(error = %e, "Host workflow panicked"),
            }
        }

        let reporting = reports.iter().filter(|r| r.connected).count();
        let snapshots = reports
            .iter()
            .flat_map(|r| &r.snapshots)
            .filter(|s| s.saved)
            .count();
        tracing::info!(
            hosts_scanned = reports.len(),
            hosts_reporting = reporting,
            snapshots_written = snapshots,
            "Audit complete"
        );

        Ok(reports)
    }
}
