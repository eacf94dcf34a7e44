//! Per-host audit workflow
//!
//! A fixed sequence of device queries: system time, identity, snapshot
//! fan-out across all video sources, TCP stream URI, UDP stream URI,
//! finalize. Each step runs after the previous settles; a failing step
//! leaves its field absent and never blocks the next. Only the initial
//! connect ends the workflow early.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fetch;
use crate::onvif::{DeviceSession, StreamProtocol, VideoSource};

use super::report::{HostReport, SnapshotOutcome};

/// Immutable per-host audit input, owned by exactly one workflow.
#[derive(Debug, Clone)]
pub struct HostTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub connect_timeout: Duration,
}

/// Run the whole workflow for one host.
///
/// A report is returned even when nothing past the connect succeeded; a
/// connect failure yields a report with only the host identity filled in.
pub async fn audit_host(target: HostTarget, report_dir: PathBuf) -> HostReport {
    let mut report = HostReport::new(&target.host, target.port);

    let session = match DeviceSession::connect(
        &target.host,
        target.port,
        &target.username,
        &target.password,
        target.connect_timeout,
    )
    .await
    {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(host = %target.host, port = target.port, error = %e, "Cannot connect");
            return report;
        }
    };
    report.connected = true;
    tracing::info!(host = %target.host, port = target.port, "Device session established");

    match session.get_system_date_and_time().await {
        Ok(time) => report.system_time = Some(time),
        Err(e) => {
            tracing::debug!(host = %target.host, error = %e, "System time query failed")
        }
    }

    match session.get_device_information().await {
        Ok(info) => report.device_info = Some(info),
        Err(e) => {
            tracing::debug!(host = %target.host, error = %e, "Device information query failed")
        }
    }

    let sources = match session.get_profiles().await {
        Ok(sources) => sources,
        Err(e) => {
            tracing::debug!(host = %target.host, error = %e, "Profile query failed");
            Vec::new()
        }
    };
    let first_token = sources.first().map(|s| s.token.clone());

    // Fan out one task per video source and join them all before the
    // stream queries. Joining in spawn order keeps outcomes ordered by
    // source index whatever the completion interleaving; an empty source
    // list passes straight through.
    let total = sources.len();
    let mut handles = Vec::with_capacity(total);
    for (index, source) in sources.into_iter().enumerate() {
        let session = session.clone();
        let report_dir = report_dir.clone();
        handles.push(tokio::spawn(async move {
            snapshot_source(&session, index, total, &source, &report_dir).await
        }));
    }
    for handle in handles {
        match handle.await {
            Ok(outcome) => report.snapshots.push(outcome),
            Err(e) => {
                tracing::warn!(host = %target.host, error = %e, "Snapshot task failed")
            }
        }
    }

    if let Some(token) = first_token {
        match session.get_stream_uri(StreamProtocol::Rtsp, &token).await {
            Ok(uri) => report.stream_uri_tcp = Some(uri),
            Err(e) => {
                tracing::debug!(host = %target.host, error = %e, "TCP stream URI query failed")
            }
        }
        match session.get_stream_uri(StreamProtocol::Udp, &token).await {
            Ok(uri) => report.stream_uri_udp = Some(uri),
            Err(e) => {
                tracing::debug!(host = %target.host, error = %e, "UDP stream URI query failed")
            }
        }
    }

    report
}

/// Snapshot step for one video source: URI query, digest fetch, file
/// write. Failure at any point marks the outcome failed and leaves the
/// destination file untouched.
async fn snapshot_source(
    session: &DeviceSession,
    index: usize,
    total: usize,
    source: &VideoSource,
    report_dir: &Path,
) -> SnapshotOutcome {
    let host = session.host();
    let mut outcome = SnapshotOutcome {
        source_index: index,
        uri: None,
        destination: report_dir.join(snapshot_file_name(host, index, total)),
        saved: false,
    };

    let uri = match session.get_snapshot_uri(&source.token).await {
        Ok(uri) => uri,
        Err(e) => {
            tracing::debug!(host = %host, source = index, error = %e, "Snapshot URI query failed");
            return outcome;
        }
    };
    outcome.uri = Some(uri.clone());

    // Devices behind NAT report an internal address in the snapshot URI;
    // the address the device was reached on is authoritative.
    let fetch_uri = match rewrite_host(&uri, host) {
        Ok(rewritten) => rewritten,
        Err(e) => {
            tracing::warn!(host = %host, uri = %uri, error = %e, "Unusable snapshot URI");
            return outcome;
        }
    };

    match fetch::fetch(session.client(), &fetch_uri, session.username(), session.password()).await {
        Ok(bytes) => match tokio::fs::write(&outcome.destination, &bytes).await {
            Ok(()) => {
                outcome.saved = true;
                tracing::info!(
                    host = %host,
                    path = %outcome.destination.display(),
                    size = bytes.len(),
                    "Snapshot saved"
                );
            }
            Err(e) => {
                tracing::warn!(
                    host = %host,
                    path = %outcome.destination.display(),
                    error = %e,
                    "Cannot write snapshot file"
                );
            }
        },
        Err(e) => {
            tracing::warn!(host = %host, source = index, error = %e, "Snapshot fetch failed");
        }
    }

    outcome
}

/// `snapshot_<host>.jpg` for single-source devices, a 1-based `_<n>`
/// suffix otherwise.
fn snapshot_file_name(host: &str, index: usize, total: usize) -> String {
    if total == 1 {
        format!("snapshot_{}.jpg", host)
    } else {
        format!("snapshot_{}_{}.jpg", host, index + 1)
    }
}

/// Replace the URI's host with `host`, keeping scheme, port, path and query.
fn rewrite_host(uri: &str, host: &str) -> std::result::Result<String, String> {
    let mut parsed = reqwest::Url::parse(uri).map_err(|e| e.to_string())?;
    parsed.set_host(Some(host)).map_err(|e| e.to_string())?;
    Ok(parsed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_file_name_single_source() {
        assert_eq!(
            snapshot_file_name("192.168.1.10", 0, 1),
            "snapshot_192.168.1.10.jpg"
        );
    }

    #[test]
    fn test_snapshot_file_name_multi_source() {
        assert_eq!(
            snapshot_file_name("192.168.1.10", 0, 4),
            "snapshot_192.168.1.10_1.jpg"
        );
        assert_eq!(
            snapshot_file_name("192.168.1.10", 3, 4),
            "snapshot_192.168.1.10_4.jpg"
        );
    }

    #[test]
    fn test_rewrite_host_keeps_port_path_query() {
        let rewritten =
            rewrite_host("http://10.1.1.1:8080/cgi-bin/snap.cgi?channel=1", "192.168.1.10").unwrap();
        assert_eq!(
            rewritten,
            "http://192.168.1.10:8080/cgi-bin/snap.cgi?channel=1"
        );
    }

    #[test]
    fn test_rewrite_host_default_port() {
        let rewritten = rewrite_host("http://10.1.1.1/snap.jpg", "192.168.1.10").unwrap();
        assert_eq!(rewritten, "http://192.168.1.10/snap.jpg");
    }

    #[test]
    fn test_rewrite_host_rejects_garbage() {
        assert!(rewrite_host("not a uri", "192.168.1.10").is_err());
    }
}
