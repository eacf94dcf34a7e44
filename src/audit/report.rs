//! Per-host audit record and report rendering

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::onvif::DeviceInformation;

const UNKNOWN: &str = "unknown";

/// Outcome of one video source's snapshot step
#[derive(Debug, Clone)]
pub struct SnapshotOutcome {
    /// Zero-based video source index
    pub source_index: usize,
    /// URI reported by the device, when the query succeeded
    pub uri: Option<String>,
    /// Destination file derived from host and source index
    pub destination: PathBuf,
    /// Whether the image was fetched and written
    pub saved: bool,
}

/// Aggregate audit record for one host.
///
/// Every field is optional: any remote call may fail on its own and the
/// record is still produced. Filled incrementally by the workflow,
/// rendered and persisted once at finalization, never mutated afterward.
#[derive(Debug, Clone)]
pub struct HostReport {
    pub host: String,
    pub port: u16,
    /// Whether the device session was established; false means every
    /// other field is empty and no queries past connect were attempted.
    pub connected: bool,
    pub system_time: Option<DateTime<Utc>>,
    pub device_info: Option<DeviceInformation>,
    pub snapshots: Vec<SnapshotOutcome>,
    pub stream_uri_tcp: Option<String>,
    pub stream_uri_udp: Option<String>,
}

impl HostReport {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            connected: false,
            system_time: None,
            device_info: None,
            snapshots: Vec::new(),
            stream_uri_tcp: None,
            stream_uri_udp: None,
        }
    }

    /// Render the report text. Absent values are written literally as
    /// `unknown` so missing data stays distinguishable from "not audited".
    pub fn render(&self) -> String {
        let info = self.device_info.clone().unwrap_or_default();
        let mut out = String::new();

        out.push_str(&format!("Host:= {} Port:= {}\n", self.host, self.port));
        out.push_str(&format!(
            "Date:= {}\n",
            self.system_time
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| UNKNOWN.to_string())
        ));
        out.push_str(&format!("Manufacturer:= {}\n", field(&info.manufacturer)));
        out.push_str(&format!("Model:= {}\n", field(&info.model)));
        out.push_str(&format!(
            "Firmware Version:= {}\n",
            field(&info.firmware_version)
        ));
        out.push_str(&format!("Serial Number:= {}\n", field(&info.serial_number)));
        out.push_str(&format!("Hardware ID:= {}\n", field(&info.hardware_id)));

        for snapshot in &self.snapshots {
            let status = if snapshot.saved {
                format!("saved to {}", snapshot.destination.display())
            } else {
                "failed".to_string()
            };
            out.push_str(&format!(
                "Snapshot {}:= {}\n",
                snapshot.source_index + 1,
                status
            ));
        }

        if let Some(uri) = &self.stream_uri_tcp {
            out.push_str(&format!("First Live TCP Stream:= {}\n", uri));
        }
        if let Some(uri) = &self.stream_uri_udp {
            out.push_str(&format!("First Live UDP Stream:= {}\n", uri));
        }

        out
    }

    /// Persist the rendered report as `camera_report_<host>.txt`.
    pub async fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("camera_report_{}.txt", self.host));
        tokio::fs::write(&path, self.render()).await?;
        Ok(path)
    }

    /// Console block mirroring the persisted report.
    pub fn print(&self) {
        println!("------------------------------");
        print!("{}", self.render());
        println!("------------------------------");
    }
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_render_all_unknown() {
        let report = HostReport::new("192.168.1.10", 80);
        let text = report.render();
        assert!(text.contains("Host:= 192.168.1.10 Port:= 80"));
        assert!(text.contains("Date:= unknown"));
        assert!(text.contains("Manufacturer:= unknown"));
        assert!(text.contains("Model:= unknown"));
        assert!(text.contains("Firmware Version:= unknown"));
        assert!(text.contains("Serial Number:= unknown"));
        assert!(text.contains("Hardware ID:= unknown"));
        assert!(!text.contains("Stream"));
        assert!(!text.contains("Snapshot"));
    }

    #[test]
    fn test_render_populated() {
        let mut report = HostReport::new("10.0.0.7", 8080);
        report.connected = true;
        report.system_time = Some(Utc.with_ymd_and_hms(2024, 6, 15, 14, 30, 5).unwrap());
        report.device_info = Some(DeviceInformation {
            manufacturer: Some("Acme".to_string()),
            model: Some("Cam-1000".to_string()),
            firmware_version: None,
            serial_number: Some("S123".to_string()),
            hardware_id: None,
        });
        report.snapshots.push(SnapshotOutcome {
            source_index: 0,
            uri: Some("http://10.0.0.7/snap.jpg".to_string()),
            destination: PathBuf::from("out/snapshot_10.0.0.7_1.jpg"),
            saved: true,
        });
        report.snapshots.push(SnapshotOutcome {
            source_index: 1,
            uri: None,
            destination: PathBuf::from("out/snapshot_10.0.0.7_2.jpg"),
            saved: false,
        });
        report.stream_uri_tcp = Some("rtsp://10.0.0.7/stream1".to_string());

        let text = report.render();
        assert!(text.contains("Manufacturer:= Acme"));
        assert!(text.contains("Firmware Version:= unknown"));
        assert!(text.contains("Snapshot 1:= saved to out/snapshot_10.0.0.7_1.jpg"));
        assert!(text.contains("Snapshot 2:= failed"));
        assert!(text.contains("First Live TCP Stream:= rtsp://10.0.0.7/stream1"));
        assert!(!text.contains("UDP"));
    }

    #[tokio::test]
    async fn test_write_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let report = HostReport::new("192.168.1.20", 80);

        let path = report.write(dir.path()).await.unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "camera_report_192.168.1.20.txt"
        );
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, report.render());
    }
}
