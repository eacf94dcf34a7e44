//! ONVIF Camera Audit
//!
//! Scan an address range for ONVIF cameras and save make, model, and a
//! snapshot per video source into a report folder. Can also listen for
//! WS-Discovery replies on the local subnet.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use onvif_audit::audit::AuditRunner;
use onvif_audit::config::{self, CameraEntry};
use onvif_audit::discovery;

#[derive(Parser, Debug)]
#[command(name = "onvif-audit", version, about = "ONVIF Camera Audit")]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .multiple(true)
        .args(["ipaddress", "filename", "scan"])
))]
struct Args {
    /// IP address (x.x.x.x), range (x.x.x.x-y.y.y.y) or comma separated mix
    #[arg(short, long)]
    ipaddress: Option<String>,

    /// JSON file with an IP address list
    #[arg(short, long)]
    filename: Option<PathBuf>,

    /// ONVIF port
    #[arg(short = 'P', long, default_value_t = 80)]
    port: u16,

    /// ONVIF username
    #[arg(short, long, default_value = "onvifusername")]
    username: String,

    /// ONVIF password
    #[arg(short, long, default_value = "onvifpassword")]
    password: String,

    /// Discover network devices on the local subnet
    #[arg(short, long)]
    scan: bool,

    /// Per-host connection timeout in seconds
    #[arg(long, default_value_t = 5)]
    timeout: u64,

    /// Maximum concurrent host audits (unbounded when omitted)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Report directory (default: onvif_audit_report_<timestamp>)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "onvif_audit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if args.ipaddress.is_some() || args.filename.is_some() {
        let report_dir = args.output.clone().unwrap_or_else(|| {
            PathBuf::from(format!(
                "onvif_audit_report_{}",
                chrono::Local::now().format("%Y_%m_%d_%H_%M_%S")
            ))
        });
        std::fs::create_dir_all(&report_dir)
            .with_context(|| format!("cannot create report directory {}", report_dir.display()))?;
        tracing::info!(dir = %report_dir.display(), "Report directory ready");

        let runner = AuditRunner {
            port: args.port,
            username: args.username.clone(),
            password: args.password.clone(),
            connect_timeout: Duration::from_secs(args.timeout),
            concurrency: args.concurrency,
            report_dir,
        };

        if let Some(spec) = &args.ipaddress {
            runner.run(spec).await?;
        }

        if let Some(path) = &args.filename {
            let list = config::load_camera_list(path)?;
            for entry in list.cameralist {
                let CameraEntry {
                    ipaddress,
                    port,
                    username,
                    password,
                } = entry;
                let pass_runner = AuditRunner {
                    port: port.unwrap_or(args.port),
                    username: username.unwrap_or_else(|| args.username.clone()),
                    password: password.unwrap_or_else(|| args.password.clone()),
                    ..runner.clone()
                };
                pass_runner.run(&ipaddress).await?;
            }
        }
    }

    if args.scan {
        discovery::run().await?;
    }

    Ok(())
}
