//! ONVIF Camera Audit Engine
//!
//! Single-pass audit of network cameras speaking the ONVIF
//! device-management protocol.
//!
//! ## Components
//!
//! 1. Address - target expansion (single IP, range, list, mix)
//! 2. Onvif - SOAP device client (time, identity, profiles, URIs)
//! 3. Fetch - digest-authenticated snapshot download
//! 4. Audit - per-host workflow and run driver
//! 5. Discovery - WS-Discovery probe/reply path
//!
//! ## Design Principles
//!
//! - One workflow owns one host; no shared mutable state across hosts
//! - A failing step loses its field, never the rest of the audit
//! - Only the address specification can abort a run

pub mod address;
pub mod audit;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod onvif;

pub use error::{Error, Result};
