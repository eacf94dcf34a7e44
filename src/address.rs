//! Target address expansion
//!
//! An address specification is a single IPv4 address, an inclusive dash
//! range `x.x.x.x-y.y.y.y`, or a comma-joined mix of both. Expansion is
//! eager: the full target list bounds the audit's work and must be known
//! before any workflow is dispatched.

use std::net::Ipv4Addr;

use crate::error::{Error, Result};

/// Expand an address specification into an ordered target list.
///
/// Per-component outputs are concatenated in specification order and
/// duplicates across components are kept. Range endpoints are swapped when
/// given in descending order. Single addresses are passed through verbatim.
pub fn expand_spec(spec: &str) -> Result<Vec<String>> {
    let mut targets = Vec::new();

    for component in spec.split(',') {
        let component = component.trim();
        if component.contains('-') {
            let bounds: Vec<&str> = component.split('-').collect();
            if bounds.len() != 2 {
                return Err(Error::AddressFormat(format!(
                    "'{}' should be x.x.x.x-y.y.y.y",
                    component
                )));
            }

            let start = to_long(bounds[0])?;
            let end = to_long(bounds[1])?;
            let (start, end) = if start > end { (end, start) } else { (start, end) };

            for value in start..=end {
                targets.push(from_long(value));
            }
        } else {
            targets.push(component.to_string());
        }
    }

    Ok(targets)
}

/// Convert a dotted-quad address to its big-endian u32 value.
pub fn to_long(addr: &str) -> Result<u32> {
    let parsed: Ipv4Addr = addr
        .trim()
        .parse()
        .map_err(|_| Error::AddressFormat(format!("'{}' is not an IPv4 address", addr)))?;
    Ok(u32::from(parsed))
}

/// Convert a big-endian u32 value back to dotted-quad form.
pub fn from_long(value: u32) -> String {
    Ipv4Addr::from(value).to_string()
}
