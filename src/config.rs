//! Run configuration
//!
//! Camera-list file for list mode: a JSON document with a `cameralist`
//! array. Each entry drives one independent audit pass; fields left out
//! of an entry fall back to the command-line values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level camera list document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraList {
    pub cameralist: Vec<CameraEntry>,
}

/// One camera list entry. The address accepts the same single/range/list
/// forms as the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraEntry {
    pub ipaddress: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Load and parse a camera list file.
pub fn load_camera_list(path: &Path) -> Result<CameraList> {
    let contents = std::fs::read_to_string(path)?;
    let list: CameraList = serde_json::from_str(&contents)?;
    if list.cameralist.is_empty() {
        return Err(Error::Config(format!(
            "{}: camera list is empty",
            path.display()
        )));
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_parse_camera_list() {
        let json = r#"{
            "cameralist": [
                {"ipaddress": "192.168.1.10", "port": 8080, "username": "admin", "password": "pw"},
                {"ipaddress": "10.0.0.1-10.0.0.5"}
            ]
        }"#;
        let list: CameraList = serde_json::from_str(json).unwrap();
        assert_eq!(list.cameralist.len(), 2);
        assert_eq!(list.cameralist[0].port, Some(8080));
        assert_eq!(list.cameralist[1].ipaddress, "10.0.0.1-10.0.0.5");
        assert_eq!(list.cameralist[1].username, None);
    }

    #[test]
    fn test_load_rejects_empty_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"cameralist": []}"#).unwrap();
        assert!(matches!(
            load_camera_list(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not json").unwrap();
        assert!(matches!(
            load_camera_list(file.path()),
            Err(Error::Serialization(_))
        ));
    }
}
