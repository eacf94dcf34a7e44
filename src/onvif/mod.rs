//! ONVIF device client
//!
//! ## Responsibilities
//!
//! - Session bootstrap with a bounded connect probe
//! - Device service queries: system time, device information
//! - Media service queries: profiles, snapshot URI, stream URI
//!
//! Requests are hand-built SOAP 1.2 envelopes POSTed over HTTP; responses
//! are read with namespace-agnostic value extraction.

pub mod envelope;
pub mod types;
pub mod xml;

pub use types::{DeviceInformation, StreamProtocol, VideoSource};

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{Error, Result};

const DEVICE_SERVICE_PATH: &str = "/onvif/device_service";
const MEDIA_SERVICE_PATH: &str = "/onvif/media_service";

/// A connected device session. Cloning shares the underlying HTTP client,
/// so per-source tasks can query concurrently.
#[derive(Debug, Clone)]
pub struct DeviceSession {
    host: String,
    port: u16,
    username: String,
    password: String,
    client: reqwest::Client,
}

impl DeviceSession {
    /// Establish a session by probing GetSystemDateAndTime without
    /// credentials (the one call ONVIF requires to be unauthenticated).
    ///
    /// The probe is bounded by `connect_timeout`; it is the only timed call
    /// in the audit. A transport failure, timeout, or non-ONVIF response is
    /// a connect error and ends the host's workflow.
    pub async fn connect(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        let session = Self {
            host: host.to_string(),
            port,
            username: username.to_string(),
            password: password.to_string(),
            client,
        };

        let probe = envelope::envelope(None, envelope::GET_SYSTEM_DATE_AND_TIME);
        let result =
            tokio::time::timeout(connect_timeout, session.post(DEVICE_SERVICE_PATH, &probe)).await;
        let body = match result {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => {
                return Err(Error::Connect {
                    host: session.host,
                    port,
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(Error::Connect {
                    host: session.host,
                    port,
                    message: format!("timed out after {}s", connect_timeout.as_secs()),
                })
            }
        };

        if !body.contains("SystemDateAndTime") && !body.contains("UTCDateTime") {
            return Err(Error::Connect {
                host: session.host,
                port,
                message: "response is not ONVIF".to_string(),
            });
        }

        Ok(session)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Device clock from GetSystemDateAndTime (UTC).
    pub async fn get_system_date_and_time(&self) -> Result<DateTime<Utc>> {
        let request = envelope::envelope(None, envelope::GET_SYSTEM_DATE_AND_TIME);
        let body = self.post(DEVICE_SERVICE_PATH, &request).await?;
        parse_system_date_time(&body)
            .ok_or_else(|| Error::Query("no UTCDateTime in response".to_string()))
    }

    /// Manufacturer, model, firmware, serial, hardware id.
    pub async fn get_device_information(&self) -> Result<DeviceInformation> {
        let body = self.device_request(envelope::GET_DEVICE_INFORMATION).await?;

        let info = DeviceInformation {
            manufacturer: xml::first_value(&body, "Manufacturer"),
            model: xml::first_value(&body, "Model"),
            firmware_version: xml::first_value(&body, "FirmwareVersion"),
            serial_number: xml::first_value(&body, "SerialNumber"),
            hardware_id: xml::first_value(&body, "HardwareId"),
        };

        if info.manufacturer.is_none() && info.model.is_none() {
            return Err(Error::Query("no device information in response".to_string()));
        }
        Ok(info)
    }

    /// Media profiles, one per video source. May be empty.
    pub async fn get_profiles(&self) -> Result<Vec<VideoSource>> {
        let body = self.media_request(envelope::GET_PROFILES).await?;
        Ok(xml::all_attributes(&body, "Profiles", "token")
            .into_iter()
            .map(|token| VideoSource { token })
            .collect())
    }

    /// Snapshot URI for one video source.
    pub async fn get_snapshot_uri(&self, profile_token: &str) -> Result<String> {
        let body = self
            .media_request(&envelope::get_snapshot_uri(profile_token))
            .await?;
        xml::first_value(&body, "Uri")
            .ok_or_else(|| Error::Query("no snapshot URI in response".to_string()))
    }

    /// RTP-Unicast stream URI for one video source over the given transport.
    pub async fn get_stream_uri(
        &self,
        protocol: StreamProtocol,
        profile_token: &str,
    ) -> Result<String> {
        let body = self
            .media_request(&envelope::get_stream_uri(protocol, profile_token))
            .await?;
        xml::first_value(&body, "Uri")
            .ok_or_else(|| Error::Query("no stream URI in response".to_string()))
    }

    async fn device_request(&self, body: &str) -> Result<String> {
        let header = envelope::security_header(&self.username, &self.password);
        let request = envelope::envelope(Some(&header), body);
        self.post(DEVICE_SERVICE_PATH, &request).await
    }

    async fn media_request(&self, body: &str) -> Result<String> {
        let header = envelope::security_header(&self.username, &self.password);
        let request = envelope::envelope(Some(&header), body);
        self.post(MEDIA_SERVICE_PATH, &request).await
    }

    async fn post(&self, path: &str, request: &str) -> Result<String> {
        let url = format!("http://{}:{}{}", self.host, self.port, path);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/soap+xml")
            .body(request.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Query(format!("{} returned {}", path, status)));
        }

        let body = response.text().await?;
        if body.contains("NotAuthorized") {
            return Err(Error::Query(format!("{} rejected credentials", path)));
        }
        Ok(body)
    }
}

fn parse_system_date_time(body: &str) -> Option<DateTime<Utc>> {
    let utc = xml::section(body, "UTCDateTime")?;
    let year: i32 = xml::first_value(utc, "Year")?.parse().ok()?;
    let month: u32 = xml::first_value(utc, "Month")?.parse().ok()?;
    let day: u32 = xml::first_value(utc, "Day")?.parse().ok()?;
    let hour: u32 = xml::first_value(utc, "Hour")?.parse().ok()?;
    let minute: u32 = xml::first_value(utc, "Minute")?.parse().ok()?;
    let second: u32 = xml::first_value(utc, "Second")?.parse().ok()?;
    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATE_TIME_RESPONSE: &str = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:tds="http://www.onvif.org/ver10/device/wsdl" xmlns:tt="http://www.onvif.org/ver10/schema">
  <s:Body>
    <tds:GetSystemDateAndTimeResponse>
      <tds:SystemDateAndTime>
        <tt:DateTimeType>NTP</tt:DateTimeType>
        <tt:DaylightSavings>false</tt:DaylightSavings>
        <tt:UTCDateTime>
          <tt:Time>
            <tt:Hour>14</tt:Hour>
            <tt:Minute>30</tt:Minute>
            <tt:Second>5</tt:Second>
          </tt:Time>
          <tt:Date>
            <tt:Year>2024</tt:Year>
            <tt:Month>6</tt:Month>
            <tt:Day>15</tt:Day>
          </tt:Date>
        </tt:UTCDateTime>
      </tds:SystemDateAndTime>
    </tds:GetSystemDateAndTimeResponse>
  </s:Body>
</s:Envelope>"#;

    #[test]
    fn test_parse_system_date_time() {
        let parsed = parse_system_date_time(DATE_TIME_RESPONSE).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 6, 15, 14, 30, 5).unwrap());
    }

    #[test]
    fn test_parse_system_date_time_missing_section() {
        assert!(parse_system_date_time("<s:Envelope/>").is_none());
    }

    #[test]
    fn test_parse_system_date_time_garbage_fields() {
        let body = "<UTCDateTime><Hour>xx</Hour></UTCDateTime>";
        assert!(parse_system_date_time(body).is_none());
    }
}
