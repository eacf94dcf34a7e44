//! SOAP envelope construction
//!
//! Requests are SOAP 1.2 with an optional WS-Security UsernameToken
//! header: PasswordDigest = Base64(SHA1(nonce + created + password)).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::Rng;
use sha1::{Digest, Sha1};

use super::types::StreamProtocol;

pub const GET_SYSTEM_DATE_AND_TIME: &str =
    r#"<GetSystemDateAndTime xmlns="http://www.onvif.org/ver10/device/wsdl"/>"#;

pub const GET_DEVICE_INFORMATION: &str =
    r#"<GetDeviceInformation xmlns="http://www.onvif.org/ver10/device/wsdl"/>"#;

pub const GET_PROFILES: &str = r#"<GetProfiles xmlns="http://www.onvif.org/ver10/media/wsdl"/>"#;

pub fn get_snapshot_uri(profile_token: &str) -> String {
    format!(
        r#"<GetSnapshotUri xmlns="http://www.onvif.org/ver10/media/wsdl"><ProfileToken>{}</ProfileToken></GetSnapshotUri>"#,
        profile_token
    )
}

pub fn get_stream_uri(protocol: StreamProtocol, profile_token: &str) -> String {
    format!(
        r#"<GetStreamUri xmlns="http://www.onvif.org/ver10/media/wsdl"><StreamSetup><Stream xmlns="http://www.onvif.org/ver10/schema">RTP-Unicast</Stream><Transport xmlns="http://www.onvif.org/ver10/schema"><Protocol>{}</Protocol></Transport></StreamSetup><ProfileToken>{}</ProfileToken></GetStreamUri>"#,
        protocol.as_str(),
        profile_token
    )
}

/// Wrap a request body, with the security header when one is given.
pub fn envelope(security_header: Option<&str>, body: &str) -> String {
    match security_header {
        Some(header) => format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
  <s:Header>
    {}
  </s:Header>
  <s:Body>
    {}
  </s:Body>
</s:Envelope>"#,
            header, body
        ),
        None => format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
  <s:Body>
    {}
  </s:Body>
</s:Envelope>"#,
            body
        ),
    }
}

/// WS-Security UsernameToken header with a fresh nonce and timestamp.
pub fn security_header(username: &str, password: &str) -> String {
    let mut rng = rand::thread_rng();
    let nonce: [u8; 16] = rng.gen();
    let created = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let digest = password_digest(&nonce, &created, password);

    format!(
        r#"<wsse:Security xmlns:wsse="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd" xmlns:wsu="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd">
      <wsse:UsernameToken>
        <wsse:Username>{}</wsse:Username>
        <wsse:Password Type="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordDigest">{}</wsse:Password>
        <wsse:Nonce EncodingType="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary">{}</wsse:Nonce>
        <wsu:Created>{}</wsu:Created>
      </wsse:UsernameToken>
    </wsse:Security>"#,
        username,
        digest,
        BASE64.encode(nonce),
        created
    )
}

/// Base64(SHA1(nonce + created + password))
pub fn password_digest(nonce: &[u8], created: &str, password: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce);
    hasher.update(created.as_bytes());
    hasher.update(password.as_bytes());
    BASE64.encode(hasher.finalize())
}
