//! WS-Discovery
//!
//! Passive device discovery: one multicast Probe for
//! NetworkVideoTransmitter devices, then replies are decoded and printed
//! until the process is stopped. Replies carry no completion signal.

use std::borrow::Cow;

use tokio::net::UdpSocket;

use crate::error::Result;
use crate::onvif::xml;

/// WS-Discovery multicast group
pub const MULTICAST_ADDR: &str = "239.255.255.250:3702";

const NAME_SCOPE_PREFIX: &str = "onvif://www.onvif.org/name/";
const HARDWARE_SCOPE_PREFIX: &str = "onvif://www.onvif.org/hardware/";

/// Fields decoded from one probe reply's scope list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReply {
    pub name: Option<String>,
    pub hardware: Option<String>,
}

/// Decode one raw probe-reply message. None when the reply carries no
/// Scopes element; malformed replies are skipped, not errors.
pub fn parse_reply(body: &str) -> Option<DiscoveryReply> {
    let scopes = xml::first_value(body, "Scopes")?;
    Some(decode_scopes(&scopes))
}

/// Scan space-separated scope tokens for the well-known name and hardware
/// prefixes and percent-decode the remainders. Tokens matching neither
/// prefix are ignored; a missing scope yields an absent field.
pub fn decode_scopes(scopes: &str) -> DiscoveryReply {
    let mut reply = DiscoveryReply::default();
    for token in scopes.split_whitespace() {
        if let Some(rest) = token.strip_prefix(NAME_SCOPE_PREFIX) {
            reply.name = Some(percent_decode(rest));
        } else if let Some(rest) = token.strip_prefix(HARDWARE_SCOPE_PREFIX) {
            reply.hardware = Some(percent_decode(rest));
        }
    }
    reply
}

fn percent_decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| value.to_string())
}

fn probe_message() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:wsa="http://schemas.xmlsoap.org/ws/2004/08/addressing" xmlns:wsd="http://schemas.xmlsoap.org/ws/2005/04/discovery" xmlns:dn="http://www.onvif.org/ver10/network/wsdl">
  <s:Header>
    <wsa:Action>http://schemas.xmlsoap.org/ws/2005/04/discovery/Probe</wsa:Action>
    <wsa:MessageID>urn:uuid:{}</wsa:MessageID>
    <wsa:To>urn:schemas-xmlsoap-org:ws:2005:04:discovery</wsa:To>
  </s:Header>
  <s:Body>
    <wsd:Probe>
      <wsd:Types>dn:NetworkVideoTransmitter</wsd:Types>
    </wsd:Probe>
  </s:Body>
</s:Envelope>"#,
        uuid::Uuid::new_v4()
    )
}

/// Send a probe and print one line per decoded reply. Runs until the
/// process is interrupted.
pub async fn run() -> Result<()> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket
        .send_to(probe_message().as_bytes(), MULTICAST_ADDR)
        .await?;
    tracing::info!("Discovery probe sent, waiting for replies (Ctrl-C to stop)");

    let mut buf = vec![0u8; 8192];
    loop {
        let (len, addr) = socket.recv_from(&mut buf).await?;
        let body = String::from_utf8_lossy(&buf[..len]);
        if let Some(reply) = parse_reply(&body) {
            println!(
                "Discovery Reply from {} ({}) ({})",
                addr.ip(),
                reply.name.as_deref().unwrap_or(""),
                reply.hardware.as_deref().unwrap_or("")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_scopes() {
        let reply = decode_scopes(
            "onvif://www.onvif.org/name/My%20Camera onvif://www.onvif.org/hardware/ModelX",
        );
        assert_eq!(reply.name.as_deref(), Some("My Camera"));
        assert_eq!(reply.hardware.as_deref(), Some("ModelX"));
    }

    #[test]
    fn test_decode_scopes_ignores_other_tokens() {
        let reply = decode_scopes(
            "onvif://www.onvif.org/type/video_encoder onvif://www.onvif.org/Profile/Streaming onvif://www.onvif.org/hardware/HW1",
        );
        assert_eq!(reply.name, None);
        assert_eq!(reply.hardware.as_deref(), Some("HW1"));
    }

    #[test]
    fn test_decode_scopes_empty() {
        assert_eq!(decode_scopes(""), DiscoveryReply::default());
    }

    #[test]
    fn test_parse_reply() {
        let body = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:d="http://schemas.xmlsoap.org/ws/2005/04/discovery">
  <s:Body>
    <d:ProbeMatches>
      <d:ProbeMatch>
        <d:XAddrs>http://192.168.1.50/onvif/device_service</d:XAddrs>
        <d:Scopes>onvif://www.onvif.org/name/Front%20Door onvif://www.onvif.org/hardware/D1</d:Scopes>
      </d:ProbeMatch>
    </d:ProbeMatches>
  </s:Body>
</s:Envelope>"#;
        let reply = parse_reply(body).unwrap();
        assert_eq!(reply.name.as_deref(), Some("Front Door"));
        assert_eq!(reply.hardware.as_deref(), Some("D1"));
    }

    #[test]
    fn test_parse_reply_without_scopes_is_skipped() {
        assert_eq!(parse_reply("<Envelope><Body/></Envelope>"), None);
        assert_eq!(parse_reply("not xml at all"), None);
    }

    #[test]
    fn test_probe_message_shape() {
        let probe = probe_message();
        assert!(probe.contains("NetworkVideoTransmitter"));
        assert!(probe.contains("urn:uuid:"));
        assert!(probe.contains("discovery/Probe"));
    }
}
