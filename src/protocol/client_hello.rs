//! ClientHello message decoding
//!
//! Decodes the body of a reassembled handshake message (RFC 5246 §7.4.1.2)
//! together with the extensions tlsmux cares about. Every length is checked
//! against the remaining input; a short or inconsistent buffer is a decode
//! failure, never a panic.

use super::error::Alert;

/// Handshake message type of a ClientHello
pub const TYPE_CLIENT_HELLO: u8 = 1;

const EXTENSION_SERVER_NAME: u16 = 0;
const EXTENSION_STATUS_REQUEST: u16 = 5;
const EXTENSION_SUPPORTED_CURVES: u16 = 10;
const EXTENSION_SUPPORTED_POINTS: u16 = 11;
const EXTENSION_SESSION_TICKET: u16 = 35;
// not IANA assigned
const EXTENSION_NEXT_PROTO_NEG: u16 = 13172;

const STATUS_TYPE_OCSP: u8 = 1;
const NAME_TYPE_HOST_NAME: u8 = 0;

/// Fields decoded from a ClientHello
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientHelloMessage {
    /// The complete handshake message, header included
    pub raw: Vec<u8>,
    /// Client protocol version
    pub version: u16,
    /// Client random
    pub random: [u8; 32],
    /// Legacy session id (at most 32 bytes)
    pub session_id: Vec<u8>,
    /// Offered cipher suites
    pub cipher_suites: Vec<u16>,
    /// Offered compression methods
    pub compression_methods: Vec<u8>,
    /// Next protocol negotiation was offered
    pub next_proto_neg: bool,
    /// First DNS host name from the `server_name` extension, empty when absent
    pub server_name: String,
    /// OCSP stapling was requested
    pub ocsp_stapling: bool,
    /// Supported elliptic curves (RFC 4492 §5.5.1)
    pub supported_curves: Vec<u16>,
    /// Supported point formats (RFC 4492 §5.5.2)
    pub supported_points: Vec<u8>,
    /// The `session_ticket` extension was present
    pub ticket_supported: bool,
    /// Raw ticket bytes sent with the `session_ticket` extension
    pub session_ticket: Vec<u8>,
}

impl ClientHelloMessage {
    /// Decode a full handshake message (4 byte header plus body)
    ///
    /// Any malformed input is reported as [`Alert::UnexpectedMessage`].
    pub fn decode(data: &[u8]) -> Result<Self, Alert> {
        Self::parse(data).ok_or(Alert::UnexpectedMessage)
    }

    fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 42 {
            return None;
        }

        let mut msg = ClientHelloMessage {
            raw: data.to_vec(),
            version: u16::from_be_bytes([data[4], data[5]]),
            ..Default::default()
        };
        msg.random.copy_from_slice(&data[6..38]);

        let session_id_len = data[38] as usize;
        if session_id_len > 32 {
            return None;
        }
        let (session_id, rest) = take(&data[39..], session_id_len)?;
        msg.session_id = session_id.to_vec();

        // cipher suites are uint16s, so the byte length must be even
        let (cipher_suite_len, rest) = take_u16(rest)?;
        if cipher_suite_len % 2 == 1 {
            return None;
        }
        let (suites, rest) = take(rest, cipher_suite_len as usize)?;
        msg.cipher_suites = be_u16s(suites);

        let (compression_len, rest) = take_u8(rest)?;
        let (methods, rest) = take(rest, compression_len as usize)?;
        msg.compression_methods = methods.to_vec();

        // extensions are optional
        if rest.is_empty() {
            return Some(msg);
        }

        let (extensions_len, mut extensions) = take_u16(rest)?;
        if extensions_len as usize != extensions.len() {
            return None;
        }

        while !extensions.is_empty() {
            let (extension, rest) = take_u16(extensions)?;
            let (length, rest) = take_u16(rest)?;
            let (body, rest) = take(rest, length as usize)?;
            extensions = rest;

            match extension {
                EXTENSION_SERVER_NAME => {
                    if let Some(name) = parse_server_name(body)? {
                        msg.server_name = name;
                    }
                }
                EXTENSION_NEXT_PROTO_NEG => {
                    if length > 0 {
                        return None;
                    }
                    msg.next_proto_neg = true;
                }
                EXTENSION_STATUS_REQUEST => {
                    msg.ocsp_stapling = body.first() == Some(&STATUS_TYPE_OCSP);
                }
                EXTENSION_SUPPORTED_CURVES => {
                    let (list_len, curves) = take_u16(body)?;
                    if list_len % 2 == 1 || body.len() != list_len as usize + 2 {
                        return None;
                    }
                    msg.supported_curves = be_u16s(curves);
                }
                EXTENSION_SUPPORTED_POINTS => {
                    let (list_len, points) = take_u8(body)?;
                    if body.len() != list_len as usize + 1 {
                        return None;
                    }
                    msg.supported_points = points.to_vec();
                }
                EXTENSION_SESSION_TICKET => {
                    msg.ticket_supported = true;
                    msg.session_ticket = body.to_vec();
                }
                _ => {}
            }
        }

        Some(msg)
    }
}

/// Returns the first host_name entry of a `server_name` extension body
///
/// The outer `Option` is `None` on malformed input.
fn parse_server_name(body: &[u8]) -> Option<Option<String>> {
    let (list_len, rest) = take_u16(body)?;
    let (mut list, _) = take(rest, list_len as usize)?;

    while !list.is_empty() {
        let (name_type, rest) = take_u8(list)?;
        let (name_len, rest) = take_u16(rest)?;
        let (name, rest) = take(rest, name_len as usize)?;
        if name_type == NAME_TYPE_HOST_NAME {
            return String::from_utf8(name.to_vec()).ok().map(Some);
        }
        list = rest;
    }

    Some(None)
}

fn take(data: &[u8], n: usize) -> Option<(&[u8], &[u8])> {
    if data.len() < n {
        return None;
    }
    Some(data.split_at(n))
}

fn take_u8(data: &[u8]) -> Option<(u8, &[u8])> {
    let (head, rest) = data.split_first()?;
    Some((*head, rest))
}

fn take_u16(data: &[u8]) -> Option<(u16, &[u8])> {
    let (head, rest) = take(data, 2)?;
    Some((u16::from_be_bytes([head[0], head[1]]), rest))
}

fn be_u16s(data: &[u8]) -> Vec<u16> {
    data.chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::testing::ClientHelloBuilder;

    #[test]
    fn test_decode_server_name() {
        let hello = ClientHelloBuilder::new().server_name("db.example.com").handshake();
        let msg = ClientHelloMessage::decode(&hello).unwrap();

        assert_eq!(msg.server_name, "db.example.com");
        assert_eq!(msg.version, 0x0303);
        assert_eq!(msg.cipher_suites, vec![0x002f, 0x0035]);
        assert_eq!(msg.compression_methods, vec![0]);
        assert_eq!(msg.raw, hello);
    }

    #[test]
    fn test_decode_without_extensions() {
        let hello = ClientHelloBuilder::new().without_extensions().handshake();
        let msg = ClientHelloMessage::decode(&hello).unwrap();

        assert_eq!(msg.server_name, "");
        assert!(!msg.ticket_supported);
    }

    #[test]
    fn test_decode_skips_non_host_name_entries() {
        let hello = ClientHelloBuilder::new()
            .raw_server_name_entries(&[(1, b"ignored"), (0, b"Real.Example.com")])
            .handshake();
        let msg = ClientHelloMessage::decode(&hello).unwrap();

        // decoding does not case-fold; the muxer does
        assert_eq!(msg.server_name, "Real.Example.com");
    }

    #[test]
    fn test_decode_rejects_odd_cipher_suite_length() {
        let hello = ClientHelloBuilder::new()
            .raw_cipher_suites(&[0x00, 0x2f, 0x00])
            .handshake();
        assert_eq!(ClientHelloMessage::decode(&hello), Err(Alert::UnexpectedMessage));
    }

    #[test]
    fn test_decode_accepts_empty_cipher_suites() {
        let hello = ClientHelloBuilder::new().raw_cipher_suites(&[]).handshake();
        let msg = ClientHelloMessage::decode(&hello).unwrap();
        assert!(msg.cipher_suites.is_empty());
    }

    #[test]
    fn test_decode_rejects_long_session_id() {
        let hello = ClientHelloBuilder::new().session_id(&[7u8; 33]).handshake();
        assert_eq!(ClientHelloMessage::decode(&hello), Err(Alert::UnexpectedMessage));

        let hello = ClientHelloBuilder::new().session_id(&[7u8; 32]).handshake();
        assert_eq!(ClientHelloMessage::decode(&hello).unwrap().session_id, vec![7u8; 32]);
    }

    #[test]
    fn test_decode_requires_exact_extensions_length() {
        let good = ClientHelloBuilder::new().server_name("a.example.com");

        let mut longer = good.clone();
        longer.extensions_length_delta(1);
        assert!(ClientHelloMessage::decode(&longer.handshake()).is_err());

        let mut shorter = good.clone();
        shorter.extensions_length_delta(-1);
        assert!(ClientHelloMessage::decode(&shorter.handshake()).is_err());

        assert!(ClientHelloMessage::decode(&good.handshake()).is_ok());
    }

    #[test]
    fn test_decode_optional_extensions() {
        let hello = ClientHelloBuilder::new()
            .server_name("x.example.com")
            .extension(5, &[1, 0, 0, 0, 0])
            .extension(10, &[0x00, 0x04, 0x00, 0x17, 0x00, 0x18])
            .extension(11, &[0x01, 0x00])
            .extension(35, b"ticket")
            .extension(13172, &[])
            .extension(0xff01, &[0x00])
            .handshake();
        let msg = ClientHelloMessage::decode(&hello).unwrap();

        assert!(msg.ocsp_stapling);
        assert_eq!(msg.supported_curves, vec![0x0017, 0x0018]);
        assert_eq!(msg.supported_points, vec![0x00]);
        assert!(msg.ticket_supported);
        assert_eq!(msg.session_ticket, b"ticket".to_vec());
        assert!(msg.next_proto_neg);
        assert_eq!(msg.server_name, "x.example.com");
    }

    #[test]
    fn test_decode_rejects_malformed_extensions() {
        // next protocol negotiation must be empty
        let hello = ClientHelloBuilder::new().extension(13172, &[1]).handshake();
        assert!(ClientHelloMessage::decode(&hello).is_err());

        // curve list length disagrees with the extension length
        let hello = ClientHelloBuilder::new().extension(10, &[0x00, 0x04, 0x00, 0x17]).handshake();
        assert!(ClientHelloMessage::decode(&hello).is_err());

        // odd curve list
        let hello = ClientHelloBuilder::new().extension(10, &[0x00, 0x01, 0x17]).handshake();
        assert!(ClientHelloMessage::decode(&hello).is_err());

        // point list length disagrees with the extension length
        let hello = ClientHelloBuilder::new().extension(11, &[0x02, 0x00]).handshake();
        assert!(ClientHelloMessage::decode(&hello).is_err());

        // server name entry runs past the list
        let hello = ClientHelloBuilder::new().extension(0, &[0x00, 0x05, 0x00, 0x00, 0x09, b'a', b'b']).handshake();
        assert!(ClientHelloMessage::decode(&hello).is_err());
    }

    #[test]
    fn test_decode_rejects_invalid_utf8_host() {
        let hello = ClientHelloBuilder::new()
            .raw_server_name_entries(&[(0, &[0xff, 0xfe])])
            .handshake();
        assert!(ClientHelloMessage::decode(&hello).is_err());
    }

    #[test]
    fn test_decode_rejects_short_input() {
        assert!(ClientHelloMessage::decode(&[1, 0, 0, 2, 3, 3]).is_err());
        assert!(ClientHelloMessage::decode(&[]).is_err());
    }
}
