//! The `Message` frame and its JSON encoding.
//!
//! Field layout matches spec §6 exactly; `data` is base64-encoded because
//! `serde_json` has no native byte-string type.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Maximum payload per `data` frame (spec §6).
pub const MAX_DATA_LEN: usize = 16 * 1024;

/// Command carried by a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cmd {
    Connect,
    Data,
    Close,
    Switch,
}

/// One tunnel frame. One `Message` per WebSocket binary message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub cmd: Cmd,
    #[serde(default)]
    pub cid: String,
    #[serde(default = "default_ok")]
    pub ok: bool,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default, with = "base64_bytes")]
    pub data: Bytes,
}

fn default_ok() -> bool {
    true
}

impl Message {
    /// Build a `connect` request frame.
    pub fn connect(cid: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            cmd: Cmd::Connect,
            cid: cid.into(),
            ok: true,
            msg: String::new(),
            host: host.into(),
            port,
            data: Bytes::new(),
        }
    }

    /// Build a `connect` reply frame.
    pub fn connect_reply(cid: impl Into<String>, ok: bool, msg: impl Into<String>) -> Self {
        Self {
            cmd: Cmd::Connect,
            cid: cid.into(),
            ok,
            msg: msg.into(),
            host: String::new(),
            port: 0,
            data: Bytes::new(),
        }
    }

    /// Build a `data` frame.
    pub fn data(
        cid: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        data: Bytes,
    ) -> Self {
        Self {
            cmd: Cmd::Data,
            cid: cid.into(),
            ok: true,
            msg: String::new(),
            host: host.into(),
            port,
            data,
        }
    }

    /// Build a `close` frame.
    pub fn close(cid: impl Into<String>) -> Self {
        Self {
            cmd: Cmd::Close,
            cid: cid.into(),
            ok: true,
            msg: String::new(),
            host: String::new(),
            port: 0,
            data: Bytes::new(),
        }
    }

    /// Build a `switch` advisory frame. `switch` carries no `cid` (spec §4.5).
    pub fn switch() -> Self {
        Self {
            cmd: Cmd::Switch,
            cid: String::new(),
            ok: true,
            msg: String::new(),
            host: String::new(),
            port: 0,
            data: Bytes::new(),
        }
    }

    /// Encode to the wire representation (one WebSocket binary message).
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        if self.data.len() > MAX_DATA_LEN {
            return Err(ProtocolError::FrameTooLarge {
                len: self.data.len(),
            });
        }
        serde_json::to_vec(self).map_err(ProtocolError::Encode)
    }

    /// Decode a WebSocket binary message into a `Message`.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let msg: Self = serde_json::from_slice(bytes).map_err(ProtocolError::Decode)?;
        if msg.data.len() > MAX_DATA_LEN {
            return Err(ProtocolError::FrameTooLarge {
                len: msg.data.len(),
            });
        }
        Ok(msg)
    }
}

/// Protocol-level errors: malformed or oversized frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("failed to decode frame: {0}")]
    Decode(serde_json::Error),
    #[error("failed to encode frame: {0}")]
    Encode(serde_json::Error),
    #[error("data frame too large: {len} bytes (max {MAX_DATA_LEN})")]
    FrameTooLarge { len: usize },
}

/// serde helper: (de)serialize `Bytes` as a base64 string.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD
            .decode(s.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_each_cmd_variant() {
        let msgs = vec![
            Message::connect("abcd1234", "example.com", 80),
            Message::connect_reply("abcd1234", true, ""),
            Message::connect_reply("abcd1234", false, "connection refused"),
            Message::data("abcd1234", "example.com", 80, Bytes::from_static(b"hello")),
            Message::close("abcd1234"),
            Message::switch(),
        ];
        for msg in msgs {
            let encoded = msg.encode().expect("encode");
            let decoded = Message::decode(&encoded).expect("decode");
            assert_eq!(decoded.cmd, msg.cmd);
            assert_eq!(decoded.cid, msg.cid);
            assert_eq!(decoded.ok, msg.ok);
            assert_eq!(decoded.host, msg.host);
            assert_eq!(decoded.port, msg.port);
            assert_eq!(decoded.data, msg.data);
        }
    }

    #[test]
    fn rejects_oversized_data_on_encode() {
        let oversized = Bytes::from(vec![0u8; MAX_DATA_LEN + 1]);
        let msg = Message::data("abcd1234", "h", 1, oversized);
        assert!(matches!(
            msg.encode(),
            Err(ProtocolError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn rejects_garbage_on_decode() {
        assert!(Message::decode(b"not json").is_err());
    }

    #[test]
    fn unknown_cmd_fails_decode() {
        let raw = br#"{"cmd":"teleport","cid":"x"}"#;
        assert!(Message::decode(raw).is_err());
    }
}
