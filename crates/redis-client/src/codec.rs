//! RESP framing for tokio-util.

use bytes::BytesMut;
use resp_protocol::{Command, Value};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::Error;

/// RESP codec for tokio-util framing.
///
/// Encodes outbound [`Command`]s and decodes inbound [`Value`] replies over
/// a byte stream. The decoder is fully incremental: it leaves partial frames
/// in the read buffer untouched until more data arrives.
#[derive(Debug, Default)]
pub struct RespCodec {
    _private: (),
}

impl RespCodec {
    /// Create a new codec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for RespCodec {
    type Item = Value;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let value = Value::decode(src)?;
        if let Some(value) = &value {
            tracing::trace!(reply = value.type_name(), "decoded RESP reply");
        }
        Ok(value)
    }
}

impl Encoder<&Command> for RespCodec {
    type Error = Error;

    fn encode(&mut self, item: &Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst);
        tracing::trace!(
            command = %String::from_utf8_lossy(item.name()),
            parts = item.len(),
            "encoded RESP command"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn encodes_command_frames() {
        let mut codec = RespCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode(&Command::new("PING"), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"*1\r\n$4\r\nPING\r\n");
    }

    #[test]
    fn decodes_across_reads() {
        let mut codec = RespCodec::new();
        let mut buf = BytesMut::from(&b"+PO"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"NG\r\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Value::Simple("PONG".into()))
        );
    }
}
