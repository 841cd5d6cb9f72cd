//! Reply model and incremental decoder.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// Maximum bulk-string payload the decoder accepts (matches the stock
/// server-side `proto-max-bulk-len`).
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Maximum number of elements in a single array reply.
pub const MAX_ARRAY_LEN: usize = 1024 * 1024;

/// Maximum length of a single frame header / simple-string line.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Maximum array nesting depth the decoder accepts. Replies to the commands
/// this protocol serves nest at most two levels; the bound keeps the
/// recursive parser's stack usage proportional to it.
pub const MAX_DEPTH: usize = 32;

/// One decoded RESP2 reply.
///
/// This is the explicit sum type callers branch on instead of casting opaque
/// reply objects: every reply a command exchange produces is exactly one of
/// these shapes, and the `into_*` conversions reject mismatches with
/// [`ProtocolError::UnexpectedReply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Simple (status) string reply, e.g. `+OK`.
    Simple(String),
    /// Error reply, e.g. `-ERR unknown command`.
    Error(String),
    /// Integer reply, e.g. `:42`.
    Integer(i64),
    /// Bulk string reply (binary safe).
    Bulk(Bytes),
    /// Null bulk (`$-1`) or null array (`*-1`): the key or field is absent.
    Nil,
    /// Array reply; elements may themselves be any shape.
    Array(Vec<Value>),
}

impl Value {
    /// Decode one complete reply from the front of `src`.
    ///
    /// Returns `Ok(None)` when `src` does not yet hold a full frame; in that
    /// case nothing is consumed. On success exactly one frame is consumed.
    pub fn decode(src: &mut BytesMut) -> Result<Option<Value>, ProtocolError> {
        let mut pos = 0;
        match parse(src, &mut pos, 0)? {
            Some(value) => {
                src.advance(pos);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Encode this value onto `dst` in RESP2 wire form.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Value::Simple(s) => put_line(dst, b'+', s.as_bytes()),
            Value::Error(s) => put_line(dst, b'-', s.as_bytes()),
            Value::Integer(n) => put_line(dst, b':', n.to_string().as_bytes()),
            Value::Bulk(payload) => {
                put_line(dst, b'$', payload.len().to_string().as_bytes());
                dst.put_slice(payload);
                dst.put_slice(b"\r\n");
            }
            Value::Nil => dst.put_slice(b"$-1\r\n"),
            Value::Array(items) => {
                put_line(dst, b'*', items.len().to_string().as_bytes());
                for item in items {
                    item.encode(dst);
                }
            }
        }
    }

    /// Wire shape name, for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Simple(_) => "simple string",
            Value::Error(_) => "error",
            Value::Integer(_) => "integer",
            Value::Bulk(_) => "bulk string",
            Value::Nil => "nil",
            Value::Array(_) => "array",
        }
    }

    /// Expect a status (simple string) reply, e.g. the `+OK` of SET.
    pub fn into_status(self) -> Result<String, ProtocolError> {
        match self {
            Value::Simple(s) => Ok(s),
            other => Err(other.mismatch("simple string")),
        }
    }

    /// Expect an integer reply.
    pub fn into_integer(self) -> Result<i64, ProtocolError> {
        match self {
            Value::Integer(n) => Ok(n),
            other => Err(other.mismatch("integer")),
        }
    }

    /// Expect an integer reply and decode it as a boolean (`> 0` is true).
    ///
    /// This is the decode rule for existence and deletion counts: EXISTS,
    /// HEXISTS, HDEL, and multi-key DEL all answer with a count.
    pub fn into_boolean(self) -> Result<bool, ProtocolError> {
        Ok(self.into_integer()? > 0)
    }

    /// Expect a present byte-string reply (bulk or simple).
    pub fn into_bytes(self) -> Result<Bytes, ProtocolError> {
        match self {
            Value::Bulk(payload) => Ok(payload),
            Value::Simple(s) => Ok(Bytes::from(s)),
            other => Err(other.mismatch("bulk string")),
        }
    }

    /// Expect a byte-string reply that may be absent.
    ///
    /// `Nil` decodes to `None`: absence is a normal outcome, distinguishable
    /// from the empty byte string at every call site.
    pub fn into_optional_bytes(self) -> Result<Option<Bytes>, ProtocolError> {
        match self {
            Value::Nil => Ok(None),
            other => other.into_bytes().map(Some),
        }
    }

    /// Expect an array reply. A null array decodes to an empty vector.
    pub fn into_array(self) -> Result<Vec<Value>, ProtocolError> {
        match self {
            Value::Array(items) => Ok(items),
            Value::Nil => Ok(Vec::new()),
            other => Err(other.mismatch("array")),
        }
    }

    fn mismatch(self, expected: &'static str) -> ProtocolError {
        match self {
            // An error reply is never a shape mismatch; surface its message.
            Value::Error(message) => ProtocolError::Server(message),
            other => ProtocolError::UnexpectedReply {
                expected,
                found: other.type_name(),
            },
        }
    }
}

fn put_line(dst: &mut BytesMut, marker: u8, line: &[u8]) {
    dst.reserve(line.len() + 3);
    dst.put_u8(marker);
    dst.put_slice(line);
    dst.put_slice(b"\r\n");
}

/// Parse one value starting at `*pos`, advancing `*pos` past it.
///
/// Returns `Ok(None)` when the buffer ends before the value does; callers
/// must then leave the buffer untouched and retry with more data.
fn parse(buf: &[u8], pos: &mut usize, depth: usize) -> Result<Option<Value>, ProtocolError> {
    if depth > MAX_DEPTH {
        return Err(ProtocolError::NestingTooDeep { max: MAX_DEPTH });
    }
    let Some(line) = take_line(buf, pos)? else {
        return Ok(None);
    };
    let (&marker, body) = line
        .split_first()
        .ok_or(ProtocolError::BadTypeMarker(b'\r'))?;

    match marker {
        b'+' => Ok(Some(Value::Simple(text(body)?))),
        b'-' => Ok(Some(Value::Error(text(body)?))),
        b':' => Ok(Some(Value::Integer(parse_int(body)?))),
        b'$' => {
            let declared = parse_int(body)?;
            if declared == -1 {
                return Ok(Some(Value::Nil));
            }
            let len = usize::try_from(declared)
                .map_err(|_| ProtocolError::InvalidLength(declared))?;
            if len > MAX_BULK_LEN {
                return Err(ProtocolError::FrameTooLarge {
                    size: len,
                    max: MAX_BULK_LEN,
                });
            }
            if buf.len() < *pos + len + 2 {
                return Ok(None);
            }
            let payload = Bytes::copy_from_slice(&buf[*pos..*pos + len]);
            if &buf[*pos + len..*pos + len + 2] != b"\r\n" {
                return Err(ProtocolError::MissingTerminator);
            }
            *pos += len + 2;
            Ok(Some(Value::Bulk(payload)))
        }
        b'*' => {
            let declared = parse_int(body)?;
            if declared == -1 {
                return Ok(Some(Value::Nil));
            }
            let len = usize::try_from(declared)
                .map_err(|_| ProtocolError::InvalidLength(declared))?;
            if len > MAX_ARRAY_LEN {
                return Err(ProtocolError::FrameTooLarge {
                    size: len,
                    max: MAX_ARRAY_LEN,
                });
            }
            let mut items = Vec::with_capacity(len.min(64));
            for _ in 0..len {
                match parse(buf, pos, depth + 1)? {
                    Some(item) => items.push(item),
                    None => return Ok(None),
                }
            }
            Ok(Some(Value::Array(items)))
        }
        other => Err(ProtocolError::BadTypeMarker(other)),
    }
}

/// Take one CRLF-terminated line starting at `*pos`, without the terminator.
fn take_line<'a>(buf: &'a [u8], pos: &mut usize) -> Result<Option<&'a [u8]>, ProtocolError> {
    let start = *pos;
    let mut i = start;
    while i + 1 < buf.len() {
        if buf[i] == b'\r' && buf[i + 1] == b'\n' {
            *pos = i + 2;
            return Ok(Some(&buf[start..i]));
        }
        i += 1;
    }
    if buf.len() - start > MAX_LINE_LEN {
        return Err(ProtocolError::FrameTooLarge {
            size: buf.len() - start,
            max: MAX_LINE_LEN,
        });
    }
    Ok(None)
}

fn parse_int(digits: &[u8]) -> Result<i64, ProtocolError> {
    let s = std::str::from_utf8(digits)
        .map_err(|_| ProtocolError::InvalidInteger(String::from_utf8_lossy(digits).into_owned()))?;
    s.parse()
        .map_err(|_| ProtocolError::InvalidInteger(s.to_owned()))
}

fn text(body: &[u8]) -> Result<String, ProtocolError> {
    // Status and error lines are ASCII in practice; tolerate any UTF-8.
    Ok(String::from_utf8_lossy(body).into_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn decode_all(input: &[u8]) -> (Vec<Value>, usize) {
        let mut buf = BytesMut::from(input);
        let mut out = Vec::new();
        while let Some(v) = Value::decode(&mut buf).unwrap() {
            out.push(v);
        }
        (out, buf.len())
    }

    #[test]
    fn decodes_simple_string() {
        let (values, rest) = decode_all(b"+OK\r\n");
        assert_eq!(values, vec![Value::Simple("OK".into())]);
        assert_eq!(rest, 0);
    }

    #[test]
    fn decodes_error_reply() {
        let (values, _) = decode_all(b"-ERR unknown command\r\n");
        assert_eq!(values, vec![Value::Error("ERR unknown command".into())]);
    }

    #[test]
    fn decodes_integer() {
        let (values, _) = decode_all(b":-42\r\n");
        assert_eq!(values, vec![Value::Integer(-42)]);
    }

    #[test]
    fn decodes_bulk_and_nil() {
        let (values, _) = decode_all(b"$5\r\nhello\r\n$-1\r\n$0\r\n\r\n");
        assert_eq!(
            values,
            vec![
                Value::Bulk(Bytes::from_static(b"hello")),
                Value::Nil,
                Value::Bulk(Bytes::new()),
            ]
        );
    }

    #[test]
    fn decodes_nested_array() {
        let (values, _) = decode_all(b"*2\r\n*1\r\n:1\r\n$2\r\nab\r\n");
        assert_eq!(
            values,
            vec![Value::Array(vec![
                Value::Array(vec![Value::Integer(1)]),
                Value::Bulk(Bytes::from_static(b"ab")),
            ])]
        );
    }

    #[test]
    fn decodes_null_array_as_nil() {
        let (values, _) = decode_all(b"*-1\r\n");
        assert_eq!(values, vec![Value::Nil]);
    }

    #[test]
    fn partial_input_consumes_nothing() {
        for cut in 1.."$5\r\nhello\r\n".len() {
            let mut buf = BytesMut::from(&b"$5\r\nhello\r\n"[..cut]);
            assert_eq!(Value::decode(&mut buf).unwrap(), None);
            assert_eq!(buf.len(), cut, "cut at {cut} must not consume");
        }
    }

    #[test]
    fn partial_array_consumes_nothing() {
        let mut buf = BytesMut::from(&b"*2\r\n:1\r\n"[..]);
        assert_eq!(Value::decode(&mut buf).unwrap(), None);
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn rejects_unknown_marker() {
        let mut buf = BytesMut::from(&b"?3\r\n"[..]);
        assert_eq!(
            Value::decode(&mut buf).unwrap_err(),
            ProtocolError::BadTypeMarker(b'?')
        );
    }

    #[test]
    fn rejects_negative_length_other_than_nil() {
        let mut buf = BytesMut::from(&b"$-2\r\n"[..]);
        assert_eq!(
            Value::decode(&mut buf).unwrap_err(),
            ProtocolError::InvalidLength(-2)
        );
    }

    #[test]
    fn rejects_pathological_nesting() {
        let mut buf = BytesMut::new();
        for _ in 0..100 {
            buf.extend_from_slice(b"*1\r\n");
        }
        buf.extend_from_slice(b":1\r\n");
        assert_eq!(
            Value::decode(&mut buf).unwrap_err(),
            ProtocolError::NestingTooDeep { max: MAX_DEPTH }
        );
    }

    #[test]
    fn rejects_bulk_without_terminator() {
        let mut buf = BytesMut::from(&b"$2\r\nabXX"[..]);
        assert_eq!(
            Value::decode(&mut buf).unwrap_err(),
            ProtocolError::MissingTerminator
        );
    }

    #[test]
    fn encode_round_trips_through_decode() {
        let original = Value::Array(vec![
            Value::Simple("OK".into()),
            Value::Integer(7),
            Value::Bulk(Bytes::from_static(b"\x00\xff")),
            Value::Nil,
        ]);
        let mut buf = BytesMut::new();
        original.encode(&mut buf);
        assert_eq!(Value::decode(&mut buf).unwrap(), Some(original));
        assert!(buf.is_empty());
    }

    #[test]
    fn boolean_conversion_uses_positive_count() {
        assert!(Value::Integer(1).into_boolean().unwrap());
        assert!(Value::Integer(3).into_boolean().unwrap());
        assert!(!Value::Integer(0).into_boolean().unwrap());
    }

    #[test]
    fn optional_bytes_distinguishes_absent_from_empty() {
        assert_eq!(Value::Nil.into_optional_bytes().unwrap(), None);
        assert_eq!(
            Value::Bulk(Bytes::new()).into_optional_bytes().unwrap(),
            Some(Bytes::new())
        );
    }

    #[test]
    fn shape_mismatch_names_both_sides() {
        let err = Value::Bulk(Bytes::from_static(b"x"))
            .into_integer()
            .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::UnexpectedReply {
                expected: "integer",
                found: "bulk string",
            }
        );
    }

    #[test]
    fn error_reply_surfaces_server_message() {
        let err = Value::Error("ERR boom".into()).into_integer().unwrap_err();
        assert_eq!(err, ProtocolError::Server("ERR boom".into()));
    }
}
