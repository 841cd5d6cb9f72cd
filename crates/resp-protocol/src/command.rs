//! Request encoding.

use bytes::{BufMut, Bytes, BytesMut};

/// A single request to the store: a command name plus its arguments.
///
/// On the wire every request is a RESP array of bulk strings, the first
/// element being the command name. Arguments are binary-safe.
///
/// # Example
///
/// ```rust
/// use resp_protocol::Command;
///
/// let cmd = Command::new("SET").arg("greeting").arg(b"hello");
/// assert_eq!(cmd.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Command {
    parts: Vec<Bytes>,
}

impl Command {
    /// Create a command with the given name and no arguments yet.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            parts: vec![Bytes::from_static(name.as_bytes())],
        }
    }

    /// Append a binary-safe argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<[u8]>) -> Self {
        self.parts.push(Bytes::copy_from_slice(arg.as_ref()));
        self
    }

    /// Append an integer argument in its decimal text form.
    #[must_use]
    pub fn arg_int(mut self, arg: i64) -> Self {
        self.parts.push(Bytes::from(arg.to_string()));
        self
    }

    /// The command name (first part of the request).
    #[must_use]
    pub fn name(&self) -> &[u8] {
        &self.parts[0]
    }

    /// Number of parts including the command name.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// A command always carries at least its name.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Encode as a RESP array of bulk strings.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        put_header(dst, b'*', self.parts.len() as i64);
        for part in &self.parts {
            put_header(dst, b'$', part.len() as i64);
            dst.put_slice(part);
            dst.put_slice(b"\r\n");
        }
    }

    /// Size of the encoded request in bytes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        // Headers are small; 16 bytes comfortably covers `*<n>\r\n` and
        // `$<len>\r\n` plus the trailing CRLF per part.
        16 + self
            .parts
            .iter()
            .map(|p| p.len() + 16)
            .sum::<usize>()
    }
}

fn put_header(dst: &mut BytesMut, marker: u8, len: i64) {
    dst.put_u8(marker);
    dst.put_slice(len.to_string().as_bytes());
    dst.put_slice(b"\r\n");
}
