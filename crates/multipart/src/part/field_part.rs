use crate::part::{Part, encode_header_block, total_length};
use bytes::Bytes;
use encoding_rs::Encoding;
use http::HeaderMap;
use std::fmt;
use tracing::warn;

/// A [`Part`] holding an in-memory text or binary value.
///
/// Construction never fails and performs no I/O. Releasing a field part is a no-op.
pub struct FieldPart {
    name: String,
    /// header block, value
    chunks: [Bytes; 2],
    length: u64,
}

impl FieldPart {
    /// Creates a text field encoded as UTF-8, with no headers besides `Content-Disposition`.
    pub fn text<N: Into<String>>(name: N, value: &str) -> Self {
        let name = name.into();
        let header = encode_header_block(&name, None, []);
        Self::from_parts(name, header, Bytes::copy_from_slice(value.as_bytes()))
    }

    /// Creates a text field encoded with `charset`.
    ///
    /// A `Content-Type: text/plain; charset=<name>` header is added. Characters the charset
    /// can't represent are replaced by numeric character references.
    pub fn text_with_charset<N: Into<String>>(name: N, value: &str, charset: &'static Encoding) -> Self {
        let name = name.into();
        let (encoded, used_charset, had_errors) = charset.encode(value);
        if had_errors {
            warn!(field = %name, charset = used_charset.name(), "field value has unmappable characters");
        }

        let content_type = format!("{}; charset={}", mime::TEXT_PLAIN, used_charset.name());
        let header = encode_header_block(&name, None, [(&b"Content-Type"[..], content_type.as_bytes())]);
        Self::from_parts(name, header, Bytes::copy_from_slice(&encoded))
    }

    /// Creates a field from an already encoded value.
    ///
    /// All headers apart from `Content-Disposition` come from `headers`, written in the
    /// map's iteration order.
    pub fn bytes<N: Into<String>, V: Into<Bytes>>(name: N, value: V, headers: &HeaderMap) -> Self {
        let name = name.into();
        let header = encode_header_block(&name, None, headers.iter().map(|(k, v)| (k.as_str().as_bytes(), v.as_bytes())));
        Self::from_parts(name, header, value.into())
    }

    fn from_parts(name: String, header: Bytes, value: Bytes) -> Self {
        let chunks = [header, value];
        let length = total_length(&chunks);
        Self { name, chunks, length }
    }

    /// The encoded value, without the header block
    pub fn value(&self) -> &Bytes {
        &self.chunks[1]
    }
}

impl Part for FieldPart {
    fn name(&self) -> &str {
        &self.name
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn chunks(&self) -> &[Bytes] {
        &self.chunks
    }
}

impl fmt::Debug for FieldPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldPart").field("name", &self.name).field("length", &self.length).finish()
    }
}
