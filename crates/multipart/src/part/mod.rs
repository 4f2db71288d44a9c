//! The parts a multipart body is made of.
//!
//! Every part exposes the same small contract through the [`Part`] trait:
//!
//! - [`Part::length`]: the exact number of bytes the part contributes (headers + content),
//!   computed once at construction
//! - [`Part::chunks`]: the part's bytes as a list of immutable [`Bytes`] views, the header
//!   block first
//! - [`Part::release`]: idempotent release of any OS resource held by the part
//!
//! Two implementations are provided:
//!
//! - [`FieldPart`]: an in-memory text or binary value
//! - [`FilePart`]: a file on disk, memory mapped in windows of at most [`MAX_MAP_SIZE`] bytes
//!
//! Parts are shared between a [`MultiPartBody`](crate::MultiPartBody) and every
//! [`BodyIterator`](crate::BodyIterator) created from it through a [`PartRef`].

mod field_part;
mod file_part;

pub use field_part::FieldPart;
pub use file_part::DEFAULT_FILE_CONTENT_TYPE;
pub use file_part::FilePart;
pub use file_part::FilePartBuilder;
pub use file_part::MAX_MAP_SIZE;

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use std::sync::Arc;

/// Shared handle to a part, as stored by a body and its iterators.
pub type PartRef = Arc<dyn Part>;

/// One named field or file of a multipart body.
pub trait Part: fmt::Debug + Send + Sync {
    /// The form field name of this part
    fn name(&self) -> &str;

    /// The number of bytes [`Part::chunks`] yields, header block included.
    fn length(&self) -> u64;

    /// The header block followed by the content, in wire order.
    ///
    /// Must return the same bytes on every call.
    fn chunks(&self) -> &[Bytes];

    /// Releases resources held by this part.
    ///
    /// Must be safe to call any number of times, and must not invalidate chunks that were
    /// already handed out.
    fn release(&self) {}
}

/// Writes the `Content-Disposition` line, the extra header lines and the blank separator line.
pub(crate) fn encode_header_block<'a, I>(name: &str, file_name: Option<&str>, headers: I) -> Bytes
where
    I: IntoIterator<Item = (&'a [u8], &'a [u8])>,
{
    let mut dst = BytesMut::with_capacity(128);

    dst.put_slice(b"Content-Disposition: form-data; name=\"");
    put_escaped(&mut dst, name);
    dst.put_slice(b"\"");
    if let Some(file_name) = file_name {
        dst.put_slice(b"; filename=\"");
        put_escaped(&mut dst, file_name);
        dst.put_slice(b"\"");
    }
    dst.put_slice(b"\r\n");

    for (header_name, header_value) in headers {
        dst.put_slice(header_name);
        dst.put_slice(b": ");
        dst.put_slice(header_value);
        dst.put_slice(b"\r\n");
    }
    dst.put_slice(b"\r\n");

    dst.freeze()
}

/// Quoted disposition parameters can't carry `"`, CR or LF, they are percent encoded instead.
fn put_escaped(dst: &mut BytesMut, value: &str) {
    for b in value.bytes() {
        match b {
            b'"' => dst.put_slice(b"%22"),
            b'\r' => dst.put_slice(b"%0D"),
            b'\n' => dst.put_slice(b"%0A"),
            b => dst.put_u8(b),
        }
    }
}

/// Sums the chunk lengths of a part.
pub(crate) fn total_length(chunks: &[Bytes]) -> u64 {
    chunks.iter().map(|chunk| chunk.len() as u64).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_block_without_headers() {
        let block = encode_header_block("field", None, []);
        assert_eq!(&block[..], b"Content-Disposition: form-data; name=\"field\"\r\n\r\n");
    }

    #[test]
    fn test_header_block_with_file_name_and_headers() {
        let headers: [(&[u8], &[u8]); 2] = [(b"Content-Type", b"image/png"), (b"x-checksum", b"abc")];
        let block = encode_header_block("icon", Some("img.png"), headers);

        assert_eq!(
            &block[..],
            &b"Content-Disposition: form-data; name=\"icon\"; filename=\"img.png\"\r\n\
               Content-Type: image/png\r\n\
               x-checksum: abc\r\n\
               \r\n"[..]
        );
    }

    #[test]
    fn test_escaped_parameters() {
        let block = encode_header_block("a\"b", Some("c\r\nd"), []);
        assert_eq!(&block[..], b"Content-Disposition: form-data; name=\"a%22b\"; filename=\"c%0D%0Ad\"\r\n\r\n");
    }
}
