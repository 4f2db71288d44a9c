//! Boundary token generation and the delimiter lines derived from it.
//!
//! A multipart body is framed by four fixed byte sequences, all derived from one token:
//!
//! | line      | bytes                 | used for                            |
//! |-----------|-----------------------|-------------------------------------|
//! | `first`   | `--token\r\n`         | before the first part               |
//! | `middle`  | `\r\n--token\r\n`     | before every following part         |
//! | `only`    | `--token--\r\n`       | the whole body when there are no parts |
//! | `last`    | `\r\n--token--\r\n`   | after the final part                |
//!
//! The lines are precomputed once and handed out as [`Bytes`] clones, so every iterator
//! gets its own view over the same immutable backing storage.

use crate::MultipartError;
use crate::ensure;
use bytes::{BufMut, Bytes, BytesMut};
use rand::Rng;

/// Readable tag every generated token starts with
pub const BOUNDARY_PREFIX: &str = "MicroMultipartBoundary";

/// Number of random base-36 characters appended to [`BOUNDARY_PREFIX`]
pub const BOUNDARY_RANDOM_LEN: usize = 16;

/// RFC 2046 limits a boundary to 70 characters
const MAX_BOUNDARY_LEN: usize = 70;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A multipart boundary token together with its precomputed delimiter lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    token: String,
    first: Bytes,
    middle: Bytes,
    only: Bytes,
    last: Bytes,
}

impl Boundary {
    /// Generates a fresh boundary: [`BOUNDARY_PREFIX`] followed by [`BOUNDARY_RANDOM_LEN`]
    /// random base-36 characters.
    ///
    /// The random source only needs to avoid collisions with content in practice, it is not
    /// used for anything security related.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut token = String::with_capacity(BOUNDARY_PREFIX.len() + BOUNDARY_RANDOM_LEN);
        token.push_str(BOUNDARY_PREFIX);
        for _ in 0..BOUNDARY_RANDOM_LEN {
            token.push(char::from(BASE36[rng.gen_range(0..BASE36.len())]));
        }
        Self::from_valid_token(token)
    }

    /// Uses a caller supplied token, e.g. to get deterministic output in tests.
    ///
    /// # Errors
    ///
    /// Returns [`MultipartError::InvalidBoundary`] if the token is empty, longer than 70
    /// characters, ends with a space or contains characters outside the RFC 2046 `bchars` set.
    pub fn new<S: Into<String>>(token: S) -> Result<Self, MultipartError> {
        let token = token.into();

        ensure!(!token.is_empty(), MultipartError::invalid_boundary("token is empty"));
        ensure!(
            token.len() <= MAX_BOUNDARY_LEN,
            MultipartError::invalid_boundary(format!("token length {} exceed the limit {MAX_BOUNDARY_LEN}", token.len()))
        );
        ensure!(!token.ends_with(' '), MultipartError::invalid_boundary("token ends with a space"));
        if let Some(c) = token.chars().find(|c| !is_bchar(*c)) {
            return Err(MultipartError::invalid_boundary(format!("token contains invalid character {c:?}")));
        }

        Ok(Self::from_valid_token(token))
    }

    fn from_valid_token(token: String) -> Self {
        let first = delimiter(false, &token, false);
        let middle = delimiter(true, &token, false);
        let only = delimiter(false, &token, true);
        let last = delimiter(true, &token, true);
        Self { token, first, middle, only, last }
    }

    /// The raw token, without the leading dashes
    #[inline]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// `--token\r\n`
    #[inline]
    pub fn first(&self) -> Bytes {
        self.first.clone()
    }

    /// `\r\n--token\r\n`
    #[inline]
    pub fn middle(&self) -> Bytes {
        self.middle.clone()
    }

    /// `--token--\r\n`
    #[inline]
    pub fn only(&self) -> Bytes {
        self.only.clone()
    }

    /// `\r\n--token--\r\n`
    #[inline]
    pub fn last(&self) -> Bytes {
        self.last.clone()
    }

    /// Length of the `middle` line, the amount charged per part by the body length accounting.
    #[inline]
    pub fn middle_len(&self) -> u64 {
        self.middle.len() as u64
    }

    /// Length of the `only` line, the length of a body with no parts.
    #[inline]
    pub fn only_len(&self) -> u64 {
        self.only.len() as u64
    }

    /// Value for the `Content-Type` header of a body framed by this boundary.
    ///
    /// The token is quoted when it contains characters that are not allowed in a bare
    /// parameter value. Encoders that always write the token bare produce different bytes for
    /// such tokens; generated tokens never need quoting.
    pub fn content_type(&self) -> String {
        if self.token.chars().all(is_token_char) {
            format!("multipart/form-data; boundary={}", self.token)
        } else {
            format!("multipart/form-data; boundary=\"{}\"", self.token)
        }
    }
}

fn delimiter(leading_crlf: bool, token: &str, close: bool) -> Bytes {
    let mut buf = BytesMut::with_capacity(token.len() + 8);
    if leading_crlf {
        buf.put_slice(b"\r\n");
    }
    buf.put_slice(b"--");
    buf.put_slice(token.as_bytes());
    if close {
        buf.put_slice(b"--");
    }
    buf.put_slice(b"\r\n");
    buf.freeze()
}

fn is_bchar(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '\'' | '(' | ')' | '+' | '_' | ',' | '-' | '.' | '/' | ':' | '=' | '?' | ' ')
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '\'' | '+' | '_' | '-' | '.')
}
