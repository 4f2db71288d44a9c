use crate::MultipartError;
use crate::body::BodyIterator;
use crate::boundary::Boundary;
use crate::part::{Part, PartRef};
use std::sync::Arc;
use tracing::debug;

/// An ordered set of parts encoded as a `multipart/form-data` body.
///
/// Parts are written in insertion order. Add and remove parts before handing the body to a
/// transport; mutating it while an iteration is in flight is not supported.
///
/// # Length accounting
///
/// A body with `n` parts is
///
/// ```text
/// first + part_0 + middle + part_1 + ... + middle + part_n-1 + last
/// ```
///
/// where `first` is two bytes shorter than `middle` and `last` is two bytes longer than `only`.
/// Charging every part, the first one included, at the `middle` length and starting from the
/// `only` length therefore yields the exact byte count, so each add and remove is O(1).
#[derive(Debug)]
pub struct MultiPartBody {
    boundary: Boundary,
    content_type: String,
    parts: Vec<PartRef>,
    length: u64,
}

impl MultiPartBody {
    /// Creates an empty body with a generated boundary.
    pub fn new() -> Self {
        Self::with(Boundary::generate())
    }

    /// Creates an empty body delimited by `token`.
    ///
    /// # Errors
    ///
    /// Returns [`MultipartError::InvalidBoundary`] if `token` isn't a valid boundary,
    /// see [`Boundary::new`].
    pub fn with_boundary<S: Into<String>>(token: S) -> Result<Self, MultipartError> {
        Ok(Self::with(Boundary::new(token)?))
    }

    fn with(boundary: Boundary) -> Self {
        let content_type = boundary.content_type();
        let length = boundary.only_len();
        Self { boundary, content_type, parts: Vec::new(), length }
    }

    /// Appends `part` and returns the shared handle needed to [`remove`](Self::remove) it.
    pub fn add<P: Part + 'static>(&mut self, part: P) -> PartRef {
        let part: PartRef = Arc::new(part);
        self.add_shared(Arc::clone(&part));
        part
    }

    /// Appends an already shared part.
    pub fn add_shared(&mut self, part: PartRef) {
        self.length += self.charge(part.as_ref());
        debug!(name = part.name(), part_length = part.length(), body_length = self.length, "added part");
        self.parts.push(part);
    }

    /// Removes the first occurrence of `part`.
    ///
    /// Parts are compared by identity: the handle must be one returned by
    /// [`add`](Self::add) or passed to [`add_shared`](Self::add_shared). Returns whether a
    /// part was removed, the length is unchanged otherwise.
    pub fn remove(&mut self, part: &PartRef) -> bool {
        let Some(index) = self.parts.iter().position(|p| Arc::ptr_eq(p, part)) else {
            return false;
        };

        let removed = self.parts.remove(index);
        self.length -= self.charge(removed.as_ref());
        debug!(name = removed.name(), part_length = removed.length(), body_length = self.length, "removed part");
        true
    }

    /// Bytes a part adds to the body: its own length plus one `middle` boundary line.
    fn charge(&self, part: &dyn Part) -> u64 {
        self.boundary.middle_len() + part.length()
    }

    /// The exact number of bytes one full iteration produces
    #[inline]
    pub fn length(&self) -> u64 {
        self.length
    }

    /// `multipart/form-data; boundary=<token>`, fixed for the lifetime of the body
    #[inline]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[inline]
    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// The parts in wire order
    #[inline]
    pub fn parts(&self) -> &[PartRef] {
        &self.parts
    }

    #[inline]
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Starts a fresh traversal of the body.
    ///
    /// May be called any number of times, e.g. once per send attempt. Each iterator is
    /// independent, and closing one releases the parts without preventing later iterations.
    pub fn iterate(&self) -> BodyIterator {
        BodyIterator::new(self.boundary.clone(), self.parts.clone(), self.length)
    }
}

impl Default for MultiPartBody {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::{FieldPart, FilePart};
    use indoc::indoc;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn crlf(text: &str) -> Vec<u8> {
        text.replace('\n', "\r\n").into_bytes()
    }

    fn drain(body: &MultiPartBody) -> Vec<u8> {
        let mut iter = body.iterate();
        let mut bytes = Vec::new();
        for chunk in iter.by_ref() {
            bytes.extend_from_slice(&chunk);
        }
        iter.close();
        bytes
    }

    #[test]
    fn test_empty_body() {
        let body = MultiPartBody::with_boundary("B").unwrap();

        assert_eq!(drain(&body), b"--B--\r\n");
        assert_eq!(body.length(), 7);
        assert_eq!(body.content_type(), "multipart/form-data; boundary=B");
    }

    #[test]
    fn test_single_field() {
        let mut body = MultiPartBody::with_boundary("B").unwrap();
        body.add(FieldPart::text("field", "foo"));

        let expected = crlf(indoc! {r#"
            --B
            Content-Disposition: form-data; name="field"

            foo
            --B--
        "#});
        assert_eq!(drain(&body), expected);
        assert_eq!(body.length(), expected.len() as u64);
    }

    #[test]
    fn test_second_part_uses_middle_boundary() {
        let mut body = MultiPartBody::with_boundary("B").unwrap();
        body.add(FieldPart::text("a", "1"));
        body.add(FieldPart::text("b", "2"));

        let expected = crlf(indoc! {r#"
            --B
            Content-Disposition: form-data; name="a"

            1
            --B
            Content-Disposition: form-data; name="b"

            2
            --B--
        "#});
        assert_eq!(drain(&body), expected);
        assert_eq!(body.length(), expected.len() as u64);
    }

    #[test]
    fn test_generated_boundary() {
        let mut body = MultiPartBody::new();
        body.add(FieldPart::text("field", "foo"));

        let token = body.boundary().token().to_string();
        assert_eq!(body.content_type(), format!("multipart/form-data; boundary={token}"));

        let bytes = drain(&body);
        assert!(bytes.starts_with(format!("--{token}\r\n").as_bytes()));
        assert!(bytes.ends_with(format!("\r\n--{token}--\r\n").as_bytes()));
        assert_eq!(body.length(), bytes.len() as u64);
    }

    #[test]
    fn test_remove() {
        let mut body = MultiPartBody::with_boundary("B").unwrap();
        let a = body.add(FieldPart::text("a", "1"));
        let b = body.add(FieldPart::text("b", "2"));
        let c = body.add(FieldPart::text("c", "3"));
        let length = body.length();

        assert!(body.remove(&b));
        assert_eq!(body.part_count(), 2);
        assert_eq!(body.length(), length - body.boundary().middle_len() - b.length());

        // not present anymore
        assert!(!body.remove(&b));
        let unrelated: PartRef = Arc::new(FieldPart::text("a", "1"));
        assert!(!body.remove(&unrelated));
        assert_eq!(body.length(), length - body.boundary().middle_len() - b.length());

        let names: Vec<&str> = body.parts().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(body.length(), drain(&body).len() as u64);

        assert!(body.remove(&a));
        assert!(body.remove(&c));
        assert_eq!(body.length(), 7);
        assert_eq!(drain(&body), b"--B--\r\n");
    }

    #[test]
    fn test_remove_first_occurrence_only() {
        let mut body = MultiPartBody::with_boundary("B").unwrap();
        let part = body.add(FieldPart::text("twice", "x"));
        body.add_shared(Arc::clone(&part));

        assert!(body.remove(&part));
        assert_eq!(body.part_count(), 1);
        assert_eq!(body.length(), body.boundary().only_len() + body.boundary().middle_len() + part.length());
        assert_eq!(body.length(), drain(&body).len() as u64);
    }

    #[test]
    fn test_replacing_a_part_changes_only_its_slot() {
        let mut body = MultiPartBody::with_boundary("B").unwrap();
        body.add(FieldPart::text("a", "1"));
        let b = body.add(FieldPart::text("b", "2"));
        let before = drain(&body);

        assert!(body.remove(&b));
        body.add(FieldPart::text("b", "22"));
        let after = drain(&body);

        let prefix = before.len() - b"2\r\n--B--\r\n".len();
        assert_eq!(before[..prefix], after[..prefix]);
        assert_eq!(&after[prefix..], b"22\r\n--B--\r\n");
        assert_eq!(body.length(), after.len() as u64);
    }

    #[test]
    fn test_reiterate_with_file_part() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"file content").unwrap();

        let mut body = MultiPartBody::with_boundary("B").unwrap();
        body.add(FieldPart::text("field", "foo"));
        let part = Arc::new(FilePart::open("upload", file.path()).unwrap());
        body.add_shared(Arc::clone(&part) as PartRef);

        let first = drain(&body);
        assert!(part.is_released());
        let second = drain(&body);

        assert_eq!(first, second);
        assert_eq!(body.length(), first.len() as u64);
        assert!(first.windows(12).any(|w| w == b"file content"));
    }

    #[test]
    fn test_zero_length_contents() {
        let file = NamedTempFile::new().unwrap();

        let mut body = MultiPartBody::with_boundary("B").unwrap();
        body.add(FieldPart::text("empty", ""));
        body.add(FilePart::open("nothing", file.path()).unwrap());

        assert_eq!(body.length(), drain(&body).len() as u64);
    }

    proptest! {
        #[test]
        fn length_matches_drained_bytes(
            token in "[a-zA-Z0-9'()+_,./:=?-]{1,70}",
            fields in prop::collection::vec(("[a-z\"\r\n]{0,12}", prop::collection::vec(any::<u8>(), 0..64)), 0..8),
            removals in prop::collection::vec(any::<prop::sample::Index>(), 0..4),
        ) {
            let mut body = MultiPartBody::with_boundary(token).unwrap();
            let mut handles: Vec<PartRef> = fields
                .into_iter()
                .map(|(name, value)| body.add(FieldPart::bytes(name, value, &http::HeaderMap::new())))
                .collect();

            for index in removals {
                if handles.is_empty() {
                    break;
                }
                let handle = handles.remove(index.index(handles.len()));
                prop_assert!(body.remove(&handle));
            }

            let bytes = drain(&body);
            prop_assert_eq!(body.length(), bytes.len() as u64);
            prop_assert_eq!(body.part_count(), handles.len());
        }
    }
}
