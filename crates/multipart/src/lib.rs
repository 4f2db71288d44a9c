//! A repeatable `multipart/form-data` body encoder
//!
//! This crate encodes a set of named parts, in-memory values or large files on disk, into the
//! exact byte layout of a `multipart/form-data` body without materializing the whole body in
//! memory. File content is memory mapped once, so a transport can replay the body any number of
//! times (retries, redirects, re-authentication) without reading the files again.
//!
//! # Features
//!
//! - Byte exact multipart framing with generated or caller supplied boundaries
//! - O(1) length bookkeeping as parts are added and removed
//! - Files mapped in windows of at most 1 GiB, zero copies into process memory
//! - Repeatable, independent iterations over the same body
//! - Iterators double as `http_body::Body` with an exact size hint
//!
//! # Example
//!
//! ```no_run
//! use micro_multipart::{BodyIterator, FieldPart, FilePart, MultiPartBody};
//! use tracing::{info, Level};
//! use tracing_subscriber::FmtSubscriber;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subscriber = FmtSubscriber::builder()
//!         .with_max_level(Level::DEBUG)
//!         .finish();
//!     tracing::subscriber::set_global_default(subscriber)?;
//!
//!     let mut body = MultiPartBody::new();
//!     body.add(FieldPart::text("field", "foo"));
//!     body.add(FilePart::with_content_type("icon", "/tmp/img.png", mime::IMAGE_PNG)?);
//!
//!     info!(content_type = body.content_type(), length = body.length(), "sending body");
//!
//!     // one iteration per send attempt
//!     for attempt in 0..2 {
//!         let mut chunks: BodyIterator = body.iterate();
//!         let sent: usize = chunks.by_ref().map(|chunk| chunk.len()).sum();
//!         chunks.close();
//!         info!(attempt, sent, "body sent");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The example above produces the same bytes a browser submits for:
//!
//! ```html
//! <form method="POST" enctype="multipart/form-data" accept-charset="UTF-8">
//!     <input type="text" name="field" value="foo" />
//!     <input type="file" name="icon" />
//! </form>
//! ```
//!
//! # Architecture
//!
//! - [`boundary`]: boundary token generation and the four delimiter lines
//! - [`part`]: the [`Part`] contract with its [`FieldPart`] and [`FilePart`] implementations
//! - [`body`]: [`MultiPartBody`] and its [`BodyIterator`]
//!
//! # Resource Handling
//!
//! A [`FilePart`] opens its file when it is built. Closing or dropping a [`BodyIterator`]
//! releases every part of the body, however far the traversal got. Releasing only closes the
//! file handle: the mapped content stays valid, so chunks already handed to a transport remain
//! readable and the body can be iterated again.
//!
//! ## Error Handling
//!
//! All fallible operations return [`MultipartError`]:
//!
//! - building a [`FilePart`] fails if the file can't be opened, isn't a regular file or
//!   can't be mapped
//! - [`BodyIterator::next_chunk`] fails once the body is exhausted
//! - releasing a part never fails
//!
//! # Limitations
//!
//! - Encoding only, multipart bodies are not parsed
//! - Files must not be truncated while a body over them is in use

pub mod body;
pub mod boundary;
pub mod part;

mod error;
pub use error::MultipartError;

pub use body::BodyIterator;
pub use body::MultiPartBody;
pub use boundary::Boundary;
pub use part::FieldPart;
pub use part::FilePart;
pub use part::Part;
pub use part::PartRef;

mod utils;
pub(crate) use utils::ensure;
