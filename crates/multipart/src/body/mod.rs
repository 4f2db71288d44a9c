//! The multipart body and its repeatable traversal.
//!
//! # Architecture
//!
//! - [`MultiPartBody`]: owns the ordered parts and the boundary, and keeps the total encoded
//!   length up to date as parts are added and removed
//! - [`BodyIterator`]: a one-shot traversal interleaving boundary lines with the chunks of every
//!   part. A transport creates one per send attempt; closing it releases every part
//!
//! The iterator also implements `http_body::Body`, so it can be handed to an HTTP client as a
//! request body with an exact size hint.

mod body_iter;
mod multipart_body;

pub use body_iter::BodyIterator;
pub use multipart_body::MultiPartBody;
