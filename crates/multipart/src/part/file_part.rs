//! File backed parts.
//!
//! The file is opened read-only when the part is built and its content is memory mapped in
//! windows of at most [`MAX_MAP_SIZE`] bytes. Each window is wrapped in its own [`Bytes`], so the
//! mapping lives as long as any view over it does, independently of the file handle. Releasing
//! the part closes the handle only; views already handed to a transport stay readable.
//!
//! # Safety
//!
//! A mapping reflects the file as it is on disk. Truncating a file while a part over it is
//! still in use makes reads from the affected views fault, so files handed to a [`FilePart`]
//! must not be truncated until every body iteration over it has finished.

use crate::MultipartError;
use crate::part::{Part, encode_header_block, total_length};
use crate::ensure;
use arc_swap::ArcSwapOption;
use bytes::Bytes;
use http::HeaderMap;
use memmap2::MmapOptions;
use mime::Mime;
use std::fmt;
use std::fs::File;
use std::io;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// Largest window mapped at once, 1 GiB
pub const MAX_MAP_SIZE: u64 = 1024 * 1024 * 1024;

const DEFAULT_MAX_MAP_SIZE: NonZeroU64 = NonZeroU64::new(MAX_MAP_SIZE).unwrap();

/// Content type of a file part when none is given
pub const DEFAULT_FILE_CONTENT_TYPE: Mime = mime::APPLICATION_OCTET_STREAM;

/// A [`Part`] whose content is a memory mapped file.
pub struct FilePart {
    name: String,
    path: PathBuf,
    file: ArcSwapOption<File>,
    /// header block followed by the mapped windows
    chunks: Vec<Bytes>,
    length: u64,
}

impl FilePart {
    /// Opens `path` as a file part named `name`, with `Content-Type: application/octet-stream`
    /// and the final path segment as file name.
    ///
    /// # Errors
    ///
    /// See [`FilePartBuilder::open`].
    pub fn open<N: Into<String>, P: Into<PathBuf>>(name: N, path: P) -> Result<Self, MultipartError> {
        Self::builder(name, path).open()
    }

    /// Opens `path` as a file part with the given content type.
    ///
    /// # Errors
    ///
    /// See [`FilePartBuilder::open`].
    pub fn with_content_type<N: Into<String>, P: Into<PathBuf>>(
        name: N,
        path: P,
        content_type: Mime,
    ) -> Result<Self, MultipartError> {
        Self::builder(name, path).content_type(content_type).open()
    }

    /// Opens `path` as a file part, taking every header apart from `Content-Disposition`
    /// from `headers`.
    ///
    /// # Errors
    ///
    /// See [`FilePartBuilder::open`].
    pub fn with_headers<N: Into<String>, P: Into<PathBuf>>(
        name: N,
        path: P,
        headers: HeaderMap,
    ) -> Result<Self, MultipartError> {
        Self::builder(name, path).headers(headers).open()
    }

    pub fn builder<N: Into<String>, P: Into<PathBuf>>(name: N, path: P) -> FilePartBuilder {
        FilePartBuilder {
            name: name.into(),
            path: path.into(),
            file_name: None,
            content_type: DEFAULT_FILE_CONTENT_TYPE,
            headers: None,
            max_map_size: DEFAULT_MAX_MAP_SIZE,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file handle has been released
    pub fn is_released(&self) -> bool {
        self.file.load().is_none()
    }
}

impl Part for FilePart {
    fn name(&self) -> &str {
        &self.name
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn chunks(&self) -> &[Bytes] {
        &self.chunks
    }

    fn release(&self) {
        if let Some(file) = self.file.swap(None) {
            debug!(name = %self.name, path = ?self.path, "release file part");
            // close errors are not observable through `Drop`, and must not escape a release
            drop(file);
        }
    }
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("length", &self.length)
            .field("released", &self.is_released())
            .finish()
    }
}

/// Builder for [`FilePart`]
#[derive(Debug, Clone)]
pub struct FilePartBuilder {
    name: String,
    path: PathBuf,
    file_name: Option<String>,
    content_type: Mime,
    headers: Option<HeaderMap>,
    max_map_size: NonZeroU64,
}

impl FilePartBuilder {
    /// Overrides the `filename` disposition parameter, which defaults to the final path segment.
    #[must_use]
    pub fn file_name<S: Into<String>>(mut self, file_name: S) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Sets the `Content-Type` header. Ignored once [`FilePartBuilder::headers`] is set.
    #[must_use]
    pub fn content_type(mut self, content_type: Mime) -> Self {
        self.content_type = content_type;
        self
    }

    /// Replaces every header apart from `Content-Disposition`, including the content type.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Limits how many bytes are mapped by a single window.
    #[must_use]
    pub fn max_map_size(mut self, max_map_size: NonZeroU64) -> Self {
        self.max_map_size = max_map_size;
        self
    }

    /// Opens the file and maps its content.
    ///
    /// # Errors
    ///
    /// - [`MultipartError::Open`] if the file can't be opened or its metadata can't be read,
    ///   the io error kind tells `NotFound` from `PermissionDenied`
    /// - [`MultipartError::NotAFile`] if the path is a directory or another non regular file
    /// - [`MultipartError::Map`] if mapping a window fails
    pub fn open(self) -> Result<FilePart, MultipartError> {
        let Self { name, path, file_name, content_type, headers, max_map_size } = self;

        let file = File::open(&path).map_err(|e| MultipartError::open(&path, e))?;
        let metadata = file.metadata().map_err(|e| MultipartError::open(&path, e))?;
        ensure!(metadata.is_file(), MultipartError::not_a_file(&path));

        let file_name = file_name
            .or_else(|| path.file_name().map(|file_name| file_name.to_string_lossy().into_owned()))
            .unwrap_or_default();

        let header = match &headers {
            Some(headers) => encode_header_block(
                &name,
                Some(&file_name),
                headers.iter().map(|(k, v)| (k.as_str().as_bytes(), v.as_bytes())),
            ),
            None => {
                encode_header_block(&name, Some(&file_name), [(&b"Content-Type"[..], content_type.as_ref().as_bytes())])
            }
        };

        let mut chunks = vec![header];
        map_windows(&file, &path, metadata.len(), max_map_size.get(), &mut chunks)?;
        let length = total_length(&chunks);

        debug!(name = %name, path = ?path, length, windows = chunks.len() - 1, "opened file part");
        Ok(FilePart { name, path, file: ArcSwapOption::new(Some(Arc::new(file))), chunks, length })
    }
}

/// Maps `size` bytes of `file` in consecutive windows of at most `max_map_size` bytes.
///
/// An empty file maps nothing.
fn map_windows(
    file: &File,
    path: &Path,
    size: u64,
    max_map_size: u64,
    chunks: &mut Vec<Bytes>,
) -> Result<(), MultipartError> {
    let mut offset = 0;
    while offset < size {
        let window = (size - offset).min(max_map_size);
        let len = usize::try_from(window)
            .map_err(|e| MultipartError::map(path, offset, io::Error::new(io::ErrorKind::InvalidInput, e)))?;

        // SAFETY: the mapping is read-only and never handed out mutably. The file must not be
        // truncated while the part is in use, see the module docs.
        let mmap = unsafe { MmapOptions::new().offset(offset).len(len).map(file) }
            .map_err(|e| MultipartError::map(path, offset, e))?;

        trace!(path = ?path, offset, size = len, "mapped file window");
        chunks.push(Bytes::from_owner(mmap));
        offset += window;
    }
    Ok(())
}
