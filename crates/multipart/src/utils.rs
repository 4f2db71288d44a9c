//! Utility macros shared by the multipart encoder.

/// Returns early with an error if a condition is not met.
///
/// Works like `assert!` but yields `Err($error)` instead of panicking, which keeps
/// validation of caller input (boundary tokens, file metadata) on the error path.
///
/// # Example
///
/// ```ignore
/// ensure!(token.len() <= MAX_BOUNDARY_LEN, MultipartError::invalid_boundary("too long"));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
