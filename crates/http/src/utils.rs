//! Helper macros used across the crate.

/// Returns early with `$error` unless `$predicate` holds.
///
/// Like `assert!`, but for validation that should fail the current request instead of
/// panicking.
///
/// ```ignore
/// ensure!(head.count <= limits.header_count, ParseError::header_too_large("too many headers"));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
