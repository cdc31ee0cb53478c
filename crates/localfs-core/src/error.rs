//! Error classification shared by every storage operation.
//!
//! Platform errors are narrowed into a small [`ErrorKind`] taxonomy. Callers
//! match on the kind; the original `io::Error` is kept as the
//! [`source`](std::error::Error::source) for diagnostics.

use std::io;

use log::debug;
use nix::errno::Errno;
use thiserror::Error;

/// Semantic error kinds exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    #[error("object not exist")]
    NotExist,
    #[error("permission denied")]
    PermissionDenied,
    /// The entry has the wrong type for the operation: a directory where a
    /// file was expected, a non-empty directory, an incompatible rename target.
    #[error("object mode invalid")]
    ModeInvalid,
    #[error("unexpected")]
    Unexpected,
}

/// A classified failure of one storage operation.
#[derive(Debug, Error)]
#[error("{op} [{paths}]: {kind}: {source}", paths = .paths.join(", "))]
pub struct StorageError {
    op: &'static str,
    paths: Vec<String>,
    kind: ErrorKind,
    #[source]
    source: io::Error,
}

impl StorageError {
    /// Classify `source` and attach the operation name and caller paths.
    pub fn new(op: &'static str, source: io::Error, paths: &[&str]) -> Self {
        let kind = classify(&source);
        Self {
            op,
            paths: paths.iter().map(|p| p.to_string()).collect(),
            kind,
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Name of the failed operation (`stat`, `list`, `read`, ...).
    pub fn op(&self) -> &'static str {
        self.op
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// The underlying platform error.
    pub fn io_error(&self) -> &io::Error {
        &self.source
    }
}

impl From<StorageError> for io::Error {
    fn from(err: StorageError) -> Self {
        io::Error::other(err)
    }
}

/// Map a platform error to its [`ErrorKind`].
///
/// Rules, first match wins: an `io::Error` already wrapping a
/// [`StorageError`] keeps that kind; then errno-specific rules; then the
/// portable `io::ErrorKind`; everything else is `Unexpected`.
pub fn classify(err: &io::Error) -> ErrorKind {
    if let Some(inner) = err.get_ref().and_then(|e| e.downcast_ref::<StorageError>()) {
        return inner.kind;
    }

    let kind = err
        .raw_os_error()
        .and_then(|code| classify_errno(Errno::from_raw(code)))
        .unwrap_or(match err.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotExist,
            io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::Unexpected,
        });
    debug!("classified {err:?} as {kind:?}");
    kind
}

fn classify_errno(errno: Errno) -> Option<ErrorKind> {
    match errno {
        Errno::ENOENT => Some(ErrorKind::NotExist),
        Errno::EACCES | Errno::EPERM => Some(ErrorKind::PermissionDenied),
        Errno::EISDIR => Some(ErrorKind::ModeInvalid),
        // rename(2)/rmdir(2) refusing the target directory
        Errno::ENOTDIR | Errno::ENOTEMPTY | Errno::EEXIST | Errno::EXDEV => {
            Some(ErrorKind::ModeInvalid)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn os(errno: Errno) -> io::Error {
        io::Error::from_raw_os_error(errno as i32)
    }

    #[test]
    fn test_classify_errno_table() {
        let cases = [
            (Errno::ENOENT, ErrorKind::NotExist),
            (Errno::EACCES, ErrorKind::PermissionDenied),
            (Errno::EPERM, ErrorKind::PermissionDenied),
            (Errno::EISDIR, ErrorKind::ModeInvalid),
            (Errno::ENOTEMPTY, ErrorKind::ModeInvalid),
            (Errno::ENOTDIR, ErrorKind::ModeInvalid),
            (Errno::EEXIST, ErrorKind::ModeInvalid),
            (Errno::EXDEV, ErrorKind::ModeInvalid),
            (Errno::EIO, ErrorKind::Unexpected),
            (Errno::ELOOP, ErrorKind::Unexpected),
        ];
        for (errno, expected) in cases {
            assert_eq!(classify(&os(errno)), expected, "{errno:?}");
        }
    }

    #[test]
    fn test_classify_portable_kinds() {
        let not_found = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(classify(&not_found), ErrorKind::NotExist);
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "no");
        assert_eq!(classify(&denied), ErrorKind::PermissionDenied);
        let other = io::Error::other("test error");
        assert_eq!(classify(&other), ErrorKind::Unexpected);
    }

    #[test]
    fn test_classify_is_idempotent() {
        let first = StorageError::new("delete", os(Errno::ENOTEMPTY), &["dir"]);
        assert_eq!(first.kind(), ErrorKind::ModeInvalid);

        let rewrapped: io::Error = first.into();
        assert_eq!(classify(&rewrapped), ErrorKind::ModeInvalid);
        let second = StorageError::new("move", rewrapped, &["dir", "other"]);
        assert_eq!(second.kind(), ErrorKind::ModeInvalid);
    }

    #[test]
    fn test_storage_error_keeps_source_and_context() {
        let err = StorageError::new("copy", os(Errno::EIO), &["a", "b"]);
        assert_eq!(err.op(), "copy");
        assert_eq!(err.paths(), ["a", "b"]);
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert_eq!(err.io_error().raw_os_error(), Some(Errno::EIO as i32));
        assert!(err.source().is_some());

        let msg = err.to_string();
        assert!(msg.starts_with("copy [a, b]: unexpected: "), "{msg}");
    }
}
