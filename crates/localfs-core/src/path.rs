//! Path resolution against the configured work directory.
//!
//! Two path flavours circulate through the crate:
//!
//! - **platform paths** (`PathBuf`): what the OS sees, used for `Object::id`;
//! - **logical names** (`OsString`): always `/`-separated, used for
//!   `Object::name` so listings compare equal across hosts. Entry names are
//!   carried byte for byte; only the directory part is normalized.

use std::ffi::{OsStr, OsString};
use std::path::{Component, MAIN_SEPARATOR, MAIN_SEPARATOR_STR, Path, PathBuf};

/// Pseudo-path bound to the process standard input.
pub const STDIN: &str = "/dev/stdin";
/// Pseudo-path bound to the process standard output.
pub const STDOUT: &str = "/dev/stdout";
/// Pseudo-path bound to the process standard error.
pub const STDERR: &str = "/dev/stderr";

/// One of the process standard streams, addressed by its pseudo-path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    Stdin,
    Stdout,
    Stderr,
}

impl StdStream {
    /// Recognize a standard-stream pseudo-path. Any other path yields `None`.
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            STDIN => Some(Self::Stdin),
            STDOUT => Some(Self::Stdout),
            STDERR => Some(Self::Stderr),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stdin => STDIN,
            Self::Stdout => STDOUT,
            Self::Stderr => STDERR,
        }
    }
}

/// Maps caller paths onto absolute paths under a fixed work directory.
#[derive(Debug, Clone)]
pub struct PathResolver {
    work_dir: PathBuf,
}

impl PathResolver {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Resolve `path` to an absolute platform path.
    ///
    /// Absolute inputs are returned unchanged. Relative inputs are joined onto
    /// the work directory and lexically cleaned; a trailing separator on the
    /// input survives the join so [`is_dir_path`] still holds downstream.
    pub fn resolve(&self, path: &str) -> PathBuf {
        if Path::new(path).is_absolute() {
            return PathBuf::from(path);
        }
        let abs = clean(&self.work_dir.join(path));
        if !is_dir_path(path) || abs.as_os_str().to_string_lossy().ends_with(MAIN_SEPARATOR) {
            return abs;
        }
        let mut abs = abs.into_os_string();
        abs.push(MAIN_SEPARATOR_STR);
        PathBuf::from(abs)
    }
}

/// Whether `path` names a directory, i.e. ends with the platform separator.
pub fn is_dir_path(path: &str) -> bool {
    path.ends_with(MAIN_SEPARATOR)
}

/// Convert a platform path string into its `/`-separated form.
pub fn to_slash(path: &str) -> String {
    if MAIN_SEPARATOR == '/' {
        path.to_owned()
    } else {
        path.replace(MAIN_SEPARATOR, "/")
    }
}

/// Join a logical directory and an entry name with `/`, dropping empty and
/// `.` segments and folding `..` the way a lexical path join does.
pub fn join_slash(dir: &str, name: &str) -> String {
    let absolute = dir.starts_with('/') || (dir.is_empty() && name.starts_with('/'));
    let mut segments: Vec<&str> = Vec::new();
    for segment in dir.split('/').chain(name.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            s => segments.push(s),
        }
    }
    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Append a single directory entry name to a logical directory.
///
/// The directory is normalized with [`join_slash`]; `entry` is appended
/// verbatim, so names that are not valid UTF-8 stay distinct.
pub fn join_entry(dir: &str, entry: &OsStr) -> OsString {
    let mut joined = OsString::from(join_slash(dir, ""));
    if !joined.is_empty() && !joined.as_encoded_bytes().ends_with(b"/") {
        joined.push("/");
    }
    joined.push(entry);
    joined
}

/// Lexically normalize a platform path: drop `.` components and fold `..`
/// without touching the filesystem.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `..` at the root stays at the root
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative() {
        let r = PathResolver::new("/work");
        assert_eq!(r.resolve("a/b.txt"), PathBuf::from("/work/a/b.txt"));
    }

    #[test]
    fn test_resolve_absolute_unchanged() {
        let r = PathResolver::new("/work");
        assert_eq!(r.resolve("/etc/hosts"), PathBuf::from("/etc/hosts"));
        assert_eq!(r.resolve("/tmp/dir/"), PathBuf::from("/tmp/dir/"));
    }

    #[test]
    fn test_resolve_keeps_trailing_separator() {
        let r = PathResolver::new("/work");
        let resolved = r.resolve("dir/sub/");
        assert_eq!(resolved.as_os_str(), "/work/dir/sub/");
        assert!(is_dir_path(resolved.to_str().unwrap()));
    }

    #[test]
    fn test_resolve_cleans_dots() {
        let r = PathResolver::new("/work");
        assert_eq!(r.resolve("a/./b/../c"), PathBuf::from("/work/a/c"));
        assert_eq!(r.resolve(""), PathBuf::from("/work"));
        assert_eq!(r.resolve("../../x"), PathBuf::from("/x"));
    }

    #[test]
    fn test_resolve_relative_work_dir() {
        let r = PathResolver::new("data");
        assert_eq!(r.resolve("../../x"), PathBuf::from("../x"));
    }

    #[test]
    fn test_resolve_root_with_slash_has_single_separator() {
        let r = PathResolver::new("/");
        assert_eq!(r.resolve("./").as_os_str(), "/");
    }

    #[test]
    fn test_is_dir_path() {
        assert!(is_dir_path("a/"));
        assert!(!is_dir_path("a"));
        assert!(!is_dir_path(""));
    }

    #[test]
    fn test_std_streams() {
        assert_eq!(StdStream::from_path("/dev/stdin"), Some(StdStream::Stdin));
        assert_eq!(StdStream::from_path("/dev/stdout"), Some(StdStream::Stdout));
        assert_eq!(StdStream::from_path("/dev/stderr"), Some(StdStream::Stderr));
        assert_eq!(StdStream::from_path("/dev/null"), None);
        assert_eq!(StdStream::Stderr.as_str(), STDERR);
    }

    #[test]
    fn test_join_slash() {
        assert_eq!(join_slash("", "a"), "a");
        assert_eq!(join_slash("dir", "a"), "dir/a");
        assert_eq!(join_slash("dir/", "a"), "dir/a");
        assert_eq!(join_slash("/abs/dir", "a"), "/abs/dir/a");
        assert_eq!(join_slash("./dir//x/..", "a"), "dir/a");
        assert_eq!(join_slash("..", "a"), "../a");
    }

    #[test]
    fn test_join_entry() {
        assert_eq!(join_entry("", OsStr::new("a")), "a");
        assert_eq!(join_entry("dir/", OsStr::new("a")), "dir/a");
        assert_eq!(join_entry("/", OsStr::new("a")), "/a");
        assert_eq!(join_entry("x/..", OsStr::new("a")), "a");
    }

    #[cfg(unix)]
    #[test]
    fn test_join_entry_keeps_raw_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let a = join_entry("d", OsStr::from_bytes(b"a\xff"));
        let b = join_entry("d", OsStr::from_bytes(b"a\xfe"));
        assert_eq!(a.as_bytes(), b"d/a\xff");
        assert_ne!(a, b);
    }

    #[test]
    fn test_to_slash_never_contains_backslash_separator() {
        let s = to_slash(&format!("a{MAIN_SEPARATOR}b"));
        assert_eq!(s, "a/b");
    }
}
