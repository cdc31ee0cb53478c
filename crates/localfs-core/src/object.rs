//! The normalized object model and the mapping from filesystem metadata.

use std::ffi::{OsStr, OsString};
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Serialize, Serializer};

use crate::dirent::EntryType;
use crate::mime;

/// Kind of an [`Object`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    File,
    Dir,
    Link,
    /// FIFO, socket, device, or a standard stream.
    Stream,
    Unknown,
    Invalid,
}

/// One filesystem entry in normalized form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Object {
    /// Platform-absolute path. Only meaningful on the host that produced it.
    pub id: PathBuf,
    /// `/`-separated path relative to the work directory, byte-exact.
    /// Serialized lossily when it is not valid UTF-8.
    #[serde(serialize_with = "serialize_lossy")]
    pub name: OsString,
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_target: Option<PathBuf>,
}

impl Object {
    pub fn new(id: impl Into<PathBuf>, name: impl Into<OsString>, object_type: ObjectType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            object_type,
            size: None,
            updated_at: None,
            content_type: None,
            link_target: None,
        }
    }

    /// Fill the regular-file fields from `meta`. `content_from` names the
    /// path whose extension drives content type detection.
    fn set_file_fields(&mut self, meta: &Metadata, content_from: &Path) {
        self.size = Some(meta.len());
        self.updated_at = meta.modified().ok().map(DateTime::<Utc>::from);
        self.content_type = mime::detect_path(content_from).map(str::to_owned);
    }
}

fn serialize_lossy<S: Serializer>(name: &OsStr, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&name.to_string_lossy())
}

/// Configuration snapshot of a storage instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageMeta {
    pub work_dir: PathBuf,
}

/// Map `lstat` metadata into an object, as `stat` reports it.
///
/// Symlinks come back as [`ObjectType::Link`] without a target; resolving the
/// target is the caller's job since it needs the path, not the metadata.
pub fn from_metadata(id: PathBuf, name: OsString, meta: &Metadata) -> Object {
    let object_type = match EntryType::from(meta.file_type()) {
        EntryType::Directory => ObjectType::Dir,
        EntryType::Regular => {
            let mut o = Object::new(id, name, ObjectType::File);
            let content_from = PathBuf::from(&o.name);
            o.set_file_fields(meta, &content_from);
            return o;
        }
        EntryType::Symlink => ObjectType::Link,
        EntryType::Fifo | EntryType::Socket | EntryType::CharDevice | EntryType::BlockDevice => {
            ObjectType::Stream
        }
        EntryType::Unknown | EntryType::Whiteout => ObjectType::Invalid,
    };
    Object::new(id, name, object_type)
}

/// Resolve where the symlink at `path` points.
///
/// Fully resolved when the chain ends somewhere; for a dangling link the raw
/// link text, anchored on the link's parent when relative.
pub fn resolve_link_target(path: &Path) -> io::Result<PathBuf> {
    match fs::canonicalize(path) {
        Ok(target) => Ok(target),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let raw = fs::read_link(path)?;
            if raw.is_absolute() {
                return Ok(raw);
            }
            Ok(path.parent().map(|p| p.join(&raw)).unwrap_or(raw))
        }
        Err(err) => Err(err),
    }
}

/// Map one listed directory entry.
///
/// `hint` comes from the dirent buffer; `Unknown` falls back to `lstat`.
/// Returns `Ok(None)` for entries that are not emitted: symlinks when
/// `follow_links` is off, and entries that vanished since the buffer was read.
/// With `follow_links` on, a dangling symlink is an error.
pub fn from_entry(
    id: PathBuf,
    name: OsString,
    hint: EntryType,
    follow_links: bool,
) -> io::Result<Option<Object>> {
    let hint = match hint {
        EntryType::Unknown => match fs::symlink_metadata(&id) {
            Ok(meta) => EntryType::from(meta.file_type()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        },
        known => known,
    };

    match hint {
        EntryType::Directory => Ok(Some(Object::new(id, name, ObjectType::Dir))),
        EntryType::Regular => {
            let meta = match fs::symlink_metadata(&id) {
                Ok(meta) => meta,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    debug!("{} vanished during listing", id.display());
                    return Ok(None);
                }
                Err(err) => return Err(err),
            };
            let mut o = Object::new(id, name, ObjectType::File);
            let content_from = PathBuf::from(&o.name);
            o.set_file_fields(&meta, &content_from);
            Ok(Some(o))
        }
        EntryType::Symlink if !follow_links => Ok(None),
        EntryType::Symlink => {
            let target = fs::canonicalize(&id)?;
            let meta = fs::metadata(&target)?;
            let mut o = match EntryType::from(meta.file_type()) {
                EntryType::Directory => Object::new(id, name, ObjectType::Dir),
                EntryType::Regular => {
                    let mut o = Object::new(id, name, ObjectType::File);
                    o.set_file_fields(&meta, &target);
                    o
                }
                _ => Object::new(id, name, ObjectType::Unknown),
            };
            o.link_target = Some(target);
            Ok(Some(o))
        }
        _ => Ok(Some(Object::new(id, name, ObjectType::Unknown))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_regular_file_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("regular file");
        fs::write(&path, vec![7u8; 1234]).unwrap();
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        let meta = fs::symlink_metadata(&path).unwrap();
        let o = from_metadata(path.clone(), "regular file".into(), &meta);
        assert_eq!(o.object_type, ObjectType::File);
        assert_eq!(o.size, Some(1234));
        assert_eq!(o.updated_at, Some(DateTime::<Utc>::from(mtime)));
        assert_eq!(o.content_type, None);
        assert_eq!(o.id, path);
    }

    #[test]
    fn test_directory_has_no_file_fields() {
        let dir = TempDir::new().unwrap();
        let meta = fs::symlink_metadata(dir.path()).unwrap();
        let o = from_metadata(dir.path().to_path_buf(), "dir".into(), &meta);
        assert_eq!(o.object_type, ObjectType::Dir);
        assert_eq!(o.size, None);
        assert_eq!(o.updated_at, None);
        assert_eq!(o.content_type, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_fifo_maps_to_stream() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipe");
        nix::unistd::mkfifo(&path, nix::sys::stat::Mode::S_IRWXU).unwrap();
        let meta = fs::symlink_metadata(&path).unwrap();
        let o = from_metadata(path, "pipe".into(), &meta);
        assert_eq!(o.object_type, ObjectType::Stream);

        let listed = from_entry(dir.path().join("pipe"), "pipe".into(), EntryType::Fifo, false)
            .unwrap()
            .unwrap();
        assert_eq!(listed.object_type, ObjectType::Unknown);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_entry_policy() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target.json");
        fs::write(&target, b"{}").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let skipped = from_entry(link.clone(), "link".into(), EntryType::Symlink, false).unwrap();
        assert!(skipped.is_none());

        let o = from_entry(link.clone(), "link".into(), EntryType::Symlink, true)
            .unwrap()
            .unwrap();
        assert_eq!(o.object_type, ObjectType::File);
        assert_eq!(o.size, Some(2));
        assert_eq!(o.content_type.as_deref(), Some("application/json"));
        assert_eq!(o.link_target, Some(fs::canonicalize(&target).unwrap()));
        assert_eq!(o.id, link);
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_errors_only_when_followed() {
        let dir = TempDir::new().unwrap();
        let link = dir.path().join("dangling");
        std::os::unix::fs::symlink(dir.path().join("missing"), &link).unwrap();

        assert!(
            from_entry(link.clone(), "dangling".into(), EntryType::Symlink, false)
                .unwrap()
                .is_none()
        );
        let err = from_entry(link.clone(), "dangling".into(), EntryType::Symlink, true).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        assert_eq!(resolve_link_target(&link).unwrap(), dir.path().join("missing"));
    }

    #[test]
    fn test_unknown_hint_falls_back_to_lstat() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.md");
        fs::write(&path, b"# hi").unwrap();

        let o = from_entry(path, "notes.md".into(), EntryType::Unknown, false)
            .unwrap()
            .unwrap();
        assert_eq!(o.object_type, ObjectType::File);
        assert_eq!(o.content_type.as_deref(), Some("text/markdown"));

        let gone = from_entry(dir.path().join("gone"), "gone".into(), EntryType::Unknown, false)
            .unwrap();
        assert!(gone.is_none());
    }

    #[test]
    fn test_serialize_skips_empty_fields() {
        let o = Object::new("/w/d", "d", ObjectType::Dir);
        let json = serde_json::to_value(&o).unwrap();
        assert_eq!(json, serde_json::json!({"id": "/w/d", "name": "d", "type": "dir"}));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_kept_exact_and_serialized_lossily() {
        use std::os::unix::ffi::OsStrExt;

        let name = OsStr::from_bytes(b"a\xff");
        let o = Object::new("/w/a", name, ObjectType::File);
        assert_eq!(o.name.as_bytes(), b"a\xff");

        let json = serde_json::to_value(&o).unwrap();
        assert_eq!(json["name"], "a\u{fffd}");
    }
}
