//! Paginated directory listing.
//!
//! A [`ListCursor`] owns everything one listing needs: the directory handle,
//! a fixed read buffer and the continuation token. Each call to
//! [`ListCursor::next_page`] issues exactly one raw `getdents64` read and
//! turns the records it got into [`Object`]s.
//!
//! ```text
//! Unopened --first page--> Scanning --empty read / error--> Exhausted
//! ```
//!
//! # Continuation tokens
//!
//! The token is the name of the last entry handed to the caller. A listing
//! started with a token suppresses every entry up to and including the one
//! carrying that name, then yields the rest. Resumption therefore depends on
//! the directory returning entries in the same order on each read, which the
//! OS does not promise across mutations; entries created or removed between
//! pages may be missed or, if the token entry itself disappears, the resumed
//! listing yields nothing.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::error::StorageError;
use crate::object::{self, Object};
use crate::path::join_entry;

/// Options of one listing.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Resume after the entry with this name.
    pub continuation_token: Option<OsString>,
    /// Report symlinks as their resolved targets instead of skipping them.
    pub follow_links: bool,
}

/// Open directory handle: a raw descriptor for `getdents64` on Linux, the
/// std directory stream elsewhere.
#[cfg(target_os = "linux")]
type DirHandle = std::fs::File;
#[cfg(not(target_os = "linux"))]
type DirHandle = std::fs::ReadDir;

enum CursorState {
    Unopened,
    Scanning(DirHandle),
    Exhausted,
}

/// Iteration state of a single listing. Not shareable between callers.
pub(crate) struct ListCursor {
    /// Platform path being scanned; prefix of every `Object::id`.
    scan_root: PathBuf,
    /// `/`-separated directory as the caller named it; prefix of every `Object::name`.
    logical_root: String,
    follow_links: bool,
    state: CursorState,
    #[cfg(target_os = "linux")]
    buf: Vec<u8>,
    started: bool,
    token: Option<Vec<u8>>,
}

impl ListCursor {
    pub(crate) fn new(
        scan_root: PathBuf,
        logical_root: String,
        options: ListOptions,
        #[cfg_attr(not(target_os = "linux"), allow(unused_variables))] buffer_size: usize,
    ) -> Self {
        let token = options.continuation_token.map(|t| t.into_encoded_bytes());
        Self {
            scan_root,
            logical_root,
            follow_links: options.follow_links,
            state: CursorState::Unopened,
            #[cfg(target_os = "linux")]
            buf: vec![0; buffer_size],
            started: token.is_none(),
            token,
        }
    }

    /// Produce the next page of objects, `Ok(None)` once the directory is
    /// exhausted. A page may be empty when every entry read was filtered out.
    ///
    /// Any error closes the directory handle and ends the listing.
    pub(crate) fn next_page(&mut self) -> io::Result<Option<Vec<Object>>> {
        let page = self.fill_page();
        if page.is_err() {
            self.close();
        }
        page
    }

    fn close(&mut self) {
        if matches!(self.state, CursorState::Scanning(_)) {
            debug!("closing {}", self.scan_root.display());
        }
        // dropping the handle closes the descriptor
        self.state = CursorState::Exhausted;
    }

    fn open(&mut self) -> io::Result<()> {
        if !matches!(self.state, CursorState::Unopened) {
            return Ok(());
        }
        let dir = open_dir(&self.scan_root)?;
        debug!("opened {} for listing", self.scan_root.display());
        self.state = CursorState::Scanning(dir);
        Ok(())
    }

    #[cfg(target_os = "linux")]
    fn fill_page(&mut self) -> io::Result<Option<Vec<Object>>> {
        use crate::dirent::{Records, read_dirents};

        self.open()?;
        let CursorState::Scanning(dir) = &self.state else {
            return Ok(None);
        };

        let n = read_dirents(dir, &mut self.buf)?;
        if n == 0 {
            debug!("listing of {} exhausted", self.scan_root.display());
            self.close();
            return Ok(None);
        }

        let mut page = Vec::new();
        for record in Records::new(&self.buf[..n]) {
            let record = record?;
            if !resume_filter(&mut self.started, self.token.as_deref(), record.name) {
                continue;
            }
            let name = os_str_from_bytes(record.name);
            if let Some(o) = self.map_entry(name, record.entry_type)? {
                page.push(o);
                self.token = Some(record.name.to_vec());
            }
        }
        trace!("{} bytes of dirents -> {} objects", n, page.len());
        Ok(Some(page))
    }

    /// Without raw dirent reads the whole directory becomes a single page.
    #[cfg(not(target_os = "linux"))]
    fn fill_page(&mut self) -> io::Result<Option<Vec<Object>>> {
        use crate::dirent::EntryType;

        self.open()?;
        // the stream is drained in one go and released with this page
        let CursorState::Scanning(entries) =
            std::mem::replace(&mut self.state, CursorState::Exhausted)
        else {
            return Ok(None);
        };

        let mut page = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();
            let raw = file_name.as_encoded_bytes();
            if !resume_filter(&mut self.started, self.token.as_deref(), raw) {
                continue;
            }
            let entry_type = entry.file_type().map(EntryType::from)?;
            if let Some(o) = self.map_entry(&file_name, entry_type)? {
                page.push(o);
                self.token = Some(raw.to_vec());
            }
        }
        debug!("listing of {} exhausted", self.scan_root.display());
        Ok(Some(page))
    }

    fn map_entry(
        &self,
        name: &OsStr,
        entry_type: crate::dirent::EntryType,
    ) -> io::Result<Option<Object>> {
        let id = self.scan_root.join(name);
        let logical = join_entry(&self.logical_root, name);
        object::from_entry(id, logical, entry_type, self.follow_links)
    }
}

/// Decide whether an entry is past the continuation token.
///
/// Before the token has been seen every entry is suppressed; the token entry
/// itself flips `started` and is suppressed too.
fn resume_filter(started: &mut bool, token: Option<&[u8]>, name: &[u8]) -> bool {
    if *started {
        return true;
    }
    if token == Some(name) {
        *started = true;
    }
    false
}

#[cfg(target_os = "linux")]
fn os_str_from_bytes(bytes: &[u8]) -> &OsStr {
    use std::os::unix::ffi::OsStrExt;
    OsStr::from_bytes(bytes)
}

#[cfg(target_os = "linux")]
fn open_dir(path: &Path) -> io::Result<DirHandle> {
    use std::os::unix::fs::OpenOptionsExt;
    std::fs::File::options()
        .read(true)
        .custom_flags(libc::O_DIRECTORY)
        .open(path)
}

#[cfg(not(target_os = "linux"))]
fn open_dir(path: &Path) -> io::Result<DirHandle> {
    std::fs::read_dir(path)
}

/// Object stream of one listing.
///
/// Iterating yields objects one by one and fetches pages as needed;
/// [`next_page`](Self::next_page) hands out whole pages instead. After an
/// error the iterator is finished; a new listing can pick up from
/// [`continuation_token`](Self::continuation_token).
pub struct ObjectIterator {
    cursor: ListCursor,
    pending: std::vec::IntoIter<Object>,
    token: Option<OsString>,
    done: bool,
}

impl ObjectIterator {
    pub(crate) fn new(cursor: ListCursor, token: Option<OsString>) -> Self {
        Self {
            cursor,
            pending: Vec::new().into_iter(),
            token,
            done: false,
        }
    }

    /// Name of the last entry delivered, or the starting token if nothing has
    /// been delivered yet. Feed it to [`ListOptions::continuation_token`].
    pub fn continuation_token(&self) -> Option<&OsStr> {
        self.token.as_deref()
    }

    /// Return the next page of objects, `Ok(None)` when the listing is over.
    ///
    /// Objects already buffered by the iterator come first.
    pub fn next_page(&mut self) -> Result<Option<Vec<Object>>, StorageError> {
        let buffered: Vec<Object> = self.pending.by_ref().collect();
        if !buffered.is_empty() {
            self.remember(&buffered);
            return Ok(Some(buffered));
        }
        if self.done {
            return Ok(None);
        }
        match self.cursor.next_page() {
            Ok(Some(page)) => {
                self.remember(&page);
                Ok(Some(page))
            }
            Ok(None) => {
                self.done = true;
                Ok(None)
            }
            Err(err) => {
                self.done = true;
                Err(self.error(err))
            }
        }
    }

    fn remember(&mut self, delivered: &[Object]) {
        if let Some(name) = delivered.last().and_then(|o| o.id.file_name()) {
            self.token = Some(name.to_os_string());
        }
    }

    fn error(&self, err: io::Error) -> StorageError {
        let dir = self.cursor.logical_root.as_str();
        StorageError::new("list", err, &[dir])
    }
}

impl Iterator for ObjectIterator {
    type Item = Result<Object, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(o) = self.pending.next() {
                self.remember(std::slice::from_ref(&o));
                return Some(Ok(o));
            }
            if self.done {
                return None;
            }
            match self.cursor.next_page() {
                Ok(Some(page)) => self.pending = page.into_iter(),
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(self.error(err)));
                }
            }
        }
    }
}
