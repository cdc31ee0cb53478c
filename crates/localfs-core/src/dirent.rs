//! Raw directory-entry records as returned by `getdents64(2)`.
//!
//! The kernel fills a caller buffer with variable-length `linux_dirent64`
//! records:
//!
//! ```text
//! offset  size  field
//!      0     8  d_ino     inode number, 0 for a deleted slot
//!      8     8  d_off     opaque offset of the next record
//!     16     2  d_reclen  length of this record, padding included
//!     18     1  d_type    DT_* entry type
//!     19     -  d_name    NUL-terminated name
//! ```
//!
//! [`Records`] walks such a buffer with checked bounds. It never reads past
//! the end of the slice: a record claiming more bytes than remain is reported
//! as `InvalidData` and ends the walk.

use std::io;

const OFFSET_INO: usize = 0;
const OFFSET_RECLEN: usize = 16;
const OFFSET_TYPE: usize = 18;
const OFFSET_NAME: usize = 19;

// <dirent.h>
const DT_FIFO: u8 = 1;
const DT_CHR: u8 = 2;
const DT_DIR: u8 = 4;
const DT_BLK: u8 = 6;
const DT_REG: u8 = 8;
const DT_LNK: u8 = 10;
const DT_SOCK: u8 = 12;
const DT_WHT: u8 = 14;

/// Entry type as reported in `d_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    /// The filesystem did not fill in the type; callers must `lstat`.
    Unknown,
    Fifo,
    CharDevice,
    Directory,
    BlockDevice,
    Regular,
    Symlink,
    Socket,
    /// BSD union-mount whiteout.
    Whiteout,
}

impl EntryType {
    pub fn from_d_type(d_type: u8) -> Self {
        match d_type {
            DT_FIFO => Self::Fifo,
            DT_CHR => Self::CharDevice,
            DT_DIR => Self::Directory,
            DT_BLK => Self::BlockDevice,
            DT_REG => Self::Regular,
            DT_LNK => Self::Symlink,
            DT_SOCK => Self::Socket,
            DT_WHT => Self::Whiteout,
            _ => Self::Unknown,
        }
    }
}

impl From<std::fs::FileType> for EntryType {
    fn from(ft: std::fs::FileType) -> Self {
        if ft.is_dir() {
            return Self::Directory;
        }
        if ft.is_file() {
            return Self::Regular;
        }
        if ft.is_symlink() {
            return Self::Symlink;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            if ft.is_fifo() {
                return Self::Fifo;
            }
            if ft.is_socket() {
                return Self::Socket;
            }
            if ft.is_char_device() {
                return Self::CharDevice;
            }
            if ft.is_block_device() {
                return Self::BlockDevice;
            }
        }
        Self::Unknown
    }
}

/// One live entry decoded from the buffer. `name` borrows the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEntry<'a> {
    pub ino: u64,
    pub entry_type: EntryType,
    pub name: &'a [u8],
}

/// Iterator over the live entries of a filled dirent buffer.
///
/// Deleted slots (inode 0) and the `.`/`..` entries are skipped.
pub struct Records<'a> {
    buf: &'a [u8],
}

impl<'a> Records<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = io::Result<RawEntry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.buf.is_empty() {
                return None;
            }

            let reclen = read_u16(self.buf, OFFSET_RECLEN).map(usize::from);
            let reclen = match reclen {
                Some(n) if n > OFFSET_NAME && n <= self.buf.len() => n,
                _ => {
                    let remaining = self.buf.len();
                    self.buf = &[];
                    return Some(Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "malformed dirent record: reclen {reclen:?} with {remaining} bytes left"
                        ),
                    )));
                }
            };

            let (rec, rest) = self.buf.split_at(reclen);
            self.buf = rest;

            // reclen > OFFSET_NAME, so the fixed header is in bounds
            let ino = read_u64(rec, OFFSET_INO).unwrap_or(0);
            if ino == 0 {
                continue;
            }

            let name = &rec[OFFSET_NAME..];
            let name = match name.iter().position(|&c| c == 0) {
                Some(end) => &name[..end],
                None => name,
            };
            if name == b"." || name == b".." {
                continue;
            }

            return Some(Ok(RawEntry {
                ino,
                entry_type: EntryType::from_d_type(rec[OFFSET_TYPE]),
                name,
            }));
        }
    }
}

fn read_u16(buf: &[u8], offset: usize) -> Option<u16> {
    let bytes = buf.get(offset..offset + 2)?;
    Some(u16::from_ne_bytes(bytes.try_into().ok()?))
}

fn read_u64(buf: &[u8], offset: usize) -> Option<u64> {
    let bytes = buf.get(offset..offset + 8)?;
    Some(u64::from_ne_bytes(bytes.try_into().ok()?))
}

/// Read the next batch of entries of `dir` into `buf`; `Ok(0)` at the end.
#[cfg(target_os = "linux")]
pub(crate) fn read_dirents(dir: &std::fs::File, buf: &mut [u8]) -> io::Result<usize> {
    use std::os::fd::AsRawFd;

    // SAFETY: the fd is owned by `dir` and stays open for the call; the kernel
    // writes at most `buf.len()` bytes into `buf`.
    let n = unsafe {
        libc::syscall(
            libc::SYS_getdents64,
            dir.as_raw_fd(),
            buf.as_mut_ptr(),
            buf.len(),
        )
    };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(n as usize)
}
