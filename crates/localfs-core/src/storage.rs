//! Path-based storage operations over a local work directory.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};

use log::debug;

use crate::Result;
use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::iowrap::CallbackReader;
use crate::object::{self, Object, ObjectType, StorageMeta};
use crate::path::{PathResolver, StdStream, is_dir_path, to_slash};
use crate::scanner::{ListCursor, ListOptions, ObjectIterator};

/// Options for [`Storage::read`].
#[derive(Default)]
pub struct ReadOptions<'a> {
    /// Start reading at this byte offset. Streams that cannot seek have
    /// that many bytes read and discarded.
    pub offset: Option<u64>,
    /// Read at most this many bytes.
    pub size: Option<u64>,
    /// Observer called with every chunk read.
    pub on_chunk: Option<&'a mut dyn FnMut(&[u8])>,
}

/// Options for [`Storage::write`].
#[derive(Default)]
pub struct WriteOptions<'a> {
    /// Copy exactly this many bytes; a shorter source is an error.
    pub size: Option<u64>,
    /// Observer called with every chunk taken from the source.
    pub on_chunk: Option<&'a mut dyn FnMut(&[u8])>,
}

/// Local filesystem storage rooted at a work directory.
pub struct Storage {
    resolver: PathResolver,
    list_buffer_size: usize,
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Storager fs {{WorkDir: {}}}", self.resolver.work_dir().display())
    }
}

impl Storage {
    /// Create a storage, creating the work directory if it does not exist.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let work_dir = config.work_dir();
        fs::create_dir_all(&work_dir).map_err(|e| {
            let display = work_dir.to_string_lossy();
            StorageError::new("new_storager", e, &[display.as_ref()])
        })?;
        debug!("storage ready at {}", work_dir.display());
        Ok(Self {
            resolver: PathResolver::new(work_dir),
            list_buffer_size: config.list_buffer_size(),
        })
    }

    pub fn metadata(&self) -> StorageMeta {
        StorageMeta {
            work_dir: self.resolver.work_dir().to_path_buf(),
        }
    }

    /// Describe the entry at `path` without following symlinks.
    ///
    /// A symlink is reported as [`ObjectType::Link`] with its resolved
    /// `link_target`.
    pub fn stat(&self, path: &str) -> Result<Object> {
        if let Some(stream) = StdStream::from_path(path) {
            return Ok(Object::new(stream.as_str(), stream.as_str(), ObjectType::Stream));
        }

        let err = |e: io::Error| StorageError::new("stat", e, &[path]);
        let rp = self.resolver.resolve(path);
        let meta = fs::symlink_metadata(&rp).map_err(err)?;
        let mut o = object::from_metadata(rp, to_slash(path).into(), &meta);
        if o.object_type == ObjectType::Link {
            o.link_target = Some(object::resolve_link_target(&o.id).map_err(err)?);
        }
        Ok(o)
    }

    /// List the entries of directory `dir`.
    ///
    /// Nothing touches the filesystem until the first page is requested.
    pub fn list(&self, dir: &str, options: ListOptions) -> ObjectIterator {
        let token = options.continuation_token.clone();
        let cursor = ListCursor::new(
            self.resolver.resolve(dir),
            to_slash(dir),
            options,
            self.list_buffer_size,
        );
        ObjectIterator::new(cursor, token)
    }

    /// Copy the content of `path` into `sink`, returning the bytes copied.
    pub fn read<'a, W: Write + ?Sized>(
        &self,
        path: &str,
        sink: &mut W,
        options: ReadOptions<'a>,
    ) -> Result<u64> {
        let err = |e: io::Error| StorageError::new("read", e, &[path]);

        let mut source: Box<dyn Read + 'a> = match StdStream::from_path(path) {
            Some(StdStream::Stdin) => {
                let mut stdin = io::stdin().lock();
                if let Some(offset) = options.offset {
                    skip(&mut stdin, offset).map_err(err)?;
                }
                Box::new(stdin)
            }
            _ => {
                let mut f = File::open(self.resolver.resolve(path)).map_err(err)?;
                if let Some(offset) = options.offset {
                    f.seek(SeekFrom::Start(offset)).map_err(err)?;
                }
                Box::new(f)
            }
        };
        if let Some(size) = options.size {
            source = Box::new(source.take(size));
        }
        if let Some(on_chunk) = options.on_chunk {
            source = Box::new(CallbackReader::new(source, on_chunk));
        }

        io::copy(&mut source, sink).map_err(err)
    }

    /// Create or truncate `path` and fill it from `source`, returning the
    /// bytes copied. Missing parent directories are created.
    pub fn write<'a, R: Read + 'a>(
        &self,
        path: &str,
        source: R,
        options: WriteOptions<'a>,
    ) -> Result<u64> {
        let err = |e: io::Error| StorageError::new("write", e, &[path]);

        let mut sink: Box<dyn Write> = match StdStream::from_path(path) {
            Some(StdStream::Stdout) => Box::new(io::stdout().lock()),
            Some(StdStream::Stderr) => Box::new(io::stderr().lock()),
            _ => {
                self.create_dir(path).map_err(err)?;
                Box::new(File::create(self.resolver.resolve(path)).map_err(err)?)
            }
        };

        let mut source: Box<dyn Read + 'a> = Box::new(source);
        if let Some(on_chunk) = options.on_chunk {
            source = Box::new(CallbackReader::new(source, on_chunk));
        }

        let written = match options.size {
            Some(size) => {
                let n = io::copy(&mut source.by_ref().take(size), &mut sink).map_err(err)?;
                if n < size {
                    return Err(err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("source ended after {n} of {size} bytes"),
                    )));
                }
                n
            }
            None => io::copy(&mut source, &mut sink).map_err(err)?,
        };
        sink.flush().map_err(err)?;
        Ok(written)
    }

    /// Remove the single entry at `path`. Directories must be empty.
    pub fn delete(&self, path: &str) -> Result<()> {
        let err = |e: io::Error| StorageError::new("delete", e, &[path]);
        let rp = self.resolver.resolve(path);
        let meta = fs::symlink_metadata(&rp).map_err(err)?;
        if meta.is_dir() {
            fs::remove_dir(&rp).map_err(err)
        } else {
            fs::remove_file(&rp).map_err(err)
        }
    }

    /// Duplicate the content of `src` into `dst`.
    pub fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let err = |e: io::Error| StorageError::new("copy", e, &[src, dst]);

        self.create_dir(dst).map_err(err)?;
        let mut src_file = File::open(self.resolver.resolve(src)).map_err(err)?;
        let mut dst_file = File::create(self.resolver.resolve(dst)).map_err(err)?;
        io::copy(&mut src_file, &mut dst_file).map_err(err)?;
        Ok(())
    }

    /// Atomically rename `src` to `dst`.
    pub fn move_object(&self, src: &str, dst: &str) -> Result<()> {
        let err = |e: io::Error| StorageError::new("move", e, &[src, dst]);

        self.create_dir(dst).map_err(err)?;
        fs::rename(self.resolver.resolve(src), self.resolver.resolve(dst)).map_err(err)
    }

    /// Make sure the directory `path` lives in exists: the path itself for a
    /// directory path, otherwise its parent.
    fn create_dir(&self, path: &str) -> io::Result<()> {
        let rp = self.resolver.resolve(path);
        let dir = if is_dir_path(path) {
            rp.as_path()
        } else {
            match rp.parent() {
                Some(parent) => parent,
                None => return Ok(()),
            }
        };
        fs::create_dir_all(dir)
    }
}

/// Consume and drop up to `n` bytes from a reader that cannot seek.
fn skip<R: Read + ?Sized>(reader: &mut R, n: u64) -> io::Result<u64> {
    io::copy(&mut reader.take(n), &mut io::sink())
}
