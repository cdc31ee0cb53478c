//! localfs-core: a local filesystem exposed through a path-based object storage API.
//!
//! Callers address entries with paths relative to a configured work directory
//! and get back a normalized [`Object`] model, whatever the entry kind.
//!
//! # Quick Start
//!
//! ```no_run
//! use localfs_core::{ListOptions, Storage, StorageConfig};
//!
//! fn main() -> Result<(), localfs_core::StorageError> {
//!     let storage = Storage::new(&StorageConfig::with_work_dir("/tmp/localfs"))?;
//!     storage.write("notes/hello.txt", &b"hello"[..], Default::default())?;
//!
//!     for object in storage.list("notes", ListOptions::default()) {
//!         let object = object?;
//!         println!("{} {:?}", object.name.to_string_lossy(), object.object_type);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Listing
//!
//! [`Storage::list`] does not stat every entry up front. On Linux it reads raw
//! directory records with `getdents64` into a fixed buffer and serves them page
//! by page; see [`scanner`] for the cursor and its continuation tokens.

pub mod config;
pub mod dirent;
pub mod error;
mod iowrap;
pub mod mime;
pub mod object;
pub mod path;
pub mod scanner;
mod storage;

pub use config::{ConfigError, StorageConfig};
pub use error::{ErrorKind, StorageError, classify};
pub use object::{Object, ObjectType, StorageMeta};
pub use path::{PathResolver, StdStream};
pub use scanner::{ListOptions, ObjectIterator};
pub use storage::{ReadOptions, Storage, WriteOptions};

/// Result alias used by every storage operation.
pub type Result<T> = std::result::Result<T, StorageError>;
