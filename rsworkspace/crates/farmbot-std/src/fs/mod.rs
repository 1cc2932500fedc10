//! Filesystem operations, one trait per operation.
//!
//! ```
//! use farmbot_std::fs::{ReadFile, SystemFs};
//! use std::path::Path;
//!
//! fn read_or_empty<F: ReadFile>(fs: &F, path: &Path) -> String {
//!     fs.read_to_string(path).unwrap_or_else(|_| "{}".to_string())
//! }
//!
//! let raw = read_or_empty(&SystemFs, Path::new("/root/data/config-1.json"));
//! ```
//!
//! With the `test-support` feature, `MemFs` stands in for the disk:
//!
//! ```ignore
//! use farmbot_std::fs::{CreateDirAll, MemFs, ReadFile, WriteFile};
//! use std::path::Path;
//!
//! let fs = MemFs::new();
//! fs.create_dir_all(Path::new("/data")).unwrap();
//! fs.write(Path::new("/data/config-1.json"), "{}").unwrap();
//! assert_eq!(fs.read_to_string(Path::new("/data/config-1.json")).unwrap(), "{}");
//! ```

mod create_dir_all;
mod mem;
mod read_file;
mod remove_file;
mod rename_file;
mod system;
mod write_file;

pub use create_dir_all::CreateDirAll;
#[cfg(any(test, feature = "test-support"))]
pub use mem::MemFs;
pub use read_file::ReadFile;
pub use remove_file::RemoveFile;
pub use rename_file::RenameFile;
pub use system::SystemFs;
pub use write_file::WriteFile;
