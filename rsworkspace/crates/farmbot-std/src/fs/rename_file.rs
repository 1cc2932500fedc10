use std::io;
use std::path::Path;

/// Replaces `to` with `from` in one step (same-directory renames are atomic
/// on POSIX filesystems).
pub trait RenameFile {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}
