use std::io;
use std::path::Path;

/// Truncating write. Not atomic: pair with [`RenameFile`](super::RenameFile)
/// when readers must never observe a half-written file.
pub trait WriteFile {
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;
}
