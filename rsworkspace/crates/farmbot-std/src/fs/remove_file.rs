use std::io;
use std::path::Path;

pub trait RemoveFile {
    /// Missing files are an error, as with `std::fs::remove_file`.
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}
