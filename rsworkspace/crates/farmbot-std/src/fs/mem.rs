#[cfg(any(test, feature = "test-support"))]
use std::collections::{HashMap, HashSet};
#[cfg(any(test, feature = "test-support"))]
use std::io;
#[cfg(any(test, feature = "test-support"))]
use std::path::{Path, PathBuf};
#[cfg(any(test, feature = "test-support"))]
use std::sync::{Arc, Mutex, MutexGuard};

#[cfg(any(test, feature = "test-support"))]
use super::{CreateDirAll, ReadFile, RemoveFile, RenameFile, WriteFile};

/// In-memory filesystem. Clones share the same storage.
///
/// Paths are raw [`PathBuf`] keys with no normalization. Writes require the
/// parent directory to exist (created via [`CreateDirAll`] or implicitly by
/// [`MemFs::insert`]), mirroring `std::fs::write`.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct MemFs {
    state: Arc<Mutex<MemState>>,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
struct MemState {
    files: HashMap<PathBuf, String>,
    dirs: HashSet<PathBuf>,
    failing_writes: u32,
    failing_renames: u32,
}

#[cfg(any(test, feature = "test-support"))]
impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed a file, creating its ancestors as directories.
    pub fn insert(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref();
        let mut state = self.lock();
        if let Some(parent) = path.parent() {
            for ancestor in parent.ancestors() {
                if ancestor.as_os_str().is_empty() {
                    break;
                }
                state.dirs.insert(ancestor.to_path_buf());
            }
        }
        state.files.insert(path.to_path_buf(), content.into());
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.lock().files.get(path.as_ref()).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().files.keys().cloned().collect()
    }

    pub fn dir_exists(&self, path: &Path) -> bool {
        self.lock().dirs.contains(path)
    }

    /// Fail the next `n` writes with `ErrorKind::Other`.
    pub fn fail_writes(&self, n: u32) {
        self.lock().failing_writes = n;
    }

    /// Fail the next `n` renames with `ErrorKind::Other`.
    pub fn fail_renames(&self, n: u32) {
        self.lock().failing_renames = n;
    }
}

#[cfg(any(test, feature = "test-support"))]
fn take_failure(counter: &mut u32) -> bool {
    if *counter > 0 {
        *counter -= 1;
        true
    } else {
        false
    }
}

#[cfg(any(test, feature = "test-support"))]
impl ReadFile for MemFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "file not found"))
    }
}

#[cfg(any(test, feature = "test-support"))]
impl WriteFile for MemFs {
    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let mut state = self.lock();
        if take_failure(&mut state.failing_writes) {
            return Err(io::Error::other("simulated write failure"));
        }
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !state.dirs.contains(parent) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("parent directory missing: {}", parent.display()),
                ));
            }
            _ => {}
        }
        state.files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
impl RenameFile for MemFs {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if take_failure(&mut state.failing_renames) {
            return Err(io::Error::other("simulated rename failure"));
        }
        let contents = state
            .files
            .remove(from)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "rename source not found"))?;
        state.files.insert(to.to_path_buf(), contents);
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
impl RemoveFile for MemFs {
    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.lock()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "file not found"))
    }
}

#[cfg(any(test, feature = "test-support"))]
impl CreateDirAll for MemFs {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            if state.files.contains_key(ancestor) {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("path component is a file: {}", ancestor.display()),
                ));
            }
        }
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            state.dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }
}
