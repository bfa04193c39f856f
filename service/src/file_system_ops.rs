//! File system operations abstraction for testing
//!
//! Trait-based abstraction over the file system touches the backup steps
//! make (dump directories, log rotation, status artifacts), allowing them to
//! be tested without a real disk.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Directory entry with the modification time the log-rotation step sorts by.
#[derive(Debug, Clone)]
pub struct SimpleDirEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Trait for file system operations to enable testing
pub trait FileSystemOps: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    fn write_file(&self, path: &Path, contents: &str) -> io::Result<()>;

    fn append_file(&self, path: &Path, contents: &str) -> io::Result<()>;

    // Materialized Vec instead of an iterator: every caller sorts or counts
    // the whole listing anyway, and mocking stays trivial.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<SimpleDirEntry>>;

    /// Total size in bytes of all files under `path`, recursively.
    fn dir_size(&self, path: &Path) -> io::Result<u64>;

    /// Make a file readable by its owner only. No-op on non-unix targets.
    fn restrict_permissions(&self, path: &Path) -> io::Result<()>;
}

/// Production implementation using std::fs
#[derive(Debug, Clone, Copy)]
pub struct StdFileSystemOps;

impl FileSystemOps for StdFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn append_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        file.write_all(contents.as_bytes())
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<SimpleDirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            entries.push(SimpleDirEntry {
                path: entry.path(),
                modified: metadata.modified()?,
            });
        }
        Ok(entries)
    }

    fn dir_size(&self, path: &Path) -> io::Result<u64> {
        let mut total = 0u64;
        let mut stack = vec![path.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                let metadata = entry.metadata()?;
                if metadata.is_dir() {
                    stack.push(entry.path());
                } else {
                    total += metadata.len();
                }
            }
        }
        Ok(total)
    }

    fn restrict_permissions(&self, path: &Path) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        #[cfg(not(unix))]
        let _ = path;
        Ok(())
    }
}
