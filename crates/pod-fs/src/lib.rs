//! Small filesystem helpers shared by the cache, versioned-cache, and pack
//! crates. Kept deliberately tiny: everything here is a direct filesystem
//! primitive, never cache policy.

use std::io;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};

pub use crate::removal::{rm_rf, Removal};

mod removal;

/// Create the parent directories of `path`, if any.
pub fn mkdir_parent(path: impl AsRef<Path>) -> io::Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        fs_err::create_dir_all(parent)?;
    }
    Ok(())
}

/// Write `contents` to `path` atomically: write to a sibling temp file in the
/// same directory, then rename over the destination. A reader can never
/// observe a partially-written file, and an interrupted write leaves no trace
/// at `path`.
pub fn persist_atomic(path: impl AsRef<Path>, contents: &[u8]) -> io::Result<()> {
    let path = path.as_ref();
    mkdir_parent(path)?;
    let dir = path.parent().expect("path passed to persist_atomic must have a parent");
    let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
    io::Write::write_all(&mut temp_file, contents)?;
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Touch `path`: create an empty file at it, creating parent directories as
/// needed. If the file already exists, its mtime is advanced instead.
pub fn touch(path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    mkdir_parent(path)?;
    match fs_err::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
    {
        Ok(_) => {
            // Truncate(false) above means an existing file is merely opened,
            // not overwritten; set its mtime explicitly so `touch` on an
            // existing sidecar behaves like the Unix command.
            let now = filetime_now();
            filetime_set(path, now)
        }
        Err(err) => Err(err),
    }
}

fn filetime_now() -> std::time::SystemTime {
    std::time::SystemTime::now()
}

fn filetime_set(path: &Path, time: std::time::SystemTime) -> io::Result<()> {
    let file = fs_err::File::open(path)?;
    file.set_modified(time)
}

/// Iterate over the immediate subdirectories of `path`. Yields nothing (not
/// an error) if `path` does not exist.
pub fn directories(path: impl AsRef<Path>) -> impl Iterator<Item = PathBuf> {
    fs_err::read_dir(path.as_ref())
        .into_iter()
        .flatten()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_dir()))
        .map(|entry| entry.path())
}

/// Marker trait implemented by accumulator types that can be summed in place
/// with `+=` while walking a directory tree. Exists purely so [`Removal`]
/// reads naturally at call sites (`summary += rm_rf(path)?`).
pub trait Accumulate: Default + AddAssign + Sized {}

impl Accumulate for Removal {}
