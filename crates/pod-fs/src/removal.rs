use std::fs;
use std::io;
use std::ops::AddAssign;
use std::path::Path;

/// Tally of what [`rm_rf`] removed. Cache-clearing operations accumulate
/// these across every entry they touch so callers (and tests) can assert on
/// totals instead of re-walking the tree.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    /// Number of directories removed.
    pub dirs: u64,
    /// Number of files (and symlinks) removed.
    pub files: u64,
    /// Total size in bytes of the files removed.
    pub bytes: u64,
}

impl AddAssign for Removal {
    fn add_assign(&mut self, other: Self) {
        self.dirs += other.dirs;
        self.files += other.files;
        self.bytes += other.bytes;
    }
}

/// Remove `path`, whatever it is (file, symlink, or directory tree), tallying
/// what was removed. Mirrors `rm -rf`: a missing `path` is not an error, and
/// results in a zeroed [`Removal`].
pub fn rm_rf(path: impl AsRef<Path>) -> io::Result<Removal> {
    let path = path.as_ref();

    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Removal::default()),
        Err(err) => return Err(err),
    };

    if metadata.is_dir() {
        let mut removal = Removal::default();
        for entry in fs::read_dir(path)?.flatten() {
            removal += rm_rf(entry.path())?;
        }
        fs::remove_dir(path)?;
        removal.dirs += 1;
        Ok(removal)
    } else {
        let bytes = metadata.len();
        fs::remove_file(path)?;
        Ok(Removal { dirs: 0, files: 1, bytes })
    }
}
