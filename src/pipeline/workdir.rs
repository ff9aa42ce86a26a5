//! Working directory for chip images and intermediate artifacts.

use crate::constants::work_files;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// Scratch directory owned by one prediction run.
///
/// A scoped directory is removed when dropped, and by
/// [`cleanup_all_work_dirs`] if the process is interrupted. A retained
/// directory is left in place for inspection.
#[derive(Debug)]
pub enum WorkDir {
    /// Temporary directory removed at the end of the run.
    Scoped(TempDir),
    /// Fixed directory kept after the run.
    Retained(PathBuf),
}

impl WorkDir {
    /// Create the working directory under `root` (system temp dir if `None`).
    ///
    /// With `save_temp`, the fixed directory `<root>/predict` is used. Its
    /// previous contents are replaced only if an earlier run created it; a
    /// non-empty directory without the marker file is an error.
    pub fn acquire(root: Option<&Path>, save_temp: bool) -> Result<Self> {
        let root = root.map_or_else(std::env::temp_dir, Path::to_path_buf);
        fs::create_dir_all(&root).map_err(|e| Error::WorkDirCreate {
            path: root.clone(),
            source: e,
        })?;

        let work_dir = if save_temp {
            let path = root.join(work_files::RETAINED_DIR);
            clear_retained_dir(&path)?;
            fs::create_dir_all(&path).map_err(|e| Error::WorkDirCreate {
                path: path.clone(),
                source: e,
            })?;
            let marker = path.join(work_files::RETAINED_MARKER);
            fs::write(&marker, b"").map_err(|e| Error::WorkDirCreate {
                path: marker,
                source: e,
            })?;
            info!("Keeping intermediate files in {}", path.display());
            Self::Retained(path)
        } else {
            let dir = tempfile::Builder::new()
                .prefix(work_files::TEMP_PREFIX)
                .tempdir_in(&root)
                .map_err(|e| Error::WorkDirCreate {
                    path: root.clone(),
                    source: e,
                })?;
            register_work_dir(dir.path());
            Self::Scoped(dir)
        };

        let chips = work_dir.chips_dir();
        fs::create_dir_all(&chips).map_err(|e| Error::WorkDirCreate {
            path: chips,
            source: e,
        })?;
        debug!("Working directory: {}", work_dir.path().display());
        Ok(work_dir)
    }

    /// Root of the working directory.
    pub fn path(&self) -> &Path {
        match self {
            Self::Scoped(dir) => dir.path(),
            Self::Retained(path) => path,
        }
    }

    /// Directory holding chip images.
    pub fn chips_dir(&self) -> PathBuf {
        self.path().join(work_files::CHIPS_DIR)
    }

    /// Whether the directory survives the run.
    pub const fn is_retained(&self) -> bool {
        matches!(self, Self::Retained(_))
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if let Self::Scoped(dir) = self {
            unregister_work_dir(dir.path());
        }
    }
}

/// Remove a previous retained directory, refusing to touch foreign content.
fn clear_retained_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let create_error = |source: std::io::Error| Error::WorkDirCreate {
        path: path.to_path_buf(),
        source,
    };
    if path.join(work_files::RETAINED_MARKER).is_file() {
        debug!("Replacing previous working directory {}", path.display());
        return fs::remove_dir_all(path).map_err(create_error);
    }
    let mut entries = fs::read_dir(path).map_err(create_error)?;
    if entries.next().is_some() {
        return Err(create_error(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "directory is not empty and was not created by geochip",
        )));
    }
    Ok(())
}

/// Scoped working directories to remove if the process is interrupted.
static ACTIVE_WORK_DIRS: std::sync::LazyLock<std::sync::Mutex<Vec<PathBuf>>> =
    std::sync::LazyLock::new(|| std::sync::Mutex::new(Vec::new()));

/// Register a directory for cleanup on signal.
pub fn register_work_dir(path: &Path) {
    if let Ok(mut dirs) = ACTIVE_WORK_DIRS.lock() {
        dirs.push(path.to_path_buf());
    }
}

/// Unregister a directory after normal cleanup.
pub fn unregister_work_dir(path: &Path) {
    if let Ok(mut dirs) = ACTIVE_WORK_DIRS.lock() {
        dirs.retain(|p| p != path);
    }
}

/// Remove all registered directories. Called on signal.
pub fn cleanup_all_work_dirs() {
    if let Ok(dirs) = ACTIVE_WORK_DIRS.lock() {
        for dir in dirs.iter() {
            let _ = fs::remove_dir_all(dir);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn is_registered(path: &Path) -> bool {
        ACTIVE_WORK_DIRS.lock().unwrap().iter().any(|p| p == path)
    }

    #[test]
    fn test_scoped_dir_removed_on_drop() {
        let root = TempDir::new().unwrap();
        let work_dir = WorkDir::acquire(Some(root.path()), false).unwrap();
        let path = work_dir.path().to_path_buf();

        assert!(!work_dir.is_retained());
        assert!(work_dir.chips_dir().is_dir());
        assert!(is_registered(&path));

        drop(work_dir);
        assert!(!path.exists());
        assert!(!is_registered(&path));
    }

    #[test]
    fn test_retained_dir_survives_and_is_replaced() {
        let root = TempDir::new().unwrap();
        let work_dir = WorkDir::acquire(Some(root.path()), true).unwrap();
        let path = work_dir.path().to_path_buf();
        assert_eq!(path, root.path().join("predict"));

        fs::write(work_dir.path().join("stale.txt"), "old").unwrap();
        drop(work_dir);
        assert!(path.join("stale.txt").exists());

        let again = WorkDir::acquire(Some(root.path()), true).unwrap();
        assert!(again.is_retained());
        assert!(!again.path().join("stale.txt").exists());
        assert!(again.chips_dir().is_dir());
    }

    #[test]
    fn test_retained_dir_keeps_foreign_content() {
        let root = TempDir::new().unwrap();
        let foreign = root.path().join("predict");
        fs::create_dir_all(&foreign).unwrap();
        fs::write(foreign.join("thesis.tex"), "draft").unwrap();

        let err = WorkDir::acquire(Some(root.path()), true).unwrap_err();
        assert!(matches!(err, Error::WorkDirCreate { .. }));
        assert_eq!(fs::read_to_string(foreign.join("thesis.tex")).unwrap(), "draft");
    }

    #[test]
    fn test_retained_dir_adopts_empty_directory() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("predict")).unwrap();

        let work_dir = WorkDir::acquire(Some(root.path()), true).unwrap();
        assert!(work_dir.path().join(work_files::RETAINED_MARKER).is_file());
        assert!(work_dir.chips_dir().is_dir());
    }
}
