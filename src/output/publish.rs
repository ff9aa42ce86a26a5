//! Atomic publishing of output files.
//!
//! Outputs are written to temporary files next to their targets and only
//! renamed into place once every output of a run has been written.

use crate::constants::work_files::TEMP_PREFIX;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// An output written to a temporary file, not yet visible at its target.
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
    target: PathBuf,
}

impl StagedFile {
    /// Reserve a temporary file in the target's directory.
    pub fn new(target: &Path) -> Result<Self> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file = tempfile::Builder::new()
            .prefix(&format!(".{TEMP_PREFIX}"))
            .tempfile_in(&dir)
            .map_err(|e| Error::OutputWrite {
                path: target.to_path_buf(),
                source: e,
            })?;
        Ok(Self {
            file,
            target: target.to_path_buf(),
        })
    }

    /// Where to write the content.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Final location.
    pub fn target(&self) -> &Path {
        &self.target
    }
}

/// Move every staged file to its target.
///
/// If any rename fails, targets already published by this call are removed
/// and the remaining temporary files are discarded.
pub fn publish(staged: Vec<StagedFile>) -> Result<Vec<PathBuf>> {
    let mut published: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for StagedFile { file, target } in staged {
        if let Err(e) = file.persist(&target) {
            for path in &published {
                if let Err(remove_err) = fs::remove_file(path) {
                    warn!("Failed to remove partial output {}: {}", path.display(), remove_err);
                }
            }
            return Err(Error::OutputWrite {
                path: target,
                source: e.error,
            });
        }
        debug!("Published {}", target.display());
        published.push(target);
    }
    Ok(published)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_publish_moves_files_into_place() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("result.geojson");
        let staged = StagedFile::new(&target).unwrap();
        fs::write(staged.path(), "{}").unwrap();
        assert!(!target.exists());

        let published = publish(vec![staged]).unwrap();
        assert_eq!(published, vec![target.clone()]);
        assert_eq!(fs::read_to_string(&target).unwrap(), "{}");
    }

    #[test]
    fn test_failed_publish_removes_earlier_outputs() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a.geojson");
        let blocked = dir.path().join("occupied");
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("keep"), "x").unwrap();

        let a = StagedFile::new(&first).unwrap();
        fs::write(a.path(), "a").unwrap();
        let b = StagedFile::new(&blocked).unwrap();
        fs::write(b.path(), "b").unwrap();

        let err = publish(vec![a, b]);
        assert!(matches!(err, Err(Error::OutputWrite { .. })));
        assert!(!first.exists());
        assert!(blocked.join("keep").exists());
    }

    #[test]
    fn test_unpublished_staging_is_discarded() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("never.csv");
        let staged = StagedFile::new(&target).unwrap();
        let temp_path = staged.path().to_path_buf();
        drop(staged);
        assert!(!temp_path.exists());
        assert!(!target.exists());
    }
}
