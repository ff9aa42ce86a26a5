//! ESRI world file sidecars.
//!
//! A world file holds six lines `A D B E C F` where `C, F` address the
//! *center* of the upper-left pixel. [`GeoTransform`] addresses pixel
//! corners, so the origin is shifted by half a pixel.

use super::GeoTransform;
use crate::constants::WORLD_FILE_EXTENSIONS;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Find a world file next to `image_path`, trying each known extension.
pub fn find_world_file(image_path: &Path) -> Option<PathBuf> {
    WORLD_FILE_EXTENSIONS
        .iter()
        .map(|ext| image_path.with_extension(ext))
        .find(|candidate| candidate.is_file())
}

/// Parse world file contents into a transform.
pub fn parse_world_file(contents: &str, path: &Path) -> Result<GeoTransform> {
    let values = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.parse::<f64>().map_err(|_| Error::WorldFileParse {
                path: path.to_path_buf(),
                message: format!("'{line}' is not a number"),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let [a, d, b, e, c, f] = values.as_slice() else {
        return Err(Error::WorldFileParse {
            path: path.to_path_buf(),
            message: format!("expected 6 values, found {}", values.len()),
        });
    };

    Ok(GeoTransform([
        c - a / 2.0 - b / 2.0,
        *a,
        *b,
        f - d / 2.0 - e / 2.0,
        *d,
        *e,
    ]))
}

/// Read and parse a world file.
pub fn read_world_file(path: &Path) -> Result<GeoTransform> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::WorldFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_world_file(&contents, path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_world_file_shifts_to_corner() {
        let contents = "2.0\n0.0\n0.0\n-2.0\n101.0\n199.0\n";
        let t = parse_world_file(contents, Path::new("x.tfw")).unwrap();
        assert_eq!(t, GeoTransform([100.0, 2.0, 0.0, 200.0, 0.0, -2.0]));
    }

    #[test]
    fn test_parse_world_file_wrong_count() {
        let err = parse_world_file("1\n2\n3\n", Path::new("x.tfw"));
        assert!(matches!(err, Err(Error::WorldFileParse { .. })));
    }

    #[test]
    fn test_parse_world_file_not_a_number() {
        let err = parse_world_file("1\n0\n0\n-1\nabc\n0\n", Path::new("x.tfw"));
        assert!(matches!(err, Err(Error::WorldFileParse { .. })));
    }

    #[test]
    fn test_find_world_file() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("scene.png");
        assert!(find_world_file(&image).is_none());

        std::fs::write(dir.path().join("scene.pgw"), "1\n0\n0\n-1\n0.5\n-0.5\n").unwrap();
        assert_eq!(find_world_file(&image), Some(dir.path().join("scene.pgw")));
    }

    #[test]
    fn test_read_missing_world_file_names_path() {
        let err = read_world_file(Path::new("/nonexistent/scene.tfw")).unwrap_err();
        assert!(matches!(err, Error::WorldFileRead { .. }));
        assert!(err.to_string().contains("/nonexistent/scene.tfw"));
    }
}
