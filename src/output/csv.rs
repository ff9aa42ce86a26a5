//! CSV output format writer.

use crate::constants::threshold::DECIMAL_PLACES;
use crate::error::{Error, Result};
use crate::output::{Detection, OutputWriter};
use std::fs::File;
use std::path::{Path, PathBuf};

const HEADER: [&str; 9] = [
    "class_id",
    "class_name",
    "score",
    "merged_count",
    "xmin",
    "ymin",
    "xmax",
    "ymax",
    "wkt",
];

/// CSV format output writer.
///
/// One row per detection: pixel box columns plus the footprint as WKT.
pub struct CsvWriter {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl CsvWriter {
    /// Create a new CSV writer.
    pub fn new(path: &Path) -> Result<Self> {
        let writer = csv::Writer::from_path(path).map_err(|e| Error::CsvWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
        })
    }

    fn csv_err(&self, source: csv::Error) -> Error {
        Error::CsvWrite {
            path: self.path.clone(),
            source,
        }
    }
}

impl OutputWriter for CsvWriter {
    fn write_header(&mut self) -> Result<()> {
        self.writer
            .write_record(HEADER)
            .map_err(|e| self.csv_err(e))
    }

    fn write_detection(&mut self, detection: &Detection) -> Result<()> {
        let b = &detection.pixel_bbox;
        let record = [
            detection.class_id.to_string(),
            detection.class_name.clone(),
            format!("{:.decimal$}", detection.score, decimal = DECIMAL_PLACES),
            detection.merged_count.to_string(),
            b.xmin.to_string(),
            b.ymin.to_string(),
            b.xmax.to_string(),
            b.ymax.to_string(),
            polygon_wkt(detection),
        ];
        self.writer
            .write_record(&record)
            .map_err(|e| self.csv_err(e))
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| Error::OutputWrite {
            path: self.path.clone(),
            source: e,
        })
    }
}

fn polygon_wkt(detection: &Detection) -> String {
    let ring: Vec<String> = detection
        .polygon
        .closed_positions()
        .iter()
        .map(|[x, y]| format!("{x} {y}"))
        .collect();
    format!("POLYGON(({}))", ring.join(", "))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use crate::output::write_all;
    use tempfile::NamedTempFile;

    fn detection(name: &str) -> Detection {
        let bbox = BoundingBox::new(10.0, 20.0, 30.0, 40.0);
        Detection {
            class_id: 1,
            class_name: name.to_string(),
            score: 0.854_21,
            merged_count: 3,
            pixel_bbox: bbox,
            polygon: bbox.to_polygon(),
        }
    }

    #[test]
    fn test_csv_writer_basic() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = CsvWriter::new(file.path()).unwrap();
        write_all(&mut writer, &[detection("car")]).unwrap();

        let contents = std::fs::read_to_string(file.path()).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "class_id,class_name,score,merged_count,xmin,ymin,xmax,ymax,wkt"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("1,car,0.8542,3,10,20,30,40,"));
        assert!(row.contains("POLYGON((10 20, 30 20, 30 40, 10 40, 10 20))"));
    }

    #[test]
    fn test_csv_writer_quotes_names() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = CsvWriter::new(file.path()).unwrap();
        write_all(&mut writer, &[detection("car, small")]).unwrap();

        let mut reader = csv::Reader::from_path(file.path()).unwrap();
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[1], "car, small");
    }
}
