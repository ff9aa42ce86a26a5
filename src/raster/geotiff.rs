//! Georeferencing embedded in GeoTIFF tags.

use super::GeoTransform;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tiff::TiffResult;
use tiff::decoder::Decoder;
use tiff::tags::Tag;

/// GeoKey describing whether pixel values cover an area or a point.
const GT_RASTER_TYPE_GEO_KEY: u32 = 1025;
/// `GTRasterTypeGeoKey` value for point-sampled rasters.
const RASTER_PIXEL_IS_POINT: u32 = 2;

/// Whether `path` has a TIFF extension.
pub fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff"))
}

/// Read the transform stored in a GeoTIFF's tags, if it has one.
pub fn read_geotiff_transform(path: &Path) -> Result<Option<GeoTransform>> {
    let tag_error = |message: String| Error::GeoTiffTags {
        path: path.to_path_buf(),
        message,
    };
    let file = File::open(path).map_err(|e| tag_error(e.to_string()))?;
    let mut decoder = Decoder::new(BufReader::new(file)).map_err(|e| tag_error(e.to_string()))?;
    let tags = GeoTags::read(&mut decoder).map_err(|e| tag_error(e.to_string()))?;
    Ok(tags.transform())
}

/// Raw GeoTIFF tag values relevant to the pixel-to-model transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoTags {
    /// `ModelTransformationTag`, a row-major 4x4 matrix.
    pub model_transformation: Option<Vec<f64>>,
    /// `ModelTiepointTag`, groups of `(I, J, K, X, Y, Z)`.
    pub tiepoints: Option<Vec<f64>>,
    /// `ModelPixelScaleTag`, `(ScaleX, ScaleY, ScaleZ)`.
    pub pixel_scale: Option<Vec<f64>>,
    /// Pixel centers rather than corners are tied to model space.
    pub pixel_is_point: bool,
}

impl GeoTags {
    fn read<R: Read + Seek>(decoder: &mut Decoder<R>) -> TiffResult<Self> {
        let model_transformation = find_f64s(decoder, Tag::ModelTransformationTag)?;
        let tiepoints = find_f64s(decoder, Tag::ModelTiepointTag)?;
        let pixel_scale = find_f64s(decoder, Tag::ModelPixelScaleTag)?;
        let geo_keys = decoder
            .find_tag(Tag::GeoKeyDirectoryTag)?
            .map(|value| value.into_u32_vec())
            .transpose()?;
        Ok(Self {
            model_transformation,
            tiepoints,
            pixel_scale,
            pixel_is_point: geo_keys.as_deref().is_some_and(is_pixel_is_point),
        })
    }

    /// Affine transform addressing pixel corners.
    ///
    /// `ModelTransformationTag` takes precedence over a tiepoint and pixel
    /// scale pair. Only the first tiepoint is used.
    pub fn transform(&self) -> Option<GeoTransform> {
        let [x0, a, b, y0, d, e] = if let Some(m) = self.model_transformation.as_deref() {
            if m.len() < 8 {
                return None;
            }
            [m[3], m[0], m[1], m[7], m[4], m[5]]
        } else {
            let (Some(tie), Some(scale)) = (self.tiepoints.as_deref(), self.pixel_scale.as_deref())
            else {
                return None;
            };
            if tie.len() < 6 || scale.len() < 2 || scale[0] == 0.0 || scale[1] == 0.0 {
                return None;
            }
            let (sx, sy) = (scale[0], scale[1]);
            [tie[3] - tie[0] * sx, sx, 0.0, tie[4] + tie[1] * sy, 0.0, -sy]
        };

        let (x0, y0) = if self.pixel_is_point {
            (x0 - (a + b) / 2.0, y0 - (d + e) / 2.0)
        } else {
            (x0, y0)
        };
        let coefficients = [x0, a, b, y0, d, e];
        coefficients
            .iter()
            .all(|v| v.is_finite())
            .then_some(GeoTransform(coefficients))
    }
}

fn find_f64s<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> TiffResult<Option<Vec<f64>>> {
    decoder
        .find_tag(tag)?
        .map(|value| value.into_f64_vec())
        .transpose()
}

/// Whether a GeoKey directory declares `RasterPixelIsPoint`.
fn is_pixel_is_point(keys: &[u32]) -> bool {
    keys.get(4..).unwrap_or_default().chunks_exact(4).any(|entry| {
        entry[0] == GT_RASTER_TYPE_GEO_KEY && entry[1] == 0 && entry[3] == RASTER_PIXEL_IS_POINT
    })
}
