//! Image file loading.

use super::{
    InMemoryRaster, Mosaic, RasterSource, find_world_file, is_tiff, read_geotiff_transform,
    read_world_file,
};
use crate::error::{Error, Result};
use image::{DynamicImage, GenericImageView};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Decode an image file into an 8-bit raster.
///
/// Georeferencing comes from a world file sidecar when one exists, else
/// from GeoTIFF tags for TIFF inputs.
/// Samples wider than 8 bits are scaled down to 8 bits.
pub fn load_raster(path: &Path) -> Result<InMemoryRaster> {
    let image = image::open(path).map_err(|e| Error::RasterRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let (width, height) = image.dimensions();
    let (width, height) = (width as usize, height as usize);
    let bands = usize::from(image.color().channel_count());
    let data = match image {
        DynamicImage::ImageLuma8(buf) => buf.into_raw(),
        DynamicImage::ImageLumaA8(buf) => buf.into_raw(),
        DynamicImage::ImageRgb8(buf) => buf.into_raw(),
        DynamicImage::ImageRgba8(buf) => buf.into_raw(),
        other => match bands {
            1 => other.to_luma8().into_raw(),
            2 => other.to_luma_alpha8().into_raw(),
            3 => other.to_rgb8().into_raw(),
            _ => other.to_rgba8().into_raw(),
        },
    };
    let bands = bands.min(4);

    let transform = match find_world_file(path) {
        Some(world_file) => {
            debug!("Using world file: {}", world_file.display());
            Some(read_world_file(&world_file)?)
        }
        None if is_tiff(path) => {
            let transform = read_geotiff_transform(path)?;
            if transform.is_some() {
                debug!("Using GeoTIFF tags of {}", path.display());
            }
            transform
        }
        None => None,
    };

    debug!(
        "Loaded {}: {}x{} pixels, {} band(s), georeferenced: {}",
        path.display(),
        width,
        height,
        bands,
        transform.is_some()
    );

    Ok(InMemoryRaster::new(width, height, bands, data)?.with_transform(transform))
}

/// Load one or more images as a single raster.
///
/// A single image is used directly; several images are combined into a
/// [`Mosaic`].
pub fn load_rasters(paths: &[PathBuf]) -> Result<Box<dyn RasterSource>> {
    let rasters = paths
        .iter()
        .map(|p| load_raster(p))
        .collect::<Result<Vec<_>>>()?;

    match rasters.len() {
        0 => Err(Error::NoInputImages),
        1 => {
            let raster = rasters.into_iter().next().ok_or(Error::NoInputImages)?;
            if raster.geo_transform().is_none() {
                warn!("Input image has no world file; output will use pixel coordinates");
            }
            Ok(Box::new(raster))
        }
        _ => {
            let mosaic = Mosaic::build(rasters)?;
            info!(
                "Built mosaic from {} images: {}x{} pixels",
                mosaic.source_count(),
                mosaic.width(),
                mosaic.height()
            );
            Ok(Box::new(mosaic))
        }
    }
}
