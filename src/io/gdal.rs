use gdal::raster::ResampleAlg;
use gdal::{Dataset, errors::GdalError as GdalCrateError};
use ndarray::Array2;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::ImageTensor;

/// Errors encountered when using GDAL reader
#[derive(Debug, Error)]
pub enum GdalError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalCrateError),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Dimension mismatch: expected {0}x{1}, got {2}x{3}")]
    DimensionMismatch(usize, usize, usize, usize),
}

/// Metadata extracted from a GDAL-supported raster dataset
#[derive(Debug, Clone)]
pub struct GdalMetadata {
    /// Width (pixels) of the raster
    pub size_x: usize,
    /// Height (lines) of the raster
    pub size_y: usize,
    /// Number of raster bands
    pub bands: usize,
    /// Affine geotransform coefficients ([origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height])
    pub geotransform: [f64; 6],
    /// Projection, `EPSG:xxxx` when an authority code is present, otherwise WKT
    pub projection: String,
}

/// Open a dataset, mapping any failure to `SourceUnavailable`
pub(crate) fn open_dataset(path: &Path) -> Result<Dataset> {
    if !path.exists() {
        return Err(Error::source_unavailable(
            path.display().to_string(),
            "no such file",
        ));
    }
    Dataset::open(path).map_err(|e| Error::source_unavailable(path.display().to_string(), e))
}

// Helper to extract EPSG code from WKT authority tag
pub(crate) fn parse_epsg(wkt: &str) -> Option<String> {
    const KEY: &str = "AUTHORITY[\"EPSG\",\"";
    if let Some(idx) = wkt.rfind(KEY) {
        let start = idx + KEY.len();
        if let Some(end) = wkt[start..].find('"') {
            let code = &wkt[start..start + end];
            return Some(format!("EPSG:{}", code));
        }
    }
    None
}

pub(crate) fn normalize_projection(proj: String) -> String {
    if proj.starts_with("EPSG:") {
        proj
    } else if let Some(code) = parse_epsg(&proj) {
        code
    } else {
        proj
    }
}

/// Raster reader for image-like GDAL datasets (GeoTIFF, PNG, JPEG, ...)
pub struct GdalRasterReader {
    pub dataset: Dataset,
    pub metadata: GdalMetadata,
}

impl GdalRasterReader {
    /// Open a GDAL-supported raster dataset
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let dataset = open_dataset(path)?;
        let (size_x, size_y) = dataset.raster_size();
        let bands = dataset.raster_count() as usize;
        if bands == 0 {
            return Err(Error::source_unavailable(
                path.display().to_string(),
                GdalError::UnsupportedFormat("No raster bands found".into()),
            ));
        }
        let geotransform = match dataset.geo_transform() {
            Ok(gt) => gt,
            Err(_) => [0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        };
        let mut proj = dataset.projection();
        if proj.is_empty() {
            if let Some(gcp_proj) = dataset.gcp_projection() {
                if !gcp_proj.is_empty() {
                    proj = gcp_proj;
                }
            }
        }
        debug!(
            "Opened raster {:?}: {}x{}, {} band(s)",
            path, size_x, size_y, bands
        );
        Ok(GdalRasterReader {
            dataset,
            metadata: GdalMetadata {
                size_x: size_x as usize,
                size_y: size_y as usize,
                bands,
                geotransform,
                projection: normalize_projection(proj),
            },
        })
    }

    /// Read a single band (1-based index) as an f64 ndarray of shape (height, width)
    pub fn read_band(
        &self,
        index: usize,
        e_resample_alg: Option<ResampleAlg>,
    ) -> Result<Array2<f64>> {
        if index == 0 || index > self.metadata.bands {
            return Err(Error::IndexOutOfRange {
                kind: "band",
                index,
                available: self.metadata.bands,
            });
        }
        let band = self.dataset.rasterband(index).map_err(GdalError::from)?;
        let window = (self.metadata.size_x, self.metadata.size_y);
        let buf = band
            .read_as::<f64>((0, 0), window, window, e_resample_alg)
            .map_err(GdalError::from)?;
        let data_vec = buf.data().to_vec();
        let array = Array2::from_shape_vec((self.metadata.size_y, self.metadata.size_x), data_vec)
            .map_err(|_| {
                GdalError::DimensionMismatch(
                    self.metadata.size_x,
                    self.metadata.size_y,
                    self.metadata.size_x,
                    self.metadata.size_y,
                )
            })?;
        Ok(array)
    }

    /// Read the raster as an RGB image tensor.
    ///
    /// Bands 1..=3 become R, G, B when at least three bands exist; a single
    /// band (or two) is replicated as grey. Values are rounded and clamped to [0, 255].
    pub fn read_rgb(&self) -> Result<ImageTensor> {
        let channels: Vec<Array2<f64>> = if self.metadata.bands >= 3 {
            (1..=3)
                .map(|idx| self.read_band(idx, None))
                .collect::<Result<_>>()?
        } else {
            let grey = self.read_band(1, None)?;
            vec![grey.clone(), grey.clone(), grey]
        };

        let (rows, cols) = (self.metadata.size_y, self.metadata.size_x);
        let mut data = Vec::with_capacity(rows * cols * 3);
        for r in 0..rows {
            for c in 0..cols {
                for channel in &channels {
                    data.push(channel[[r, c]].round().clamp(0.0, 255.0) as u8);
                }
            }
        }
        ImageTensor::new(rows, cols, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_epsg_from_wkt_authority() {
        let wkt = r#"GEOGCS["WGS 84",DATUM["WGS_1984"],AUTHORITY["EPSG","4326"]]"#;
        assert_eq!(parse_epsg(wkt).as_deref(), Some("EPSG:4326"));
        assert_eq!(normalize_projection(wkt.to_string()), "EPSG:4326");
        assert_eq!(normalize_projection("LOCAL_CS[\"x\"]".into()), "LOCAL_CS[\"x\"]");
    }

    #[test]
    fn open_missing_file_is_source_unavailable() {
        let err = GdalRasterReader::open("/definitely/not/here.tif").err().unwrap();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
    }
}
