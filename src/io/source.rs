//! Source Reader surface: global metadata plus a finite, non-restartable record
//! sequence, and the async entry points that dispatch a location (path or
//! HTTP(S) URL) to the right reader under a deadline.
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{error, info};

use crate::core::deadline::with_deadline;
use crate::error::{Error, Result};
use crate::io::gdal::GdalRasterReader;
use crate::io::remote::fetch_image;
use crate::io::vector::VectorSource;
use crate::types::{ImageTensor, Record, RecordPayload};

/// Global metadata of an opened source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMetadata {
    pub location: String,
    /// Raster width in pixels (0 for vector sources)
    pub width: usize,
    /// Raster height in pixels (0 for vector sources)
    pub height: usize,
    pub band_count: usize,
    pub layer_count: usize,
    pub feature_count: usize,
    pub projection: String,
    pub geotransform: Option<[f64; 6]>,
}

/// Ordered records of one source. Consumed once; there is no rewind.
#[derive(Debug)]
pub struct SourceRecords {
    metadata: SourceMetadata,
    records: std::vec::IntoIter<Record>,
}

impl SourceRecords {
    pub fn new(metadata: SourceMetadata, records: Vec<Record>) -> Self {
        Self {
            metadata,
            records: records.into_iter(),
        }
    }

    pub fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    /// Remaining number of records
    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

impl Iterator for SourceRecords {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        self.records.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl ExactSizeIterator for SourceRecords {}

/// Reader for raster images via GDAL
pub struct RasterSource;

impl RasterSource {
    /// Read a raster as one image record.
    ///
    /// With `band = None` the RGB composite is used; with `Some(b)` (1-based)
    /// only that band is read and replicated as grey.
    pub fn open<P: AsRef<Path>>(path: P, band: Option<usize>) -> Result<SourceRecords> {
        let path = path.as_ref();
        let reader = GdalRasterReader::open(path)?;
        let meta = &reader.metadata;
        let image = match band {
            None => reader.read_rgb()?,
            Some(idx) => {
                let grey = reader.read_band(idx, None)?;
                let (rows, cols) = grey.dim();
                let mut data = Vec::with_capacity(rows * cols * 3);
                for v in grey.iter() {
                    let px = v.round().clamp(0.0, 255.0) as u8;
                    data.extend_from_slice(&[px, px, px]);
                }
                ImageTensor::new(rows, cols, data)?
            }
        };
        let metadata = SourceMetadata {
            location: path.display().to_string(),
            width: meta.size_x,
            height: meta.size_y,
            band_count: meta.bands,
            layer_count: 0,
            feature_count: 1,
            projection: meta.projection.clone(),
            geotransform: Some(meta.geotransform),
        };
        Ok(SourceRecords::new(metadata, vec![Record::image(0, image)]))
    }
}

pub fn is_remote(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Open a single image from a filesystem path (GDAL) or an HTTP(S) URL.
pub async fn open_image(
    location: &str,
    band: Option<usize>,
    deadline: Duration,
) -> Result<(SourceMetadata, ImageTensor)> {
    let result = if is_remote(location) {
        if let Some(idx) = band.filter(|&b| b != 1) {
            // Decoded web images expose a single RGB composite
            return Err(Error::IndexOutOfRange {
                kind: "band",
                index: idx,
                available: 1,
            });
        }
        with_deadline("image fetch", deadline, fetch_image(location)).await
    } else {
        let path = PathBuf::from(location);
        with_deadline(
            "raster read",
            deadline,
            blocking(move || RasterSource::open(&path, band)),
        )
        .await
        .and_then(|mut records| {
            let metadata = records.metadata().clone();
            match records.next().map(|r| r.payload) {
                Some(RecordPayload::Image(image)) => Ok((metadata, image)),
                _ => Err(Error::Processing(format!(
                    "raster source {} yielded no image",
                    location
                ))),
            }
        })
    };
    match &result {
        Ok((meta, _)) => info!(
            "Loaded image {} ({}x{})",
            meta.location, meta.width, meta.height
        ),
        Err(e) => error!("Failed to open image {}: {}", location, e),
    }
    result
}

/// Open a vector layer (1-based) on the blocking pool under a deadline.
pub async fn open_vector_layer(
    path: &Path,
    layer_index: usize,
    deadline: Duration,
) -> Result<SourceRecords> {
    let owned = path.to_path_buf();
    let result = with_deadline(
        "vector read",
        deadline,
        blocking(move || VectorSource::open(&owned, layer_index)),
    )
    .await;
    if let Err(e) = &result {
        error!("Failed to read layer {} of {:?}: {}", layer_index, path, e);
    }
    result
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(Error::external)?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_detection_is_case_insensitive() {
        assert!(is_remote("https://example.com/a.jpg"));
        assert!(is_remote("HTTP://example.com/a.jpg"));
        assert!(!is_remote("/data/a.tif"));
        assert!(!is_remote("ftp://example.com/a.jpg"));
    }

    #[test]
    fn source_records_are_consumed_once() {
        let records = vec![
            Record::attributes(1, Default::default()),
            Record::attributes(2, Default::default()),
        ];
        let mut source = SourceRecords::new(SourceMetadata::default(), records);
        assert_eq!(source.remaining(), 2);
        let ids: Vec<u64> = source.by_ref().map(|r| r.index).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(source.next().is_none());
    }

    #[tokio::test]
    async fn missing_raster_path_is_source_unavailable() {
        let err = open_image("/no/such/image.tif", None, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
    }
}
