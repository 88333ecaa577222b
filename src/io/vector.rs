//! OGR vector layer reader: turns features of one layer into attribute records.
use std::collections::BTreeMap;
use std::path::Path;

use gdal::vector::{FieldValue, LayerAccess};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::io::gdal::{normalize_projection, open_dataset};
use crate::io::source::{SourceMetadata, SourceRecords};
use crate::types::{AttributeValue, Record};

/// Attribute names synthesized from the feature geometry envelope
pub const CENTROID_X: &str = "centroid_x";
pub const CENTROID_Y: &str = "centroid_y";

fn field_to_attribute(value: FieldValue) -> Option<AttributeValue> {
    match value {
        FieldValue::IntegerValue(v) => Some(AttributeValue::Integer(v as i64)),
        FieldValue::Integer64Value(v) => Some(AttributeValue::Integer(v)),
        FieldValue::RealValue(v) => Some(AttributeValue::Real(v)),
        FieldValue::StringValue(v) => Some(AttributeValue::Text(v)),
        FieldValue::DateValue(d) => Some(AttributeValue::Text(d.to_string())),
        FieldValue::DateTimeValue(d) => Some(AttributeValue::Text(d.to_rfc3339())),
        // List-valued fields have no scalar encoding
        _ => None,
    }
}

/// Reader for OGR vector datasets (GeoJSON, Shapefile, GeoPackage, ...)
pub struct VectorSource;

impl VectorSource {
    /// Read every feature of the layer at `layer_index` (1-based).
    ///
    /// The dataset is opened and released within this call; the returned
    /// records are already materialized.
    pub fn open<P: AsRef<Path>>(path: P, layer_index: usize) -> Result<SourceRecords> {
        let path = path.as_ref();
        let dataset = open_dataset(path)?;
        let layer_count = dataset.layer_count() as usize;
        if layer_index == 0 || layer_index > layer_count {
            return Err(Error::IndexOutOfRange {
                kind: "layer",
                index: layer_index,
                available: layer_count,
            });
        }

        let mut layer = dataset
            .layer(layer_index - 1)
            .map_err(|e| Error::source_unavailable(path.display().to_string(), e))?;
        let projection = layer
            .spatial_ref()
            .and_then(|srs| srs.to_wkt().ok())
            .map(normalize_projection)
            .unwrap_or_default();

        let mut records = Vec::new();
        for (position, feature) in layer.features().enumerate() {
            let index = feature.fid().unwrap_or(position as u64);
            let mut attributes = BTreeMap::new();
            for (name, value) in feature.fields() {
                if let Some(attr) = value.and_then(field_to_attribute) {
                    attributes.insert(name, attr);
                }
            }
            if let Some(geometry) = feature.geometry() {
                let env = geometry.envelope();
                attributes.insert(
                    CENTROID_X.to_string(),
                    AttributeValue::Real((env.MinX + env.MaxX) / 2.0),
                );
                attributes.insert(
                    CENTROID_Y.to_string(),
                    AttributeValue::Real((env.MinY + env.MaxY) / 2.0),
                );
            }
            records.push(Record::attributes(index, attributes));
        }

        info!(
            "Read {} feature(s) from layer {} of {:?}",
            records.len(),
            layer_index,
            path
        );
        debug!("Layer projection: {}", projection);

        let metadata = SourceMetadata {
            location: path.display().to_string(),
            width: 0,
            height: 0,
            band_count: 0,
            layer_count,
            feature_count: records.len(),
            projection,
            geotransform: None,
        };
        Ok(SourceRecords::new(metadata, records))
    }
}
