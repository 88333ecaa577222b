//! Feature extraction: an explicit attribute-to-index schema that turns
//! attribute records into fixed-length feature vectors and training labels.
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{AttributeValue, FeatureVector, Label, Record, RecordPayload};

/// Pure mapping from a record to its feature vector (and label when training)
pub trait FeatureExtractor {
    /// Declared vector length; every extracted vector has exactly this many values
    fn width(&self) -> usize;

    fn extract(&self, record: &Record) -> Result<FeatureVector>;

    /// Whether a malformed record is dropped from the run instead of aborting it
    fn skips_malformed(&self) -> bool {
        false
    }

    fn extract_label(&self, record: &Record) -> Result<Label>;
}

/// How an attribute value becomes a number
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Encoding {
    /// Integers, reals, booleans (0/1) and numeric strings
    #[default]
    Numeric,
    /// Position of the value in `categories`; unknown values count as missing
    Categorical { categories: Vec<String> },
}

impl Encoding {
    fn encode(&self, value: &AttributeValue) -> Option<f32> {
        match self {
            Encoding::Numeric => match value {
                AttributeValue::Integer(v) => Some(*v as f32),
                AttributeValue::Real(v) => Some(*v as f32),
                AttributeValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
                AttributeValue::Text(s) => s.trim().parse::<f32>().ok(),
            }
            .filter(|v| v.is_finite()),
            Encoding::Categorical { categories } => {
                let key = value.to_string();
                categories
                    .iter()
                    .position(|c| *c == key)
                    .map(|pos| pos as f32)
            }
        }
    }
}

/// Treatment of absent or unencodable attributes
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Reject the record with `MalformedRecord`
    #[default]
    Fail,
    /// Substitute a constant
    Default { value: f32 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureField {
    pub attribute: String,
    #[serde(default)]
    pub encoding: Encoding,
    /// Field-level substitute; overrides the schema-wide policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<f32>,
}

impl FeatureField {
    pub fn numeric(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            encoding: Encoding::Numeric,
            default: None,
        }
    }

    pub fn categorical(attribute: impl Into<String>, categories: &[&str]) -> Self {
        Self {
            attribute: attribute.into(),
            encoding: Encoding::Categorical {
                categories: categories.iter().map(|c| c.to_string()).collect(),
            },
            default: None,
        }
    }

    pub fn with_default(mut self, value: f32) -> Self {
        self.default = Some(value);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelField {
    pub attribute: String,
    #[serde(default)]
    pub encoding: Encoding,
}

/// Explicit attribute-to-index mapping; position in `fields` is the vector index
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub fields: Vec<FeatureField>,
    #[serde(default)]
    pub missing: MissingPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<LabelField>,
}

impl FeatureSchema {
    pub fn new(fields: Vec<FeatureField>) -> Self {
        Self {
            fields,
            missing: MissingPolicy::Fail,
            label: None,
        }
    }

    pub fn with_missing(mut self, missing: MissingPolicy) -> Self {
        self.missing = missing;
        self
    }

    pub fn with_label(mut self, attribute: impl Into<String>, encoding: Encoding) -> Self {
        self.label = Some(LabelField {
            attribute: attribute.into(),
            encoding,
        });
        self
    }

    /// Whether a malformed attribute is substituted rather than rejected
    pub fn substitutes_missing(&self) -> bool {
        matches!(self.missing, MissingPolicy::Default { .. })
    }

    fn attributes<'a>(
        record: &'a Record,
    ) -> Result<&'a std::collections::BTreeMap<String, AttributeValue>> {
        match &record.payload {
            RecordPayload::Attributes(map) => Ok(map),
            RecordPayload::Image(_) => Err(Error::MalformedRecord {
                index: record.index,
                reason: "image record has no attributes".into(),
            }),
        }
    }
}

impl FeatureExtractor for FeatureSchema {
    fn width(&self) -> usize {
        self.fields.len()
    }

    fn skips_malformed(&self) -> bool {
        self.substitutes_missing()
    }

    fn extract(&self, record: &Record) -> Result<FeatureVector> {
        let attributes = Self::attributes(record)?;
        let mut vector = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let encoded = attributes
                .get(&field.attribute)
                .and_then(|v| field.encoding.encode(v));
            let value = match (encoded, field.default, &self.missing) {
                (Some(v), _, _) => v,
                (None, Some(d), _) => d,
                (None, None, MissingPolicy::Default { value }) => *value,
                (None, None, MissingPolicy::Fail) => {
                    return Err(Error::MalformedRecord {
                        index: record.index,
                        reason: format!("missing or unencodable attribute '{}'", field.attribute),
                    });
                }
            };
            vector.push(value);
        }
        Ok(vector)
    }

    fn extract_label(&self, record: &Record) -> Result<Label> {
        let spec = self.label.as_ref().ok_or_else(|| Error::MalformedRecord {
            index: record.index,
            reason: "schema declares no label attribute".into(),
        })?;
        let attributes = Self::attributes(record)?;
        attributes
            .get(&spec.attribute)
            .and_then(|v| spec.encoding.encode(v))
            .ok_or_else(|| Error::MalformedRecord {
                index: record.index,
                reason: format!("missing or unencodable label '{}'", spec.attribute),
            })
    }
}

/// Extracted rows for a sequence of records, in input order
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Extracted {
    pub indices: Vec<u64>,
    pub vectors: Vec<FeatureVector>,
    pub labels: Option<Vec<Label>>,
    /// Records dropped as malformed under a substituting policy
    pub skipped: usize,
}

/// Run the extractor over every record.
///
/// With `with_labels` each record must also carry a label. A `MalformedRecord`
/// aborts the run unless the extractor skips malformed records, in which case
/// the record is dropped and counted in `skipped`. Other errors always abort.
pub fn extract_all<E, I>(extractor: &E, records: I, with_labels: bool) -> Result<Extracted>
where
    E: FeatureExtractor + ?Sized,
    I: IntoIterator<Item = Record>,
{
    let mut out = Extracted {
        labels: with_labels.then(Vec::new),
        ..Default::default()
    };
    for record in records {
        let row = extractor.extract(&record).and_then(|vector| {
            let label = if with_labels {
                Some(extractor.extract_label(&record)?)
            } else {
                None
            };
            Ok((vector, label))
        });
        let (vector, label) = match row {
            Ok(row) => row,
            Err(e @ Error::MalformedRecord { .. }) if extractor.skips_malformed() => {
                warn!("Skipping record: {}", e);
                out.skipped += 1;
                continue;
            }
            Err(e) => {
                warn!("Feature extraction failed: {}", e);
                return Err(e);
            }
        };
        if let (Some(labels), Some(label)) = (out.labels.as_mut(), label) {
            labels.push(label);
        }
        out.indices.push(record.index);
        out.vectors.push(vector);
    }
    debug!(
        "Extracted {} vector(s) of width {}, skipped {}",
        out.vectors.len(),
        extractor.width(),
        out.skipped
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(index: u64, pairs: &[(&str, AttributeValue)]) -> Record {
        let map: BTreeMap<String, AttributeValue> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Record::attributes(index, map)
    }

    fn schema() -> FeatureSchema {
        FeatureSchema::new(vec![
            FeatureField::numeric("elevation"),
            FeatureField::categorical("landcover", &["forest", "urban", "water"]),
            FeatureField::numeric("slope"),
        ])
    }

    #[test]
    fn vector_length_is_constant_under_default_substitution() {
        let schema = schema().with_missing(MissingPolicy::Default { value: 0.0 });
        let records = vec![
            record(
                0,
                &[
                    ("elevation", AttributeValue::Real(120.5)),
                    ("landcover", AttributeValue::Text("urban".into())),
                    ("slope", AttributeValue::Integer(3)),
                ],
            ),
            record(1, &[("elevation", AttributeValue::Integer(7))]),
            record(2, &[]),
            record(3, &[("unrelated", AttributeValue::Bool(true))]),
        ];
        for r in &records {
            assert_eq!(schema.extract(r).unwrap().len(), schema.width());
        }
        assert_eq!(schema.extract(&records[0]).unwrap(), vec![120.5, 1.0, 3.0]);
        assert_eq!(schema.extract(&records[1]).unwrap(), vec![7.0, 0.0, 0.0]);
    }

    #[test]
    fn missing_attribute_without_default_is_malformed() {
        let err = schema()
            .extract(&record(9, &[("elevation", AttributeValue::Real(1.0))]))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { index: 9, .. }));
    }

    #[test]
    fn field_default_overrides_fail_policy() {
        let schema = FeatureSchema::new(vec![FeatureField::numeric("depth").with_default(-1.0)]);
        assert_eq!(schema.extract(&record(0, &[])).unwrap(), vec![-1.0]);
    }

    #[test]
    fn numeric_strings_parse_and_garbage_is_missing() {
        let schema = FeatureSchema::new(vec![FeatureField::numeric("v")])
            .with_missing(MissingPolicy::Default { value: 42.0 });
        let parsed = schema
            .extract(&record(0, &[("v", AttributeValue::Text(" 2.5 ".into()))]))
            .unwrap();
        assert_eq!(parsed, vec![2.5]);
        let garbage = schema
            .extract(&record(0, &[("v", AttributeValue::Text("n/a".into()))]))
            .unwrap();
        assert_eq!(garbage, vec![42.0]);
    }

    #[test]
    fn labels_are_never_defaulted() {
        let schema = schema()
            .with_missing(MissingPolicy::Default { value: 0.0 })
            .with_label(
                "class",
                Encoding::Categorical {
                    categories: vec!["no".into(), "yes".into()],
                },
            );
        let ok = record(0, &[("class", AttributeValue::Text("yes".into()))]);
        assert_eq!(schema.extract_label(&ok).unwrap(), 1.0);
        let err = schema.extract_label(&record(1, &[])).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { index: 1, .. }));
    }

    #[test]
    fn image_records_are_rejected() {
        let image = crate::types::ImageTensor::new(1, 1, vec![0, 0, 0]).unwrap();
        let err = schema().extract(&Record::image(5, image)).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { index: 5, .. }));
    }

    #[test]
    fn extract_all_keeps_order_and_labels() {
        let schema = FeatureSchema::new(vec![FeatureField::numeric("x")])
            .with_label("y", Encoding::Numeric);
        let records = vec![
            record(
                4,
                &[("x", AttributeValue::Integer(1)), ("y", AttributeValue::Integer(0))],
            ),
            record(
                2,
                &[("x", AttributeValue::Integer(2)), ("y", AttributeValue::Integer(1))],
            ),
        ];
        let out = extract_all(&schema, records, true).unwrap();
        assert_eq!(out.indices, vec![4, 2]);
        assert_eq!(out.vectors, vec![vec![1.0], vec![2.0]]);
        assert_eq!(out.labels, Some(vec![0.0, 1.0]));
    }

    #[test]
    fn substituting_policy_drops_unlabelled_records() {
        let schema = FeatureSchema::new(vec![FeatureField::numeric("x")])
            .with_missing(MissingPolicy::Default { value: 0.0 })
            .with_label("y", Encoding::Numeric);
        let records = vec![
            record(
                0,
                &[("x", AttributeValue::Integer(1)), ("y", AttributeValue::Integer(0))],
            ),
            record(1, &[("x", AttributeValue::Integer(5))]),
            record(2, &[("y", AttributeValue::Integer(1))]),
        ];
        let out = extract_all(&schema, records, true).unwrap();
        assert_eq!(out.indices, vec![0, 2]);
        assert_eq!(out.vectors, vec![vec![1.0], vec![0.0]]);
        assert_eq!(out.labels, Some(vec![0.0, 1.0]));
        assert_eq!(out.skipped, 1);
    }

    #[test]
    fn fail_policy_aborts_on_first_unlabelled_record() {
        let schema =
            FeatureSchema::new(vec![FeatureField::numeric("x")]).with_label("y", Encoding::Numeric);
        let records = vec![
            record(
                0,
                &[("x", AttributeValue::Integer(1)), ("y", AttributeValue::Integer(0))],
            ),
            record(1, &[("x", AttributeValue::Integer(5))]),
        ];
        let err = extract_all(&schema, records, true).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { index: 1, .. }));
    }

    #[test]
    fn image_records_are_skipped_under_substituting_policy() {
        let schema = schema().with_missing(MissingPolicy::Default { value: 0.0 });
        let image = crate::types::ImageTensor::new(1, 1, vec![0, 0, 0]).unwrap();
        let out = extract_all(&schema, vec![Record::image(3, image)], false).unwrap();
        assert!(out.vectors.is_empty());
        assert_eq!(out.labels, None);
        assert_eq!(out.skipped, 1);
    }

    #[test]
    fn schema_round_trips_through_json_config() {
        let json = r#"{
            "fields": [
                {"attribute": "elevation"},
                {"attribute": "landcover", "encoding": {"kind": "categorical", "categories": ["forest", "urban"]}, "default": -1.0}
            ],
            "missing": {"kind": "default", "value": 0.0},
            "label": {"attribute": "risk"}
        }"#;
        let schema: FeatureSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.width(), 2);
        assert!(schema.substitutes_missing());
        assert_eq!(schema.fields[1].default, Some(-1.0));
        assert_eq!(schema.label.unwrap().encoding, Encoding::Numeric);
    }
}
