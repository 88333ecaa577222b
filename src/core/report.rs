//! Reporting of filtered results, kept apart from filtering.
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::Result;

/// Sink for the final results of one pipeline run
pub trait Reporter {
    fn report<T: Serialize>(&mut self, source: &str, items: &[T]) -> Result<()>;
}

/// Emits one tracing event per item
#[derive(Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report<T: Serialize>(&mut self, source: &str, items: &[T]) -> Result<()> {
        info!("{} result(s) for {}", items.len(), source);
        for (i, item) in items.iter().enumerate() {
            info!("  [{}] {}", i, serde_json::to_string(item)?);
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ReportDocument<'a, T> {
    source: &'a str,
    generated_at: DateTime<Utc>,
    count: usize,
    results: &'a [T],
}

/// Writes one pretty-printed JSON document per report
pub struct JsonReporter<W: Write> {
    writer: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn report<T: Serialize>(&mut self, source: &str, items: &[T]) -> Result<()> {
        let doc = ReportDocument {
            source,
            generated_at: Utc::now(),
            count: items.len(),
            results: items,
        };
        serde_json::to_writer_pretty(&mut self.writer, &doc)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Detection;

    #[test]
    fn json_report_carries_source_count_and_results() {
        let detections = vec![Detection {
            bbox: [1.0, 2.0, 3.0, 4.0],
            label: "person".into(),
            score: 0.75,
        }];
        let mut reporter = JsonReporter::new(Vec::new());
        reporter.report("https://example.com/a.jpg", &detections).unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["source"], "https://example.com/a.jpg");
        assert_eq!(value["count"], 1);
        assert_eq!(value["results"][0]["label"], "person");
        assert_eq!(value["results"][0]["bbox"][2], 3.0);
        assert!(value["generated_at"].is_string());
    }

    #[test]
    fn log_reporter_accepts_empty_results() {
        let empty: Vec<Detection> = Vec::new();
        assert!(LogReporter.report("none", &empty).is_ok());
    }
}
