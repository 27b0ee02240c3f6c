//! Event export - CSV and JSON Lines projections of a filtered sequence

use std::borrow::Cow;
use std::io::Write;
use std::path::Path;
use serde::{Deserialize, Serialize};

use super::DetectionEvent;
use crate::error::{ConsoleError, Result};

/// Export format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    JsonLines,
}

impl ExportFormat {
    /// Pick a format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
            Some(ext) if ext == "csv" => Ok(ExportFormat::Csv),
            Some(ext) if ext == "jsonl" || ext == "json" => Ok(ExportFormat::JsonLines),
            _ => Err(ConsoleError::ValidationError(format!(
                "cannot infer export format from {:?} (use .csv or .jsonl)",
                path
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::JsonLines => "jsonl",
        }
    }
}

/// Writes events in one format
pub struct EventExporter {
    format: ExportFormat,
}

impl EventExporter {
    pub fn new(format: ExportFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Export events in the order given
    pub fn export<W: Write>(&self, events: &[DetectionEvent], writer: &mut W) -> Result<()> {
        match self.format {
            ExportFormat::Csv => {
                writeln!(writer, "timestamp,labels,confidences,count,latency_ms")?;
                for event in events {
                    writeln!(writer, "{}", csv_row(event))?;
                }
            }
            ExportFormat::JsonLines => {
                for event in events {
                    serde_json::to_writer(&mut *writer, event).map_err(std::io::Error::from)?;
                    writeln!(writer)?;
                }
            }
        }

        writer.flush()?;
        Ok(())
    }

    /// Export to a file, creating parent directories
    pub fn export_to_path(&self, events: &[DetectionEvent], path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
        self.export(events, &mut writer)
    }
}

/// One row: timestamp, labels, confidences, count, latency
pub fn csv_row(event: &DetectionEvent) -> String {
    let labels = event.labels().collect::<Vec<_>>().join(";");
    let confidences = event
        .detections
        .iter()
        .map(|d| format!("{:.2}", d.confidence))
        .collect::<Vec<_>>()
        .join(";");

    format!(
        "{},{},{},{},{:.1}",
        event.timestamp.to_rfc3339(),
        csv_field(&labels),
        confidences,
        event.detections.len(),
        event.metadata.inference_ms
    )
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}
