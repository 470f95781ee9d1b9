use crate::domain::synthesis::{EventSink, RunEvent};
use chrono::Utc;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

#[derive(Serialize)]
struct Record<'a> {
    at: chrono::DateTime<Utc>,
    #[serde(flatten)]
    event: &'a RunEvent,
}

/// Appends every event as one JSON object per line
pub struct JsonLinesEventSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesEventSink {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl EventSink for JsonLinesEventSink {
    fn emit(&self, event: &RunEvent) {
        let record = Record {
            at: Utc::now(),
            event,
        };
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Could not serialize run event");
                return;
            }
        };

        let mut writer = match self.writer.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        // flushed per line so a crashed run still leaves a readable log
        if let Err(e) = writeln!(writer, "{line}").and_then(|()| writer.flush()) {
            tracing::warn!(error = %e, "Could not write run event");
        }
    }
}
