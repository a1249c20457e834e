//! Routing event log in JSON Lines format.
//!
//! Every routed request leaves a trail of `request_classified`,
//! `plan_built`, `handler_completed` and `response_aggregated` records.
//! Object payloads are flattened into the record; anything else goes
//! under `data`.

use delegate_application::{EventLogger, RoutingEvent};
use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Appends routing events to a `.jsonl` file, one record per line
pub struct JsonlEventLogger {
    path: PathBuf,
    out: Mutex<BufWriter<File>>,
}

impl JsonlEventLogger {
    /// Open `path` for appending, creating missing parent directories.
    ///
    /// An unusable path disables the event log (`None`) instead of failing
    /// the request; the reason is reported through `tracing`.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        match Self::open(path) {
            Ok(file) => Some(Self {
                path: path.to_path_buf(),
                out: Mutex::new(BufWriter::new(file)),
            }),
            Err(e) => {
                warn!(path = %path.display(), "Event log disabled: {}", e);
                None
            }
        }
    }

    fn open(path: &Path) -> std::io::Result<File> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }
        OpenOptions::new().create(true).append(true).open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn to_record(event: RoutingEvent) -> Value {
        let mut record = match event.payload {
            Value::Object(fields) => fields,
            other => {
                let mut fields = Map::new();
                fields.insert("data".to_string(), other);
                fields
            }
        };
        record.insert("type".to_string(), Value::from(event.event_type));
        record.insert(
            "timestamp".to_string(),
            Value::from(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
        );
        Value::Object(record)
    }
}

impl EventLogger for JsonlEventLogger {
    fn log(&self, event: RoutingEvent) {
        let Ok(line) = serde_json::to_string(&Self::to_record(event)) else {
            return;
        };
        let Ok(mut out) = self.out.lock() else {
            return;
        };
        // One flush per record keeps the file complete if the process dies.
        if let Err(e) = writeln!(out, "{}", line).and_then(|()| out.flush()) {
            warn!(path = %self.path.display(), "Event log write failed: {}", e);
        }
    }
}
