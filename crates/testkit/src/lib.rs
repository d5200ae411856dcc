#![warn(missing_docs)]
//! Deterministic testing surfaces: terrain fixtures, transition logs and CI metrics.

mod metrics;
mod snapshot;
mod terrain;

use anyhow::Result;
use delve_core::{BlockPos, PlayerId};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::{SystemTime, UNIX_EPOCH};

pub use metrics::*;
pub use snapshot::*;
pub use terrain::*;

/// One portal activation captured by headless tests.
#[derive(Debug, Serialize)]
pub struct TransitionRecord<'a> {
    /// Clock reading in milliseconds when the portal was used.
    pub now_ms: u64,
    /// Player who activated the portal.
    pub player: PlayerId,
    /// Marker position.
    pub position: BlockPos,
    /// Outcome label, e.g. `entered` or `on_cooldown`.
    pub outcome: &'a str,
    /// Player depth after the activation.
    pub depth: u32,
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    file: File,
}

impl JsonlSink {
    /// Create a new sink at `path`, creating parent dirs if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self { file })
    }

    /// Append a record to the log.
    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<()> {
        let line = serde_json::to_string(record)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        Ok(())
    }
}

/// Unique path under the system temp dir, e.g. `delve-metrics-<nanos>.json`.
pub fn temp_path(prefix: &str, extension: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    std::env::temp_dir().join(format!(
        "delve-{prefix}-{}-{nanos}.{extension}",
        std::process::id()
    ))
}

static TRACING: Once = Once::new();

/// Install a test-friendly `tracing` subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to `warn`.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
