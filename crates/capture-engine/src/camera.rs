//! Camera data output: one JSON record per captured frame.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use demorec_capture_model::{CaptureSettings, Tick};
use demorec_common::error::{DemorecError, DemorecResult};
use demorec_encoder::unique_output_path;
use serde::Serialize;

use crate::host::CameraPose;

/// One line of `Camera.jsonl`.
#[derive(Debug, Clone, Serialize)]
pub struct CameraRecord {
    pub frame: u64,
    pub tick: Tick,
    #[serde(flatten)]
    pub pose: CameraPose,
}

#[derive(Serialize)]
struct CameraHeader<'a> {
    started_at: String,
    settings: &'a CaptureSettings,
}

/// Writer for camera data captures.
///
/// The file starts with a `#`-prefixed JSON header holding the settings and
/// start time, followed by one JSON object per line.
pub struct CameraDataWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    records: u64,
}

impl CameraDataWriter {
    /// Create `Camera.jsonl` (or `Camera(n).jsonl`) in `dir`.
    pub fn create(
        dir: &Path,
        settings: &CaptureSettings,
        started_at: DateTime<Utc>,
    ) -> DemorecResult<Self> {
        let path = unique_output_path(dir, "Camera", "jsonl");
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);

        let header = CameraHeader {
            started_at: started_at.to_rfc3339(),
            settings,
        };
        writeln!(writer, "# {}", serde_json::to_string(&header)?)?;

        tracing::info!(path = %path.display(), "Writing camera data");
        Ok(Self {
            path,
            writer,
            records: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_record(&mut self, record: &CameraRecord) -> DemorecResult<()> {
        let line = serde_json::to_string(record)?;
        writeln!(self.writer, "{line}")
            .map_err(|e| DemorecError::pipe(format!("Failed to write camera record: {e}")))?;
        self.records += 1;
        Ok(())
    }

    /// Flush and close the file, returning the number of records written.
    pub fn finish(mut self) -> DemorecResult<u64> {
        self.writer.flush()?;
        Ok(self.records)
    }
}
