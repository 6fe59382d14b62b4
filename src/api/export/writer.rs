use super::shape::OutputRow;
use crate::handler::error::ApiError;
use chrono::NaiveDate;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes one headerless, BOM-prefixed CSV per day as `<label>_<YYYYMMDD>.csv`.
#[derive(Debug, Clone)]
pub struct DailyCsvWriter {
    output_dir: PathBuf,
    label: String,
}

impl DailyCsvWriter {
    pub fn new(output_dir: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            label: label.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn path_for(&self, day: NaiveDate) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.csv", self.label, day.format("%Y%m%d")))
    }

    /// Replaces the day's file with `rows`. An empty slice still produces a file.
    pub fn write_day(&self, day: NaiveDate, rows: &[OutputRow]) -> Result<PathBuf, ApiError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.path_for(day);
        let mut file = BufWriter::new(File::create(&path)?);
        file.write_all(UTF8_BOM)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        for row in rows {
            writer.write_record(row.to_record())?;
        }
        writer.flush()?;
        log::debug!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(path)
    }
}
