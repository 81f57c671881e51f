//! Delimited text loading

use super::{DataConfig, RawDataset};
use crate::error::{FraudError, Result};
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Reads transaction files into raw datasets
pub struct DataLoader {
    config: DataConfig,
}

/// Per-column summary reported by [`DataLoader::describe`]
#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: String,
    pub null_count: usize,
}

/// File summary without schema resolution
#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub n_rows: usize,
    pub n_cols: usize,
    pub columns: Vec<ColumnInfo>,
}

impl DataLoader {
    /// Create a new loader
    pub fn new(config: DataConfig) -> Self {
        Self { config }
    }

    /// Loader configuration
    pub fn config(&self) -> &DataConfig {
        &self.config
    }

    /// Load a file and resolve its schema
    pub fn load(&self, path: impl AsRef<Path>) -> Result<RawDataset> {
        let path = path.as_ref();
        let start = Instant::now();
        info!(path = %path.display(), "Reading transactions");

        let frame = self.read_frame(path)?;
        if frame.width() == 0 {
            return Err(FraudError::Format(format!(
                "{}: no columns found",
                path.display()
            )));
        }
        if frame.height() == 0 {
            return Err(FraudError::Format(format!(
                "{}: no data rows found",
                path.display()
            )));
        }

        let dataset = RawDataset::from_frame(frame, &self.config)?;
        info!(
            rows = dataset.height(),
            cols = dataset.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded dataset"
        );
        Ok(dataset)
    }

    /// Read the file into a frame using polars' dtype inference over all rows
    pub fn read_frame(&self, path: &Path) -> Result<DataFrame> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(FraudError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            )));
        }
        if !self.config.delimiter.is_ascii() {
            return Err(FraudError::Config(format!(
                "delimiter {:?} must be a single ASCII character",
                self.config.delimiter
            )));
        }
        self.check_structure(path)?;
        let file = File::open(path)?;

        let mut parse_opts = CsvParseOptions::default().with_separator(self.config.delimiter as u8);
        if !self.config.null_values.is_empty() {
            let tokens: Vec<PlSmallStr> = self
                .config
                .null_values
                .iter()
                .map(|token| token.as_str().into())
                .collect();
            parse_opts = parse_opts.with_null_values(Some(NullValues::AllColumns(tokens)));
        }

        debug!(
            delimiter = %self.config.delimiter,
            has_header = self.config.has_header,
            "Parsing delimited text"
        );

        CsvReadOptions::default()
            .with_has_header(self.config.has_header)
            .with_infer_schema_length(None)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| FraudError::Format(format!("{}: {}", path.display(), e)))
    }

    /// Reject duplicate header names and rows whose field count differs from
    /// the first record. polars would otherwise rename the duplicates and
    /// pad short rows with nulls.
    fn check_structure(&self, path: &Path) -> Result<()> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.config.delimiter as u8)
            .has_headers(self.config.has_header)
            .flexible(false)
            .from_reader(File::open(path)?);

        if self.config.has_header {
            let headers = reader.byte_headers().map_err(|e| structure_error(path, e))?;
            let mut seen = HashSet::new();
            if let Some(name) = headers.iter().find(|name| !seen.insert(*name)) {
                return Err(FraudError::Format(format!(
                    "{}: duplicate column name '{}' in header",
                    path.display(),
                    String::from_utf8_lossy(name)
                )));
            }
        }

        let mut record = csv::ByteRecord::new();
        while reader
            .read_byte_record(&mut record)
            .map_err(|e| structure_error(path, e))?
        {}
        Ok(())
    }

    /// Summarise a file's shape, dtypes and missing counts
    pub fn describe(&self, path: impl AsRef<Path>) -> Result<DatasetInfo> {
        let path = path.as_ref();
        let file_size = std::fs::metadata(path)?.len();
        let frame = self.read_frame(path)?;

        let columns = frame
            .get_columns()
            .iter()
            .map(|column| ColumnInfo {
                name: column.name().to_string(),
                dtype: column.dtype().to_string(),
                null_count: column.null_count(),
            })
            .collect();

        Ok(DatasetInfo {
            path: path.to_path_buf(),
            file_size,
            n_rows: frame.height(),
            n_cols: frame.width(),
            columns,
        })
    }
}

fn structure_error(path: &Path, err: csv::Error) -> FraudError {
    let message = format!("{}: {}", path.display(), err);
    match err.into_kind() {
        csv::ErrorKind::Io(e) => FraudError::Io(e),
        _ => FraudError::Format(message),
    }
}
