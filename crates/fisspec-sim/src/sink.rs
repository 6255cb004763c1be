//! Output sinks for the bin time series and the dense nuclide table.
//!
//! The bin series is appended after every materialized row. The dense table
//! needs the final nuclide universe and is written once, at the end of a run.
//!
//! [`CsvSink`] layout:
//! - bins: `step,0-1MeV,1-2MeV,2-3MeV,3-4MeV,4-5MeV,5+MeV`
//! - nuclides: `step,<nuclide>,...`, absent cells written as `0`

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use fisspec_core::error::SinkError;
use fisspec_core::spectrum::EnergyBin;

use crate::ledger::{BinRow, DenseTable};

/// Durable destination for simulation output.
pub trait OutputSink {
    /// Append `rows` to the bin series, in order.
    ///
    /// Either every row is durable when this returns `Ok`, or none of them
    /// is observable once a later call succeeds. Callers retry a failed batch
    /// by passing it again at the front of the next one.
    fn append_bins(&mut self, rows: &[BinRow]) -> Result<(), SinkError>;

    /// Write the complete dense nuclide table.
    fn write_dense(&mut self, table: &DenseTable) -> Result<(), SinkError>;
}

/// In-memory sink, for tests and embedding.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    pub bins: Vec<BinRow>,
    pub dense: Option<DenseTable>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for MemorySink {
    fn append_bins(&mut self, rows: &[BinRow]) -> Result<(), SinkError> {
        self.bins.extend_from_slice(rows);
        Ok(())
    }

    fn write_dense(&mut self, table: &DenseTable) -> Result<(), SinkError> {
        self.dense = Some(table.clone());
        Ok(())
    }
}

/// CSV files on disk.
///
/// Each append opens the bin file, truncates any bytes past the last
/// successful append, writes, syncs and closes it again. The dense table is
/// written to a sibling temporary file and renamed into place.
#[derive(Debug)]
pub struct CsvSink {
    bins_path: PathBuf,
    nuclides_path: PathBuf,
    committed_len: u64,
}

impl CsvSink {
    /// Create (or truncate) the bin file and write its header.
    pub fn create(
        bins_path: impl Into<PathBuf>,
        nuclides_path: impl Into<PathBuf>,
    ) -> Result<Self, SinkError> {
        let bins_path = bins_path.into();
        let nuclides_path = nuclides_path.into();
        for path in [&bins_path, &nuclides_path] {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
            }
        }

        let mut header = String::from("step");
        for bin in EnergyBin::ALL {
            header.push(',');
            header.push_str(&bin.label());
        }
        header.push('\n');

        let mut file = File::create(&bins_path).map_err(|e| io_error(&bins_path, e))?;
        file.write_all(header.as_bytes())
            .and_then(|_| file.sync_data())
            .map_err(|e| io_error(&bins_path, e))?;

        Ok(Self {
            committed_len: header.len() as u64,
            bins_path,
            nuclides_path,
        })
    }

    pub fn bins_path(&self) -> &Path {
        &self.bins_path
    }

    pub fn nuclides_path(&self) -> &Path {
        &self.nuclides_path
    }

    fn write_rows(&self, rows: &[BinRow]) -> std::io::Result<u64> {
        let mut file = OpenOptions::new().write(true).open(&self.bins_path)?;
        file.set_len(self.committed_len)?;
        file.seek(SeekFrom::Start(self.committed_len))?;

        let mut out = BufWriter::new(file);
        let mut written = 0u64;
        for row in rows {
            let mut line = row.step.to_string();
            for value in row.bins.as_array() {
                line.push(',');
                line.push_str(&format_value(*value));
            }
            line.push('\n');
            out.write_all(line.as_bytes())?;
            written += line.len() as u64;
        }
        let file = out.into_inner().map_err(|e| e.into_error())?;
        file.sync_data()?;
        Ok(written)
    }

    fn write_table(&self, path: &Path, table: &DenseTable) -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        write!(out, "step")?;
        for nuclide in table.nuclides() {
            write!(out, ",{nuclide}")?;
        }
        writeln!(out)?;
        for row in table.rows() {
            write!(out, "{}", row.step)?;
            for value in &row.activities {
                write!(out, ",{}", format_value(*value))?;
            }
            writeln!(out)?;
        }
        let file = out.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }
}

impl OutputSink for CsvSink {
    fn append_bins(&mut self, rows: &[BinRow]) -> Result<(), SinkError> {
        let written = self
            .write_rows(rows)
            .map_err(|e| io_error(&self.bins_path, e))?;
        self.committed_len += written;
        debug!(rows = rows.len(), bytes = self.committed_len, "flushed bin rows");
        Ok(())
    }

    fn write_dense(&mut self, table: &DenseTable) -> Result<(), SinkError> {
        if let Some(row) = table
            .rows()
            .iter()
            .find(|r| r.activities.len() != table.nuclides().len())
        {
            return Err(SinkError::RowWidth {
                got: row.activities.len(),
                expected: table.nuclides().len(),
            });
        }

        let mut tmp = self.nuclides_path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        self.write_table(&tmp, table)
            .map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, &self.nuclides_path).map_err(|e| io_error(&self.nuclides_path, e))?;
        debug!(
            nuclides = table.nuclides().len(),
            rows = table.rows().len(),
            "wrote dense nuclide table"
        );
        Ok(())
    }
}

/// `0` for zero, shortest round-trip scientific notation otherwise.
fn format_value(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{value:e}")
    }
}

fn io_error(path: &Path, err: std::io::Error) -> SinkError {
    SinkError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
