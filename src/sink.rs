//! Row sinks

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::aggregate::ResultRow;
use crate::error::Result;

/// CSV header line
pub const CSV_HEADER: &str = "name,bytes,stride,reps,host_ms,sum_cycles,sum_ops";

/// Destination for result rows
pub trait ResultSink {
    /// Accept one row; the row must be durable before this returns
    ///
    /// # Errors
    ///
    /// Returns `BenchError::Io` if the row cannot be written.
    fn emit(&mut self, row: &ResultRow) -> Result<()>;
}

/// CSV writer that flushes after every row
#[derive(Debug)]
pub struct CsvSink<W: Write> {
    writer: W,
    rows: usize,
}

impl CsvSink<BufWriter<File>> {
    /// Create (truncate) a CSV file at `path`
    ///
    /// # Errors
    ///
    /// Returns `BenchError::Io` if the file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> CsvSink<W> {
    /// Wrap `writer` and write the header
    ///
    /// # Errors
    ///
    /// Returns `BenchError::Io` if the header cannot be written.
    pub fn new(mut writer: W) -> Result<Self> {
        writeln!(writer, "{CSV_HEADER}")?;
        writer.flush()?;
        Ok(Self { writer, rows: 0 })
    }

    /// Rows written so far (header excluded)
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for CsvSink<W> {
    fn emit(&mut self, row: &ResultRow) -> Result<()> {
        writeln!(self.writer, "{}", row.to_csv())?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }
}

/// Sink that keeps rows in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Vec<ResultRow>,
}

impl MemorySink {
    /// Empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows received so far
    #[must_use]
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Take ownership of the rows
    #[must_use]
    pub fn into_rows(self) -> Vec<ResultRow> {
        self.rows
    }
}

impl ResultSink for MemorySink {
    fn emit(&mut self, row: &ResultRow) -> Result<()> {
        self.rows.push(row.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;

    fn host_row() -> ResultRow {
        ResultRow::Host {
            name: "host_h2d".to_string(),
            bytes: 64,
            reps: 1,
            host_ms: 0.5,
            throughput: 0.000128,
        }
    }

    #[test]
    fn test_csv_sink_header_and_rows() {
        let mut sink = CsvSink::new(Vec::new()).unwrap();
        sink.emit(&host_row()).unwrap();
        assert_eq!(sink.rows(), 1);
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "host_h2d,64,0,1,0.500000,0.000128");
    }

    #[test]
    fn test_memory_sink_keeps_rows() {
        let mut sink = MemorySink::new();
        sink.emit(&host_row()).unwrap();
        sink.emit(&host_row()).unwrap();
        assert_eq!(sink.rows().len(), 2);
        assert_eq!(sink.into_rows()[0].name(), "host_h2d");
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_csv_sink_io_error() {
        assert!(matches!(CsvSink::new(BrokenWriter), Err(BenchError::Io(_))));
    }
}
