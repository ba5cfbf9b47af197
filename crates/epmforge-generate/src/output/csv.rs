use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use epmforge_core::Frame;

/// Write a frame as CSV in column order, returning the bytes written.
pub fn write_frame_csv(path: &Path, frame: &Frame) -> Result<u64, csv::Error> {
    let writer = BufWriter::new(File::create(path).map_err(csv::Error::from)?);
    let counting = CountingWriter::new(writer);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(counting);

    writer.write_record(frame.column_names())?;

    let columns: Vec<_> = frame
        .column_names()
        .iter()
        .filter_map(|name| frame.column(name))
        .collect();
    for row in 0..frame.num_rows() {
        let record: Vec<String> = columns
            .iter()
            .map(|column| column[row].to_csv_field())
            .collect();
        writer.write_record(&record)?;
    }

    writer.flush()?;
    let counting = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(counting.bytes_written())
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
