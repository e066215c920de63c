use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{DumpError, DumpResult};

/// Destination of the dump: standard output or a file opened in its place.
///
/// Acquired once before any emission and moved into the run, so the
/// destination cannot change part-way through.
pub enum OutputSink {
    Stdout(BufWriter<Stdout>),
    File(BufWriter<File>),
}

impl OutputSink {
    /// Open `path` (truncating it) or fall back to standard output.
    pub fn acquire(path: Option<&Path>) -> DumpResult<Self> {
        match path {
            Some(path) => {
                let file = File::create(path).map_err(DumpError::Output)?;
                debug!(path = %path.display(), "output redirected");
                Ok(OutputSink::File(BufWriter::new(file)))
            }
            None => Ok(OutputSink::Stdout(BufWriter::new(io::stdout()))),
        }
    }

    /// Flush buffered output, reporting failures instead of losing them on drop.
    pub fn finish(mut self) -> DumpResult<()> {
        self.flush().map_err(DumpError::Output)
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputSink::Stdout(w) => w.write(buf),
            OutputSink::File(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputSink::Stdout(w) => w.flush(),
            OutputSink::File(w) => w.flush(),
        }
    }
}
