//! Per-run export log.
//!
//! Every export run writes a human-readable log file next to the scene file:
//! one line per processing step, tab-indented by depth, with warnings counted
//! and an elapsed-time footer. Messages are mirrored to the [`log`] facade so
//! embedding applications see the same stream through their own logger.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use crate::error::Result;

/// Collects the log of one export run.
pub struct ExportLog {
    sink: Box<dyn Write>,
    start: Instant,
    warnings: u32,
}

impl ExportLog {
    /// Open a log file at `path`, truncating any previous run.
    pub fn create(path: &Path) -> Result<Self> {
        let file = BufWriter::new(File::create(path)?);
        let mut log = Self::with_sink(Box::new(file));
        log.line(
            0,
            &format!(
                "exporter: {} ver {}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ),
        );
        Ok(log)
    }

    /// A log that discards its file output. Facade mirroring still happens.
    pub fn discard() -> Self {
        Self::with_sink(Box::new(io::sink()))
    }

    fn with_sink(sink: Box<dyn Write>) -> Self {
        Self {
            sink,
            start: Instant::now(),
            warnings: 0,
        }
    }

    /// Log a progress message at the given indent depth.
    pub fn log(&mut self, indent: usize, msg: &str) {
        log::info!("{msg}");
        self.line(indent, msg);
    }

    /// Log a warning and bump the run's warning count.
    pub fn warn(&mut self, indent: usize, msg: &str) {
        log::warn!("{msg}");
        self.line(indent, &format!("WARNING: {msg}"));
        self.warnings += 1;
    }

    /// Record an error on the abort path, with whatever context is available.
    pub fn error(&mut self, err: &dyn std::fmt::Display) {
        log::error!("{err}");
        self.line(0, "========= An error was encountered =========");
        self.line(0, &format!("ERROR:  {err}"));
    }

    /// Number of warnings issued so far.
    pub fn warning_count(&self) -> u32 {
        self.warnings
    }

    /// Write the closing footer with the elapsed time.
    pub fn close(mut self) {
        self.line(0, "========= end of processing =========");
        let elapsed = self.start.elapsed().as_secs_f64();
        let minutes = (elapsed / 60.0).floor() as u64;
        let seconds = elapsed - (minutes as f64 * 60.0);
        self.line(0, &format!("elapsed time:  {minutes} min, {seconds:.4} secs"));
        let _ = self.sink.flush();
    }

    fn line(&mut self, indent: usize, msg: &str) {
        for _ in 0..indent {
            let _ = self.sink.write_all(b"\t");
        }
        let _ = self.sink.write_all(msg.as_bytes());
        let _ = self.sink.write_all(b"\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        let mut log = ExportLog::create(&path).unwrap();
        log.log(1, "processing begun of mesh:  Cube");
        log.warn(2, "No materials have been assigned");
        assert_eq!(log.warning_count(), 1);
        log.close();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\tprocessing begun of mesh:  Cube"));
        assert!(contents.contains("\t\tWARNING: No materials have been assigned"));
        assert!(contents.contains("end of processing"));
    }
}
