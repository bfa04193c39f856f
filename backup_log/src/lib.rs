use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Local;

use error::StatusLogError;

pub mod error;

/// Minimum inner width of a section banner. Shorter messages are centered,
/// longer messages stretch the banner to fit.
const MIN_BANNER_WIDTH: usize = 18;

/// Append-only run log shared by every backup step.
///
/// Each entry is written with an open-append-close cycle so a crashed run
/// leaves everything logged up to that point on disk. Rotation of old log
/// files is not done here; the log-rotation step owns that.
pub struct StatusLog {
    log_file: PathBuf,
    verbose: bool,
}

impl StatusLog {
    pub fn new(log_file: impl Into<PathBuf>, verbose: bool) -> Self {
        Self {
            log_file: log_file.into(),
            verbose,
        }
    }

    pub fn path(&self) -> &Path {
        &self.log_file
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Appends a timestamped line.
    pub fn log(&self, message: &str) -> Result<(), StatusLogError> {
        let line = format!("{} - {}", Local::now().format("%Y-%m-%d %H:%M:%S"), message);
        self.append(&line)
    }

    /// Appends a `#` banner framing the message, used to mark the start of a
    /// backup step in the log.
    pub fn log_section(&self, message: &str) -> Result<(), StatusLogError> {
        let width = message.chars().count().max(MIN_BANNER_WIDTH);
        let border = "#".repeat(width + 4);
        let banner = format!("\n{border}\n# {message:^width$} #\n{border}");
        self.append(&banner)
    }

    /// 1-based line number at which the next entry will land. Error messages
    /// in the report use this to point readers into the log.
    pub fn next_line_number(&self) -> usize {
        match std::fs::read_to_string(&self.log_file) {
            Ok(contents) => contents.lines().count() + 1,
            Err(_) => 1,
        }
    }

    fn append(&self, text: &str) -> Result<(), StatusLogError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)?;
        writeln!(file, "{text}")?;
        if self.verbose {
            println!("{text}");
        }
        Ok(())
    }
}
