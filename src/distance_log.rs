//! The distance log: one line `<average>,` per frame, and the aggregation of such a log into a single mean.

use std::{
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use log::debug;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::estimator::Estimate;

pub const DEFAULT_LOG_PATH: &str = "avg_log.txt";

/// Formats one log line. Frames without a usable distance are written as `0.00`, the log format has no other way to express them.
pub fn format_line(estimate: &Estimate) -> String {
    format!("{:.2},\n", estimate.sentinel())
}

/// Append only log file. Lines are written under a lock and flushed one by one, so several threads can share one log without interleaving.
pub struct DistanceLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}
impl DistanceLog {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!("appending distances to {}", path.display());
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, estimate: &Estimate) -> Result<()> {
        let line = format_line(estimate);
        let mut writer = self.writer.lock().map_err(|_| Error::LockPoisoned)?;
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

/// How to treat the first line of a log when aggregating. The writer above never emits a header, so `None` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderPolicy {
    #[default]
    None,
    SkipFirstLine,
}

/// Result of aggregating a log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
}

/// Parses the first comma separated field of every line as a distance and returns their mean. Blank lines are ignored.
pub fn aggregate<R: BufRead>(reader: R, header: HeaderPolicy) -> Result<Summary> {
    let skip = match header {
        HeaderPolicy::None => 0,
        HeaderPolicy::SkipFirstLine => 1,
    };
    let mut sum = 0.0;
    let mut count = 0;
    for (i, line) in reader.lines().enumerate().skip(skip) {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let field = line.split(',').next().unwrap_or_default().trim();
        let value: f64 = field.parse().map_err(|_| Error::Parse {
            line: i + 1,
            field: field.to_string(),
        })?;
        sum += value;
        count += 1;
    }
    if count == 0 {
        return Err(Error::EmptyLog);
    }
    Ok(Summary {
        count,
        mean: sum / count as f64,
    })
}

/// `aggregate()` for a file on disk.
pub fn aggregate_file(path: impl AsRef<Path>, header: HeaderPolicy) -> Result<Summary> {
    let file = File::open(path)?;
    aggregate(BufReader::new(file), header)
}
