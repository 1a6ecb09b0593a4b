//! Upload outcome reports

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Summary of a completed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    /// Device-side filename
    pub filename: String,

    /// Payload size in bytes
    pub bytes: usize,

    /// Chunks written and acknowledged
    pub chunks: usize,

    /// Chunk size agreed at handshake
    pub chunk_size: usize,

    pub completed_at: DateTime<Utc>,
}

impl fmt::Display for TransferReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} bytes in {} chunks of {})",
            self.filename, self.bytes, self.chunks, self.chunk_size
        )
    }
}

/// Outcome of one file in a batch upload
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub path: PathBuf,
    pub slot: u32,
    /// Transfer summary, or the rendered error
    pub outcome: std::result::Result<TransferReport, String>,
}

impl BatchEntry {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Outcome of a batch upload
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,

    /// Files left over once every slot was used
    pub skipped: Vec<PathBuf>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }

    pub fn processed(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed {}, succeeded {}, failed {}, skipped {}",
            self.processed(),
            self.succeeded(),
            self.failed(),
            self.skipped.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(name: &str) -> TransferReport {
        TransferReport {
            filename: name.into(),
            bytes: 10,
            chunks: 1,
            chunk_size: 1024,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_batch_counts() {
        let batch = BatchReport {
            entries: vec![
                BatchEntry {
                    path: "a.png".into(),
                    slot: 1,
                    outcome: Ok(report("1.jpeg")),
                },
                BatchEntry {
                    path: "b.png".into(),
                    slot: 2,
                    outcome: Err("No acknowledgment for chunk 0".into()),
                },
            ],
            skipped: vec!["c.png".into()],
        };

        assert_eq!(batch.processed(), 2);
        assert_eq!(batch.succeeded(), 1);
        assert_eq!(batch.failed(), 1);
        assert_eq!(
            batch.to_string(),
            "processed 2, succeeded 1, failed 1, skipped 1"
        );
    }

    #[test]
    fn test_transfer_report_display() {
        assert_eq!(
            report("3.jpeg").to_string(),
            "3.jpeg (10 bytes in 1 chunks of 1024)"
        );
    }
}
