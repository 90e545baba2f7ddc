//! JSONL transfer ledger: one line per acquisition outcome.
//!
//! - Append-only JSONL format for easy parsing
//! - Automatic rotation when the file exceeds `MAX_LOG_SIZE` (50MB)
//! - Rotated files named `.1`, `.2`, etc. (max 5 rotations)

use crate::types::{AcquisitionOutcome, Work};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Maximum ledger size before rotation (50 MB).
const MAX_LOG_SIZE: u64 = 50 * 1024 * 1024;

/// Maximum number of rotated ledger files to keep.
const MAX_ROTATIONS: u32 = 5;

/// A single transfer record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub timestamp: String,
    pub creator: String,
    pub work: String,
    pub source_url: String,
    pub media_url: Option<String>,
    /// `downloaded`, `skipped`, `delegated` or `failed`.
    pub outcome: String,
    /// Destination path, or the error kind and message for failures.
    pub detail: Option<String>,
    pub bytes: u64,
    pub duration_ms: u64,
}

impl TransferRecord {
    pub fn from_outcome(
        work: &Work,
        media_url: Option<&str>,
        outcome: &AcquisitionOutcome,
        bytes: u64,
        duration_ms: u64,
    ) -> Self {
        let detail = match outcome {
            AcquisitionOutcome::Downloaded(p) | AcquisitionOutcome::Skipped(p) => {
                Some(p.display().to_string())
            }
            AcquisitionOutcome::Delegated => None,
            AcquisitionOutcome::Failed(e) => Some(format!("{}: {e}", e.kind())),
        };
        Self {
            timestamp: Utc::now().to_rfc3339(),
            creator: work.creator().name.clone(),
            work: work.name().to_string(),
            source_url: work.source_url().to_string(),
            media_url: media_url.map(String::from),
            outcome: outcome.kind().to_string(),
            detail,
            bytes,
            duration_ms,
        }
    }
}

/// Append-only JSONL ledger with automatic rotation.
pub struct TransferLedger {
    file: File,
    path: PathBuf,
    /// Approximate current size (may drift slightly; re-checked on rotation).
    current_size: u64,
}

impl TransferLedger {
    /// Open or create the ledger file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open transfer ledger: {}", path.display()))?;

        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            file,
            path: path.to_path_buf(),
            current_size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record.
    pub fn record(&mut self, record: &TransferRecord) -> Result<()> {
        if self.current_size >= MAX_LOG_SIZE {
            self.rotate()?;
        }

        let json = serde_json::to_string(record)?;
        writeln!(self.file, "{json}")?;
        self.current_size += json.len() as u64 + 1;
        Ok(())
    }

    /// Rotate files: transfers.jsonl → transfers.jsonl.1, .1 → .2, etc.
    fn rotate(&mut self) -> Result<()> {
        self.file.flush()?;

        let oldest = rotation_path(&self.path, MAX_ROTATIONS);
        if oldest.exists() {
            let _ = std::fs::remove_file(&oldest);
        }

        for i in (1..MAX_ROTATIONS).rev() {
            let from = rotation_path(&self.path, i);
            let to = rotation_path(&self.path, i + 1);
            if from.exists() {
                let _ = std::fs::rename(&from, &to);
            }
        }

        let _ = std::fs::rename(&self.path, rotation_path(&self.path, 1));

        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| "failed to reopen transfer ledger after rotation")?;
        self.current_size = 0;

        Ok(())
    }
}

/// Build path for a rotated file: `transfers.jsonl.1`, `transfers.jsonl.2`, etc.
fn rotation_path(base: &Path, index: u32) -> PathBuf {
    let name = format!(
        "{}.{index}",
        base.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("transfers.jsonl")
    );
    base.with_file_name(name)
}
