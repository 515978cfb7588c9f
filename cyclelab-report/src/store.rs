//! JSON persistence for pair sets.
//!
//! The on-disk format is a map of pair id to persisted pair, pretty-printed.
//! A missing store file reads as an empty set; a malformed one is an error
//! and never clobbers caller state.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use cyclelab_core::domain::{PairId, PersistedPair};
use cyclelab_core::merge::{self, MergeReport};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access pair store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed pair data in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type PairMap = BTreeMap<PairId, PersistedPair>;

/// Load a pair set from disk. A file that does not exist yet is an empty
/// set, not an error.
pub fn load_pairs(path: &Path) -> Result<PairMap, StoreError> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PairMap::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&json).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a pair set to disk as pretty JSON.
pub fn save_pairs(path: &Path, pairs: &PairMap) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(pairs).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge an incoming pair set into the store file: load, merge with eviction
/// of conflicting existing pairs, save, and report.
///
/// If the load fails the file is left exactly as it was.
pub fn merge_into_file(path: &Path, incoming: PairMap) -> Result<MergeReport, StoreError> {
    let existing = load_pairs(path)?;
    let outcome = merge::merge(existing, incoming);
    save_pairs(path, &outcome.pairs)?;
    info!(
        path = %path.display(),
        added = outcome.report.added,
        evicted = outcome.report.evicted,
        total = outcome.report.final_total,
        "merged pair set into store"
    );
    Ok(outcome.report)
}
