//! # Pairing Module
//!
//! Discovers document pairs: files with the same name in the "from"
//! and "to" directories.
//!
//! ## Rules
//! - Only direct children of each directory are listed (no recursion)
//! - Names must pass the [`DocumentFilter`] (default suffix `.pdf`)
//! - A pair exists iff the exact same name is in both listings
//! - Different listing sizes produce a warning, never an error
//! - Output follows the "from" listing order unless sorting is enabled
//!
//! ## Example
//! ```rust,ignore
//! let finder = PairFinder::new(DocumentFilter::default()).sorted(true);
//! let pairing = finder.find_pairs(Path::new("from"), Path::new("to"))?;
//! for pair in &pairing.pairs {
//!     println!("{}", pair.id);
//! }
//! ```

mod filter;

pub use filter::DocumentFilter;

use crate::error::ScanError;
use crate::events::{null_sender, Event, EventSender, PairingEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Two documents sharing a file name, compared as one unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPair {
    /// Shared file name
    pub id: String,
    /// Document in the "from" directory
    pub path_from: PathBuf,
    /// Document in the "to" directory
    pub path_to: PathBuf,
}

/// Warning raised when the directories hold different numbers of documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountMismatch {
    pub from_count: usize,
    pub to_count: usize,
}

impl std::fmt::Display for CountMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Number of files differ: from has {}, to has {}",
            self.from_count, self.to_count
        )
    }
}

/// Result of pair discovery
#[derive(Debug, Clone)]
pub struct PairingResult {
    /// Pairs present in both directories
    pub pairs: Vec<DocumentPair>,
    /// Documents listed in the "from" directory
    pub from_count: usize,
    /// Documents listed in the "to" directory
    pub to_count: usize,
}

impl PairingResult {
    /// Warning for differing listing sizes, if any
    pub fn count_mismatch(&self) -> Option<CountMismatch> {
        (self.from_count != self.to_count).then_some(CountMismatch {
            from_count: self.from_count,
            to_count: self.to_count,
        })
    }
}

/// Finds document pairs across two directories
#[derive(Debug, Clone, Default)]
pub struct PairFinder {
    filter: DocumentFilter,
    sort: bool,
}

impl PairFinder {
    pub fn new(filter: DocumentFilter) -> Self {
        Self {
            filter,
            sort: false,
        }
    }

    /// Sort listings by name instead of using the platform listing order
    pub fn sorted(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    /// Find pairs without progress reporting
    pub fn find_pairs(&self, dir_from: &Path, dir_to: &Path) -> Result<PairingResult, ScanError> {
        self.find_pairs_with_events(dir_from, dir_to, &null_sender())
    }

    /// Find pairs, emitting pairing events (including the count warning)
    pub fn find_pairs_with_events(
        &self,
        dir_from: &Path,
        dir_to: &Path,
        events: &EventSender,
    ) -> Result<PairingResult, ScanError> {
        events.send(Event::Pairing(PairingEvent::Started {
            from: dir_from.to_path_buf(),
            to: dir_to.to_path_buf(),
        }));

        let from_names = self.list(dir_from)?;
        let to_names = self.list(dir_to)?;

        let to_set: HashSet<&str> = to_names.iter().map(String::as_str).collect();

        let pairs: Vec<DocumentPair> = from_names
            .iter()
            .filter(|name| to_set.contains(name.as_str()))
            .map(|name| DocumentPair {
                id: name.clone(),
                path_from: dir_from.join(name),
                path_to: dir_to.join(name),
            })
            .collect();

        let result = PairingResult {
            pairs,
            from_count: from_names.len(),
            to_count: to_names.len(),
        };

        if let Some(mismatch) = result.count_mismatch() {
            tracing::warn!(
                from = %dir_from.display(),
                to = %dir_to.display(),
                "{}",
                mismatch
            );
            events.send(Event::Pairing(PairingEvent::CountMismatch {
                from_count: mismatch.from_count,
                to_count: mismatch.to_count,
            }));
        }

        tracing::info!(pairs = result.pairs.len(), "pairing complete");
        events.send(Event::Pairing(PairingEvent::Completed {
            total_pairs: result.pairs.len(),
        }));

        Ok(result)
    }

    /// List matching file names directly inside `dir`
    fn list(&self, dir: &Path) -> Result<Vec<String>, ScanError> {
        if !dir.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: dir.to_path_buf(),
            });
        }

        let mut walker = WalkDir::new(dir).min_depth(1).max_depth(1);
        if self.sort {
            walker = walker.sort_by_file_name();
        }

        let mut names = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| ScanError::ReadDirectory {
                path: dir.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(name) = entry.file_name().to_str() else {
                tracing::debug!(path = %entry.path().display(), "skipping non UTF-8 file name");
                continue;
            };

            if self.filter.should_include(name) {
                names.push(name.to_string());
            }
        }

        Ok(names)
    }
}
