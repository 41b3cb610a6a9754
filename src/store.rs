use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use thiserror::Error;

use crate::consts::DATE_FORMAT;
use crate::model::{EntryPatch, NewEntry, VocabularyEntry};
use crate::schema::{Schema, COL_MEANING, COL_WORD};
use crate::workbook::{TableBackend, XlsxWorkbook};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Word not found: {0}")]
    NotFound(String),

    #[error("Search query must not be empty")]
    EmptyQuery,

    #[error("{0} is not supported by the basic schema")]
    Unsupported(&'static str),

    #[error("Another entry already uses the word: {}", .0.word)]
    WordTaken(Box<VocabularyEntry>),

    #[error("Workbook has no sheets")]
    NoSheet,

    #[error("Failed to read workbook: {0}")]
    Read(#[from] calamine::XlsxError),

    #[error("Failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("Workbook I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of an append
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    Inserted(VocabularyEntry),
    /// Nothing was written. Carries the row that already holds the word.
    Duplicate(VocabularyEntry),
}

/// Matches found by a search, in table order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults {
    pub entries: Vec<VocabularyEntry>,
    pub count: usize,
}

/// Row CRUD over a whole-table backend.
///
/// Every operation reloads the full table and every mutation writes it back
/// in full. Operations on one store are serialized so concurrent requests
/// cannot overwrite each other's changes.
pub struct VocabularyStore<B: TableBackend = XlsxWorkbook> {
    backend: B,
    lock: Mutex<()>,
}

impl VocabularyStore<XlsxWorkbook> {
    /// Open (creating if absent) the workbook at `path`
    pub fn open_workbook(
        path: impl Into<std::path::PathBuf>,
        schema: Schema,
    ) -> Result<Self, StoreError> {
        Self::open(XlsxWorkbook::new(path, schema))
    }
}

impl<B: TableBackend> VocabularyStore<B> {
    pub fn open(backend: B) -> Result<Self, StoreError> {
        if backend.initialize()? {
            tracing::info!(schema = %backend.schema(), "created empty vocabulary table");
        }
        Ok(Self {
            backend,
            lock: Mutex::new(()),
        })
    }

    pub fn schema(&self) -> Schema {
        self.backend.schema()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // The guarded value is (), so a poisoned lock carries no broken state
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn entry(&self, row: &[String]) -> VocabularyEntry {
        VocabularyEntry::from_row(row, self.schema())
    }

    fn require_edits(&self, operation: &'static str) -> Result<(), StoreError> {
        if self.schema().supports_edits() {
            Ok(())
        } else {
            Err(StoreError::Unsupported(operation))
        }
    }

    /// Append a new entry dated today. With duplicate detection on, an
    /// existing word (any case) is returned instead of written.
    pub fn append(&self, entry: NewEntry) -> Result<AppendOutcome, StoreError> {
        let _guard = self.guard();
        let (outcome, _) = self.append_locked(entry)?;
        Ok(outcome)
    }

    /// Append, then list the newest `count` entries from the table just
    /// written, under one lock. The list is empty when the word was a duplicate.
    pub fn append_with_recent(
        &self,
        entry: NewEntry,
        count: usize,
    ) -> Result<(AppendOutcome, Vec<VocabularyEntry>), StoreError> {
        let _guard = self.guard();
        let (outcome, rows) = self.append_locked(entry)?;
        let recent = match outcome {
            AppendOutcome::Inserted(_) => rows
                .iter()
                .rev()
                .take(count)
                .map(|row| self.entry(row))
                .collect(),
            AppendOutcome::Duplicate(_) => Vec::new(),
        };
        Ok((outcome, recent))
    }

    /// Caller holds the guard. Returns the table as it stands afterwards.
    fn append_locked(
        &self,
        entry: NewEntry,
    ) -> Result<(AppendOutcome, Vec<Vec<String>>), StoreError> {
        let mut rows = self.backend.load()?;

        if self.schema().rejects_duplicates() {
            if let Some(existing) = find_word(&rows, &entry.word) {
                tracing::warn!(word = %entry.word, "duplicate word rejected");
                let duplicate = self.entry(&rows[existing]);
                return Ok((AppendOutcome::Duplicate(duplicate), rows));
            }
        }

        let row = entry.into_row(self.schema(), &today());
        let stored = self.entry(&row);
        rows.push(row);
        self.backend.save(&rows)?;

        tracing::info!(word = %stored.word, total = rows.len(), "vocabulary saved");
        Ok((AppendOutcome::Inserted(stored), rows))
    }

    /// Case-insensitive substring match on word and meaning
    pub fn search(&self, query: &str) -> Result<SearchResults, StoreError> {
        if query.is_empty() {
            return Err(StoreError::EmptyQuery);
        }

        let _guard = self.guard();
        let needle = query.to_lowercase();
        let entries: Vec<VocabularyEntry> = self
            .backend
            .load()?
            .iter()
            .filter(|row| {
                row[COL_WORD].to_lowercase().contains(&needle)
                    || row[COL_MEANING].to_lowercase().contains(&needle)
            })
            .map(|row| self.entry(row))
            .collect();

        Ok(SearchResults {
            count: entries.len(),
            entries,
        })
    }

    /// Every entry in table order
    pub fn list_all(&self) -> Result<Vec<VocabularyEntry>, StoreError> {
        let _guard = self.guard();
        let rows = self.backend.load()?;
        Ok(rows.iter().map(|row| self.entry(row)).collect())
    }

    /// The last `count` entries, newest first. Asking for more than exist
    /// returns all of them.
    pub fn list_recent(&self, count: usize) -> Result<Vec<VocabularyEntry>, StoreError> {
        let _guard = self.guard();
        let rows = self.backend.load()?;
        Ok(rows
            .iter()
            .rev()
            .take(count)
            .map(|row| self.entry(row))
            .collect())
    }

    /// Apply a partial update to the first row whose word matches (any case)
    pub fn update(&self, word: &str, patch: &EntryPatch) -> Result<VocabularyEntry, StoreError> {
        self.require_edits("update")?;

        let _guard = self.guard();
        let mut rows = self.backend.load()?;
        let index = find_word(&rows, word).ok_or_else(|| StoreError::NotFound(word.to_string()))?;

        if let Some(new_word) = patch.new_word() {
            let clash = rows.iter().enumerate().find(|(i, row)| {
                *i != index && row[COL_WORD].to_lowercase() == new_word.to_lowercase()
            });
            if let Some((_, row)) = clash {
                return Err(StoreError::WordTaken(Box::new(self.entry(row))));
            }
        }

        patch.apply(&mut rows[index], self.schema());
        let updated = self.entry(&rows[index]);
        self.backend.save(&rows)?;

        tracing::info!(word = %word, updated = %updated.word, "vocabulary updated");
        Ok(updated)
    }

    /// Remove the first row whose word matches (any case)
    pub fn delete(&self, word: &str) -> Result<VocabularyEntry, StoreError> {
        self.require_edits("delete")?;

        let _guard = self.guard();
        let mut rows = self.backend.load()?;
        let index = find_word(&rows, word).ok_or_else(|| StoreError::NotFound(word.to_string()))?;

        let removed = rows.remove(index);
        self.backend.save(&rows)?;

        tracing::info!(word = %word, remaining = rows.len(), "vocabulary deleted");
        Ok(self.entry(&removed))
    }
}

/// Today's date (UTC) in YYYY-MM-DD format
pub fn today() -> String {
    Utc::now().format(DATE_FORMAT).to_string()
}

/// Index of the first row whose word equals `word`, ignoring case
fn find_word(rows: &[Vec<String>], word: &str) -> Option<usize> {
    let target = word.to_lowercase();
    rows.iter().position(|row| {
        let stored = &row[COL_WORD];
        !stored.is_empty() && stored.to_lowercase() == target
    })
}
