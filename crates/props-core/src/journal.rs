//! Save journal
//!
//! Saving commits a property set, after which [`PropertySet::restore`] can
//! no longer go back. The journal keeps, for every save, what each written
//! file held before and what was written, so the last save can be rolled
//! back from disk.
//!
//! [`PropertySet::restore`]: crate::properties::PropertySet::restore

use crate::error::{Error, Result};
use crate::session::{read_text, SaveReport, SavedFile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    /// What caused the save (command or bundle name)
    pub label: String,
    pub files: Vec<SavedFile>,
}

/// All recorded saves, oldest first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

/// Outcome of [`Journal::undo_last`]
#[derive(Debug, Clone, Default)]
pub struct UndoReport {
    pub label: String,
    /// Files written back to their earlier content
    pub restored: Vec<PathBuf>,
    /// Files left alone because they changed after the save
    pub conflicts: Vec<PathBuf>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a journal; a missing file is an empty journal
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| Error::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Record the files of a save. Returns `false` when nothing was saved.
    pub fn record(&mut self, label: impl Into<String>, report: &SaveReport) -> bool {
        if report.saved.is_empty() {
            return false;
        }
        self.entries.push(JournalEntry {
            timestamp: Utc::now(),
            label: label.into(),
            files: report.saved.clone(),
        });
        true
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&JournalEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Roll back the most recent save and drop it from the journal.
    ///
    /// A file is only written back if it still holds exactly what the save
    /// wrote. Returns `None` when the journal is empty.
    pub fn undo_last(&mut self) -> Result<Option<UndoReport>> {
        let Some(entry) = self.entries.pop() else {
            return Ok(None);
        };

        let mut report = UndoReport {
            label: entry.label,
            ..UndoReport::default()
        };
        for file in entry.files {
            let unchanged = read_text(&file.path).is_ok_and(|current| current == file.after);
            if !unchanged {
                warn!(file = %file.path.display(), "changed since it was saved, not restored");
                report.conflicts.push(file.path);
                continue;
            }

            fs::write(&file.path, &file.before).map_err(|e| Error::FileWrite {
                path: file.path.clone(),
                source: e,
            })?;
            info!(file = %file.path.display(), "restored");
            report.restored.push(file.path);
        }

        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    fn saved_session(dir: &Path) -> (PathBuf, SaveReport) {
        let path = dir.join("messages_de.properties");
        fs::write(&path, "# Nachrichten\n\nhello=Hallo\n").unwrap();

        let mut session = Session::load(&[&path]).unwrap();
        session.set_value(0, "bye", "Tschuess").unwrap();
        let report = session.save_changed();
        assert_eq!(report.saved.len(), 1);
        (path, report)
    }

    #[test]
    fn test_record_skips_empty_saves() {
        let mut journal = Journal::new();
        assert!(!journal.record("set", &SaveReport::default()));
        assert!(journal.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let (_path, report) = saved_session(dir.path());
        let journal_path = dir.path().join("journal.json");

        // Missing file loads as empty
        let mut journal = Journal::load(&journal_path).unwrap();
        assert!(journal.is_empty());

        assert!(journal.record("set", &report));
        journal.save(&journal_path).unwrap();

        let loaded = Journal::load(&journal_path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.last().unwrap().label, "set");
        assert_eq!(loaded.entries(), journal.entries());
    }

    #[test]
    fn test_undo_last_restores_committed_content() {
        let dir = tempfile::tempdir().unwrap();
        let (path, report) = saved_session(dir.path());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "# Nachrichten\n\nbye=Tschuess\nhello=Hallo"
        );

        let mut journal = Journal::new();
        journal.record("set", &report);

        let undo = journal.undo_last().unwrap().unwrap();
        assert_eq!(undo.restored, vec![path.clone()]);
        assert!(undo.conflicts.is_empty());
        assert!(journal.is_empty());

        let session = Session::load(&[&path]).unwrap();
        let properties = &session.files()[0].properties;
        assert!(properties.rows_for("bye").is_empty());
        assert_eq!(properties.values_for("hello"), vec!["Hallo"]);

        assert!(journal.undo_last().unwrap().is_none());
    }

    #[test]
    fn test_undo_leaves_files_changed_after_save() {
        let dir = tempfile::tempdir().unwrap();
        let (path, report) = saved_session(dir.path());
        fs::write(&path, "hello=Servus\n").unwrap();

        let mut journal = Journal::new();
        journal.record("set", &report);

        let undo = journal.undo_last().unwrap().unwrap();
        assert!(undo.restored.is_empty());
        assert_eq!(undo.conflicts, vec![path.clone()]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello=Servus\n");
    }
}
