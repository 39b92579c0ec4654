//! The set of property files loaded for comparison and editing
//!
//! A [`Session`] owns one [`PropertySet`] per loaded file. It turns the edits
//! a user makes on the comparison matrix into property set mutations, and
//! writes back only the files that changed.

use crate::compare::{compare, ComparisonMatrix};
use crate::error::{Error, Result};
use crate::properties::PropertySet;
use crate::row::is_valid_key;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A property file together with where it came from
#[derive(Debug, Clone)]
pub struct LoadedFile {
    /// Path the file was read from and is saved to
    pub path: PathBuf,
    /// Parsed content
    pub properties: PropertySet,
}

impl LoadedFile {
    /// File name used to address this file in edits
    pub fn file_name(&self) -> String {
        match self.properties.name() {
            Some(name) => name.to_string(),
            None => self.path.display().to_string(),
        }
    }

}

/// Files loaded side by side, in name order
#[derive(Debug, Clone, Default)]
pub struct Session {
    files: Vec<LoadedFile>,
}

/// A file written by [`Session::save_changed`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFile {
    pub path: PathBuf,
    /// Content of the last committed state
    pub before: String,
    /// Content that was written
    pub after: String,
}

/// Result of saving changed files
#[derive(Debug, Clone, Default)]
pub struct SaveReport {
    /// Files that were written and committed
    pub saved: Vec<SavedFile>,
    /// Files that could not be written (path, error message); they keep
    /// their unsaved changes
    pub errors: Vec<(PathBuf, String)>,
}

impl SaveReport {
    /// Paths of the files that were written
    pub fn files_written(&self) -> impl Iterator<Item = &Path> + '_ {
        self.saved.iter().map(|f| f.path.as_path())
    }
}

impl Session {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse the given files
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut session = Self::new();
        for path in paths {
            session.load_file(path)?;
        }
        Ok(session)
    }

    /// Read and parse one file and add it to the session
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = read_text(path)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let properties = PropertySet::parse_str(&content, Some(name));

        for (pos, row) in properties.errors() {
            warn!(
                file = %path.display(),
                line = pos + 1,
                "unparsable line: {}",
                row.original_text().unwrap_or_default()
            );
        }
        debug!(file = %path.display(), rows = properties.len(), "loaded property file");

        self.add(path.to_path_buf(), properties);
        Ok(())
    }

    /// Add an already parsed property set
    pub fn add(&mut self, path: PathBuf, properties: PropertySet) {
        self.files.push(LoadedFile { path, properties });
        self.files.sort_by_key(LoadedFile::file_name);
    }

    pub fn files(&self) -> &[LoadedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Column (position among the loaded files) of a file, by path or by
    /// file name. A file name shared by several loaded files is ambiguous.
    pub fn column_of(&self, name: &str) -> Result<usize> {
        if let Some(column) = self.files.iter().position(|f| f.path == Path::new(name)) {
            return Ok(column);
        }

        let mut matching = self
            .files
            .iter()
            .enumerate()
            .filter(|(_, f)| f.properties.name() == Some(name))
            .map(|(column, _)| column);
        match (matching.next(), matching.next()) {
            (Some(column), None) => Ok(column),
            (Some(_), Some(_)) => Err(Error::AmbiguousFile(name.to_string())),
            (None, _) => Err(Error::FileNotLoaded(name.to_string())),
        }
    }

    fn file_mut(&mut self, column: usize) -> Result<&mut LoadedFile> {
        self.files
            .get_mut(column)
            .ok_or_else(|| Error::FileNotLoaded(format!("column {}", column)))
    }

    /// Compare all loaded files
    pub fn compare(&self) -> ComparisonMatrix {
        compare(self.files.iter().map(|f| &f.properties))
    }

    /// A value cell was edited
    pub fn set_value(&mut self, column: usize, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        validate_value(value)?;
        self.file_mut(column)?.properties.set(key, value, None);
        Ok(())
    }

    /// A key cell was edited: rename the `occurrence`-th row of `old_key`
    /// in every file that has one. Returns the number of files changed.
    pub fn rename_key(&mut self, old_key: &str, new_key: &str, occurrence: usize) -> Result<usize> {
        validate_key(new_key)?;
        if old_key == new_key {
            return Ok(0);
        }

        let mut renamed = 0;
        for file in &mut self.files {
            let value = file
                .properties
                .rows_for(old_key)
                .get(occurrence)
                .and_then(|row| row.value())
                .map(str::to_string);
            if let Some(value) = value {
                file.properties.change_key(new_key, old_key, &value);
                renamed += 1;
            }
        }
        Ok(renamed)
    }

    /// Delete a value in one file: the row with `value`, or the first row
    /// of `key`. Returns whether a row was deleted.
    pub fn delete_value(&mut self, column: usize, key: &str, value: Option<&str>) -> Result<bool> {
        let deleted = self
            .file_mut(column)?
            .properties
            .delete_value(key, value, false)
            .is_some();
        Ok(deleted)
    }

    /// Delete one row of the comparison matrix: in every file, the
    /// `occurrence`-th row of `key`, whatever its value there. Returns the
    /// number of files changed.
    pub fn delete_row(&mut self, key: &str, occurrence: usize) -> usize {
        let mut deleted = 0;
        for file in &mut self.files {
            let value = file
                .properties
                .rows_for(key)
                .get(occurrence)
                .and_then(|row| row.value())
                .map(str::to_string);
            if let Some(value) = value {
                if file.properties.delete_value(key, Some(&value), false).is_some() {
                    deleted += 1;
                }
            }
        }
        deleted
    }

    /// Remove unparsable lines and sort every file by key
    pub fn normalize(&mut self) {
        for file in &mut self.files {
            file.properties.strip_errors();
            file.properties.sort();
        }
    }

    /// Whether any file has unsaved changes
    pub fn has_unsaved_changes(&self) -> bool {
        self.files.iter().any(|f| f.properties.has_unsaved_changes())
    }

    /// Files with unsaved changes
    pub fn changed_files(&self) -> impl Iterator<Item = &LoadedFile> + '_ {
        self.files.iter().filter(|f| f.properties.has_unsaved_changes())
    }

    /// Discard all unsaved changes
    pub fn restore_all(&mut self) {
        for file in &mut self.files {
            file.properties.restore();
        }
    }

    /// Write every file with unsaved changes back to its path.
    ///
    /// Before writing, invalid lines are stripped and the file is sorted.
    /// A file is committed only after its write succeeded. The report keeps
    /// the committed content each saved file had before.
    pub fn save_changed(&mut self) -> SaveReport {
        let mut report = SaveReport::default();

        for file in self
            .files
            .iter_mut()
            .filter(|f| f.properties.has_unsaved_changes())
        {
            let before = file
                .properties
                .previous()
                .map(PropertySet::serialize)
                .unwrap_or_default();
            file.properties.strip_errors();
            file.properties.sort();
            let after = file.properties.serialize();

            match fs::write(&file.path, &after) {
                Ok(()) => {
                    file.properties.commit();
                    info!(file = %file.path.display(), "saved");
                    report.saved.push(SavedFile {
                        path: file.path.clone(),
                        before,
                        after,
                    });
                }
                Err(e) => {
                    let error = Error::FileWrite {
                        path: file.path.clone(),
                        source: e,
                    };
                    warn!("{}", error);
                    report.errors.push((file.path.clone(), error.to_string()));
                }
            }
        }

        report
    }
}

/// Read a property file as text. Content that is not UTF-8 is read as
/// ISO-8859-1.
pub(crate) fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!(file = %path.display(), "not valid UTF-8, reading as ISO-8859-1");
            Ok(e.into_bytes().into_iter().map(char::from).collect())
        }
    }
}

fn validate_value(value: &str) -> Result<()> {
    if value.contains(['\n', '\r']) {
        Err(Error::InvalidValue(value.to_string()))
    } else {
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<()> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(Error::InvalidKey(key.to_string()))
    }
}
