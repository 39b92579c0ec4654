//! Edit scripts: recorded cell edits applied to a session
//!
//! This module provides:
//! - The edit operations a user can make on the comparison matrix
//! - An edit script format (JSON) for storing edits per bundle
//! - Application of a script to a loaded session

use crate::error::{Error, Result};
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// A single edit on the comparison matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    /// A value cell was changed
    Set {
        /// File name (or path) of the edited column
        file: String,
        key: String,
        value: String,
    },
    /// A key cell was changed; applies to every file
    Rename {
        old_key: String,
        new_key: String,
        /// Which row of a repeated key (0 = first)
        #[serde(default)]
        occurrence: usize,
    },
    /// A value was deleted in one file
    Delete {
        file: String,
        key: String,
        /// Specific value to delete; the first row of the key if absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    /// A whole matrix row was deleted: the `occurrence`-th row of the key
    /// in every file
    DeleteRow {
        key: String,
        #[serde(default)]
        occurrence: usize,
    },
}

impl Edit {
    /// Create a value edit
    pub fn set(file: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Edit::Set {
            file: file.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a rename of the first row of a key
    pub fn rename(old_key: impl Into<String>, new_key: impl Into<String>) -> Self {
        Edit::Rename {
            old_key: old_key.into(),
            new_key: new_key.into(),
            occurrence: 0,
        }
    }

    /// Create a deletion of the first row of a key in one file
    pub fn delete(file: impl Into<String>, key: impl Into<String>) -> Self {
        Edit::Delete {
            file: file.into(),
            key: key.into(),
            value: None,
        }
    }

    /// Create a deletion of the first matrix row of a key
    pub fn delete_row(key: impl Into<String>) -> Self {
        Edit::DeleteRow {
            key: key.into(),
            occurrence: 0,
        }
    }

    /// Apply this edit to a session
    fn apply(&self, session: &mut Session) -> Result<()> {
        match self {
            Edit::Set { file, key, value } => {
                let column = session.column_of(file)?;
                session.set_value(column, key, value)
            }
            Edit::Rename {
                old_key,
                new_key,
                occurrence,
            } => match session.rename_key(old_key, new_key, *occurrence)? {
                0 => Err(Error::EditNotApplied(format!("key '{}' not found", old_key))),
                _ => Ok(()),
            },
            Edit::Delete { file, key, value } => {
                let column = session.column_of(file)?;
                if session.delete_value(column, key, value.as_deref())? {
                    Ok(())
                } else {
                    Err(Error::EditNotApplied(format!(
                        "nothing to delete for key '{}' in '{}'",
                        key, file
                    )))
                }
            }
            Edit::DeleteRow { key, occurrence } => match session.delete_row(key, *occurrence) {
                0 => Err(Error::EditNotApplied(format!(
                    "key '{}' has no row {}",
                    key, occurrence
                ))),
                _ => Ok(()),
            },
        }
    }
}

/// An edit script containing multiple edits for a bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditScript {
    /// Bundle name this script applies to
    pub bundle: String,
    /// List of edits, applied in order
    pub edits: Vec<Edit>,
}

impl EditScript {
    /// Create a new empty edit script
    pub fn new(bundle: impl Into<String>) -> Self {
        Self {
            bundle: bundle.into(),
            edits: Vec::new(),
        }
    }

    /// Add an edit to the script
    pub fn add_edit(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    /// Load an edit script from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the edit script to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Result of applying an edit script
#[derive(Debug, Clone, Default)]
pub struct ApplyResult {
    /// Number of edits applied
    pub edits_applied: usize,
    /// Edits that failed (file not loaded, key not found, invalid key or value)
    pub failed_edits: Vec<(Edit, String)>,
}

/// Apply every edit of a script to a session.
///
/// A failing edit is recorded and does not stop the remaining edits.
pub fn apply_edits(session: &mut Session, script: &EditScript) -> ApplyResult {
    let mut result = ApplyResult::default();

    for edit in &script.edits {
        match edit.apply(session) {
            Ok(()) => result.edits_applied += 1,
            Err(e) => {
                debug!(?edit, "edit not applied: {}", e);
                result.failed_edits.push((edit.clone(), e.to_string()));
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::PropertySet;
    use std::path::PathBuf;

    fn session() -> Session {
        let mut session = Session::new();
        session.add(
            PathBuf::from("en.properties"),
            PropertySet::from_lines(["hello=Hello", "bye=Bye"], Some("en.properties".to_string())),
        );
        session.add(
            PathBuf::from("de.properties"),
            PropertySet::from_lines(["hello=Hallo"], Some("de.properties".to_string())),
        );
        session
    }

    #[test]
    fn test_edit_script_serialization() {
        let mut script = EditScript::new("messages");
        script.add_edit(Edit::set("de.properties", "bye", "Tschuess"));
        script.add_edit(Edit::rename("hello", "greeting"));
        script.add_edit(Edit::delete("en.properties", "bye"));
        script.add_edit(Edit::delete_row("bye"));

        let json = serde_json::to_string_pretty(&script).unwrap();
        let loaded: EditScript = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, script);
    }

    #[test]
    fn test_edit_json_format() {
        let json = r#"{
            "bundle": "messages",
            "edits": [
                {"op": "set", "file": "de.properties", "key": "bye", "value": "Tschuess"},
                {"op": "rename", "old_key": "hello", "new_key": "greeting"},
                {"op": "delete", "file": "en.properties", "key": "bye", "value": "Bye"},
                {"op": "delete_row", "key": "hello", "occurrence": 1}
            ]
        }"#;
        let script: EditScript = serde_json::from_str(json).unwrap();
        assert_eq!(script.edits.len(), 4);
        assert_eq!(script.edits[1], Edit::rename("hello", "greeting"));
        assert_eq!(
            script.edits[2],
            Edit::Delete {
                file: "en.properties".to_string(),
                key: "bye".to_string(),
                value: Some("Bye".to_string()),
            }
        );
        assert_eq!(
            script.edits[3],
            Edit::DeleteRow {
                key: "hello".to_string(),
                occurrence: 1,
            }
        );
    }

    #[test]
    fn test_apply_edits() {
        let mut session = session();
        let mut script = EditScript::new("messages");
        script.add_edit(Edit::set("de.properties", "bye", "Tschuess"));
        script.add_edit(Edit::rename("hello", "greeting"));

        let result = apply_edits(&mut session, &script);
        assert_eq!(result.edits_applied, 2);
        assert!(result.failed_edits.is_empty());

        let de = &session.files()[session.column_of("de.properties").unwrap()].properties;
        assert_eq!(de.values_for("bye"), vec!["Tschuess"]);
        assert_eq!(de.values_for("greeting"), vec!["Hallo"]);
    }

    #[test]
    fn test_failed_edits_do_not_stop_script() {
        let mut session = session();
        let mut script = EditScript::new("messages");
        script.add_edit(Edit::set("fr.properties", "bye", "Au revoir"));
        script.add_edit(Edit::rename("missing", "other"));
        script.add_edit(Edit::set("en.properties", "bad key", "x"));
        script.add_edit(Edit::set("en.properties", "bye", "two\nlines"));
        script.add_edit(Edit::delete_row("nothing"));
        script.add_edit(Edit::delete("de.properties", "bye"));
        script.add_edit(Edit::delete_row("bye"));

        let result = apply_edits(&mut session, &script);
        assert_eq!(result.edits_applied, 1);
        assert_eq!(result.failed_edits.len(), 6);
        assert!(result.failed_edits[0].1.contains("fr.properties"));
    }
}
