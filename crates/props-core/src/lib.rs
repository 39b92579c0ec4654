//! props-core: Core library for comparing and editing `.properties` bundles
//!
//! This library provides functionality to:
//! - Parse property files line by line, keeping comments, blank lines and
//!   unparsable lines
//! - Edit values and keys while tracking unsaved changes, with undo
//! - Compare several files of a bundle key by key
//! - Scan directories for bundles, apply edit scripts and save changed files
//! - Journal saves so they can be undone later

pub mod compare;
pub mod edit;
pub mod error;
pub mod journal;
pub mod properties;
pub mod row;
pub mod scanner;
pub mod session;

pub use compare::{compare, Cell, ComparisonMatrix, ComparisonRow};
pub use edit::{apply_edits, ApplyResult, Edit, EditScript};
pub use error::{Error, Result};
pub use journal::{Journal, JournalEntry, UndoReport};
pub use properties::PropertySet;
pub use row::{is_valid_key, split_lines, Row, RowId, RowKind};
pub use scanner::{scan_directory, Bundle, BundleMember, ScanResult};
pub use session::{LoadedFile, SaveReport, SavedFile, Session};
