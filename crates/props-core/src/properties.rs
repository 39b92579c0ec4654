//! Property sets: one parsed `.properties` file with change tracking
//!
//! A [`PropertySet`] keeps every line of the source file in order, including
//! comments, blank lines and lines that could not be parsed. Next to the row
//! list it maintains an index from each key to the rows defining it, so that
//! duplicate keys keep their relative order.
//!
//! The first mutation after loading (or after [`PropertySet::commit`]) puts a
//! copy of the previous state aside. That copy is what
//! [`PropertySet::has_unsaved_changes`] reports on and what
//! [`PropertySet::restore`] goes back to.

use crate::row::{split_lines, Row, RowId, RowKind};
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::debug;

/// One property file
#[derive(Debug, Clone, Default)]
pub struct PropertySet {
    name: Option<String>,
    /// Rows in source order
    rows: Vec<Row>,
    /// Rows defining each key, in row order
    key_index: BTreeMap<String, Vec<RowId>>,
    /// State before the first uncommitted change
    previous: Option<Box<PropertySet>>,
    next_id: u64,
}

impl PropertySet {
    /// Create an empty property set
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    /// Parse a property set from raw lines, one row per line
    pub fn from_lines<I, S>(lines: I, name: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new(name);
        for line in lines {
            let row = set.make_row(RowKind::parse(line.as_ref()));
            set.rows.push(row);
        }
        set.key_index = build_key_index(&set.rows);
        set
    }

    /// Parse a property set from file content
    pub fn parse_str(text: &str, name: Option<String>) -> Self {
        Self::from_lines(split_lines(text), name)
    }

    fn make_row(&mut self, kind: RowKind) -> Row {
        let id = RowId(self.next_id);
        self.next_id += 1;
        Row::new(id, kind)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All distinct keys, in ascending order
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.key_index.keys().map(String::as_str)
    }

    /// All rows defining `key`, in file order
    pub fn rows_for(&self, key: &str) -> Vec<&Row> {
        self.key_index
            .get(key)
            .map(|ids| ids.iter().filter_map(|id| self.row_by_id(*id)).collect())
            .unwrap_or_default()
    }

    /// Values of all rows defining `key`, in file order
    pub fn values_for(&self, key: &str) -> Vec<&str> {
        self.rows_for(key).into_iter().filter_map(Row::value).collect()
    }

    /// The first row for `key` with the given value, or the first row for
    /// `key` at all when no value is given
    pub fn row_for(&self, key: &str, value: Option<&str>) -> Option<&Row> {
        self.rows_for(key)
            .into_iter()
            .find(|row| matches_value(row, value))
    }

    /// Position in [`rows`](Self::rows) of the first row matching `key`
    /// (and `value`, if given)
    pub fn index_of(&self, key: &str, value: Option<&str>) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.key() == Some(key) && matches_value(row, value))
    }

    /// Leading comment rows that belong to the file rather than to a key.
    ///
    /// The preamble is the run of non-empty comments at the top of the file.
    /// If that run is directly followed by a key/value row it describes that
    /// key, and the preamble is empty.
    pub fn preamble(&self) -> &[Row] {
        &self.rows[..self.preamble_len()]
    }

    fn preamble_len(&self) -> usize {
        let end = self
            .rows
            .iter()
            .position(|row| !row.has_comment_text())
            .unwrap_or(self.rows.len());
        match self.rows.get(end) {
            Some(row) if row.is_property() => 0,
            _ => end,
        }
    }

    /// Comment rows directly above a key/value row
    pub fn comment_rows_for(&self, row: &Row) -> Vec<&Row> {
        if !row.is_property() {
            return Vec::new();
        }
        match self.position_of(row.id()) {
            Some(pos) => self.rows[self.comment_span(pos)].iter().collect(),
            None => Vec::new(),
        }
    }

    /// Positions of the comment and blank rows owned by the key/value row at
    /// `pos`. Rows of the preamble, and the blank line separating it from
    /// the first key, are never owned by a key.
    fn comment_span(&self, pos: usize) -> Range<usize> {
        let mut start = pos;
        while start > 0 && self.rows[start - 1].comment().is_some() {
            start -= 1;
        }
        if start == 0 && pos > 0 {
            start = self.preamble_len().min(pos);
            if start < pos && self.rows[start].is_blank() {
                start += 1;
            }
        }
        start..pos
    }

    /// Rows that could not be parsed, with their positions
    pub fn errors(&self) -> impl Iterator<Item = (usize, &Row)> + '_ {
        self.rows.iter().enumerate().filter(|(_, row)| row.is_error())
    }

    /// Render the rows back to file content, one line per row.
    ///
    /// Invalid rows are written with their original text; callers saving a
    /// file run [`strip_errors`](Self::strip_errors) first.
    pub fn serialize(&self) -> String {
        self.rows
            .iter()
            .map(Row::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn position_of(&self, id: RowId) -> Option<usize> {
        self.rows.iter().position(|row| row.id() == id)
    }

    fn row_by_id(&self, id: RowId) -> Option<&Row> {
        self.rows.iter().find(|row| row.id() == id)
    }

    // ------------------------------------------------------------------
    // Change tracking
    // ------------------------------------------------------------------

    /// Put the current state aside, unless a change is already pending
    fn mark_changed(&mut self) {
        if self.previous.is_none() {
            debug!(name = ?self.name, rows = self.rows.len(), "taking snapshot before first change");
            self.previous = Some(Box::new(self.snapshot()));
        }
    }

    fn snapshot(&self) -> PropertySet {
        let rows = self.rows.clone();
        PropertySet {
            name: self.name.clone(),
            key_index: build_key_index(&rows),
            rows,
            previous: None,
            next_id: self.next_id,
        }
    }

    /// Whether the set was changed since it was loaded or last committed
    pub fn has_unsaved_changes(&self) -> bool {
        self.previous.is_some()
    }

    /// The state before the first uncommitted change
    pub fn previous(&self) -> Option<&PropertySet> {
        self.previous.as_deref()
    }

    /// Accept the current state as saved
    pub fn commit(&mut self) {
        self.previous = None;
    }

    /// Undo every change since the last commit
    pub fn restore(&mut self) {
        if let Some(previous) = self.previous.take() {
            let previous = *previous;
            self.rows = previous.rows;
            self.key_index = previous.key_index;
        }
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Set the value of `key`.
    ///
    /// An existing key gets its first row overwritten in place; later rows
    /// for the same key are left alone. A new key is inserted at `index`,
    /// or appended when `index` is `None`.
    pub fn set(&mut self, key: &str, value: &str, index: Option<usize>) {
        self.mark_changed();
        let first = self
            .key_index
            .get(key)
            .and_then(|ids| ids.first().copied())
            .and_then(|id| self.position_of(id));
        match first {
            Some(pos) => self.rows[pos].set_value(value),
            None => {
                self.add_new_property(key, value, index);
            }
        }
    }

    /// Insert a new key/value row at `index` (clamped), or append it
    pub fn add_new_property(&mut self, key: &str, value: &str, index: Option<usize>) -> RowId {
        self.mark_changed();
        let row = self.make_row(RowKind::Property {
            key: key.to_string(),
            value: value.to_string(),
        });
        let id = row.id();
        let pos = index.map_or(self.rows.len(), |i| i.min(self.rows.len()));

        // Keep the index in row order when inserting above an existing row
        let slot = self.rows[..pos]
            .iter()
            .filter(|row| row.key() == Some(key))
            .count();
        self.rows.insert(pos, row);
        self.key_index
            .entry(key.to_string())
            .or_default()
            .insert(slot, id);
        id
    }

    /// Delete the row found by [`row_for`](Self::row_for).
    ///
    /// When it was the last row for its key, the comment rows above it go
    /// too, unless `preserve_comments` is set. Returns the position the row
    /// had after any comments were removed, or `None` if nothing matched.
    pub fn delete_value(
        &mut self,
        key: &str,
        value: Option<&str>,
        preserve_comments: bool,
    ) -> Option<usize> {
        let target = self.row_for(key, value)?.id();
        self.mark_changed();

        let sole = self.key_index.get(key).is_some_and(|ids| ids.len() == 1);
        if sole {
            if !preserve_comments {
                if let Some(pos) = self.position_of(target) {
                    let span = self.comment_span(pos);
                    self.rows.drain(span);
                }
            }
            self.key_index.remove(key);
        } else if let Some(ids) = self.key_index.get_mut(key) {
            ids.retain(|id| *id != target);
        }

        let pos = self.position_of(target)?;
        self.rows.remove(pos);
        Some(pos)
    }

    /// Rename one row from `old_key` to `new_key`, keeping its position.
    ///
    /// Comment rows above the old row stay where they are and are not moved
    /// along with the renamed row.
    pub fn change_key(&mut self, new_key: &str, old_key: &str, old_value: &str) {
        let position = self.delete_value(old_key, Some(old_value), true);
        self.set(new_key, old_value, position);
    }

    /// Reorder the file by key.
    ///
    /// Result: the preamble, one blank separator, then every key in
    /// ascending order with each of its rows preceded by its comments.
    /// Comments that are not attached to any key are dropped.
    pub fn sort(&mut self) {
        self.mark_changed();

        let preamble_len = self.preamble_len();
        let mut keyed = Vec::new();
        for ids in self.key_index.values() {
            for id in ids {
                if let Some(pos) = self.position_of(*id) {
                    keyed.extend(self.comment_span(pos));
                    keyed.push(pos);
                }
            }
        }

        let mut slots: Vec<Option<Row>> = std::mem::take(&mut self.rows)
            .into_iter()
            .map(Some)
            .collect();
        let mut rows: Vec<Row> = slots[..preamble_len]
            .iter_mut()
            .filter_map(Option::take)
            .collect();
        rows.push(self.make_row(RowKind::Blank));
        rows.extend(keyed.into_iter().filter_map(|pos| slots[pos].take()));

        self.key_index = build_key_index(&rows);
        self.rows = rows;
    }

    /// Remove every row that could not be parsed.
    ///
    /// An invalid row that ended the preamble is replaced by a blank row so
    /// the preamble stays separated from the first key.
    pub fn strip_errors(&mut self) {
        let Some(first) = self.rows.iter().position(Row::is_error) else {
            return;
        };
        self.mark_changed();
        if first > 0 && self.preamble_len() == first {
            let separator = self.make_row(RowKind::Blank);
            self.rows[first] = separator;
        }
        self.rows.retain(|row| !row.is_error());
    }
}

fn matches_value(row: &Row, value: Option<&str>) -> bool {
    value.map_or(true, |v| row.value() == Some(v))
}

/// Build a key index from rows in order
fn build_key_index(rows: &[Row]) -> BTreeMap<String, Vec<RowId>> {
    let mut index: BTreeMap<String, Vec<RowId>> = BTreeMap::new();
    for row in rows {
        if let Some(key) = row.key() {
            index.entry(key.to_string()).or_default().push(row.id());
        }
    }
    index
}
