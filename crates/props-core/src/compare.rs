//! N-way comparison of property sets, aligned by key

use crate::error::Result;
use crate::properties::PropertySet;
use crate::row::Row;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Write;

/// Label of the key column
pub const KEY_HEADER: &str = "Key";

/// The comparison of several property sets.
///
/// Every key of every set gets at least one row. A key defined more than
/// once in some set gets as many rows as its longest list of values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonMatrix {
    /// `Key` followed by one label per compared set
    pub headers: Vec<String>,
    /// Rows in ascending key order
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonMatrix {
    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of compared sets
    pub fn column_count(&self) -> usize {
        self.headers.len().saturating_sub(1)
    }

    /// All rows for a key (more than one if some set repeats the key)
    pub fn rows_for_key(&self, key: &str) -> Vec<&ComparisonRow> {
        self.rows.iter().filter(|row| row.key == key).collect()
    }

    /// Write the matrix as CSV. Missing and absent cells are written empty.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.headers)?;
        for row in &self.rows {
            let mut record = Vec::with_capacity(row.cells.len() + 1);
            record.push(row.key.as_str());
            record.extend(
                row.cells
                    .iter()
                    .map(|cell| cell.as_ref().and_then(|c| c.value.as_deref()).unwrap_or("")),
            );
            csv_writer.write_record(&record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

/// One output row: the key and one cell per compared set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRow {
    /// Key cell value, repeated on every row of a key
    pub key: String,
    /// `None` when this set has no further value for the key
    pub cells: Vec<Option<Cell>>,
}

/// A value cell with its provenance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub value: Option<String>,
    /// Human readable provenance
    pub title: String,
    /// The key is not defined in this set
    pub missing: bool,
    /// The value is entirely whitespace
    pub empty: bool,
    /// The set defines the key more than once
    pub multiple: bool,
}

impl Cell {
    fn missing(key: &str) -> Self {
        Self {
            title: format!("no value for property {}", key),
            missing: true,
            ..Self::default()
        }
    }

    fn defined(row: &Row, multiple: bool, index: Option<usize>) -> Self {
        let index = index.map_or_else(|| "?".to_string(), |i| i.to_string());
        Self {
            value: row.value().map(str::to_string),
            title: format!("defined in row {}", index),
            missing: false,
            empty: row.is_empty(),
            multiple,
        }
    }
}

/// Entry of a set's value list for one key
enum Entry<'a> {
    Missing,
    Defined { row: &'a Row, multiple: bool },
}

/// Header label for a set: its name without the `.properties` extension
pub fn header_label(set: &PropertySet) -> String {
    match set.name() {
        Some(name) => name.strip_suffix(".properties").unwrap_or(name).to_string(),
        None => "(unnamed)".to_string(),
    }
}

/// Compare property sets key by key.
///
/// Inputs are only read. Keys are sorted with plain string ordering, and
/// duplicate values keep their file order.
pub fn compare<'a, I>(sets: I) -> ComparisonMatrix
where
    I: IntoIterator<Item = &'a PropertySet>,
{
    let sets: Vec<&PropertySet> = sets.into_iter().collect();

    let mut headers = vec![KEY_HEADER.to_string()];
    headers.extend(sets.iter().map(|set| header_label(set)));

    let all_keys: BTreeSet<&str> = sets.iter().flat_map(|set| set.keys()).collect();

    let mut rows = Vec::new();
    for key in all_keys {
        let entries: Vec<Vec<Entry>> = sets
            .iter()
            .map(|set| {
                let defined = set.rows_for(key);
                let multiple = defined.len() > 1;
                if defined.is_empty() {
                    vec![Entry::Missing]
                } else {
                    defined
                        .into_iter()
                        .map(|row| Entry::Defined { row, multiple })
                        .collect()
                }
            })
            .collect();

        let row_count = entries.iter().map(Vec::len).max().unwrap_or(0);

        for i in 0..row_count {
            let cells = entries
                .iter()
                .zip(&sets)
                .map(|(list, set)| {
                    list.get(i).map(|entry| match entry {
                        Entry::Missing => Cell::missing(key),
                        Entry::Defined { row, multiple } => {
                            Cell::defined(row, *multiple, set.index_of(key, row.value()))
                        }
                    })
                })
                .collect();
            rows.push(ComparisonRow {
                key: key.to_string(),
                cells,
            });
        }
    }

    ComparisonMatrix { headers, rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_file() -> PropertySet {
        PropertySet::from_lines(
            [
                "# Test",
                "",
                "# Parameter a is the fnord factor",
                "a=A fnord is just a fnord",
                "# Parameter c: gnuification",
                "c=Rose bud",
                "c=I said: Rose bud",
                "b=Best of...",
            ],
            Some("Test.properties".to_string()),
        )
    }

    fn second_file() -> PropertySet {
        PropertySet::from_lines(
            ["b=Fnords und kein Ende", "c=ist eine Rose", "d=Sonstiges"],
            Some("Test2".to_string()),
        )
    }

    #[test]
    fn test_headers() {
        let (p0, p1) = (first_file(), second_file());
        let matrix = compare([&p0, &p1]);
        assert_eq!(matrix.headers, vec!["Key", "Test", "Test2"]);
        assert_eq!(matrix.column_count(), 2);
    }

    #[test]
    fn test_detect_all_keys() {
        let (p0, p1) = (first_file(), second_file());
        let matrix = compare([&p0, &p1]);
        let keys: BTreeSet<&str> = matrix.rows.iter().map(|row| row.key.as_str()).collect();
        assert_eq!(keys, BTreeSet::from(["a", "b", "c", "d"]));
        // Sorted, with the duplicate key on adjacent rows
        let order: Vec<&str> = matrix.rows.iter().map(|row| row.key.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c", "c", "d"]);
    }

    #[test]
    fn test_detect_missing_key() {
        let (p0, p1) = (first_file(), second_file());
        let matrix = compare([&p0, &p1]);
        let rows = matrix.rows_for_key("a");
        assert_eq!(rows.len(), 1);

        let defined = rows[0].cells[0].as_ref().unwrap();
        assert!(!defined.missing);
        assert_eq!(defined.value.as_deref(), Some("A fnord is just a fnord"));
        assert_eq!(defined.title, "defined in row 3");

        let missing = rows[0].cells[1].as_ref().unwrap();
        assert!(missing.missing);
        assert!(!missing.multiple);
        assert_eq!(missing.value, None);
        assert_eq!(missing.title, "no value for property a");
    }

    #[test]
    fn test_group_multiple_values() {
        let (p0, p1) = (first_file(), second_file());
        let matrix = compare([&p0, &p1]);
        let rows = matrix.rows_for_key("c");
        assert_eq!(rows.len(), 2);

        let first = rows[0].cells[0].as_ref().unwrap();
        let second = rows[1].cells[0].as_ref().unwrap();
        assert_eq!(first.value.as_deref(), Some("Rose bud"));
        assert_eq!(second.value.as_deref(), Some("I said: Rose bud"));
        assert!(first.multiple && second.multiple);
        assert_eq!(second.title, "defined in row 6");

        let other = rows[0].cells[1].as_ref().unwrap();
        assert_eq!(other.value.as_deref(), Some("ist eine Rose"));
        assert!(!other.multiple);

        // No further value in the second file: absent, not missing
        assert!(rows[1].cells[1].is_none());
    }

    #[test]
    fn test_detect_additional_key() {
        let (p0, p1) = (first_file(), second_file());
        let matrix = compare([&p0, &p1]);
        let rows = matrix.rows_for_key("d");
        assert_eq!(rows.len(), 1);
        assert!(rows[0].cells[0].as_ref().unwrap().missing);
        assert_eq!(rows[0].cells[1].as_ref().unwrap().value.as_deref(), Some("Sonstiges"));
    }

    #[test]
    fn test_empty_flag() {
        let p0 = PropertySet::from_lines(["a=  "], None);
        let matrix = compare([&p0]);
        let cell = matrix.rows[0].cells[0].as_ref().unwrap();
        assert!(cell.empty);
        assert_eq!(cell.value.as_deref(), Some(""));
        assert_eq!(matrix.headers, vec!["Key", "(unnamed)"]);
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let (p0, p1) = (first_file(), second_file());
        let _ = compare([&p0, &p1]);
        assert!(!p0.has_unsaved_changes());
        assert!(!p1.has_unsaved_changes());
    }

    #[test]
    fn test_compare_nothing() {
        let matrix = compare(std::iter::empty());
        assert_eq!(matrix.headers, vec!["Key"]);
        assert_eq!(matrix.row_count(), 0);
    }

    #[test]
    fn test_write_csv() {
        let p0 = PropertySet::from_lines(["a=1", "b=x,y"], Some("en.properties".to_string()));
        let p1 = PropertySet::from_lines(["a=2"], Some("de.properties".to_string()));
        let mut out = Vec::new();
        compare([&p0, &p1]).write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "Key,en,de\na,1,2\nb,\"x,y\",\n");
    }
}
