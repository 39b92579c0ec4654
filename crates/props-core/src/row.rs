//! Row types and the line grammar of `.properties` files

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a row inside one property set.
///
/// Two rows with the same content are still different rows; the key index
/// refers to rows by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub(crate) u64);

/// The classified content of one line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowKind {
    /// `key=value`
    Property { key: String, value: String },
    /// `# text` (text may be empty)
    Comment { text: String },
    /// Whitespace only
    Blank,
    /// Anything else, kept verbatim
    Invalid { original: String },
}

impl RowKind {
    /// Classify a single line.
    ///
    /// Leading whitespace is ignored. The alternatives are tried in order:
    /// `key=value`, then `#comment`, then blank, and everything else is
    /// kept as an invalid line with its original text.
    pub fn parse(line: &str) -> Self {
        let rest = line.trim_start();

        if let Some((key, value)) = split_assignment(rest) {
            return RowKind::Property {
                key: key.to_string(),
                value: value.trim().to_string(),
            };
        }

        if let Some(comment) = rest.strip_prefix('#') {
            return RowKind::Comment {
                text: comment.trim().to_string(),
            };
        }

        if rest.is_empty() {
            return RowKind::Blank;
        }

        RowKind::Invalid {
            original: line.to_string(),
        }
    }
}

/// Split `key = value` into its parts. The key runs up to the first `#`,
/// `=` or whitespace character and must be followed (after optional
/// whitespace) by `=`.
fn split_assignment(s: &str) -> Option<(&str, &str)> {
    let key_end = s.find(is_key_terminator).unwrap_or(s.len());
    if key_end == 0 {
        return None;
    }
    let value = s[key_end..].trim_start().strip_prefix('=')?;
    Some((&s[..key_end], value))
}

fn is_key_terminator(c: char) -> bool {
    c == '#' || c == '=' || c.is_whitespace()
}

/// Whether `key` can be written as the key of a `key=value` line and read
/// back unchanged
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(is_key_terminator)
}

/// Split file content into lines on `\r\n`, `\r` or `\n`.
///
/// A line break at the very end does not start another line, and empty
/// input has no lines.
pub fn split_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&text[start..i]);
                i += 1;
                start = i;
            }
            b'\r' => {
                lines.push(&text[start..i]);
                i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// One logical line of a property file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    id: RowId,
    kind: RowKind,
}

impl Row {
    pub(crate) fn new(id: RowId, kind: RowKind) -> Self {
        Self { id, kind }
    }

    /// Identity of this row within its property set
    pub fn id(&self) -> RowId {
        self.id
    }

    /// The classified content
    pub fn kind(&self) -> &RowKind {
        &self.kind
    }

    /// Key of a key/value row
    pub fn key(&self) -> Option<&str> {
        match &self.kind {
            RowKind::Property { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Value of a key/value row
    pub fn value(&self) -> Option<&str> {
        match &self.kind {
            RowKind::Property { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Comment text. Blank rows report an empty comment, so both comment
    /// and blank rows count as "carrying a comment".
    pub fn comment(&self) -> Option<&str> {
        match &self.kind {
            RowKind::Comment { text } => Some(text),
            RowKind::Blank => Some(""),
            _ => None,
        }
    }

    /// Original text of a line that could not be parsed
    pub fn original_text(&self) -> Option<&str> {
        match &self.kind {
            RowKind::Invalid { original } => Some(original),
            _ => None,
        }
    }

    pub fn is_property(&self) -> bool {
        matches!(self.kind, RowKind::Property { .. })
    }

    pub fn is_blank(&self) -> bool {
        matches!(self.kind, RowKind::Blank)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, RowKind::Invalid { .. })
    }

    /// A key/value row whose value is entirely whitespace
    pub fn is_empty(&self) -> bool {
        match &self.kind {
            RowKind::Property { value, .. } => value.trim().is_empty(),
            _ => false,
        }
    }

    /// A comment row with non-empty text
    pub(crate) fn has_comment_text(&self) -> bool {
        matches!(&self.kind, RowKind::Comment { text } if !text.is_empty())
    }

    pub(crate) fn set_value(&mut self, new_value: &str) {
        if let RowKind::Property { value, .. } = &mut self.kind {
            *value = new_value.to_string();
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RowKind::Property { key, value } => write!(f, "{}={}", key, value),
            RowKind::Comment { text } => write!(f, "# {}", text),
            RowKind::Blank => Ok(()),
            RowKind::Invalid { original } => write!(f, "{}", original),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn property(key: &str, value: &str) -> RowKind {
        RowKind::Property {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(RowKind::parse("a=1"), property("a", "1"));
        assert_eq!(RowKind::parse("   greeting = Hello  "), property("greeting", "Hello"));
        assert_eq!(RowKind::parse("url=a=b"), property("url", "a=b"));
        assert_eq!(RowKind::parse("x.y_z=# not a comment"), property("x.y_z", "# not a comment"));
    }

    #[test]
    fn test_parse_empty_value() {
        let row = Row::new(RowId(0), RowKind::parse("a=   "));
        assert_eq!(row.key(), Some("a"));
        assert_eq!(row.value(), Some(""));
        assert!(row.is_empty());

        let row = Row::new(RowId(1), RowKind::parse("a=x"));
        assert!(!row.is_empty());
    }

    #[test]
    fn test_parse_comment() {
        assert_eq!(
            RowKind::parse("#  About a  "),
            RowKind::Comment {
                text: "About a".to_string()
            }
        );
        assert_eq!(
            RowKind::parse("  #"),
            RowKind::Comment {
                text: String::new()
            }
        );
    }

    #[test]
    fn test_parse_blank() {
        assert_eq!(RowKind::parse(""), RowKind::Blank);
        assert_eq!(RowKind::parse(" \t "), RowKind::Blank);

        let row = Row::new(RowId(0), RowKind::Blank);
        assert_eq!(row.comment(), Some(""));
        assert!(row.is_blank());
    }

    #[test]
    fn test_parse_invalid() {
        for line in ["Invalid line", "foo bar=baz", "a#b=1", "=value", "  key"] {
            let row = Row::new(RowId(0), RowKind::parse(line));
            assert!(row.is_error(), "{:?} should be invalid", line);
            assert_eq!(row.original_text(), Some(line));
            assert_eq!(row.key(), None);
            assert_eq!(row.comment(), None);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Row::new(RowId(0), property("a", "1")).to_string(), "a=1");
        assert_eq!(
            Row::new(RowId(0), RowKind::Comment { text: String::new() }).to_string(),
            "# "
        );
        assert_eq!(Row::new(RowId(0), RowKind::Blank).to_string(), "");
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("app.title"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("a b"));
        assert!(!is_valid_key("a=b"));
        assert!(!is_valid_key("#a"));
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines(""), Vec::<&str>::new());
        assert_eq!(split_lines("a=1"), vec!["a=1"]);
        assert_eq!(split_lines("a=1\r\nb=2\rc=3\n"), vec!["a=1", "b=2", "c=3"]);
        assert_eq!(split_lines("a=1\n\n"), vec!["a=1", ""]);
        assert_eq!(split_lines("\n"), vec![""]);
    }

    proptest! {
        #[test]
        fn invalid_lines_keep_original_text(line in "[a-z]{1,8} [a-z ]{1,8}") {
            let row = Row::new(RowId(0), RowKind::parse(&line));
            prop_assert!(row.is_error());
            prop_assert_eq!(row.original_text(), Some(line.as_str()));
        }

        #[test]
        fn key_value_lines_parse(key in "[A-Za-z0-9._-]{1,12}", value in "[^\r\n]{0,20}") {
            let line = format!("{}={}", key, value);
            let kind = RowKind::parse(&line);
            prop_assert_eq!(kind, property(&key, value.trim()));
        }
    }
}
