use std::borrow::Borrow;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::parse::tags::normalize_tag;

/// A tag that places a task in a board column (`#today`), or the `done` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnTag(String);

impl ColumnTag {
    /// Tag that marks a task as belonging to the Done column
    pub const DONE: &'static str = "done";

    pub fn new(tag: impl Into<String>) -> Self {
        ColumnTag(tag.into())
    }

    pub fn done() -> Self {
        ColumnTag(Self::DONE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_done(&self) -> bool {
        self.0 == Self::DONE
    }
}

impl Borrow<str> for ColumnTag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Column placement of a task
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Column {
    Tag(ColumnTag),
    /// Written as `#archived`; archived lines are never parsed back as tasks
    Archived,
}

impl Column {
    pub const ARCHIVED: &'static str = "archived";

    /// The tag text written after `#` when the task is serialized
    pub fn tag(&self) -> &str {
        match self {
            Column::Tag(tag) => tag.as_str(),
            Column::Archived => Self::ARCHIVED,
        }
    }

    pub fn column_tag(&self) -> Option<&ColumnTag> {
        match self {
            Column::Tag(tag) => Some(tag),
            Column::Archived => None,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The configured column vocabulary: column tag → column display name.
///
/// Iteration follows configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnTagTable {
    columns: IndexMap<ColumnTag, String>,
}

impl ColumnTagTable {
    /// Build the table from column display names. Each name is turned into
    /// its tag with the tag normalizer; a name that normalizes to nothing is
    /// skipped, and a tag claimed twice keeps its first column.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = ColumnTagTable::default();
        for name in names {
            let name = name.as_ref();
            let tag = normalize_tag(name);
            if tag.is_empty() {
                continue;
            }
            table
                .columns
                .entry(ColumnTag::new(tag))
                .or_insert_with(|| name.to_string());
        }
        table
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.columns.contains_key(tag)
    }

    /// Look up the column identity for a tag
    pub fn get(&self, tag: &str) -> Option<&ColumnTag> {
        self.columns.get_key_value(tag).map(|(tag, _)| tag)
    }

    /// Display name of a column tag
    pub fn name_of(&self, tag: &str) -> Option<&str> {
        self.columns.get(tag).map(|s| s.as_str())
    }

    /// Find a column by its tag, its display name, or anything that
    /// normalizes to its tag (`"Next week"` → `Nextweek`).
    pub fn lookup(&self, query: &str) -> Option<&ColumnTag> {
        let query = query.trim();
        if let Some(tag) = self.get(query.trim_start_matches('#')) {
            return Some(tag);
        }
        if let Some((tag, _)) = self.columns.iter().find(|(_, name)| name.as_str() == query) {
            return Some(tag);
        }
        self.get(&normalize_tag(query))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ColumnTag, &str)> {
        self.columns.iter().map(|(tag, name)| (tag, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_from_names_normalizes_tags() {
        let table = ColumnTagTable::from_names(["Later", "Next week", "Today"]);
        assert_eq!(table.len(), 3);
        assert!(table.contains("Later"));
        assert!(table.contains("Nextweek"));
        assert_eq!(table.name_of("Nextweek"), Some("Next week"));
        assert!(!table.contains("Next week"));
    }

    #[test]
    fn test_table_first_column_wins_on_duplicate_tag() {
        let table = ColumnTagTable::from_names(["Next week", "Nextweek", "#"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.name_of("Nextweek"), Some("Next week"));
    }

    #[test]
    fn test_lookup_by_tag_name_or_hash() {
        let table = ColumnTagTable::from_names(["This week", "Today"]);
        assert_eq!(table.lookup("Thisweek").map(|t| t.as_str()), Some("Thisweek"));
        assert_eq!(table.lookup("This week").map(|t| t.as_str()), Some("Thisweek"));
        assert_eq!(table.lookup("#Today").map(|t| t.as_str()), Some("Today"));
        assert!(table.lookup("Tomorrow").is_none());
    }

    #[test]
    fn test_column_tags() {
        assert_eq!(Column::Archived.tag(), "archived");
        assert_eq!(Column::Tag(ColumnTag::done()).to_string(), "done");
        assert!(ColumnTag::done().is_done());
        assert!(Column::Archived.column_tag().is_none());
    }
}
