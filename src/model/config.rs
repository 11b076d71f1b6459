use serde::{Deserialize, Serialize};

use super::column::ColumnTagTable;

/// Columns of a freshly created board
pub const DEFAULT_COLUMNS: [&str; 6] = [
    "Later",
    "Soonish",
    "Next week",
    "This week",
    "Today",
    "Pending",
];

/// Document that new tasks go to on a freshly created board
pub const DEFAULT_TASK_PATH: &str = "Tasks.md";

/// Configuration from taskboard.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Column display names, in board order
    pub columns: Vec<String>,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default = "default_true")]
    pub show_filepath: bool,
    #[serde(default)]
    pub uncategorized_visibility: Visibility,
    #[serde(default = "default_done_visibility")]
    pub done_visibility: Visibility,
    /// Where `add` appends new tasks. Absent unless the file sets it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_task_path: Option<String>,
}

/// Which documents a board scans
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// The board directory and everything below it
    #[default]
    Folder,
    /// Every document in the vault
    Everywhere,
}

/// When an optional board column is shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Only when the column holds tasks
    #[default]
    Auto,
    Never,
    Always,
}

impl Visibility {
    pub fn shows(self, has_tasks: bool) -> bool {
        match self {
            Visibility::Auto => has_tasks,
            Visibility::Never => false,
            Visibility::Always => true,
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            columns: DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            scope: Scope::Folder,
            show_filepath: true,
            uncategorized_visibility: Visibility::Auto,
            done_visibility: Visibility::Always,
            default_task_path: Some(DEFAULT_TASK_PATH.to_string()),
        }
    }
}

impl BoardConfig {
    /// The column vocabulary consulted while parsing task lines
    pub fn column_table(&self) -> ColumnTagTable {
        ColumnTagTable::from_names(&self.columns)
    }
}

fn default_true() -> bool {
    true
}

fn default_done_visibility() -> Visibility {
    Visibility::Always
}
