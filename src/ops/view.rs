use serde::Serialize;

use crate::model::column::{Column, ColumnTag, ColumnTagTable};
use crate::model::config::BoardConfig;
use crate::model::task::Task;
use crate::ops::reconcile::BoardIndex;

/// Which board column a group of tasks is shown in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "tag", rename_all = "lowercase")]
pub enum ColumnKind {
    /// Tasks with no column tag
    Uncategorized,
    Column(ColumnTag),
    Done,
}

/// One visible column of the board
#[derive(Debug, Clone)]
pub struct BoardColumn<'a> {
    pub kind: ColumnKind,
    pub name: String,
    pub tasks: Vec<&'a Task>,
}

/// The board as shown: Uncategorized, the configured columns in order,
/// then Done.
#[derive(Debug, Clone)]
pub struct Board<'a> {
    pub columns: Vec<BoardColumn<'a>>,
}

impl<'a> Board<'a> {
    /// Group indexed tasks into columns. Archived and deleted tasks are left
    /// out; Uncategorized and Done follow their visibility settings.
    pub fn from_index(index: &'a BoardIndex, config: &BoardConfig) -> Self {
        let table = config.column_table();
        let mut uncategorized = Vec::new();
        let mut done = Vec::new();
        let mut by_column: Vec<Vec<&Task>> = vec![Vec::new(); table.len()];

        for task in index.tasks() {
            if task.is_deleted() || task.is_archived() {
                continue;
            }
            match placement(task, &table) {
                Placement::Done => done.push(task),
                Placement::Column(i) => by_column[i].push(task),
                Placement::Uncategorized => uncategorized.push(task),
            }
        }

        let mut columns = Vec::new();
        if config
            .uncategorized_visibility
            .shows(!uncategorized.is_empty())
        {
            columns.push(BoardColumn {
                kind: ColumnKind::Uncategorized,
                name: "Uncategorized".to_string(),
                tasks: uncategorized,
            });
        }
        for ((tag, name), tasks) in table.iter().zip(by_column) {
            columns.push(BoardColumn {
                kind: ColumnKind::Column(tag.clone()),
                name: name.to_string(),
                tasks,
            });
        }
        if config.done_visibility.shows(!done.is_empty()) {
            columns.push(BoardColumn {
                kind: ColumnKind::Done,
                name: "Done".to_string(),
                tasks: done,
            });
        }

        Board { columns }
    }

    pub fn column(&self, kind: &ColumnKind) -> Option<&BoardColumn<'a>> {
        self.columns.iter().find(|c| &c.kind == kind)
    }
}

enum Placement {
    Uncategorized,
    Column(usize),
    Done,
}

fn placement(task: &Task, table: &ColumnTagTable) -> Placement {
    if task.done() {
        return Placement::Done;
    }
    match task.column() {
        Some(Column::Tag(tag)) if tag.is_done() => Placement::Done,
        Some(Column::Tag(tag)) => table
            .iter()
            .position(|(t, _)| t == tag)
            .map_or(Placement::Uncategorized, Placement::Column),
        Some(Column::Archived) | None => Placement::Uncategorized,
    }
}
