use serde::Serialize;

use crate::model::column::ColumnTagTable;
use crate::model::link::LinkTarget;
use crate::model::task::Task;
use crate::ops::reconcile::ScanReport;
use crate::ops::view::{Board, ColumnKind};
use crate::util::unicode::{display_width, truncate_to_width};

/// Characters of a task id shown in listings
pub const SHORT_ID_LEN: usize = 8;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    pub id: String,
    pub content: String,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_link: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkJson>,
    pub path: String,
    /// One-based line number
    pub line: usize,
}

#[derive(Serialize)]
pub struct LinkJson {
    pub label: String,
    #[serde(flatten)]
    pub target: LinkTarget,
}

#[derive(Serialize)]
pub struct BoardColumnJson {
    #[serde(flatten)]
    pub kind: ColumnKind,
    pub name: String,
    pub tasks: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct BoardJson {
    pub columns: Vec<BoardColumnJson>,
}

#[derive(Serialize)]
pub struct ScanJson<'a> {
    pub tasks: usize,
    #[serde(flatten)]
    pub report: &'a ScanReport,
}

#[derive(Serialize)]
pub struct WrittenJson {
    pub id: String,
    pub path: String,
    /// The line as written; absent when the line was removed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn task_to_json(task: &Task) -> TaskJson {
    TaskJson {
        id: task.id().to_string(),
        content: task.source_content().trim().to_string(),
        done: task.done(),
        column: task.column().map(|c| c.tag().to_string()),
        tags: task.tags().iter().cloned().collect(),
        block_link: task.block_link().map(str::to_string),
        links: task
            .internal_links()
            .iter()
            .map(|link| LinkJson {
                label: link.label.clone(),
                target: link.target.clone(),
            })
            .collect(),
        path: task.path().to_string(),
        line: task.row_index() + 1,
    }
}

pub fn board_to_json(board: &Board) -> BoardJson {
    BoardJson {
        columns: board
            .columns
            .iter()
            .map(|column| BoardColumnJson {
                kind: column.kind.clone(),
                name: column.name.clone(),
                tasks: column.tasks.iter().map(|t| task_to_json(t)).collect(),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// `path:line`, one-based
pub fn format_location(task: &Task) -> String {
    format!("{}:{}", task.path(), task.row_index() + 1)
}

/// Format a single task as a one-line summary, content truncated so the
/// whole line fits in `width` cells.
pub fn format_task_line(task: &Task, show_filepath: bool, width: usize) -> String {
    let head = format!(
        "[{}] {} ",
        if task.done() { 'x' } else { ' ' },
        short_id(task.id())
    );
    let tail = if show_filepath {
        format!("  {}", format_location(task))
    } else {
        String::new()
    };
    let budget = width.saturating_sub(display_width(&head) + display_width(&tail));
    let content = task.source_content();
    format!(
        "{}{}{}",
        head,
        truncate_to_width(content.trim(), budget),
        tail
    )
}

/// Format the board: one block per visible column
pub fn format_board(board: &Board, show_filepath: bool, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, column) in board.columns.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.push(format!("== {} ({}) ==", column.name, column.tasks.len()));
        for task in &column.tasks {
            lines.push(format_task_line(task, show_filepath, width));
        }
    }
    lines
}

/// Format detailed task view
pub fn format_task_detail(task: &Task, columns: &ColumnTagTable) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!("id: {}", task.id()));
    lines.push(format!("text: {}", task.source_content().trim()));
    lines.push(format!("done: {}", if task.done() { "yes" } else { "no" }));

    if let Some(column) = task.column() {
        let name = columns.name_of(column.tag()).unwrap_or(column.tag());
        lines.push(format!("column: {}", name));
    }
    if !task.tags().is_empty() {
        lines.push(format!(
            "tags: {}",
            task.tags()
                .iter()
                .map(|t| format!("#{}", t))
                .collect::<Vec<_>>()
                .join(" ")
        ));
    }
    if let Some(anchor) = task.block_link() {
        lines.push(format!("block: ^{}", anchor));
    }
    for link in task.internal_links() {
        lines.push(format!(
            "link: {} → {}{}",
            link.label, link.target.path, link.target.subpath
        ));
    }
    lines.push(format!("at: {}", format_location(task)));
    lines
}

/// One line per document that changed in a scan, then a summary
pub fn format_scan_report(report: &ScanReport, tasks: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for doc in &report.documents {
        if doc.added.is_empty() && doc.evicted.is_empty() {
            continue;
        }
        lines.push(format!(
            "{}: {} tasks (+{} -{})",
            doc.path,
            doc.seen.len(),
            doc.added.len(),
            doc.evicted.len()
        ));
    }
    for path in &report.forgotten {
        lines.push(format!("{}: gone", path));
    }
    for failure in &report.failures {
        lines.push(format!("{}: skipped: {}", failure.path, failure.error));
    }
    lines.push(format!(
        "{} tasks in {} documents",
        tasks,
        report.documents.len()
    ));
    lines
}
