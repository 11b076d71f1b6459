use tracing::debug;

use crate::io::store::{DocumentStore, StoreError};
use crate::model::column::{ColumnTag, ColumnTagTable};
use crate::model::config::DEFAULT_TASK_PATH;
use crate::model::task::Task;
use crate::ops::reconcile::BoardIndex;
use crate::parse::serialize_task;

/// Characters a vault file name may not contain
const FORBIDDEN_PATH_CHARS: [char; 8] = ['*', '\\', '"', '<', '>', ':', '|', '?'];

/// Error type for task actions
#[derive(Debug, thiserror::Error)]
pub enum TaskOpError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("task id prefix {0} matches more than one task")]
    AmbiguousId(String),
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("no default task path configured")]
    NoTaskPath,
    #[error("task path contains a forbidden character: {0}")]
    ForbiddenPath(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Write-back
// ---------------------------------------------------------------------------

/// Replace, remove, or append one line of a document.
///
/// `row = None` appends a line, keeping a trailing newline at the end.
/// A row past the end of the document is ignored. Empty `text` removes the
/// row.
pub fn update_row<S: DocumentStore + ?Sized>(
    store: &S,
    path: &str,
    row: Option<usize>,
    text: &str,
) -> Result<(), StoreError> {
    let document = store.read_whole(path)?;
    let mut rows: Vec<&str> = if document.is_empty() {
        Vec::new()
    } else {
        document.split('\n').collect()
    };

    match row {
        None if text.is_empty() => return Ok(()),
        None => {
            let at = if document.ends_with('\n') {
                rows.len() - 1
            } else {
                rows.len()
            };
            rows.insert(at, text);
        }
        Some(row) if row > rows.len() => {
            debug!(path, row, "row past end of document, nothing written");
            return Ok(());
        }
        Some(row) if text.is_empty() => {
            if row < rows.len() {
                rows.remove(row);
            }
        }
        Some(row) if row == rows.len() => rows.push(text),
        Some(row) => rows[row] = text,
    }

    store.write_whole(path, &rows.join("\n"))?;
    debug!(path, ?row, removed = text.is_empty(), "wrote task line");
    Ok(())
}

/// Apply `update` to a task and write its serialization back to the line it
/// was read from. Returns the written line (empty when deleted).
///
/// A deleted task no longer owns its row and is reported as not found. The
/// index keeps the old task when the write fails.
fn update_row_with_task<S, F>(
    store: &S,
    index: &mut BoardIndex,
    id: &str,
    update: F,
) -> Result<String, TaskOpError>
where
    S: DocumentStore + ?Sized,
    F: FnOnce(&mut Task),
{
    let not_found = || TaskOpError::NotFound(id.to_string());
    let location = index.location(id).cloned().ok_or_else(not_found)?;
    let mut task = index
        .get(id)
        .filter(|task| !task.is_deleted())
        .cloned()
        .ok_or_else(not_found)?;

    update(&mut task);
    let line = serialize_task(&task);
    update_row(store, &location.path, Some(location.row_index), &line)?;

    if let Some(slot) = index.get_mut(id) {
        *slot = task;
    }
    Ok(line)
}

// ---------------------------------------------------------------------------
// Task actions
// ---------------------------------------------------------------------------

/// Find a column by tag or display name
pub fn resolve_column(columns: &ColumnTagTable, query: &str) -> Result<ColumnTag, TaskOpError> {
    columns
        .lookup(query)
        .cloned()
        .ok_or_else(|| TaskOpError::UnknownColumn(query.to_string()))
}

pub fn change_column<S: DocumentStore + ?Sized>(
    store: &S,
    index: &mut BoardIndex,
    id: &str,
    column: ColumnTag,
) -> Result<String, TaskOpError> {
    update_row_with_task(store, index, id, |task| task.change_column(column))
}

pub fn mark_done<S: DocumentStore + ?Sized>(
    store: &S,
    index: &mut BoardIndex,
    id: &str,
) -> Result<String, TaskOpError> {
    update_row_with_task(store, index, id, Task::mark_done)
}

/// Replace the body text. Column, done state and block link are kept.
pub fn update_content<S: DocumentStore + ?Sized>(
    store: &S,
    index: &mut BoardIndex,
    id: &str,
    content: &str,
) -> Result<String, TaskOpError> {
    update_row_with_task(store, index, id, |task| task.content = content.to_string())
}

/// Archive each task in turn. Stops at the first failure; tasks before it
/// stay archived.
pub fn archive_tasks<S: DocumentStore + ?Sized>(
    store: &S,
    index: &mut BoardIndex,
    ids: &[String],
) -> Result<Vec<String>, TaskOpError> {
    ids.iter()
        .map(|id| update_row_with_task(store, index, id, Task::archive))
        .collect()
}

/// Delete a task and remove its line from the document
pub fn delete_task<S: DocumentStore + ?Sized>(
    store: &S,
    index: &mut BoardIndex,
    id: &str,
) -> Result<(), TaskOpError> {
    update_row_with_task(store, index, id, Task::delete)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// New tasks
// ---------------------------------------------------------------------------

/// Resolve the configured default task path against the board folder.
///
/// A leading `/` makes the path vault-absolute; otherwise it is relative to
/// `board_folder`. A trailing `/` names a folder and gets `Tasks.md`, and
/// `.md` is appended when missing.
pub fn normalize_task_path(default_task_path: &str, board_folder: &str) -> String {
    let joined = if default_task_path.starts_with('/') {
        default_task_path.to_string()
    } else {
        format!("{}/{}", board_folder, default_task_path)
    };

    let mut full_path = joined.trim_start_matches('/').to_string();
    if full_path.ends_with('/') {
        full_path.push_str(DEFAULT_TASK_PATH);
    }
    if !full_path.ends_with(".md") {
        full_path.push_str(".md");
    }
    full_path
}

/// Append a new task to the board's default task document, creating its
/// folder and the document when needed. Returns the document path.
pub fn add_new<S: DocumentStore + ?Sized>(
    store: &S,
    column: &ColumnTag,
    content: &str,
    board_folder: &str,
    default_task_path: Option<&str>,
) -> Result<String, TaskOpError> {
    let default_task_path = default_task_path
        .filter(|p| !p.trim().is_empty())
        .ok_or(TaskOpError::NoTaskPath)?;
    if default_task_path.contains(FORBIDDEN_PATH_CHARS) {
        return Err(TaskOpError::ForbiddenPath(default_task_path.to_string()));
    }

    let full_path = normalize_task_path(default_task_path, board_folder);
    if let Some((folder, _)) = full_path.rsplit_once('/')
        && !folder.is_empty()
        && !store.exists(folder)
    {
        store.create_folder(folder)?;
    }
    if !store.exists(&full_path) {
        store.create_file(&full_path, "")?;
    }

    add_to_document(store, &full_path, column, content)?;
    Ok(full_path)
}

/// Append a new task line to an existing document
pub fn add_to_document<S: DocumentStore + ?Sized>(
    store: &S,
    path: &str,
    column: &ColumnTag,
    content: &str,
) -> Result<(), TaskOpError> {
    let line = new_task_line(column, content);
    update_row(store, path, None, &line)?;
    Ok(())
}

/// `- [ ] <content> #<column>`; without content, `- [ ]  #<column>`
pub fn new_task_line(column: &ColumnTag, content: &str) -> String {
    format!("- [ ] {} #{}", content.trim(), column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::MemoryStore;
    use crate::model::link::PathLinkResolver;
    use pretty_assertions::assert_eq;

    const PATH: &str = "Board/Tasks.md";

    fn columns() -> ColumnTagTable {
        ColumnTagTable::from_names(["Today", "Later"])
    }

    fn setup(text: &str) -> (MemoryStore, BoardIndex, Vec<String>) {
        let store = MemoryStore::new().with_document(PATH, text);
        let mut index = BoardIndex::new();
        let report = index
            .reconcile_document(&store, PATH, &columns(), &PathLinkResolver)
            .unwrap();
        (store, index, report.seen)
    }

    fn document(store: &MemoryStore, path: &str) -> String {
        store.read_whole(path).unwrap()
    }

    // --- update_row ---

    #[test]
    fn test_update_row_replaces_line() {
        let store = MemoryStore::new().with_document(PATH, "a\nb\nc");
        update_row(&store, PATH, Some(1), "B").unwrap();
        assert_eq!(document(&store, PATH), "a\nB\nc");
    }

    #[test]
    fn test_update_row_empty_text_removes_line() {
        let store = MemoryStore::new().with_document(PATH, "a\nb\nc\n");
        update_row(&store, PATH, Some(1), "").unwrap();
        assert_eq!(document(&store, PATH), "a\nc\n");
    }

    #[test]
    fn test_update_row_past_end_is_noop() {
        let store = MemoryStore::new().with_document(PATH, "a\nb");
        update_row(&store, PATH, Some(5), "x").unwrap();
        assert_eq!(document(&store, PATH), "a\nb");
    }

    #[test]
    fn test_update_row_appends() {
        let store = MemoryStore::new()
            .with_document("a.md", "a")
            .with_document("b.md", "a\n")
            .with_document("c.md", "");
        for path in ["a.md", "b.md", "c.md"] {
            update_row(&store, path, None, "- [ ] new").unwrap();
        }
        assert_eq!(document(&store, "a.md"), "a\n- [ ] new");
        assert_eq!(document(&store, "b.md"), "a\n- [ ] new\n");
        assert_eq!(document(&store, "c.md"), "- [ ] new");
    }

    #[test]
    fn test_update_row_at_len_appends() {
        let store = MemoryStore::new().with_document(PATH, "a\nb");
        update_row(&store, PATH, Some(2), "c").unwrap();
        assert_eq!(document(&store, PATH), "a\nb\nc");
    }

    #[test]
    fn test_update_row_missing_document() {
        let store = MemoryStore::new();
        assert!(matches!(
            update_row(&store, PATH, Some(0), "x"),
            Err(StoreError::NotFound(_))
        ));
    }

    // --- actions ---

    #[test]
    fn test_change_column_writes_line() {
        let (store, mut index, ids) = setup("# Tasks\n- [ ] Buy milk #Today ^a1\n- [x] Done thing\n");
        let line = change_column(&store, &mut index, &ids[0], ColumnTag::new("Later")).unwrap();
        assert_eq!(line, "- [ ] Buy milk #Later ^a1");
        assert_eq!(
            document(&store, PATH),
            "# Tasks\n- [ ] Buy milk #Later ^a1\n- [x] Done thing\n"
        );

        change_column(&store, &mut index, &ids[1], ColumnTag::new("Today")).unwrap();
        assert_eq!(
            document(&store, PATH),
            "# Tasks\n- [ ] Buy milk #Later ^a1\n- [ ] Done thing #Today\n"
        );
    }

    #[test]
    fn test_mark_done_drops_column() {
        let (store, mut index, ids) = setup("- [ ] Buy milk #Today #errand\n");
        mark_done(&store, &mut index, &ids[0]).unwrap();
        assert_eq!(document(&store, PATH), "- [x] Buy milk  #errand\n");
    }

    #[test]
    fn test_update_content_keeps_column_and_links() {
        let (store, mut index, ids) = setup("- [ ] Read [[Book]] #Later\n");
        update_content(&store, &mut index, &ids[0], "Finish [Book](#internal-0)").unwrap();
        assert_eq!(document(&store, PATH), "- [ ] Finish [[Book]] #Later\n");
    }

    #[test]
    fn test_archive_tasks() {
        let (store, mut index, ids) = setup("- [ ] a #Today\n- [ ] b\n- [ ] c\n");
        let lines = archive_tasks(&store, &mut index, &ids[..2]).unwrap();
        assert_eq!(lines, vec!["- [x] a #archived", "- [x] b #archived"]);
        assert_eq!(
            document(&store, PATH),
            "- [x] a #archived\n- [x] b #archived\n- [ ] c\n"
        );

        let rescan = index
            .reconcile_document(&store, PATH, &columns(), &PathLinkResolver)
            .unwrap();
        assert_eq!(rescan.seen, vec![ids[2].clone()]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_delete_task_removes_line() {
        let (store, mut index, ids) = setup("- [ ] a\n- [ ] b\n- [ ] c\n");
        delete_task(&store, &mut index, &ids[1]).unwrap();
        assert_eq!(document(&store, PATH), "- [ ] a\n- [ ] c\n");
        assert!(index.get(&ids[1]).is_some_and(|t| t.is_deleted()));
    }

    #[test]
    fn test_deleted_task_is_not_found() {
        let (store, mut index, ids) = setup("- [ ] a\n- [ ] b\n- [ ] c\n");
        delete_task(&store, &mut index, &ids[1]).unwrap();

        // Row 1 now holds `c`; acting on `b` again must not touch it
        assert!(matches!(
            mark_done(&store, &mut index, &ids[1]),
            Err(TaskOpError::NotFound(_))
        ));
        assert!(matches!(
            delete_task(&store, &mut index, &ids[1]),
            Err(TaskOpError::NotFound(_))
        ));
        assert_eq!(document(&store, PATH), "- [ ] a\n- [ ] c\n");
    }

    #[test]
    fn test_failed_write_leaves_index_unchanged() {
        let (store, mut index, ids) = setup("- [ ] Buy milk #Today\n");
        store.remove(PATH);

        assert!(matches!(
            change_column(&store, &mut index, &ids[0], ColumnTag::new("Later")),
            Err(TaskOpError::Store(StoreError::NotFound(_)))
        ));
        let task = index.get(&ids[0]).unwrap();
        assert_eq!(task.column().map(|c| c.tag()), Some("Today"));
        assert!(!task.done());
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let (store, mut index, _) = setup("- [ ] a\n");
        assert!(matches!(
            mark_done(&store, &mut index, "nope"),
            Err(TaskOpError::NotFound(_))
        ));
        assert_eq!(document(&store, PATH), "- [ ] a\n");
    }

    #[test]
    fn test_resolve_column() {
        let table = ColumnTagTable::from_names(["Next week"]);
        assert_eq!(resolve_column(&table, "Next week").unwrap().as_str(), "Nextweek");
        assert!(matches!(
            resolve_column(&table, "Someday"),
            Err(TaskOpError::UnknownColumn(_))
        ));
    }

    // --- new tasks ---

    #[test]
    fn test_normalize_task_path() {
        assert_eq!(normalize_task_path("Tasks.md", "Board"), "Board/Tasks.md");
        assert_eq!(normalize_task_path("Tasks", "Board"), "Board/Tasks.md");
        assert_eq!(normalize_task_path("Inbox/", "Board"), "Board/Inbox/Tasks.md");
        assert_eq!(normalize_task_path("//Inbox/todo", "Board"), "Inbox/todo.md");
        assert_eq!(normalize_task_path("Tasks.md", ""), "Tasks.md");
    }

    #[test]
    fn test_new_task_line() {
        let today = ColumnTag::new("Today");
        assert_eq!(new_task_line(&today, ""), "- [ ]  #Today");
        assert_eq!(new_task_line(&today, " Call mom "), "- [ ] Call mom #Today");
    }

    #[test]
    fn test_add_new_creates_folder_and_file() {
        let store = MemoryStore::new();
        let path = add_new(
            &store,
            &ColumnTag::new("Today"),
            "Call mom",
            "Board",
            Some("Inbox/"),
        )
        .unwrap();
        assert_eq!(path, "Board/Inbox/Tasks.md");
        assert!(store.exists("Board/Inbox"));
        assert_eq!(document(&store, &path), "- [ ] Call mom #Today");

        add_new(&store, &ColumnTag::new("Later"), "", "Board", Some("Inbox/")).unwrap();
        assert_eq!(
            document(&store, &path),
            "- [ ] Call mom #Today\n- [ ]  #Later"
        );
    }

    #[test]
    fn test_add_new_appended_task_is_parsed_into_column() {
        let (store, mut index, _) = setup("- [ ] a\n");
        add_new(&store, &ColumnTag::new("Today"), "b", "Board", Some("Tasks.md")).unwrap();
        let report = index
            .reconcile_document(&store, PATH, &columns(), &PathLinkResolver)
            .unwrap();
        assert_eq!(report.added.len(), 1);
        let task = index.get(&report.added[0]).unwrap();
        assert_eq!(task.content, "b");
        assert_eq!(task.column().map(|c| c.tag()), Some("Today"));
    }

    #[test]
    fn test_add_new_rejects_bad_paths() {
        let store = MemoryStore::new();
        let today = ColumnTag::new("Today");
        assert!(matches!(
            add_new(&store, &today, "x", "", Some("Tasks?.md")),
            Err(TaskOpError::ForbiddenPath(_))
        ));
        assert!(matches!(
            add_new(&store, &today, "x", "", Some("  ")),
            Err(TaskOpError::NoTaskPath)
        ));
        assert!(matches!(
            add_new(&store, &today, "x", "", None),
            Err(TaskOpError::NoTaskPath)
        ));
        assert!(store.list_documents("").unwrap().is_empty());
    }
}
