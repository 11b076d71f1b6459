use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::io::store::{DocumentStore, StoreError};
use crate::model::column::ColumnTagTable;
use crate::model::link::LinkResolver;
use crate::model::task::Task;
use crate::ops::task_ops::TaskOpError;
use crate::parse::{TaskParseError, is_task_line, parse_task};

/// Error type for reconciliation of one document
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("could not read {path}: {source}")]
    Read { path: String, source: StoreError },
    #[error("{path}:{}: {source}", .line + 1)]
    Task {
        path: String,
        /// Zero-based line index
        line: usize,
        source: TaskParseError,
    },
}

impl ReconcileError {
    pub fn path(&self) -> &str {
        match self {
            ReconcileError::Read { path, .. } | ReconcileError::Task { path, .. } => path,
        }
    }
}

/// Where a task line lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskLocation {
    pub path: String,
    pub row_index: usize,
}

/// Outcome of reconciling one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub path: String,
    /// Ids found in this pass, in line order
    pub seen: Vec<String>,
    /// Ids that were not in the previous snapshot
    pub added: Vec<String>,
    /// Ids of the previous snapshot that were not reproduced, sorted
    pub evicted: Vec<String>,
}

/// A document that could not be reconciled during a board-wide scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    pub path: String,
    pub error: String,
}

/// Outcome of a board-wide scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub documents: Vec<ReconcileReport>,
    /// Previously indexed documents that are no longer part of the board
    pub forgotten: Vec<String>,
    pub failures: Vec<ScanFailure>,
}

impl ScanReport {
    pub fn evicted(&self) -> usize {
        self.documents.iter().map(|d| d.evicted.len()).sum()
    }

    pub fn added(&self) -> usize {
        self.documents.iter().map(|d| d.added.len()).sum()
    }
}

/// The board's task index: tasks and their locations keyed by id, plus the
/// snapshot of ids each document produced on its last successful
/// reconciliation.
///
/// Callers reconcile one document at a time through `&mut self`.
#[derive(Debug, Default)]
pub struct BoardIndex {
    tasks: HashMap<String, Task>,
    locations: HashMap<String, TaskLocation>,
    snapshots: HashMap<String, HashSet<String>>,
}

impl BoardIndex {
    pub fn new() -> Self {
        BoardIndex::default()
    }

    /// Read `path` from the store and fold its tasks into the index.
    ///
    /// Fails closed: if the document cannot be read, or a recognized line
    /// does not parse, the index is left exactly as it was.
    pub fn reconcile_document<S: DocumentStore + ?Sized>(
        &mut self,
        store: &S,
        path: &str,
        columns: &ColumnTagTable,
        resolver: &dyn LinkResolver,
    ) -> Result<ReconcileReport, ReconcileError> {
        let text = store
            .read_whole(path)
            .map_err(|source| ReconcileError::Read {
                path: path.to_string(),
                source,
            })?;
        self.reconcile_text(path, &text, columns, resolver)
    }

    /// Fold already-read document text into the index.
    pub fn reconcile_text(
        &mut self,
        path: &str,
        text: &str,
        columns: &ColumnTagTable,
        resolver: &dyn LinkResolver,
    ) -> Result<ReconcileReport, ReconcileError> {
        let found = scan_text(text, path, columns, resolver)?;

        let mut previous = self.snapshots.remove(path).unwrap_or_default();
        let mut seen = HashSet::with_capacity(found.len());
        let mut report = ReconcileReport {
            path: path.to_string(),
            ..ReconcileReport::default()
        };

        for task in found {
            let id = task.id().to_string();
            if !previous.remove(&id) && !seen.contains(&id) {
                report.added.push(id.clone());
            }
            self.locations.insert(
                id.clone(),
                TaskLocation {
                    path: path.to_string(),
                    row_index: task.row_index(),
                },
            );
            self.tasks.insert(id.clone(), task);
            report.seen.push(id.clone());
            seen.insert(id);
        }

        for id in previous {
            self.tasks.remove(&id);
            self.locations.remove(&id);
            report.evicted.push(id);
        }
        report.evicted.sort();

        self.snapshots.insert(path.to_string(), seen);

        debug!(
            path,
            seen = report.seen.len(),
            added = report.added.len(),
            evicted = report.evicted.len(),
            "reconciled document"
        );
        Ok(report)
    }

    /// Reconcile every document of the board. A document that fails is
    /// logged and keeps its previous snapshot. Indexed documents missing
    /// from `documents` are forgotten.
    pub fn scan<S: DocumentStore + ?Sized>(
        &mut self,
        store: &S,
        documents: &[String],
        columns: &ColumnTagTable,
        resolver: &dyn LinkResolver,
    ) -> ScanReport {
        let mut report = ScanReport::default();

        let listed: HashSet<&str> = documents.iter().map(String::as_str).collect();
        let mut stale: Vec<String> = self
            .snapshots
            .keys()
            .filter(|path| !listed.contains(path.as_str()))
            .cloned()
            .collect();
        stale.sort();
        for path in stale {
            self.forget_document(&path);
            report.forgotten.push(path);
        }

        for path in documents {
            match self.reconcile_document(store, path, columns, resolver) {
                Ok(doc) => report.documents.push(doc),
                Err(e) => {
                    warn!(path = e.path(), error = %e, "skipping document");
                    report.failures.push(ScanFailure {
                        path: path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Evict every task of a document that no longer exists. Returns the
    /// evicted ids, sorted.
    pub fn forget_document(&mut self, path: &str) -> Vec<String> {
        let mut evicted: Vec<String> = self
            .snapshots
            .remove(path)
            .unwrap_or_default()
            .into_iter()
            .collect();
        for id in &evicted {
            self.tasks.remove(id);
            self.locations.remove(id);
        }
        evicted.sort();
        if !evicted.is_empty() {
            debug!(path, evicted = evicted.len(), "forgot document");
        }
        evicted
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    pub fn location(&self, id: &str) -> Option<&TaskLocation> {
        self.locations.get(id)
    }

    /// Ids a document produced on its last successful reconciliation
    pub fn snapshot(&self, path: &str) -> Option<&HashSet<String>> {
        self.snapshots.get(path)
    }

    /// Resolve a full id or a unique id prefix.
    pub fn resolve_id(&self, prefix: &str) -> Result<&str, TaskOpError> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(TaskOpError::NotFound(prefix.to_string()));
        }
        if let Some((id, _)) = self.tasks.get_key_value(prefix) {
            return Ok(id.as_str());
        }
        let mut matches = self.tasks.keys().filter(|id| id.starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(id.as_str()),
            (None, _) => Err(TaskOpError::NotFound(prefix.to_string())),
            (Some(_), Some(_)) => Err(TaskOpError::AmbiguousId(prefix.to_string())),
        }
    }

    /// All tasks in document, then line order
    pub fn tasks(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.values().collect();
        tasks.sort_by(|a, b| {
            a.path()
                .cmp(b.path())
                .then(a.row_index().cmp(&b.row_index()))
        });
        tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Parse every task line of a document. Empty and non-task lines are
/// skipped; a line that looks like a task but does not parse is an error.
pub fn scan_text(
    text: &str,
    path: &str,
    columns: &ColumnTagTable,
    resolver: &dyn LinkResolver,
) -> Result<Vec<Task>, ReconcileError> {
    let mut tasks = Vec::new();
    for (row_index, line) in text.split('\n').enumerate() {
        if line.is_empty() || !is_task_line(line) {
            continue;
        }
        let task = parse_task(line, path, row_index, columns, resolver).map_err(|source| {
            ReconcileError::Task {
                path: path.to_string(),
                line: row_index,
                source,
            }
        })?;
        tasks.push(task);
    }
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::MemoryStore;
    use crate::model::column::{Column, ColumnTag};
    use crate::model::link::PathLinkResolver;
    use pretty_assertions::assert_eq;

    const DOC: &str = "# Groceries\n\
- [ ] Buy milk #today\n\
not a task\n\
\n\
- [x] Buy bread\n\
- [ ] Old thing #archived\n\
- [ ] Sort photos #later ^n1\n";

    fn columns() -> ColumnTagTable {
        ColumnTagTable::from_names(["today", "later"])
    }

    fn reconcile(index: &mut BoardIndex, store: &MemoryStore, path: &str) -> ReconcileReport {
        index
            .reconcile_document(store, path, &columns(), &PathLinkResolver)
            .unwrap()
    }

    #[test]
    fn test_scan_text_picks_task_lines() {
        let tasks = scan_text(DOC, "Tasks.md", &columns(), &PathLinkResolver).unwrap();
        let rows: Vec<usize> = tasks.iter().map(|t| t.row_index()).collect();
        assert_eq!(rows, vec![1, 4, 6]);
        assert_eq!(tasks[0].content, "Buy milk");
        assert_eq!(
            tasks[0].column(),
            Some(&Column::Tag(ColumnTag::new("today")))
        );
        assert!(tasks[1].done());
        assert_eq!(tasks[2].block_link(), Some("n1"));
    }

    #[test]
    fn test_first_reconcile_adds_everything() {
        let store = MemoryStore::new().with_document("Tasks.md", DOC);
        let mut index = BoardIndex::new();
        let report = reconcile(&mut index, &store, "Tasks.md");

        assert_eq!(report.seen.len(), 3);
        assert_eq!(report.added, report.seen);
        assert!(report.evicted.is_empty());
        assert_eq!(index.len(), 3);

        let id = &report.seen[0];
        assert_eq!(
            index.location(id),
            Some(&TaskLocation {
                path: "Tasks.md".to_string(),
                row_index: 1
            })
        );
        assert_eq!(index.get(id).map(|t| t.content.as_str()), Some("Buy milk"));
    }

    #[test]
    fn test_unchanged_rescan_evicts_nothing() {
        let store = MemoryStore::new().with_document("Tasks.md", DOC);
        let mut index = BoardIndex::new();
        let first = reconcile(&mut index, &store, "Tasks.md");
        let second = reconcile(&mut index, &store, "Tasks.md");

        assert_eq!(first.seen, second.seen);
        assert!(second.added.is_empty());
        assert!(second.evicted.is_empty());
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_removed_line_evicts_exactly_that_task() {
        let store = MemoryStore::new().with_document("Tasks.md", "- [ ] a\n- [ ] b\n- [ ] c\n");
        let mut index = BoardIndex::new();
        let first = reconcile(&mut index, &store, "Tasks.md");

        store
            .write_whole("Tasks.md", "- [ ] a\n- [ ] b\n\n")
            .unwrap();
        let second = reconcile(&mut index, &store, "Tasks.md");

        assert_eq!(second.evicted, vec![first.seen[2].clone()]);
        assert!(second.added.is_empty());
        assert!(index.get(&first.seen[2]).is_none());
        assert!(index.location(&first.seen[2]).is_none());
        assert!(index.get(&first.seen[0]).is_some());
        assert!(index.get(&first.seen[1]).is_some());
    }

    #[test]
    fn test_shifted_line_gets_new_identity() {
        let store = MemoryStore::new().with_document("Tasks.md", "- [ ] a\n- [ ] b\n");
        let mut index = BoardIndex::new();
        let first = reconcile(&mut index, &store, "Tasks.md");

        store
            .write_whole("Tasks.md", "- [ ] new\n- [ ] a\n- [ ] b\n")
            .unwrap();
        let second = reconcile(&mut index, &store, "Tasks.md");

        assert_eq!(second.added.len(), 3);
        let mut expected = first.seen.clone();
        expected.sort();
        assert_eq!(second.evicted, expected);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_read_failure_leaves_index_untouched() {
        let store = MemoryStore::new().with_document("Tasks.md", DOC);
        let mut index = BoardIndex::new();
        let first = reconcile(&mut index, &store, "Tasks.md");

        store.remove("Tasks.md");
        let err = index
            .reconcile_document(&store, "Tasks.md", &columns(), &PathLinkResolver)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Read { .. }));
        assert_eq!(index.len(), 3);
        assert_eq!(index.snapshot("Tasks.md").map(|s| s.len()), Some(3));
        for id in &first.seen {
            assert!(index.get(id).is_some());
        }
    }

    #[test]
    fn test_unparsable_task_line_fails_closed() {
        let store = MemoryStore::new().with_document("Tasks.md", "- [ ] a\n");
        let mut index = BoardIndex::new();
        reconcile(&mut index, &store, "Tasks.md");

        store.write_whole("Tasks.md", "- [ ] b\n- [ ] ^abc\n").unwrap();
        let err = index
            .reconcile_document(&store, "Tasks.md", &columns(), &PathLinkResolver)
            .unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Task {
                line: 1,
                source: TaskParseError::InvalidContent,
                ..
            }
        ));
        assert_eq!(err.to_string(), format!("Tasks.md:2: {}", TaskParseError::InvalidContent));
        assert_eq!(index.tasks()[0].content, "a");
    }

    #[test]
    fn test_documents_are_reconciled_independently() {
        let store = MemoryStore::new()
            .with_document("a.md", "- [ ] same\n")
            .with_document("b.md", "- [ ] same\n");
        let mut index = BoardIndex::new();
        let a = reconcile(&mut index, &store, "a.md");
        let b = reconcile(&mut index, &store, "b.md");
        assert_ne!(a.seen, b.seen);

        store.write_whole("a.md", "").unwrap();
        let a2 = reconcile(&mut index, &store, "a.md");
        assert_eq!(a2.evicted, a.seen);
        assert_eq!(index.len(), 1);
        assert!(index.get(&b.seen[0]).is_some());
    }

    #[test]
    fn test_scan_skips_failures_and_forgets_missing_documents() {
        let store = MemoryStore::new()
            .with_document("a.md", "- [ ] one\n")
            .with_document("b.md", "- [ ] two\n");
        let mut index = BoardIndex::new();
        let docs = vec!["a.md".to_string(), "b.md".to_string()];
        let report = index.scan(&store, &docs, &columns(), &PathLinkResolver);
        assert_eq!(report.documents.len(), 2);
        assert_eq!(report.added(), 2);

        store.remove("a.md");
        let report = index.scan(&store, &docs, &columns(), &PathLinkResolver);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "a.md");
        assert_eq!(index.len(), 2);

        let report = index.scan(&store, &docs[1..], &columns(), &PathLinkResolver);
        assert_eq!(report.forgotten, vec!["a.md"]);
        assert_eq!(report.evicted(), 0);
        assert_eq!(index.len(), 1);
        assert_eq!(index.tasks()[0].content, "two");
    }

    #[test]
    fn test_forget_document() {
        let store = MemoryStore::new().with_document("Tasks.md", DOC);
        let mut index = BoardIndex::new();
        reconcile(&mut index, &store, "Tasks.md");
        assert_eq!(index.forget_document("Tasks.md").len(), 3);
        assert!(index.is_empty());
        assert!(index.forget_document("Tasks.md").is_empty());
    }

    #[test]
    fn test_resolve_id_by_prefix() {
        let store = MemoryStore::new().with_document("Tasks.md", "- [ ] a\n- [ ] b\n");
        let mut index = BoardIndex::new();
        let report = reconcile(&mut index, &store, "Tasks.md");
        let id = &report.seen[0];

        assert_eq!(index.resolve_id(id).unwrap(), id.as_str());
        assert_eq!(index.resolve_id(&id[..12]).unwrap(), id.as_str());
        assert!(matches!(
            index.resolve_id("zzz"),
            Err(TaskOpError::NotFound(_))
        ));
        assert!(matches!(index.resolve_id(""), Err(TaskOpError::NotFound(_))));
    }

    #[test]
    fn test_tasks_in_document_order() {
        let store = MemoryStore::new()
            .with_document("b.md", "- [ ] b1\n- [ ] b2\n")
            .with_document("a.md", "\n\n- [ ] a1\n");
        let mut index = BoardIndex::new();
        reconcile(&mut index, &store, "b.md");
        reconcile(&mut index, &store, "a.md");
        let contents: Vec<&str> = index.tasks().iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["a1", "b1", "b2"]);
    }
}
