use indexmap::IndexSet;
use sha2::{Digest, Sha256};

use super::column::{Column, ColumnTag};
use super::link::InternalLink;

/// One task line of a document, as held by the board.
///
/// Built once per recognized line during a scan (see
/// [`crate::parse::parse_task`]). The `done`/`column` pair only changes
/// through the transition methods, each of which rewrites both fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: String,
    /// Body text without the resolved column tag, internal links in display form
    pub content: String,
    done: bool,
    column: Option<Column>,
    tags: IndexSet<String>,
    block_link: Option<String>,
    internal_links: Vec<InternalLink>,
    path: String,
    row_index: usize,
    deleted: bool,
}

/// Parsed fields a task is assembled from
#[derive(Debug, Clone)]
pub struct TaskParts {
    pub content: String,
    pub done: bool,
    pub column: Option<ColumnTag>,
    pub tags: IndexSet<String>,
    pub block_link: Option<String>,
    pub internal_links: Vec<InternalLink>,
}

impl Task {
    /// Assemble a task found at `row_index` of the document at `path`.
    /// A done task never keeps a column.
    pub fn from_parts(parts: TaskParts, path: &str, row_index: usize) -> Self {
        let column = if parts.done {
            None
        } else {
            parts.column.map(Column::Tag)
        };
        Task {
            id: fingerprint(&parts.content, path, row_index),
            content: parts.content,
            done: parts.done,
            column,
            tags: parts.tags,
            block_link: parts.block_link,
            internal_links: parts.internal_links,
            path: path.to_string(),
            row_index,
            deleted: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn done(&self) -> bool {
        self.done
    }

    pub fn column(&self) -> Option<&Column> {
        self.column.as_ref()
    }

    pub fn is_archived(&self) -> bool {
        self.column == Some(Column::Archived)
    }

    /// Tags left after column resolution
    pub fn tags(&self) -> &IndexSet<String> {
        &self.tags
    }

    pub fn block_link(&self) -> Option<&str> {
        self.block_link.as_deref()
    }

    pub fn internal_links(&self) -> &[InternalLink] {
        &self.internal_links
    }

    /// Owning document, vault-relative
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Zero-based line of the document this task was parsed from
    pub fn row_index(&self) -> usize {
        self.row_index
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Content with internal links back in their `[[target]]` source form.
    ///
    /// Each link is restored at its recorded offset. When the content was
    /// replaced and the offset no longer holds the display form, the first
    /// free occurrence of the display form is used instead.
    pub fn source_content(&self) -> String {
        let mut spans: Vec<(usize, usize, &str)> = Vec::new();
        for link in &self.internal_links {
            let display = link.display_form();
            let recorded = self
                .content
                .get(link.offset..)
                .is_some_and(|rest| rest.starts_with(&display));
            let start = if recorded {
                Some(link.offset)
            } else {
                self.content
                    .match_indices(&display)
                    .map(|(at, _)| at)
                    .find(|at| !overlaps(&spans, *at, at + display.len()))
            };
            if let Some(start) = start
                && !overlaps(&spans, start, start + display.len())
            {
                spans.push((start, start + display.len(), &link.link_text));
            }
        }
        spans.sort_by_key(|(start, _, _)| *start);

        let mut content = String::with_capacity(self.content.len());
        let mut copied = 0;
        for (start, end, link_text) in spans {
            content.push_str(&self.content[copied..start]);
            content.push_str(link_text);
            copied = end;
        }
        content.push_str(&self.content[copied..]);
        content
    }

    pub fn mark_done(&mut self) {
        self.done = true;
        self.column = None;
    }

    pub fn change_column(&mut self, column: ColumnTag) {
        self.column = Some(Column::Tag(column));
        self.done = false;
    }

    pub fn archive(&mut self) {
        self.done = true;
        self.column = Some(Column::Archived);
    }

    /// Terminal: a deleted task serializes to the empty string.
    pub fn delete(&mut self) {
        self.deleted = true;
    }
}

fn overlaps(spans: &[(usize, usize, &str)], start: usize, end: usize) -> bool {
    spans.iter().any(|(s, e, _)| start < *e && *s < end)
}

/// Task identity: SHA-256 over content, document path and line index.
///
/// Any change to one of the three yields a different id.
pub fn fingerprint(content: &str, path: &str, row_index: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher.update(path.as_bytes());
    hasher.update(row_index.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
