use std::sync::OnceLock;

use indexmap::IndexSet;
use regex::Regex;

use crate::model::column::{ColumnTag, ColumnTagTable};
use crate::model::link::{display_form, InternalLink, LinkResolver};
use crate::model::task::{Task, TaskParts};
use crate::parse::tags::extract_tags;

/// Lines containing this marker are archived and never read back as tasks
pub const ARCHIVED_MARKER: &str = "#archived";

/// Error type for task line parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskParseError {
    #[error("attempted to create a task from invalid raw content")]
    InvalidContent,
    #[error("content not found in raw content")]
    MissingContent,
}

/// Fields of a task line before column resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskContent {
    /// Body after the checkbox, internal links in display form
    pub content: String,
    /// Tags of the raw body, in order of appearance
    pub tags: IndexSet<String>,
    pub is_done: bool,
    pub internal_links: Vec<InternalLink>,
    pub block_link: Option<String>,
}

/// Check whether a line is a task line: `- [ ] text`, `- [x] text` or
/// `- [X] text` after optional indentation. Archived lines never are.
pub fn is_task_line(line: &str) -> bool {
    if line.contains(ARCHIVED_MARKER) {
        return false;
    }
    match_checkbox(line).is_some_and(|checkbox| !checkbox.body.is_empty())
}

/// Parse a task line into its fields. The block link is split off before the
/// checkbox grammar is applied.
pub fn parse_task_content(
    line: &str,
    resolver: &dyn LinkResolver,
) -> Result<TaskContent, TaskParseError> {
    let (rest, block_link) = split_block_link(line);
    let checkbox = match_checkbox(rest).ok_or(TaskParseError::InvalidContent)?;
    if checkbox.body.is_empty() {
        return Err(TaskParseError::MissingContent);
    }

    let tags = extract_tags(checkbox.body);
    let (content, internal_links) = rewrite_internal_links(checkbox.body, resolver);

    Ok(TaskContent {
        content,
        tags,
        is_done: matches!(checkbox.status, 'x' | 'X'),
        internal_links,
        block_link: block_link.map(str::to_string),
    })
}

/// Parse a task line found at `row_index` of `path` and resolve its column.
///
/// Tags in the column vocabulary (and `done`) are column candidates: the
/// first one becomes the column, and every candidate is removed from both
/// the tag set and the content. A done task keeps no column.
pub fn parse_task(
    line: &str,
    path: &str,
    row_index: usize,
    columns: &ColumnTagTable,
    resolver: &dyn LinkResolver,
) -> Result<Task, TaskParseError> {
    let TaskContent {
        mut content,
        mut tags,
        is_done,
        mut internal_links,
        block_link,
    } = parse_task_content(line, resolver)?;

    let candidates: Vec<String> = tags
        .iter()
        .filter(|tag| columns.contains(tag) || tag.as_str() == ColumnTag::DONE)
        .cloned()
        .collect();

    let mut column = None;
    for tag in candidates {
        if column.is_none() {
            column = Some(
                columns
                    .get(&tag)
                    .cloned()
                    .unwrap_or_else(ColumnTag::done),
            );
        }
        tags.shift_remove(&tag);
        content = strip_tag(&content, &tag, &mut internal_links);
    }

    Ok(Task::from_parts(
        TaskParts {
            content,
            done: is_done,
            column,
            tags,
            block_link,
            internal_links,
        },
        path,
        row_index,
    ))
}

/// Split a trailing ` ^anchor` off a line. Anchors are letters (`\p{L}`),
/// digits (`\p{N}`) and hyphens; combining marks do not count.
/// Returns the line without the suffix and the anchor.
pub fn split_block_link(line: &str) -> (&str, Option<&str>) {
    static BLOCK_LINK: OnceLock<Option<Regex>> = OnceLock::new();
    let re = BLOCK_LINK.get_or_init(|| Regex::new(r"\s\^([\p{L}\p{N}-]+)$").ok());

    match re.as_ref().and_then(|re| re.captures(line)) {
        Some(caps) => match (caps.get(0), caps.get(1)) {
            (Some(whole), Some(anchor)) => (&line[..whole.start()], Some(anchor.as_str())),
            _ => (line, None),
        },
        None => (line, None),
    }
}

/// The checkbox part of a task line
struct Checkbox<'a> {
    status: char,
    body: &'a str,
}

/// Walk `- [s] body`: dash, one whitespace, bracketed status, one whitespace,
/// then the body up to the first line break.
fn match_checkbox(line: &str) -> Option<Checkbox<'_>> {
    let rest = line.trim_start().strip_prefix('-')?;
    let rest = strip_one_whitespace(rest)?;
    let rest = rest.strip_prefix('[')?;

    let mut chars = rest.chars();
    let status = chars
        .next()
        .filter(|c| matches!(c, 'x' | 'X') || c.is_whitespace())?;
    let rest = chars.as_str().strip_prefix(']')?;
    let rest = strip_one_whitespace(rest)?;

    let end = rest.find(is_line_break).unwrap_or(rest.len());
    Some(Checkbox {
        status,
        body: &rest[..end],
    })
}

fn strip_one_whitespace(s: &str) -> Option<&str> {
    let mut chars = s.chars();
    chars.next().filter(|c| c.is_whitespace())?;
    Some(chars.as_str())
}

fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Rewrite each ` [[label]]` into its display form, numbering links from 0
/// and recording where each display form starts.
fn rewrite_internal_links(
    body: &str,
    resolver: &dyn LinkResolver,
) -> (String, Vec<InternalLink>) {
    let mut content = String::with_capacity(body.len());
    let mut links = Vec::new();
    let mut copied = 0;

    for (idx, (start, link_text, label)) in find_internal_links(body).into_iter().enumerate() {
        let id = idx.to_string();
        content.push_str(&body[copied..start]);
        let offset = content.len();
        content.push_str(&display_form(label, &id));
        copied = start + link_text.len();
        links.push(InternalLink {
            id,
            label: label.to_string(),
            link_text: link_text.to_string(),
            target: resolver.resolve(label),
            offset,
        });
    }
    content.push_str(&body[copied..]);

    (content, links)
}

/// Find ` [[label]]` occurrences: whitespace, `[[`, a non-empty label
/// without `]`, `]]`. Returns (start, matched text, label) left to right.
fn find_internal_links(body: &str) -> Vec<(usize, &str, &str)> {
    let mut found = Vec::new();
    let mut from = 0;

    while let Some(offset) = body[from..].find("[[") {
        let open = from + offset;
        let Some(ws) = body[..open].chars().next_back().filter(|c| c.is_whitespace()) else {
            from = open + 1;
            continue;
        };

        let label_start = open + 2;
        let label_end = body[label_start..]
            .find(']')
            .map_or(body.len(), |len| label_start + len);
        if label_end > label_start && body[label_end..].starts_with("]]") {
            let start = open - ws.len_utf8();
            found.push((
                start,
                &body[start..label_end + 2],
                &body[label_start..label_end],
            ));
            from = label_end + 2;
        } else {
            from = open + 1;
        }
    }

    found
}

/// Remove `#tag ` and a trailing `#tag` from content, then trim. Link
/// offsets are moved to follow the text they point at.
fn strip_tag(content: &str, tag: &str, links: &mut [InternalLink]) -> String {
    let escaped = regex::escape(tag);
    let Ok(re) = Regex::new(&format!("#{0} |#{0}$", escaped)) else {
        return content.to_string();
    };

    let mut out = String::with_capacity(content.len());
    let mut copied = 0;
    // (start of the match in `content`, bytes removed)
    let mut cuts = Vec::new();
    for m in re.find_iter(content) {
        out.push_str(&content[copied..m.start()]);
        out.push(' ');
        copied = m.end();
        cuts.push((m.start(), m.len() - 1));
    }
    out.push_str(&content[copied..]);

    let leading = out.len() - out.trim_start().len();
    for link in links.iter_mut() {
        // A match that swallowed the space opening a display form leaves
        // the form starting at the replacement space
        let removed: usize = cuts
            .iter()
            .filter(|(start, _)| *start < link.offset)
            .map(|(start, len)| (*len).min(link.offset - start))
            .sum();
        link.offset = link.offset.saturating_sub(removed + leading);
    }
    out.trim().to_string()
}
