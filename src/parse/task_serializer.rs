use crate::model::task::Task;

/// Serialize a task back to its line.
///
/// Canonical format: `- [x] content #column ^anchor`, trailing whitespace
/// trimmed. Internal links go back to their `[[label]]` source form.
/// A deleted task serializes to the empty string, which write-back reads as
/// "remove this line".
pub fn serialize_task(task: &Task) -> String {
    if task.is_deleted() {
        return String::new();
    }

    let content = task.source_content();
    let mut line = format!(
        "- [{}] {}",
        if task.done() { 'x' } else { ' ' },
        content.trim()
    );

    if let Some(column) = task.column() {
        line.push_str(&format!(" #{}", column));
    }

    if let Some(anchor) = task.block_link() {
        line.push_str(&format!(" ^{}", anchor));
    }

    line.trim_end().to_string()
}
