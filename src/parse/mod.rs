pub mod tags;
pub mod task_parser;
pub mod task_serializer;

pub use tags::{extract_tags, normalize_tag};
pub use task_parser::{
    ARCHIVED_MARKER, TaskContent, TaskParseError, is_task_line, parse_task, parse_task_content,
    split_block_link,
};
pub use task_serializer::serialize_task;
