use serde::{Deserialize, Serialize};

/// Where an internal link points inside the vault
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTarget {
    pub path: String,
    /// Heading or block reference, including its leading `#` (empty if none)
    pub subpath: String,
}

/// A `[[target]]` reference found in task content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalLink {
    /// Sequence number within its task line (`"0"`, `"1"`, ...)
    pub id: String,
    /// The text between the brackets
    pub label: String,
    /// The matched source text, including the whitespace before `[[`
    pub link_text: String,
    pub target: LinkTarget,
    /// Byte offset of the display form within the task content
    #[serde(default)]
    pub offset: usize,
}

impl InternalLink {
    /// The form the link takes inside task content: ` [label](#internal-<id>)`
    pub fn display_form(&self) -> String {
        display_form(&self.label, &self.id)
    }
}

pub(crate) fn display_form(label: &str, id: &str) -> String {
    format!(" [{}](#internal-{})", label, id)
}

/// Resolves the text inside `[[...]]` into a vault target.
///
/// Implementations must be pure and total: every label resolves to something,
/// whether or not the target exists.
pub trait LinkResolver {
    fn resolve(&self, link_text: &str) -> LinkTarget;
}

impl<F> LinkResolver for F
where
    F: Fn(&str) -> LinkTarget,
{
    fn resolve(&self, link_text: &str) -> LinkTarget {
        self(link_text)
    }
}

/// Resolver that reads the link text as `path#subpath|alias`
#[derive(Debug, Clone, Copy, Default)]
pub struct PathLinkResolver;

impl LinkResolver for PathLinkResolver {
    fn resolve(&self, link_text: &str) -> LinkTarget {
        let without_alias = link_text
            .split_once('|')
            .map_or(link_text, |(target, _)| target);
        match without_alias.find('#') {
            Some(idx) => LinkTarget {
                path: without_alias[..idx].trim().to_string(),
                subpath: without_alias[idx..].trim().to_string(),
            },
            None => LinkTarget {
                path: without_alias.trim().to_string(),
                subpath: String::new(),
            },
        }
    }
}
