use indexmap::IndexSet;

/// Normalize a raw `#token` into a tag name: drop every `#` and every
/// whitespace character, then trim.
pub fn normalize_tag(token: &str) -> String {
    token
        .chars()
        .filter(|c| *c != '#' && !c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Collect the distinct tags of a piece of text, in order of first appearance.
///
/// A tag starts with a `#` at the beginning of the text or after whitespace
/// and runs to the next whitespace. Any further `#` inside that run (nested
/// tags such as `#area#home`) stays part of the same token.
pub fn extract_tags(text: &str) -> IndexSet<String> {
    let mut tags = IndexSet::new();
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        let at_boundary = prev.is_none_or(char::is_whitespace);
        if c == '#' && at_boundary {
            let start = idx + c.len_utf8();
            let mut end = start;
            let mut last = c;
            while let Some(&(next_idx, next)) = chars.peek() {
                if next.is_whitespace() {
                    break;
                }
                end = next_idx + next.len_utf8();
                last = next;
                chars.next();
            }
            let tag = normalize_tag(&text[start..end]);
            if !tag.is_empty() {
                tags.insert(tag);
            }
            prev = Some(last);
        } else {
            prev = Some(c);
        }
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(text: &str) -> Vec<String> {
        extract_tags(text).into_iter().collect()
    }

    #[test]
    fn test_normalize_strips_hash_and_whitespace() {
        assert_eq!(normalize_tag("#today"), "today");
        assert_eq!(normalize_tag("Next week"), "Nextweek");
        assert_eq!(normalize_tag(" #a\t#b "), "ab");
        assert_eq!(normalize_tag("##"), "");
    }

    #[test]
    fn test_extract_simple_tags_in_order() {
        assert_eq!(tags("Something #tag #column"), vec!["tag", "column"]);
        assert_eq!(tags("#first word #second"), vec!["first", "second"]);
    }

    #[test]
    fn test_extract_deduplicates() {
        assert_eq!(tags("#a #b #a"), vec!["a", "b"]);
    }

    #[test]
    fn test_hash_inside_word_is_not_a_tag() {
        assert!(tags("issue#3 and [one](#internal-0)").is_empty());
        assert!(tags("C# code").is_empty());
    }

    #[test]
    fn test_nested_tags_stay_one_token() {
        assert_eq!(tags("Plan #area#home"), vec!["areahome"]);
        assert_eq!(tags("#project/alpha"), vec!["project/alpha"]);
    }

    #[test]
    fn test_unicode_tags() {
        assert_eq!(tags("Réunion #équipe #今日"), vec!["équipe", "今日"]);
    }

    #[test]
    fn test_lone_hash_is_ignored() {
        assert!(tags("a # b ##").is_empty());
    }
}
