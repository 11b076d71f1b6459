use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Cells a tab occupies in listings
const TAB_WIDTH: usize = 4;

const ELLIPSIS: char = '\u{2026}';

/// Display width in terminal cells, summed per grapheme cluster.
pub fn display_width(s: &str) -> usize {
    s.graphemes(true).map(grapheme_width).sum()
}

/// Cut `s` so it fits in `max_cells` terminal cells. A cut string ends in
/// `…`, which takes one of the cells. Graphemes are never split.
pub fn truncate_to_width(s: &str, max_cells: usize) -> String {
    if display_width(s) <= max_cells {
        return s.to_string();
    }
    let Some(budget) = max_cells.checked_sub(1) else {
        return String::new();
    };

    let mut used = 0;
    let mut out = String::new();
    for g in s.graphemes(true) {
        used += grapheme_width(g);
        if used > budget {
            break;
        }
        out.push_str(g);
    }
    out.push(ELLIPSIS);
    out
}

fn grapheme_width(g: &str) -> usize {
    if g == "\t" {
        TAB_WIDTH
    } else {
        UnicodeWidthStr::width(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_width() {
        assert_eq!(display_width(""), 0);
        assert_eq!(display_width("Buy milk"), 8);
        assert_eq!(display_width("買い物"), 6);
        assert_eq!(display_width("🎉 party"), 8);
        assert_eq!(display_width("cafe\u{0301}"), 4);
        assert_eq!(display_width("a\tb"), 6);
    }

    #[test]
    fn test_truncate_fits() {
        assert_eq!(truncate_to_width("Buy milk", 8), "Buy milk");
        assert_eq!(truncate_to_width("Buy milk", 80), "Buy milk");
    }

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_to_width("Call the plumber", 9), "Call the…");
    }

    #[test]
    fn test_truncate_wide_graphemes() {
        // Budget of 4 cells holds two wide characters
        assert_eq!(truncate_to_width("買い物リスト", 5), "買い…");
        // A wide character that would overflow is dropped whole
        let cut = truncate_to_width("買い物リスト", 4);
        assert_eq!(cut, "買…");
        assert!(display_width(&cut) <= 4);
        assert_eq!(truncate_to_width("🎉🚀💫", 4), "🎉…");
    }

    #[test]
    fn test_truncate_tiny_widths() {
        assert_eq!(truncate_to_width("hello", 0), "");
        assert_eq!(truncate_to_width("hello", 1), "…");
    }
}
