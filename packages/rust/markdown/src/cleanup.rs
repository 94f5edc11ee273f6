//! Post-conversion cleanup pipeline for extracted Markdown.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! The goal is compact evidence text, not faithful rendering: links and
//! images collapse to their text and whitespace is squeezed.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on raw Markdown text.
pub(crate) fn run_pipeline(md: &str) -> String {
    let mut result = md.to_string();

    result = strip_leftover_html(&result);
    result = flatten_links(&result);
    result = collapse_inline_whitespace(&result);
    result = drop_empty_markup_lines(&result);
    result = clean_blank_lines(&result);

    result.trim().to_string()
}

// ---------------------------------------------------------------------------
// Pass 1: Strip leftover HTML tags
// ---------------------------------------------------------------------------

/// Remove stray HTML tags that survived the conversion, keeping inner text.
fn strip_leftover_html(md: &str) -> String {
    static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"</?[a-zA-Z][a-zA-Z0-9]*(?:\s[^>]*)?/?>").expect("valid regex")
    });

    HTML_TAG_RE.replace_all(md, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 2: Flatten links and images
// ---------------------------------------------------------------------------

/// Replace `[text](url)` with `text` and drop `![alt](src)` entirely.
fn flatten_links(md: &str) -> String {
    static IMAGE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid regex"));
    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid regex"));

    let without_images = IMAGE_RE.replace_all(md, "");
    LINK_RE.replace_all(&without_images, "$1").to_string()
}

// ---------------------------------------------------------------------------
// Pass 3: Collapse inline whitespace
// ---------------------------------------------------------------------------

/// Squeeze runs of spaces/tabs and trim every line.
fn collapse_inline_whitespace(md: &str) -> String {
    static SPACES_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("valid regex"));

    md.lines()
        .map(|line| SPACES_RE.replace_all(line, " ").trim().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 4: Drop markup-only lines
// ---------------------------------------------------------------------------

/// Remove lines left with nothing but list bullets, emphasis or rules.
fn drop_empty_markup_lines(md: &str) -> String {
    md.lines()
        .filter(|line| {
            line.is_empty()
                || line
                    .chars()
                    .any(|c| !matches!(c, '*' | '-' | '_' | '#' | '>' | '|' | ' ' | '+'))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 5: Clean up excessive blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of blank lines into a single blank line.
fn clean_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_leftover_html_keeps_text() {
        let input = "<div class=\"note\">Important info</div><br/>";
        assert_eq!(strip_leftover_html(input), "Important info");
    }

    #[test]
    fn flatten_links_keeps_link_text() {
        let input = "See [the report](https://gse.it/r.pdf) and ![chart](/c.png) here";
        assert_eq!(flatten_links(input), "See the report and  here");
    }

    #[test]
    fn collapse_inline_whitespace_squeezes() {
        let input = "  a \t  b  \n c";
        assert_eq!(collapse_inline_whitespace(input), "a b\nc");
    }

    #[test]
    fn drop_empty_markup_lines_removes_bullets() {
        let input = "Title\n- \n---\n* item\n\nText";
        assert_eq!(drop_empty_markup_lines(input), "Title\n* item\n\nText");
    }

    #[test]
    fn clean_blank_lines_collapses_excess() {
        let input = "Line 1\n\n\n\n\nLine 2";
        assert_eq!(clean_blank_lines(input), "Line 1\n\nLine 2");
    }

    #[test]
    fn full_pipeline_cleans_markdown() {
        let input = "# Title\n\n\n\n<span>Some   content</span>\n\n- \n\n[link](http://x)\n\n";
        let result = run_pipeline(input);
        assert_eq!(result, "# Title\n\nSome content\n\nlink");
    }
}
