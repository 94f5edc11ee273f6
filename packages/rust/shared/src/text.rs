//! Character-budget helpers shared by extraction, prompt building and generation.

/// Return the longest prefix of `text` holding at most `max_chars` characters.
///
/// Cuts on a `char` boundary, so multi-byte text (accented Italian, etc.)
/// never panics.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Substitute `{key}` placeholders in `template`.
///
/// Unknown placeholders are left untouched.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_short_text_untouched() {
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        let text = "mobilità elettrica";
        let cut = truncate_chars(text, 8);
        assert_eq!(cut, "mobilità");
        assert_eq!(cut.chars().count(), 8);
    }

    #[test]
    fn truncate_to_zero() {
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn render_replaces_known_placeholders() {
        let out = render_template("{topic} ultime notizie {x}", &[("topic", "smart grid")]);
        assert_eq!(out, "smart grid ultime notizie {x}");
    }
}
