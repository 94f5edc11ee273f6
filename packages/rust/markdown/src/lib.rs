//! Best-effort HTML-to-text extraction for source evidence.
//!
//! Pages are reduced to their main content block, converted to lightweight
//! Markdown with `htmd`, flattened by a series of cleanup passes, and cut to
//! a per-source character budget.

mod cleanup;

use scraper::{Html, Selector};
use tracing::{debug, instrument};

use newsdesk_shared::{NewsdeskError, Result, truncate_chars};

/// Tags whose content never counts as readable text.
const SKIP_TAGS: [&str; 14] = [
    "script", "style", "nav", "header", "footer", "aside", "form", "iframe", "noscript",
    "svg", "img", "figure", "button", "template",
];

/// Content containers tried in priority order before falling back to `<body>`.
const CONTENT_SELECTORS: [&str; 7] = [
    "article",
    "main",
    "[role=\"main\"]",
    ".entry-content",
    ".post-content",
    "#content",
    ".content",
];

/// Text extracted from one HTML page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    /// Whether the budget cut the text short.
    pub truncated: bool,
}

/// Extract readable text from an HTML document, limited to `max_chars`.
#[instrument(skip(html), fields(html_len = html.len()))]
pub fn html_to_text(html: &str, max_chars: usize) -> Result<ExtractedText> {
    let doc = Html::parse_document(html);
    let content_html = extract_content_html(&doc).unwrap_or_else(|| html.to_string());

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIP_TAGS.to_vec())
        .build();

    let raw_markdown = converter
        .convert(&content_html)
        .map_err(|e| NewsdeskError::Conversion(format!("htmd conversion failed: {e}")))?;

    let cleaned = cleanup::run_pipeline(&raw_markdown);
    let cut = truncate_chars(&cleaned, max_chars);
    let truncated = cut.len() < cleaned.len();

    debug!(
        raw_len = raw_markdown.len(),
        cleaned_len = cleaned.len(),
        truncated,
        "text extraction complete"
    );

    Ok(ExtractedText {
        text: cut.trim_end().to_string(),
        truncated,
    })
}

/// Inner HTML of the first matching content container.
fn extract_content_html(doc: &Html) -> Option<String> {
    let found = CONTENT_SELECTORS.iter().find_map(|sel_str| {
        let selector = Selector::parse(sel_str).ok()?;
        doc.select(&selector)
            .find(|el| !el.text().collect::<String>().trim().is_empty())
            .map(|el| el.inner_html())
    });

    found.or_else(|| {
        let body = Selector::parse("body").ok()?;
        doc.select(&body).next().map(|el| el.inner_html())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_main_content() {
        let html = r#"<html><head><title>Incentivi 2025</title></head><body>
            <nav><a href="/">Home</a></nav>
            <main>
                <h1>Incentivi</h1>
                <p>Il bonus copre il <strong>50%</strong> della spesa.</p>
            </main>
            <footer><p>Copyright 2025</p></footer>
        </body></html>"#;

        let result = html_to_text(html, 1000).unwrap();
        assert!(result.text.contains("# Incentivi"));
        assert!(result.text.contains("50%"));
        assert!(!result.text.contains("Copyright"));
        assert!(!result.text.contains("Home"));
        assert!(!result.truncated);
    }

    #[test]
    fn drops_scripts_and_styles() {
        let html = r#"<html><body><article>
            <script>var tracking = 1;</script>
            <style>.x { color: red }</style>
            <p>Testo utile.</p>
        </article></body></html>"#;

        let result = html_to_text(html, 1000).unwrap();
        assert_eq!(result.text, "Testo utile.");
    }

    #[test]
    fn links_keep_text_only() {
        let html = r#"<html><body><main>
            <p>Vedi il <a href="https://gse.it/report.pdf">rapporto GSE</a> completo.</p>
        </main></body></html>"#;

        let result = html_to_text(html, 1000).unwrap();
        assert!(result.text.contains("rapporto GSE"));
        assert!(!result.text.contains("https://gse.it"));
    }

    #[test]
    fn falls_back_to_body() {
        let html = "<html><body><h1>Diretto</h1><p>Contenuto nel body.</p></body></html>";
        let result = html_to_text(html, 1000).unwrap();
        assert!(result.text.contains("Diretto"));
        assert!(result.text.contains("Contenuto nel body."));
    }

    #[test]
    fn empty_container_is_skipped() {
        let html =
            "<html><body><article>  </article><main><p>Vero contenuto</p></main></body></html>";
        let result = html_to_text(html, 1000).unwrap();
        assert_eq!(result.text, "Vero contenuto");
    }

    #[test]
    fn truncates_to_char_budget() {
        let paragraph = "è ".repeat(2000);
        let html = format!("<html><body><main><p>{paragraph}</p></main></body></html>");

        let result = html_to_text(&html, 800).unwrap();
        assert!(result.truncated);
        assert!(result.text.chars().count() <= 800);
    }

    #[test]
    fn empty_document_yields_empty_text() {
        let result = html_to_text("<html><body></body></html>", 1000).unwrap();
        assert!(result.text.is_empty());
        assert!(!result.truncated);
    }
}
