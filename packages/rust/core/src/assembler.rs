//! Post assembler: writes a generated article as a Markdown post.
//!
//! Layout is `<posts_dir>/<YYYY-MM-DD>-<slug>.md` with a YAML frontmatter
//! block. Files are written atomically (temp file, then rename) and a
//! failed or empty article is refused, so no placeholder post ever lands.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use newsdesk_shared::{GeneratedArticle, NewsdeskError, PostSection, Result};

/// Metadata about a written post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMeta {
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: usize,
}

/// File name for a post about `slug` on `date`.
pub fn post_file_name(date: NaiveDate, slug: &str) -> String {
    format!("{}-{slug}.md", date.format("%Y-%m-%d"))
}

/// Cover image for the article's topic, falling back to the default.
fn cover_image<'a>(post: &'a PostSection, article: &GeneratedArticle) -> Option<&'a str> {
    post.images
        .get(article.topic.as_str())
        .or(post.default_image.as_ref())
        .map(String::as_str)
}

/// Render the full post document (frontmatter + body).
pub fn render_post(post: &PostSection, article: &GeneratedArticle, date: NaiveDate) -> String {
    let mut doc = String::from("---\n");
    doc.push_str(&format!("title: {}\n", quoted(&article.topic.title_case())));
    doc.push_str(&format!("date: {}\n", date.format("%Y-%m-%d")));
    doc.push_str(&format!("categories: [{}]\n", quoted(&article.topic.slug())));

    let tags = post
        .tags
        .iter()
        .map(|t| quoted(t))
        .collect::<Vec<_>>()
        .join(", ");
    doc.push_str(&format!("tags: [{tags}]\n"));
    doc.push_str(&format!("license: {}\n", quoted(&post.license)));
    if let Some(image) = cover_image(post, article) {
        doc.push_str(&format!("image: {}\n", quoted(image)));
    }
    doc.push_str("---\n\n");
    doc.push_str(article.body.trim());
    doc.push('\n');
    doc
}

/// YAML double-quoted scalar (JSON string syntax is a subset).
fn quoted(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

/// Write `article` under `post.posts_dir`, creating the directory if needed.
#[instrument(skip_all, fields(topic = %article.topic, posts_dir = %post.posts_dir))]
pub fn write_post(
    post: &PostSection,
    article: &GeneratedArticle,
    date: NaiveDate,
) -> Result<PostMeta> {
    if let Some(reason) = article.failure_reason() {
        return Err(NewsdeskError::GenerationFailed {
            topic: article.topic.to_string(),
            reason: reason.to_string(),
        });
    }
    if article.body.trim().is_empty() {
        return Err(NewsdeskError::validation("refusing to write an empty article"));
    }

    let slug = article.topic.slug();
    if slug.is_empty() {
        return Err(NewsdeskError::validation(format!(
            "topic {:?} has no characters usable in a file name",
            article.topic.as_str()
        )));
    }

    let dir = Path::new(&post.posts_dir);
    std::fs::create_dir_all(dir).map_err(|e| NewsdeskError::io(dir, e))?;

    let file_name = post_file_name(date, &slug);
    let target = dir.join(&file_name);
    let temp = dir.join(format!(".{file_name}.tmp"));
    let content = render_post(post, article, date);

    std::fs::write(&temp, &content).map_err(|e| NewsdeskError::io(&temp, e))?;
    std::fs::rename(&temp, &target).map_err(|e| NewsdeskError::io(&target, e))?;

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let sha256 = format!("{:x}", hasher.finalize());

    debug!(file = %file_name, size = content.len(), "wrote post");
    info!(path = %target.display(), "post written");

    Ok(PostMeta {
        path: target,
        sha256,
        size_bytes: content.len(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use newsdesk_shared::Topic;

    fn temp_dir() -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("newsdesk-post-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn post_section(dir: &Path) -> PostSection {
        PostSection {
            posts_dir: dir.join("_posts").to_string_lossy().into_owned(),
            tags: vec!["energia".into(), "italia".into()],
            ..PostSection::default()
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn renders_frontmatter() {
        let mut post = post_section(Path::new("/unused"));
        post.images
            .insert("smart grid".into(), "https://img.example/grid.jpg".into());
        let article = GeneratedArticle::generated(Topic::new("smart grid"), "  Testo.  ");

        let doc = render_post(&post, &article, date());

        assert_eq!(
            doc,
            "---\n\
             title: \"Smart grid\"\n\
             date: 2025-03-14\n\
             categories: [\"smart-grid\"]\n\
             tags: [\"energia\", \"italia\"]\n\
             license: \"CC BY 4.0\"\n\
             image: \"https://img.example/grid.jpg\"\n\
             ---\n\nTesto.\n"
        );
    }

    #[test]
    fn default_image_used_when_topic_has_none() {
        let mut post = post_section(Path::new("/unused"));
        post.default_image = Some("https://img.example/default.jpg".into());
        let article = GeneratedArticle::generated(Topic::new("fotovoltaico"), "x");

        let doc = render_post(&post, &article, date());
        assert!(doc.contains("image: \"https://img.example/default.jpg\""));
    }

    #[test]
    fn writes_post_atomically_with_checksum() {
        let tmp = temp_dir();
        let post = post_section(&tmp);
        let article =
            GeneratedArticle::generated(Topic::new("batterie al litio"), "Corpo articolo.");

        let meta = write_post(&post, &article, date()).unwrap();

        assert_eq!(
            meta.path,
            tmp.join("_posts").join("2025-03-14-batterie-al-litio.md")
        );
        let content = std::fs::read_to_string(&meta.path).unwrap();
        assert_eq!(content.len(), meta.size_bytes);
        assert_eq!(meta.sha256.len(), 64);
        assert!(!tmp.join("_posts").join(".2025-03-14-batterie-al-litio.md.tmp").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn slash_in_topic_stays_inside_posts_dir() {
        let tmp = temp_dir();
        let post = post_section(&tmp);
        let posts = tmp.join("_posts");

        let article = GeneratedArticle::generated(Topic::new("solare/eolico"), "Testo.");
        let meta = write_post(&post, &article, date()).unwrap();
        assert_eq!(meta.path, posts.join("2025-03-14-solare-eolico.md"));

        let article = GeneratedArticle::generated(Topic::new("x/../../escaped"), "Testo.");
        let meta = write_post(&post, &article, date()).unwrap();
        assert_eq!(meta.path, posts.join("2025-03-14-x-escaped.md"));
        assert!(meta.path.exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn topic_without_slug_characters_is_refused() {
        let tmp = temp_dir();
        let post = post_section(&tmp);
        let article = GeneratedArticle::generated(Topic::new("/.."), "Testo.");

        let err = write_post(&post, &article, date()).unwrap_err();
        assert!(matches!(err, NewsdeskError::Validation { .. }));
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn refuses_failed_article() {
        let tmp = temp_dir();
        let post = post_section(&tmp);
        let article = GeneratedArticle::failed(Topic::new("t"), "model error");

        let err = write_post(&post, &article, date()).unwrap_err();

        assert!(matches!(err, NewsdeskError::GenerationFailed { .. }));
        assert!(!tmp.join("_posts").exists());
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn refuses_empty_article() {
        let tmp = temp_dir();
        let post = post_section(&tmp);
        let article = GeneratedArticle::generated(Topic::new("t"), "   ");

        assert!(write_post(&post, &article, date()).is_err());
        let _ = std::fs::remove_dir_all(&tmp);
    }
}
