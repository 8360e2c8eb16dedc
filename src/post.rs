use std::fmt;
use std::fmt::Formatter;

use chrono::{DateTime, Utc};

use crate::text_utils::slugify;

/// One blog article as the rest of the crate sees it. The slug is the
/// identity: it names the file in the repository and never changes after
/// creation, even when the title does.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub date: DateTime<Utc>,
    /// Minutes, recomputed from the body on every decode.
    pub read_time: u32,
    pub content: String,
    pub cover_image: Option<String>,
    pub author: Option<String>,
}

impl Post {
    /// Slug for a brand-new post. Empty normalization gets a placeholder
    /// so the file name is never `.md`.
    pub fn slug_from_title(title: &str) -> String {
        let slug = slugify(title);
        if slug.is_empty() {
            "untitled".to_string()
        } else {
            slug
        }
    }

    /// File name inside the content directory.
    pub fn file_name(&self) -> String {
        format!("{}.md", self.slug)
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slug={}, date={}, category={}, read_time={}min\ntitle={}",
            self.slug, self.date, self.category, self.read_time, self.title
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_from_title() {
        assert_eq!(Post::slug_from_title("My First Post"), "my-first-post");
        assert_eq!(Post::slug_from_title("Привет, мир!"), "privet-mir");
        assert_eq!(Post::slug_from_title("???"), "untitled");
        assert_eq!(Post::slug_from_title(""), "untitled");
    }

    #[test]
    fn test_file_name() {
        let post = Post {
            slug: "my-first-post".to_string(),
            title: "My First Post".to_string(),
            description: String::new(),
            category: "design".to_string(),
            tags: vec![],
            date: Utc::now(),
            read_time: 1,
            content: String::new(),
            cover_image: None,
            author: None,
        };
        assert_eq!(post.file_name(), "my-first-post.md");
    }
}
