use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use spdlog::warn;

use crate::post::Post;
use crate::text_utils::{estimate_read_time, format_instant, parse_instant};

/// Result of decoding one markdown document. Unknown metadata keys are
/// reported instead of silently dropped so callers can log them.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPost {
    pub post: Post,
    pub ignored_keys: Vec<String>,
}

#[derive(Default)]
struct RawFields {
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    tags: Option<Vec<String>>,
    date: Option<String>,
    cover_image: Option<String>,
    author: Option<String>,
    ignored: Vec<String>,
}

/// Decodes a stored markdown document into a post. Total: any input
/// yields a post, missing metadata falls back to defaults. `slug` is the
/// caller-supplied identity (usually the file stem); when absent it is
/// derived from the title.
pub fn decode(document: &str, slug: Option<&str>) -> DecodedPost {
    lazy_static! {
        static ref FRONT_MATTER_REGEX: Regex =
            Regex::new(r"(?s)\A---\s*\n(.*?)\n---\s*\n(.*)\z").unwrap();
    }

    let Some(caps) = FRONT_MATTER_REGEX.captures(document) else {
        // No metadata block: the whole document is the body.
        let body = document.trim();
        return DecodedPost {
            post: Post {
                slug: slug.unwrap_or("untitled").to_string(),
                title: "Untitled".to_string(),
                description: String::new(),
                category: "uncategorized".to_string(),
                tags: vec![],
                date: Utc::now(),
                read_time: estimate_read_time(body),
                content: body.to_string(),
                cover_image: None,
                author: None,
            },
            ignored_keys: vec![],
        };
    };

    let fields = parse_block(&caps[1]);
    let body = caps[2].trim();

    let title = non_empty(fields.title).unwrap_or_else(|| "Untitled".to_string());
    let slug = match slug {
        Some(slug) => slug.to_string(),
        None => Post::slug_from_title(&title),
    };

    let date = match non_empty(fields.date) {
        Some(value) => parse_instant(&value).unwrap_or_else(|| {
            warn!("unreadable date '{}' in post '{}', using current time", value, slug);
            Utc::now()
        }),
        None => Utc::now(),
    };

    DecodedPost {
        post: Post {
            slug,
            title,
            description: fields.description.unwrap_or_default(),
            category: non_empty(fields.category).unwrap_or_else(|| "uncategorized".to_string()),
            tags: fields.tags.unwrap_or_default(),
            date,
            read_time: estimate_read_time(body),
            content: body.to_string(),
            cover_image: non_empty(fields.cover_image),
            author: non_empty(fields.author),
        },
        ignored_keys: fields.ignored,
    }
}

/// Encodes a post as a stored markdown document: delimited metadata
/// block in fixed field order, blank line, body. `read_time` is derived
/// data and is never written.
pub fn encode(post: &Post) -> String {
    let mut lines = vec![
        "---".to_string(),
        format!("title: \"{}\"", post.title),
        format!("description: \"{}\"", post.description),
        format!("category: \"{}\"", post.category),
        format!("tags: \"{}\"", post.tags.join(", ")),
        format!("date: \"{}\"", format_instant(&post.date)),
    ];

    if let Some(cover_image) = post.cover_image.as_deref().filter(|v| !v.is_empty()) {
        lines.push(format!("coverImage: \"{}\"", cover_image));
    }
    if let Some(author) = post.author.as_deref().filter(|v| !v.is_empty()) {
        lines.push(format!("author: \"{}\"", author));
    }

    lines.push("---".to_string());
    lines.push(String::new());
    lines.push(post.content.clone());
    lines.join("\n")
}

fn parse_block(block: &str) -> RawFields {
    let mut fields = RawFields::default();

    for line in block.lines() {
        let Some(colon) = line.find(':') else {
            continue;
        };

        let key = line[..colon].trim();
        let value = strip_quotes(line[colon + 1..].trim());

        match key {
            "title" => fields.title = Some(value.to_string()),
            "description" => fields.description = Some(value.to_string()),
            "category" => fields.category = Some(value.to_string()),
            "tags" => {
                let tags = value
                    .split(',')
                    .map(|tag| tag.trim().to_string())
                    .filter(|tag| !tag.is_empty())
                    .collect();
                fields.tags = Some(tags);
            }
            "date" => fields.date = Some(value.to_string()),
            "coverImage" => fields.cover_image = Some(value.to_string()),
            "author" => fields.author = Some(value.to_string()),
            _ => {
                if !key.is_empty() {
                    fields.ignored.push(key.to_string());
                }
            }
        }
    }

    fields
}

/// Strips one layer of double quotes. Inner quotes are left alone.
fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
