use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use spdlog::{debug, warn};

use gitpress::category::CategoryStore;
use gitpress::draft::{self, Draft};
use gitpress::front_matter;
use gitpress::local_state::LocalState;
use gitpress::post::Post;
use gitpress::session::Session;
use gitpress::text_utils::format_instant;
use gitpress::util::os_helper::get_name;

use crate::session::require_client;
use crate::{DeleteArgs, DraftAction, DraftArgs, ListArgs, PublishArgs, ShowArgs};

pub async fn list_cmd(args: ListArgs, session: &mut Session) -> Result<()> {
    let client = require_client(session).await?;

    let mut categories = CategoryStore::new();
    categories.load(Some(client)).await;

    let selected = args.category.unwrap_or_else(|| "all".to_string());
    if !categories.with_all().iter().any(|c| c.id == selected) {
        bail!("Unknown category '{}'", selected);
    }

    let posts = client.list_posts().await?;
    let mut shown = 0;
    for post in &posts {
        if selected != "all" && post.category != selected {
            continue;
        }
        println!(
            "{}  {:<32} {:<16} {:>3} min",
            post.date.format("%Y-%m-%d"),
            post.slug,
            post.category,
            post.read_time
        );
        shown += 1;
    }
    println!("{} post(s)", shown);
    Ok(())
}

pub async fn show_cmd(args: ShowArgs, session: &mut Session) -> Result<()> {
    let client = require_client(session).await?;

    let Some(post) = client.get_post(&args.slug).await? else {
        bail!("No post with slug '{}'", args.slug);
    };

    println!("{}", post);
    println!("description={}", post.description);
    println!("tags={}", post.tags.join(", "));
    if let Some(ref author) = post.author {
        println!("author={}", author);
    }
    if let Some(ref cover_image) = post.cover_image {
        println!("cover_image={}", cover_image);
    }
    println!();
    println!("{}", post.content);
    Ok(())
}

/// Reads a local markdown file into a post. The file's front matter
/// wins; the slug comes from the override, then the file name.
fn post_from_file(file: &Path, slug_override: Option<String>) -> Result<Post> {
    let document = fs::read_to_string(file)
        .with_context(|| format!("Could not read {}", file.display()))?;

    let slug = slug_override.or_else(|| {
        file.file_stem()
            .and_then(|stem| stem.to_str())
            .map(String::from)
    });

    let decoded = front_matter::decode(&document, slug.as_deref());
    if !decoded.ignored_keys.is_empty() {
        debug!(
            "{}: ignoring unknown front matter keys: {}",
            file.display(),
            decoded.ignored_keys.join(", ")
        );
    }
    Ok(decoded.post)
}

pub async fn publish_cmd(
    args: PublishArgs,
    storage: &LocalState,
    session: &mut Session,
) -> Result<()> {
    let mut post = post_from_file(&args.file, args.slug)?;

    let client = require_client(session).await?;

    let mut categories = CategoryStore::new();
    categories.load(Some(client)).await;
    post.category = categories.resolve_or_first(&post.category);
    if post.author.is_none() {
        post.author = Some(get_name());
    }

    if client.get_post(&post.slug).await?.is_some() {
        client.update_post(&post).await?;
        println!("Updated {}", post.file_name());
    } else {
        client.create_post(&post).await?;
        println!("Created {}", post.file_name());
    }

    if let Err(e) = draft::clear(storage) {
        warn!("Could not clear the draft snapshot: {}", e);
    }
    Ok(())
}

pub fn draft_cmd(args: DraftArgs, storage: &LocalState) -> Result<()> {
    match args.action {
        DraftAction::Save(save) => {
            let post = post_from_file(&save.file, None)?;
            let snapshot = Draft {
                title: post.title,
                description: post.description,
                category: post.category,
                tags: post.tags.join(", "),
                cover_image: post.cover_image,
                content: post.content,
                saved_at: format_instant(&Utc::now()),
            };
            draft::save(storage, &snapshot)?;
            println!("Draft saved");
        }
        DraftAction::Show => match draft::load(storage) {
            Some(snapshot) => {
                println!("title={}", snapshot.title);
                println!("description={}", snapshot.description);
                println!("category={}", snapshot.category);
                println!("tags={}", snapshot.tags);
                if let Some(ref cover_image) = snapshot.cover_image {
                    println!("cover_image={}", cover_image);
                }
                println!("saved_at={}", snapshot.saved_at);
                println!();
                println!("{}", snapshot.content);
            }
            None => println!("No draft saved"),
        },
        DraftAction::Clear => {
            draft::clear(storage)?;
            println!("Draft cleared");
        }
    }
    Ok(())
}

pub async fn delete_cmd(args: DeleteArgs, session: &mut Session) -> Result<()> {
    let client = require_client(session).await?;

    if let [slug] = args.slugs.as_slice() {
        client
            .delete_post(slug)
            .await
            .with_context(|| format!("Could not delete '{}'", slug))?;
        println!("Deleted '{}'", slug);
        return Ok(());
    }

    let outcomes = client.delete_posts(&args.slugs).await;
    let mut deleted = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(()) => {
                println!("Deleted '{}'", outcome.slug);
                deleted += 1;
            }
            Err(e) => println!("Skipped '{}': {}", outcome.slug, e),
        }
    }
    println!("{} of {} deleted", deleted, outcomes.len());
    Ok(())
}
