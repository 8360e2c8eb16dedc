use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use spdlog::warn;

use gitpress::local_state::LocalState;
use gitpress::logger::configure_logger;
use gitpress::session::Session;

use crate::category::category_cmd;
use crate::config::open_config;
use crate::post::{delete_cmd, draft_cmd, list_cmd, publish_cmd, show_cmd};
use crate::session::{login_cmd, logout_cmd, whoami_cmd};

mod category;
mod config;
mod post;
mod session;

const CFG_FILE_NAME: &str = "gitpress.toml";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
enum Args {
    /// Sign in to a content repository
    Login(LoginArgs),
    /// Forget the stored session
    Logout,
    /// Show who the stored session belongs to
    Whoami,
    /// List the posts in the repository
    List(ListArgs),
    /// Print one post
    Show(ShowArgs),
    /// Publish a local markdown file
    Publish(PublishArgs),
    /// Work with the local draft snapshot
    Draft(DraftArgs),
    /// Delete posts by slug
    Delete(DeleteArgs),
    /// Manage the category manifest
    Category(CategoryArgs),
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct LoginArgs {
    /// Repository owner. If empty, [repository] in gitpress.toml is used
    #[arg(short, long)]
    owner: Option<String>,

    /// Repository name. If empty, [repository] in gitpress.toml is used
    #[arg(short, long)]
    repo: Option<String>,

    /// Directory holding the posts. If empty, the repository root is used
    #[arg(short, long)]
    dir: Option<String>,

    /// Access token. If empty, the GITPRESS_TOKEN environment variable is used
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct ListArgs {
    /// Only show posts in this category ("all" shows everything)
    #[arg(short, long)]
    category: Option<String>,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct ShowArgs {
    /// Slug of the post
    slug: String,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct PublishArgs {
    /// Markdown file to publish
    file: PathBuf,

    /// Slug for the post. If empty, the file name is used
    #[arg(short, long)]
    slug: Option<String>,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct DraftArgs {
    #[command(subcommand)]
    action: DraftAction,
}

#[derive(Subcommand, Debug)]
enum DraftAction {
    /// Snapshot a local markdown file as the draft
    Save(DraftSaveArgs),
    /// Print the saved draft
    Show,
    /// Remove the saved draft
    Clear,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct DraftSaveArgs {
    /// Markdown file to snapshot
    file: PathBuf,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct DeleteArgs {
    /// Slugs of the posts to delete
    #[arg(required = true)]
    slugs: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CategoryArgs {
    #[command(subcommand)]
    action: CategoryAction,
}

#[derive(Subcommand, Debug)]
enum CategoryAction {
    /// List the categories
    List,
    /// Add a category
    Add(CategoryAddArgs),
    /// Rename a category
    Rename(CategoryRenameArgs),
    /// Remove categories by id
    Rm(CategoryRmArgs),
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CategoryAddArgs {
    /// Display label. The id is derived from it
    label: String,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CategoryRenameArgs {
    /// Id of the category to rename
    id: String,

    /// New display label. The id is derived from it
    label: String,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CategoryRmArgs {
    /// Ids of the categories to remove
    #[arg(required = true)]
    ids: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match open_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            eprintln!("Please run gitpress-admin --help");
            return Ok(());
        }
    };

    if let Err(err) = configure_logger(&config) {
        warn!("Error creating logger sinks. Using console instead. Desc={}", err);
    }

    let storage = LocalState::in_user_dir()?;
    let mut session = Session::new(storage.clone());

    match args {
        Args::Login(args) => login_cmd(args, &config, &mut session).await,
        Args::Logout => logout_cmd(&mut session),
        Args::Whoami => whoami_cmd(&mut session).await,
        Args::List(args) => list_cmd(args, &mut session).await,
        Args::Show(args) => show_cmd(args, &mut session).await,
        Args::Publish(args) => publish_cmd(args, &storage, &mut session).await,
        Args::Draft(args) => draft_cmd(args, &storage),
        Args::Delete(args) => delete_cmd(args, &mut session).await,
        Args::Category(args) => category_cmd(args, &mut session).await,
    }
}
