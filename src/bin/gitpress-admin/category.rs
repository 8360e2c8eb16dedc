use anyhow::Result;

use gitpress::category::{Applied, CategoryStore};
use gitpress::session::Session;

use crate::session::require_client;
use crate::{CategoryAction, CategoryArgs};

fn warn_unpersisted<T>(outcome: &Applied<T>) {
    if let Some(ref e) = outcome.persist_error {
        println!("Warning: the change is applied but was not saved remotely: {}", e);
    }
}

pub async fn category_cmd(args: CategoryArgs, session: &mut Session) -> Result<()> {
    let client = require_client(session).await?;

    let mut store = CategoryStore::new();
    store.load(Some(client)).await;

    match args.action {
        CategoryAction::List => {
            for category in store.all() {
                println!("{:<24} {}", category.id, category.label);
            }
        }
        CategoryAction::Add(args) => {
            let outcome = store.create(&args.label, Some(client)).await?;
            println!("Added '{}' with id {}", outcome.value.label, outcome.value.id);
            warn_unpersisted(&outcome);
        }
        CategoryAction::Rename(args) => {
            let outcome = store.rename(&args.id, &args.label, Some(client)).await?;
            println!("Renamed to '{}' with id {}", outcome.value.label, outcome.value.id);
            warn_unpersisted(&outcome);
        }
        CategoryAction::Rm(args) => {
            if let [id] = args.ids.as_slice() {
                let outcome = store.delete(id, Some(client)).await?;
                println!("Removed '{}'", id);
                warn_unpersisted(&outcome);
            } else {
                let outcome = store.delete_many(&args.ids, Some(client)).await;
                println!("Removed {} of {} categories", outcome.value, args.ids.len());
                warn_unpersisted(&outcome);
            }
        }
    }
    Ok(())
}
