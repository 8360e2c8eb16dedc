use std::env;

use anyhow::{bail, Result};

use gitpress::config::{Config, Repository};
use gitpress::github::{RepoClient, RepoCoordinates};
use gitpress::session::Session;

use crate::LoginArgs;

const TOKEN_ENV: &str = "GITPRESS_TOKEN";

/// Flags win over the `[repository]` config section; the token falls
/// back to the environment.
fn resolve_login(
    args: LoginArgs,
    defaults: Option<&Repository>,
    env_token: Option<String>,
) -> Result<(RepoCoordinates, String)> {
    let Some(owner) = args.owner.or_else(|| defaults.map(|r| r.owner.clone())) else {
        bail!("No repository owner. Pass --owner or set [repository] in gitpress.toml");
    };
    let Some(repo) = args.repo.or_else(|| defaults.map(|r| r.repo.clone())) else {
        bail!("No repository name. Pass --repo or set [repository] in gitpress.toml");
    };
    let content_dir = args
        .dir
        .or_else(|| defaults.and_then(|r| r.content_dir.clone()))
        .unwrap_or_default();

    let token = match args.token.or(env_token) {
        Some(token) if !token.is_empty() => token,
        _ => bail!("No access token. Pass --token or set {}", TOKEN_ENV),
    };

    let coords = RepoCoordinates {
        owner,
        repo,
        content_dir,
    };
    Ok((coords, token))
}

pub async fn login_cmd(args: LoginArgs, config: &Config, session: &mut Session) -> Result<()> {
    let env_token = env::var(TOKEN_ENV).ok();
    let (coords, token) = resolve_login(args, config.repository.as_ref(), env_token)?;

    let outcome = session.login(coords, &token).await?;

    println!("Signed in as {} ({})", outcome.user.name, outcome.user.login);
    if let Some(warning) = outcome.warning {
        println!("Warning: {}", warning);
    }
    Ok(())
}

pub fn logout_cmd(session: &mut Session) -> Result<()> {
    session.logout();
    println!("Signed out");
    Ok(())
}

pub async fn whoami_cmd(session: &mut Session) -> Result<()> {
    if session.restore().await?.is_none() {
        println!("Not signed in");
        return Ok(());
    }

    if let Some(active) = session.active() {
        println!("{} ({})", active.user.name, active.user.login);
        if !active.user.email.is_empty() {
            println!("Email: {}", active.user.email);
        }
        println!("Repository: {}/{}", active.coords.owner, active.coords.repo);
        if !active.coords.content_dir.is_empty() {
            println!("Content dir: {}", active.coords.content_dir);
        }
    }
    Ok(())
}

/// Restores the stored session and hands out its client. Commands that
/// touch the remote store all start here.
pub async fn require_client(session: &mut Session) -> Result<&RepoClient> {
    if session.restore().await?.is_none() {
        bail!("Not signed in. Run gitpress-admin login first");
    }

    match session.client() {
        Some(client) => Ok(client),
        None => bail!("Not signed in. Run gitpress-admin login first"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_flags() -> LoginArgs {
        LoginArgs {
            owner: None,
            repo: None,
            dir: None,
            token: None,
        }
    }

    fn section() -> Repository {
        Repository {
            owner: "ana".to_string(),
            repo: "blog".to_string(),
            content_dir: Some("posts".to_string()),
        }
    }

    #[test]
    fn test_flags_win_over_config() {
        let args = LoginArgs {
            owner: Some("other".to_string()),
            repo: None,
            dir: Some(String::new()),
            token: Some("t-flag".to_string()),
        };

        let (coords, token) = resolve_login(args, Some(&section()), Some("t-env".to_string())).unwrap();
        assert_eq!(coords.owner, "other");
        assert_eq!(coords.repo, "blog");
        assert_eq!(coords.content_dir, "");
        assert_eq!(token, "t-flag");
    }

    #[test]
    fn test_config_and_env_fill_the_gaps() {
        let (coords, token) = resolve_login(no_flags(), Some(&section()), Some("t-env".to_string())).unwrap();
        assert_eq!(coords.owner, "ana");
        assert_eq!(coords.content_dir, "posts");
        assert_eq!(token, "t-env");
    }

    #[test]
    fn test_missing_pieces_are_errors() {
        assert!(resolve_login(no_flags(), None, Some("t".to_string())).is_err());
        assert!(resolve_login(no_flags(), Some(&section()), None).is_err());
    }
}
