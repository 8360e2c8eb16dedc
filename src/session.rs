//! One active session against one repository. Built by replaying the
//! token through `authenticate()`, persisted locally so the next start
//! can restore it, and holding the only client handle while it lasts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use spdlog::{info, warn};

use crate::error::StoreError;
use crate::github::host::ContentHost;
use crate::github::{AuthOutcome, GithubHost, RepoClient, RepoCoordinates, UserProfile};
use crate::local_state::{LocalState, SESSION_FILE};

/// What survives a process restart, exactly as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub owner: String,
    pub repo: String,
    pub content_dir: String,
    pub token: String,
}

impl StoredCredentials {
    fn coords(&self) -> RepoCoordinates {
        RepoCoordinates {
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            content_dir: self.content_dir.clone(),
        }
    }
}

pub struct ActiveSession {
    pub user: UserProfile,
    pub warning: Option<String>,
    pub coords: RepoCoordinates,
    client: RepoClient,
}

impl ActiveSession {
    pub fn client(&self) -> &RepoClient {
        &self.client
    }
}

pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated(ActiveSession),
    Failed(StoreError),
}

/// Builds a host for given coordinates and token. Injectable so tests
/// can hand the session an in-memory store.
pub type HostConnector =
    Box<dyn Fn(&RepoCoordinates, &str) -> Result<Arc<dyn ContentHost>, StoreError> + Send + Sync>;

pub struct Session {
    state: SessionState,
    storage: LocalState,
    connect: HostConnector,
}

impl Session {
    pub fn new(storage: LocalState) -> Session {
        Session::with_connector(
            storage,
            Box::new(|coords, token| {
                let host = GithubHost::new(&coords.owner, &coords.repo, token)?;
                Ok(Arc::new(host) as Arc<dyn ContentHost>)
            }),
        )
    }

    pub fn with_connector(storage: LocalState, connect: HostConnector) -> Session {
        Session {
            state: SessionState::Anonymous,
            storage,
            connect,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated(_))
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        match &self.state {
            SessionState::Authenticated(active) => Some(active),
            _ => None,
        }
    }

    pub fn client(&self) -> Option<&RepoClient> {
        self.active().map(|active| active.client())
    }

    pub fn last_error(&self) -> Option<&StoreError> {
        match &self.state {
            SessionState::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Authenticates against the store. Success persists the
    /// credentials for the next start; failure leaves the session in
    /// the failed state and keeps whatever was stored before.
    pub async fn login(
        &mut self,
        coords: RepoCoordinates,
        token: &str,
    ) -> Result<AuthOutcome, StoreError> {
        self.state = SessionState::Authenticating;

        match self.open_session(&coords, token).await {
            Ok(active) => {
                let outcome = AuthOutcome {
                    user: active.user.clone(),
                    warning: active.warning.clone(),
                };

                let stored = StoredCredentials {
                    owner: coords.owner.clone(),
                    repo: coords.repo.clone(),
                    content_dir: coords.content_dir.clone(),
                    token: token.to_string(),
                };
                if let Err(e) = self.storage.write(SESSION_FILE, &stored) {
                    warn!("could not persist session: {}", e);
                }

                info!(
                    "authenticated as {} against {}/{}",
                    outcome.user.login, coords.owner, coords.repo
                );
                self.state = SessionState::Authenticated(active);
                Ok(outcome)
            }
            Err(e) => {
                self.state = SessionState::Failed(e.clone());
                Err(e)
            }
        }
    }

    /// Replays stored credentials through the same `authenticate()`
    /// path. Nothing stored is a quiet `None`; a failed replay deletes
    /// the stored credentials instead of keeping stale state around.
    pub async fn restore(&mut self) -> Result<Option<AuthOutcome>, StoreError> {
        let Some(stored) = self.storage.read::<StoredCredentials>(SESSION_FILE) else {
            return Ok(None);
        };

        match self.login(stored.coords(), &stored.token).await {
            Ok(outcome) => Ok(Some(outcome)),
            Err(e) => {
                warn!("stored session is no longer valid: {}", e);
                if let Err(remove_err) = self.storage.remove(SESSION_FILE) {
                    warn!("could not remove stored session: {}", remove_err);
                }
                self.state = SessionState::Anonymous;
                Err(e)
            }
        }
    }

    /// Back to anonymous: drops the client handle and the stored
    /// credentials.
    pub fn logout(&mut self) {
        self.state = SessionState::Anonymous;
        if let Err(e) = self.storage.remove(SESSION_FILE) {
            warn!("could not remove stored session: {}", e);
        }
    }

    async fn open_session(
        &self,
        coords: &RepoCoordinates,
        token: &str,
    ) -> Result<ActiveSession, StoreError> {
        let host = (self.connect)(coords, token)?;
        let client = RepoClient::new(host, &coords.content_dir);
        let outcome = client.authenticate().await?;

        Ok(ActiveSession {
            user: outcome.user,
            warning: outcome.warning,
            coords: coords.clone(),
            client,
        })
    }
}
