use std::sync::Arc;

use thiserror::Error;

use crate::directory::{find_user, UserDirectory};
use crate::error::{RequestError, ValidationError};
use crate::model::{Credentials, UserProfile};
use crate::session::{Role, Session, SessionContext, SessionStore};

/// Directory id that is granted the administrator role.
pub const ADMIN_USER_ID: u64 = 1;

/// Directory ids allowed to list every user. Wider than the admin role.
pub const DIRECTORY_VIEWER_IDS: [u64; 2] = [ADMIN_USER_ID, 2];

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("no directory entry for {0}")]
    UnknownUser(String),
    #[error("administrator role required")]
    Forbidden,
    #[error("not logged in")]
    NotLoggedIn,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

fn can_list_users(session: &Session) -> bool {
    session.role == Role::Admin
        || session
            .user_id
            .is_some_and(|id| DIRECTORY_VIEWER_IDS.contains(&id))
}

pub fn role_for(user_id: u64) -> Role {
    if user_id == ADMIN_USER_ID {
        Role::Admin
    } else {
        Role::Member
    }
}

/// Login, registration and the directory views, all tied to one persisted
/// session.
#[derive(Clone)]
pub struct AuthService {
    directory: Arc<dyn UserDirectory>,
    store: SessionStore,
    context: SessionContext,
}

impl AuthService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        store: SessionStore,
        context: SessionContext,
    ) -> Self {
        Self {
            directory,
            store,
            context,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Load the persisted session, if any, into the shared context.
    pub fn restore(&self) -> Result<Option<Session>, AuthError> {
        let session = self.store.load()?;
        match &session {
            Some(session) => self.context.replace(session.clone()),
            None => self.context.clear(),
        }
        Ok(session)
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        credentials.validate()?;
        let token = self.directory.login(credentials).await?;
        let users = self.directory.users().await?;
        let user = find_user(users, &credentials.email)
            .ok_or_else(|| AuthError::UnknownUser(credentials.email.trim().to_string()))?;

        let session = Session {
            token,
            role: role_for(user.id),
            email: user.email,
            user_id: Some(user.id),
        };
        self.store.save(&session)?;
        self.context.replace(session.clone());
        tracing::info!(
            email = session.email.as_str(),
            role = session.role.as_str(),
            "logged in"
        );
        Ok(session)
    }

    /// Create a directory account. Does not log in.
    pub async fn register(&self, credentials: &Credentials) -> Result<(), AuthError> {
        credentials.validate()?;
        self.directory.register(credentials).await?;
        tracing::info!(email = credentials.email.trim(), "registered account");
        Ok(())
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        self.store.clear()?;
        self.context.clear();
        tracing::info!("logged out");
        Ok(())
    }

    /// Drop a session the task API no longer accepts.
    pub fn expire_session(&self) -> Result<(), AuthError> {
        tracing::warn!("session rejected by server, clearing it");
        self.store.clear()?;
        self.context.clear();
        Ok(())
    }

    pub async fn profile(&self) -> Result<UserProfile, AuthError> {
        let session = self.context.current().ok_or(AuthError::NotLoggedIn)?;
        let found = self.directory.find_by_email(&session.email).await?;
        found.ok_or(AuthError::UnknownUser(session.email))
    }

    pub async fn admin_users(&self) -> Result<Vec<UserProfile>, AuthError> {
        let session = self.context.current().ok_or(AuthError::NotLoggedIn)?;
        if !can_list_users(&session) {
            return Err(AuthError::Forbidden);
        }
        Ok(self.directory.users().await?)
    }
}
