//! In-memory collaborators shared by the command and TUI tests.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::directory::UserDirectory;
use crate::core::error::RequestError;
use crate::core::remote::TaskSource;
use crate::core::services::{role_for, AuthService};
use crate::core::session::{Session, SessionContext, SessionStore};
use crate::model::{
    Assignee, Credentials, Priority, Task, TaskDraft, TaskId, TaskStatus, UserProfile,
};

pub(crate) fn task(id: &str, title: &str) -> Task {
    Task {
        id: TaskId::from(id),
        title: title.to_string(),
        description: format!("{title} notes"),
        status: TaskStatus::Todo,
        due_date: None,
        priority: Priority::Medium,
        assignee: None,
    }
}

#[derive(Default)]
pub(crate) struct MemorySource {
    tasks: Mutex<Vec<Task>>,
    failure: Mutex<Option<RequestError>>,
    next_id: AtomicU64,
}

impl MemorySource {
    pub(crate) fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            failure: Mutex::new(None),
            next_id: AtomicU64::new(500),
        }
    }

    pub(crate) fn fail_with(&self, err: RequestError) {
        *self.failure.lock() = Some(err);
    }

    pub(crate) fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }

    fn check(&self) -> Result<(), RequestError> {
        match self.failure.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn materialize(id: TaskId, draft: &TaskDraft) -> Task {
    Task {
        id,
        title: draft.title.clone(),
        description: draft.description.clone(),
        status: draft.status,
        due_date: draft.due_date,
        priority: draft.priority,
        assignee: draft.assignee.clone().map(Assignee::Id),
    }
}

#[async_trait]
impl TaskSource for MemorySource {
    async fn list(&self) -> Result<Vec<Task>, RequestError> {
        self.check()?;
        Ok(self.tasks())
    }

    async fn create(&self, draft: &TaskDraft) -> Result<Task, RequestError> {
        self.check()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let task = materialize(TaskId::from(id.to_string()), draft);
        self.tasks.lock().push(task.clone());
        Ok(task)
    }

    async fn update(&self, id: &TaskId, draft: &TaskDraft) -> Result<Task, RequestError> {
        self.check()?;
        let mut tasks = self.tasks.lock();
        let slot = tasks
            .iter_mut()
            .find(|task| &task.id == id)
            .ok_or_else(|| RequestError::NotFound(id.clone()))?;
        *slot = materialize(id.clone(), draft);
        Ok(slot.clone())
    }

    async fn delete(&self, id: &TaskId) -> Result<(), RequestError> {
        self.check()?;
        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|task| &task.id != id);
        if tasks.len() == before {
            return Err(RequestError::NotFound(id.clone()));
        }
        Ok(())
    }
}

pub(crate) struct MemoryDirectory {
    users: Vec<UserProfile>,
}

impl MemoryDirectory {
    pub(crate) fn seeded() -> Self {
        let user = |id: u64, email: &str, first: &str, last: &str| UserProfile {
            id,
            email: email.into(),
            first_name: first.into(),
            last_name: last.into(),
            avatar: String::new(),
        };
        Self {
            users: vec![
                user(1, "george.bluth@reqres.in", "George", "Bluth"),
                user(4, "eve.holt@reqres.in", "Eve", "Holt"),
            ],
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn login(&self, credentials: &Credentials) -> Result<String, RequestError> {
        Ok(format!("token-for-{}", credentials.email))
    }

    async fn register(&self, _credentials: &Credentials) -> Result<(), RequestError> {
        Ok(())
    }

    async fn users(&self) -> Result<Vec<UserProfile>, RequestError> {
        Ok(self.users.clone())
    }
}

pub(crate) fn auth_service(data_dir: &Path) -> AuthService {
    AuthService::new(
        Arc::new(MemoryDirectory::seeded()),
        SessionStore::new(data_dir.join("session.json")),
        SessionContext::anonymous(),
    )
}

/// Persist a session for `email` and load it into a fresh service.
pub(crate) fn signed_in(data_dir: &Path, user_id: u64, email: &str) -> (AuthService, Session) {
    let session = Session {
        token: "abc123".into(),
        role: role_for(user_id),
        email: email.into(),
        user_id: Some(user_id),
    };
    SessionStore::new(data_dir.join("session.json"))
        .save(&session)
        .unwrap();
    let auth = auth_service(data_dir);
    auth.restore().unwrap();
    (auth, session)
}
