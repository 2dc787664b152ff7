//! The Remote Task Source: the REST endpoint that owns the authoritative task list.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};

use crate::config::AppConfig;
use crate::error::RequestError;
use crate::http::{build_client, check_status, decode, transport_error};
use crate::model::{Task, TaskDraft, TaskId};
use crate::session::SessionContext;

#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn list(&self) -> Result<Vec<Task>, RequestError>;
    async fn create(&self, draft: &TaskDraft) -> Result<Task, RequestError>;
    async fn update(&self, id: &TaskId, draft: &TaskDraft) -> Result<Task, RequestError>;
    async fn delete(&self, id: &TaskId) -> Result<(), RequestError>;
}

/// `TaskSource` over HTTP. The bearer token is looked up from the session on
/// every request.
#[derive(Debug, Clone)]
pub struct HttpTaskSource {
    client: Client,
    base_url: String,
    session: SessionContext,
    timeout: Duration,
}

impl HttpTaskSource {
    pub fn new(config: &AppConfig, session: SessionContext) -> Result<Self> {
        let timeout = config.request_timeout();
        Ok(Self {
            client: build_client(timeout)?,
            base_url: config.api_url().to_string(),
            session,
            timeout,
        })
    }

    fn tasks_url(&self) -> String {
        format!("{}/tasks", self.base_url)
    }

    fn task_url(&self, id: &TaskId) -> String {
        format!("{}/tasks/{}", self.base_url, id)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.timeout(self.timeout);
        match self.session.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(
        &self,
        builder: RequestBuilder,
        target: Option<&TaskId>,
    ) -> Result<reqwest::Response, RequestError> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|err| transport_error(err, self.timeout))?;
        check_status(response, target).await
    }
}

#[async_trait]
impl TaskSource for HttpTaskSource {
    async fn list(&self) -> Result<Vec<Task>, RequestError> {
        tracing::debug!(url = %self.tasks_url(), "fetching tasks");
        let response = self.send(self.client.get(self.tasks_url()), None).await?;
        decode(response).await
    }

    async fn create(&self, draft: &TaskDraft) -> Result<Task, RequestError> {
        tracing::debug!(title = draft.title.as_str(), "creating task");
        let response = self
            .send(self.client.post(self.tasks_url()).json(draft), None)
            .await?;
        decode(response).await
    }

    async fn update(&self, id: &TaskId, draft: &TaskDraft) -> Result<Task, RequestError> {
        tracing::debug!(task_id = id.as_str(), "updating task");
        let response = self
            .send(self.client.put(self.task_url(id)).json(draft), Some(id))
            .await?;
        decode(response).await
    }

    async fn delete(&self, id: &TaskId) -> Result<(), RequestError> {
        tracing::debug!(task_id = id.as_str(), "deleting task");
        self.send(self.client.delete(self.task_url(id)), Some(id))
            .await?;
        Ok(())
    }
}
