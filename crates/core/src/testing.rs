//! In-memory `TaskSource` and a scripted HTTP server used by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::error::RequestError;
use crate::model::{Assignee, Priority, Task, TaskDraft, TaskId, TaskStatus};
use crate::remote::TaskSource;

pub(crate) fn sample_task(id: &str, title: &str) -> Task {
    Task {
        id: TaskId::from(id),
        title: title.to_string(),
        description: format!("{title} details"),
        status: TaskStatus::Todo,
        due_date: None,
        priority: Priority::Medium,
        assignee: None,
    }
}

#[derive(Default)]
pub(crate) struct FakeSource {
    tasks: Mutex<Vec<Task>>,
    failure: Mutex<Option<RequestError>>,
    next_id: AtomicU64,
    list_calls: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            next_id: AtomicU64::new(100),
            ..Self::default()
        }
    }

    /// Every following call fails with `err` until [`FakeSource::succeed`].
    pub(crate) fn fail_with(&self, err: RequestError) {
        *self.failure.lock() = Some(err);
    }

    pub(crate) fn succeed(&self) {
        *self.failure.lock() = None;
    }

    pub(crate) fn server_tasks(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }

    pub(crate) fn replace_tasks(&self, tasks: Vec<Task>) {
        *self.tasks.lock() = tasks;
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), RequestError> {
        match self.failure.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn from_draft(id: TaskId, draft: &TaskDraft) -> Task {
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
impl TaskSource for FakeSource {
    async fn list(&self) -> Result<Vec<Task>, RequestError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.server_tasks())
    }

    async fn create(&self, draft: &TaskDraft) -> Result<Task, RequestError> {
        self.check()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let task = from_draft(TaskId::from(id.to_string()), draft);
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
        *slot = from_draft(id.clone(), draft);
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

/// One request as seen by [`StubServer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SeenRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

/// Local HTTP/1.1 server answering each connection with the next scripted
/// `(status, body)` pair; a 500 once the script runs out.
pub(crate) struct StubServer {
    url: String,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl StubServer {
    pub(crate) async fn start(replies: Vec<(u16, &str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let replies: VecDeque<(u16, String)> = replies
            .into_iter()
            .map(|(status, body)| (status, body.to_string()))
            .collect();
        let replies = Arc::new(Mutex::new(replies));

        let log = seen.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let reply = replies
                    .lock()
                    .pop_front()
                    .unwrap_or((500, String::from(r#"{"message":"no reply scripted"}"#)));
                serve(stream, reply, &log).await;
            }
        });

        Self { url, seen }
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().clone()
    }
}

async fn serve(mut stream: TcpStream, reply: (u16, String), log: &Mutex<Vec<SeenRequest>>) {
    if let Some(request) = read_request(&mut stream).await {
        log.lock().push(request);
        let _ = write_reply(&mut stream, reply).await;
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<SeenRequest> {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        raw.extend_from_slice(&chunk[..read]);
        if let Some(pos) = raw.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let mut authorization = None;
    let mut content_length = 0usize;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("authorization") {
            authorization = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse().unwrap_or(0);
        }
    }

    while raw.len() < header_end + content_length {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..read]);
    }
    let body_end = raw.len().min(header_end + content_length);
    Some(SeenRequest {
        method,
        path,
        authorization,
        body: String::from_utf8_lossy(&raw[header_end..body_end]).to_string(),
    })
}

async fn write_reply(stream: &mut TcpStream, (status, body): (u16, String)) -> std::io::Result<()> {
    let reason = match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
