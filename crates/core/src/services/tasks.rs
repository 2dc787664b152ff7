use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{RequestError, TaskError};
use crate::model::{RequiredFields, Task, TaskDraft, TaskId, TaskPatch};
use crate::mutation::{
    MutationCoordinator, MutationOutcome, MutationPhase, PendingMutation, RemoteAck,
};
use crate::remote::TaskSource;
use crate::view::{
    compute_view, count_matches, total_pages, PageSize, PagedResult, SortDirection, SortField,
    ViewState,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(String),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

/// Handle for one in-flight fetch. Only the ticket of the most recent
/// `begin_refresh` is applied on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied { count: usize, duplicates: usize },
    Stale,
    Failed(RequestError),
}

/// Owns the locally held collection together with the view parameters and the
/// mutation coordinator. Every change goes through `&mut self`, so a single
/// owner (the UI loop or a one-shot command) serializes access.
pub struct TaskBoard {
    source: Arc<dyn TaskSource>,
    tasks: Vec<Task>,
    view: ViewState,
    coordinator: MutationCoordinator,
    load_state: LoadState,
    generation: u64,
    version: u64,
}

impl fmt::Debug for TaskBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskBoard")
            .field("tasks", &self.tasks.len())
            .field("view", &self.view)
            .field("load_state", &self.load_state)
            .field("phase", self.coordinator.phase())
            .field("generation", &self.generation)
            .finish()
    }
}

impl TaskBoard {
    pub fn new(source: Arc<dyn TaskSource>, required: RequiredFields) -> Self {
        Self::with_coordinator(source, MutationCoordinator::new(required))
    }

    pub fn with_coordinator(source: Arc<dyn TaskSource>, coordinator: MutationCoordinator) -> Self {
        Self {
            source,
            tasks: Vec::new(),
            view: ViewState::default(),
            coordinator,
            load_state: LoadState::Idle,
            generation: 0,
            version: 0,
        }
    }

    pub fn source(&self) -> Arc<dyn TaskSource> {
        Arc::clone(&self.source)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn find(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn phase(&self) -> &MutationPhase {
        self.coordinator.phase()
    }

    pub fn is_busy(&self) -> bool {
        self.coordinator.phase().is_pending()
    }

    pub fn required_fields(&self) -> &RequiredFields {
        self.coordinator.required_fields()
    }

    /// Bumped whenever the collection changes. Lets a renderer skip work.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn view(&self) -> PagedResult {
        compute_view(&self.tasks, &self.view)
    }

    pub fn total_pages(&self) -> usize {
        total_pages(count_matches(&self.tasks, &self.view), self.view.page_size())
    }

    pub fn begin_refresh(&mut self) -> FetchTicket {
        self.generation = self.generation.wrapping_add(1);
        self.load_state = LoadState::Loading;
        FetchTicket {
            generation: self.generation,
        }
    }

    pub fn complete_refresh(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Task>, RequestError>,
    ) -> RefreshOutcome {
        if ticket.generation != self.generation {
            tracing::debug!(
                generation = ticket.generation,
                latest = self.generation,
                "discarding stale fetch"
            );
            return RefreshOutcome::Stale;
        }

        match result {
            Ok(tasks) => {
                let (tasks, duplicates) = dedupe(tasks);
                let count = tasks.len();
                self.tasks = tasks;
                self.load_state = LoadState::Ready;
                self.touch();
                tracing::info!(count, "loaded tasks");
                RefreshOutcome::Applied { count, duplicates }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load tasks");
                self.load_state = LoadState::Failed(err.to_string());
                RefreshOutcome::Failed(err)
            }
        }
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.view.set_search(search);
    }

    pub fn set_sort_field(&mut self, field: SortField) {
        self.view.set_sort_field(field);
    }

    pub fn set_direction(&mut self, direction: SortDirection) {
        self.view.set_direction(direction);
    }

    pub fn toggle_direction(&mut self) {
        self.view.toggle_direction();
    }

    pub fn set_page_size(&mut self, size: PageSize) {
        self.view.set_page_size(size);
    }

    pub fn set_page(&mut self, page: usize) {
        let total = self.total_pages();
        self.view.set_page(page, total);
    }

    pub fn next_page(&mut self) {
        let total = self.total_pages();
        self.view.next_page(total);
    }

    pub fn prev_page(&mut self) {
        self.view.prev_page();
    }

    pub fn reset_view(&mut self) {
        self.view.reset();
    }

    pub fn begin_create(&mut self, draft: TaskDraft) -> Result<PendingMutation, TaskError> {
        self.coordinator.begin_create(draft)
    }

    pub fn begin_update(
        &mut self,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> Result<PendingMutation, TaskError> {
        let pending = self.coordinator.begin_update(&mut self.tasks, id, patch)?;
        self.touch();
        Ok(pending)
    }

    pub fn begin_delete(&mut self, id: &TaskId) -> Result<PendingMutation, TaskError> {
        self.coordinator.begin_delete(&self.tasks, id)
    }

    pub fn settle(
        &mut self,
        pending: PendingMutation,
        result: Result<RemoteAck, RequestError>,
    ) -> Result<MutationOutcome, TaskError> {
        let outcome = self.coordinator.settle(&mut self.tasks, pending, result);
        self.touch();
        outcome
    }

    pub fn acknowledge(&mut self) {
        self.coordinator.acknowledge();
    }

    pub async fn refresh(&mut self) -> Result<usize, RequestError> {
        let ticket = self.begin_refresh();
        let source = self.source();
        let result = source.list().await;
        match self.complete_refresh(ticket, result) {
            RefreshOutcome::Applied { count, .. } => Ok(count),
            RefreshOutcome::Stale => Ok(self.tasks.len()),
            RefreshOutcome::Failed(err) => Err(err),
        }
    }

    pub async fn create(&mut self, draft: TaskDraft) -> Result<Task, TaskError> {
        let pending = self.begin_create(draft)?;
        match self.execute(pending).await? {
            MutationOutcome::Created(task) => Ok(task),
            other => Err(unexpected(other)),
        }
    }

    pub async fn update(&mut self, id: &TaskId, patch: &TaskPatch) -> Result<Task, TaskError> {
        let pending = self.begin_update(id, patch)?;
        match self.execute(pending).await? {
            MutationOutcome::Updated(task) => Ok(task),
            other => Err(unexpected(other)),
        }
    }

    pub async fn delete(&mut self, id: &TaskId) -> Result<(), TaskError> {
        let pending = self.begin_delete(id)?;
        self.execute(pending).await.map(|_| ())
    }

    async fn execute(&mut self, pending: PendingMutation) -> Result<MutationOutcome, TaskError> {
        let source = self.source();
        let result = pending.request().send(source.as_ref()).await;
        self.settle(pending, result)
    }

    fn touch(&mut self) {
        self.version = self.version.wrapping_add(1);
        let total = self.total_pages();
        self.view.clamp_page(total);
    }
}

fn dedupe(tasks: Vec<Task>) -> (Vec<Task>, usize) {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(tasks.len());
    let mut duplicates = 0;
    for task in tasks {
        if seen.insert(task.id.clone()) {
            kept.push(task);
        } else {
            tracing::warn!(task_id = task.id.as_str(), "ignoring duplicate task id");
            duplicates += 1;
        }
    }
    (kept, duplicates)
}

fn unexpected(outcome: MutationOutcome) -> TaskError {
    RequestError::Decode(format!("unexpected outcome {outcome:?}")).into()
}
