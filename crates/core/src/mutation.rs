//! Create, update and delete against the remote source, reconciled with the
//! locally held collection.
//!
//! Every mutation is two-phase: `begin_*` validates and returns a
//! [`PendingMutation`], the caller performs [`RemoteRequest::send`] wherever it
//! likes, and [`MutationCoordinator::settle`] applies the result. Only updates
//! touch the collection before the server answers; creates and deletes wait for
//! confirmation.

use std::fmt;

use crate::error::{RequestError, TaskError};
use crate::model::{RequiredFields, Task, TaskDraft, TaskId, TaskPatch};
use crate::remote::TaskSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `Idle → Pending → Committed | RolledBack`, then back to `Idle` on acknowledge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MutationPhase {
    #[default]
    Idle,
    Pending {
        kind: MutationKind,
        target: Option<TaskId>,
    },
    Committed {
        kind: MutationKind,
        target: Option<TaskId>,
    },
    RolledBack {
        kind: MutationKind,
        target: Option<TaskId>,
    },
}

impl MutationPhase {
    pub fn is_pending(&self) -> bool {
        matches!(self, MutationPhase::Pending { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Intent {
    Create {
        draft: TaskDraft,
    },
    Update {
        id: TaskId,
        draft: TaskDraft,
        snapshot: Task,
    },
    Delete {
        id: TaskId,
    },
}

/// A mutation whose remote call has not resolved yet. Holds the pre-update
/// snapshot needed to roll an optimistic update back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    ticket: u64,
    intent: Intent,
}

impl PendingMutation {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn kind(&self) -> MutationKind {
        match self.intent {
            Intent::Create { .. } => MutationKind::Create,
            Intent::Update { .. } => MutationKind::Update,
            Intent::Delete { .. } => MutationKind::Delete,
        }
    }

    pub fn target(&self) -> Option<&TaskId> {
        match &self.intent {
            Intent::Create { .. } => None,
            Intent::Update { id, .. } | Intent::Delete { id } => Some(id),
        }
    }

    /// The remote call this mutation needs, detached from the coordinator so it
    /// can run on another task.
    pub fn request(&self) -> RemoteRequest {
        match &self.intent {
            Intent::Create { draft } => RemoteRequest::Create(draft.clone()),
            Intent::Update { id, draft, .. } => RemoteRequest::Update(id.clone(), draft.clone()),
            Intent::Delete { id } => RemoteRequest::Delete(id.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRequest {
    Create(TaskDraft),
    Update(TaskId, TaskDraft),
    Delete(TaskId),
}

impl RemoteRequest {
    pub async fn send(self, source: &dyn TaskSource) -> Result<RemoteAck, RequestError> {
        match self {
            RemoteRequest::Create(draft) => source.create(&draft).await.map(RemoteAck::Created),
            RemoteRequest::Update(id, draft) => {
                source.update(&id, &draft).await.map(RemoteAck::Updated)
            }
            RemoteRequest::Delete(id) => source.delete(&id).await.map(|()| RemoteAck::Deleted),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteAck {
    Created(Task),
    Updated(Task),
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Created(Task),
    Updated(Task),
    Deleted(TaskId),
}

#[derive(Debug, Clone)]
pub struct MutationCoordinator {
    phase: MutationPhase,
    next_ticket: u64,
    required: RequiredFields,
    optimistic_updates: bool,
}

impl Default for MutationCoordinator {
    fn default() -> Self {
        Self::new(RequiredFields::default())
    }
}

impl MutationCoordinator {
    pub fn new(required: RequiredFields) -> Self {
        Self {
            phase: MutationPhase::Idle,
            next_ticket: 0,
            required,
            optimistic_updates: true,
        }
    }

    /// Wait for the server before showing an update locally.
    pub fn without_optimistic_updates(mut self) -> Self {
        self.optimistic_updates = false;
        self
    }

    pub fn required_fields(&self) -> &RequiredFields {
        &self.required
    }

    pub fn phase(&self) -> &MutationPhase {
        &self.phase
    }

    /// Return a settled coordinator to `Idle`. A pending phase is left alone.
    pub fn acknowledge(&mut self) {
        if !self.phase.is_pending() {
            self.phase = MutationPhase::Idle;
        }
    }

    pub fn begin_create(&mut self, draft: TaskDraft) -> Result<PendingMutation, TaskError> {
        draft.validate(&self.required)?;
        Ok(self.start(Intent::Create { draft }))
    }

    pub fn begin_update(
        &mut self,
        collection: &mut [Task],
        id: &TaskId,
        patch: &TaskPatch,
    ) -> Result<PendingMutation, TaskError> {
        let index = position(collection, id).ok_or_else(|| RequestError::NotFound(id.clone()))?;
        let snapshot = collection[index].clone();
        let patched = patch.apply_to(&snapshot);
        let draft = TaskDraft::from(&patched);
        draft.validate(&self.required)?;

        if self.optimistic_updates {
            collection[index] = patched;
        }
        Ok(self.start(Intent::Update {
            id: id.clone(),
            draft,
            snapshot,
        }))
    }

    pub fn begin_delete(
        &mut self,
        collection: &[Task],
        id: &TaskId,
    ) -> Result<PendingMutation, TaskError> {
        if position(collection, id).is_none() {
            return Err(RequestError::NotFound(id.clone()).into());
        }
        Ok(self.start(Intent::Delete { id: id.clone() }))
    }

    /// Apply the remote result. A failure is reported once and leaves the
    /// collection as it was before the mutation began.
    pub fn settle(
        &mut self,
        collection: &mut Vec<Task>,
        pending: PendingMutation,
        result: Result<RemoteAck, RequestError>,
    ) -> Result<MutationOutcome, TaskError> {
        let kind = pending.kind();
        let target = pending.target().cloned();

        let outcome = match (pending.intent, result) {
            (Intent::Create { .. }, Ok(RemoteAck::Created(task))) => {
                upsert(collection, task.clone());
                Ok(MutationOutcome::Created(task))
            }
            (Intent::Update { id, .. }, Ok(RemoteAck::Updated(task))) => {
                match position(collection, &id) {
                    Some(index) => collection[index] = task.clone(),
                    None => upsert(collection, task.clone()),
                }
                Ok(MutationOutcome::Updated(task))
            }
            (Intent::Delete { id }, Ok(RemoteAck::Deleted)) => {
                collection.retain(|task| task.id != id);
                Ok(MutationOutcome::Deleted(id))
            }
            (Intent::Update { id, snapshot, .. }, result) => {
                if let Some(index) = position(collection, &id) {
                    collection[index] = snapshot;
                }
                Err(failure(result))
            }
            (_, result) => Err(failure(result)),
        };

        match &outcome {
            Ok(_) => {
                tracing::info!(
                    kind = kind.as_str(),
                    task_id = target.as_ref().map(TaskId::as_str),
                    "mutation committed"
                );
                self.phase = MutationPhase::Committed { kind, target };
            }
            Err(err) => {
                tracing::warn!(
                    kind = kind.as_str(),
                    task_id = target.as_ref().map(TaskId::as_str),
                    error = %err,
                    "mutation rolled back"
                );
                self.phase = MutationPhase::RolledBack { kind, target };
            }
        }
        outcome.map_err(TaskError::from)
    }

    /// begin, send and settle in one go, for callers without a UI loop.
    pub async fn run(
        &mut self,
        collection: &mut Vec<Task>,
        source: &dyn TaskSource,
        pending: PendingMutation,
    ) -> Result<MutationOutcome, TaskError> {
        let result = pending.request().send(source).await;
        self.settle(collection, pending, result)
    }

    fn start(&mut self, intent: Intent) -> PendingMutation {
        self.next_ticket = self.next_ticket.wrapping_add(1);
        let pending = PendingMutation {
            ticket: self.next_ticket,
            intent,
        };
        self.phase = MutationPhase::Pending {
            kind: pending.kind(),
            target: pending.target().cloned(),
        };
        pending
    }
}

fn failure(result: Result<RemoteAck, RequestError>) -> RequestError {
    match result {
        Err(err) => err,
        Ok(ack) => RequestError::Decode(format!("unexpected acknowledgement {ack:?}")),
    }
}

fn position(collection: &[Task], id: &TaskId) -> Option<usize> {
    collection.iter().position(|task| &task.id == id)
}

fn upsert(collection: &mut Vec<Task>, task: Task) {
    match position(collection, &task.id) {
        Some(index) => collection[index] = task,
        None => collection.push(task),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, TaskStatus};
    use crate::error::ValidationError;
    use crate::testing::{sample_task, FakeSource};
    use pretty_assertions::assert_eq;

    fn collection() -> Vec<Task> {
        vec![sample_task("5", "A"), sample_task("7", "Seven")]
    }

    fn rename(title: &str) -> TaskPatch {
        TaskPatch {
            title: Some(title.into()),
            ..TaskPatch::default()
        }
    }

    #[test]
    fn optimistic_update_applies_immediately_and_rolls_back() {
        let mut tasks = collection();
        let mut coordinator = MutationCoordinator::default();
        let pending = coordinator
            .begin_update(&mut tasks, &TaskId::from("5"), &rename("B"))
            .unwrap();

        assert_eq!(tasks[0].title, "B");
        assert!(coordinator.phase().is_pending());

        let err = coordinator
            .settle(
                &mut tasks,
                pending,
                Err(RequestError::Network("connection reset".into())),
            )
            .unwrap_err();

        assert_eq!(tasks[0].title, "A");
        assert_eq!(
            err,
            TaskError::Request(RequestError::Network("connection reset".into()))
        );
        assert_eq!(
            coordinator.phase(),
            &MutationPhase::RolledBack {
                kind: MutationKind::Update,
                target: Some(TaskId::from("5")),
            }
        );
        coordinator.acknowledge();
        assert_eq!(coordinator.phase(), &MutationPhase::Idle);
    }

    #[test]
    fn update_success_takes_the_server_record() {
        let mut tasks = collection();
        let mut coordinator = MutationCoordinator::default();
        let pending = coordinator
            .begin_update(&mut tasks, &TaskId::from("5"), &rename("B"))
            .unwrap();

        let mut server = sample_task("5", "B");
        server.status = TaskStatus::Done;
        let outcome = coordinator
            .settle(&mut tasks, pending, Ok(RemoteAck::Updated(server.clone())))
            .unwrap();

        assert_eq!(outcome, MutationOutcome::Updated(server.clone()));
        assert_eq!(tasks[0], server);
    }

    #[test]
    fn non_optimistic_update_waits_for_the_server() {
        let mut tasks = collection();
        let mut coordinator = MutationCoordinator::default().without_optimistic_updates();
        let pending = coordinator
            .begin_update(&mut tasks, &TaskId::from("5"), &rename("B"))
            .unwrap();
        assert_eq!(tasks[0].title, "A");

        let mut expected = TaskDraft::from(&tasks[0]);
        expected.title = "B".into();
        assert_eq!(
            pending.request(),
            RemoteRequest::Update(TaskId::from("5"), expected)
        );
    }

    #[test]
    fn update_validation_runs_before_any_change() {
        let mut tasks = collection();
        let mut coordinator = MutationCoordinator::default();
        let err = coordinator
            .begin_update(&mut tasks, &TaskId::from("5"), &rename("  "))
            .unwrap_err();
        assert_eq!(err, TaskError::Validation(ValidationError::MissingField("title")));
        assert_eq!(tasks[0].title, "A");
        assert_eq!(coordinator.phase(), &MutationPhase::Idle);
    }

    #[test]
    fn update_of_unknown_record_is_not_found() {
        let mut tasks = collection();
        let err = MutationCoordinator::default()
            .begin_update(&mut tasks, &TaskId::from("99"), &rename("x"))
            .unwrap_err();
        assert_eq!(err, TaskError::Request(RequestError::NotFound(TaskId::from("99"))));
    }

    #[test]
    fn delete_is_never_speculative() {
        let mut tasks = collection();
        let mut coordinator = MutationCoordinator::default();
        let id = TaskId::from("7");
        let pending = coordinator.begin_delete(&tasks, &id).unwrap();

        assert!(tasks.iter().any(|t| t.id == id));
        assert_eq!(pending.request(), RemoteRequest::Delete(id.clone()));

        let outcome = coordinator
            .settle(&mut tasks, pending, Ok(RemoteAck::Deleted))
            .unwrap();
        assert_eq!(outcome, MutationOutcome::Deleted(id.clone()));
        assert!(tasks.iter().all(|t| t.id != id));
    }

    #[test]
    fn failed_delete_leaves_collection_unchanged() {
        let mut tasks = collection();
        let before = tasks.clone();
        let mut coordinator = MutationCoordinator::default();
        let id = TaskId::from("7");
        let pending = coordinator.begin_delete(&tasks, &id).unwrap();
        let err = coordinator
            .settle(&mut tasks, pending, Err(RequestError::NotFound(id)))
            .unwrap_err();
        assert!(matches!(err, TaskError::Request(RequestError::NotFound(_))));
        assert_eq!(tasks, before);
    }

    #[test]
    fn create_validates_before_requesting() {
        let mut coordinator = MutationCoordinator::default();
        let err = coordinator
            .begin_create(TaskDraft::new("", "body"))
            .unwrap_err();
        assert_eq!(err, TaskError::Validation(ValidationError::MissingField("title")));
        assert_eq!(coordinator.phase(), &MutationPhase::Idle);

        let mut strict = MutationCoordinator::new(RequiredFields::all());
        assert!(strict.begin_create(TaskDraft::new("t", "d")).is_err());
    }

    #[test]
    fn create_appends_server_record_only_on_success() {
        let mut tasks = collection();
        let mut coordinator = MutationCoordinator::default();
        let pending = coordinator
            .begin_create(TaskDraft::new("Buy milk", "two litres"))
            .unwrap();
        assert_eq!(tasks.len(), 2);

        let err = coordinator
            .settle(
                &mut tasks,
                pending.clone(),
                Err(RequestError::Status {
                    status: 500,
                    message: "boom".into(),
                }),
            )
            .unwrap_err();
        assert!(matches!(err, TaskError::Request(RequestError::Status { .. })));
        assert_eq!(tasks.len(), 2);

        let created = sample_task("9", "Buy milk");
        coordinator
            .settle(&mut tasks, pending, Ok(RemoteAck::Created(created.clone())))
            .unwrap();
        assert_eq!(tasks.last(), Some(&created));
    }

    #[test]
    fn mismatched_acknowledgement_rolls_back() {
        let mut tasks = collection();
        let mut coordinator = MutationCoordinator::default();
        let pending = coordinator
            .begin_update(&mut tasks, &TaskId::from("5"), &rename("B"))
            .unwrap();
        let err = coordinator
            .settle(&mut tasks, pending, Ok(RemoteAck::Deleted))
            .unwrap_err();
        assert!(matches!(err, TaskError::Request(RequestError::Decode(_))));
        assert_eq!(tasks[0].title, "A");
    }

    #[tokio::test]
    async fn run_round_trips_through_a_source() {
        let source = FakeSource::with_tasks(collection());
        let mut tasks = collection();
        let mut coordinator = MutationCoordinator::default();

        let patch = TaskPatch {
            priority: Some(Priority::High),
            ..TaskPatch::default()
        };
        let pending = coordinator
            .begin_update(&mut tasks, &TaskId::from("7"), &patch)
            .unwrap();
        let outcome = coordinator.run(&mut tasks, &source, pending).await.unwrap();
        match outcome {
            MutationOutcome::Updated(task) => assert_eq!(task.priority, Priority::High),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(source.server_tasks()[1].priority, Priority::High);

        source.fail_with(RequestError::Timeout(std::time::Duration::from_secs(1)));
        let pending = coordinator
            .begin_update(&mut tasks, &TaskId::from("7"), &rename("Renamed"))
            .unwrap();
        assert!(coordinator.run(&mut tasks, &source, pending).await.is_err());
        assert_eq!(tasks[1].title, "Seven");
    }
}
