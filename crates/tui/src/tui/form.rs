use anyhow::Result;

use super::buffer::TextBuffer;
use crate::model::{parse_due_date, Priority, RecordId, Task, TaskDraft, TaskId, TaskPatch, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FormField {
    Title,
    Description,
    Status,
    Priority,
    DueDate,
    Assignee,
}

impl FormField {
    pub(crate) const ALL: [FormField; 6] = [
        FormField::Title,
        FormField::Description,
        FormField::Status,
        FormField::Priority,
        FormField::DueDate,
        FormField::Assignee,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            FormField::Title => "Title",
            FormField::Description => "Description",
            FormField::Status => "Status",
            FormField::Priority => "Priority",
            FormField::DueDate => "Due (YYYY-MM-DD)",
            FormField::Assignee => "Assignee id",
        }
    }

    /// Choice fields cycle through fixed values instead of taking text.
    pub(crate) fn is_choice(self) -> bool {
        matches!(self, FormField::Status | FormField::Priority)
    }

    fn index(self) -> usize {
        FormField::ALL
            .iter()
            .position(|field| *field == self)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FormMode {
    Create,
    Edit(TaskId),
}

/// Editable copy of a task's fields for the create and edit overlays.
#[derive(Debug, Clone)]
pub(crate) struct TaskForm {
    mode: FormMode,
    focus: FormField,
    title: TextBuffer,
    description: TextBuffer,
    status: TaskStatus,
    priority: Priority,
    due_date: TextBuffer,
    assignee: TextBuffer,
}

impl TaskForm {
    pub(crate) fn create() -> Self {
        Self {
            mode: FormMode::Create,
            focus: FormField::Title,
            title: TextBuffer::new(),
            description: TextBuffer::new(),
            status: TaskStatus::default(),
            priority: Priority::default(),
            due_date: TextBuffer::new(),
            assignee: TextBuffer::new(),
        }
    }

    pub(crate) fn edit(task: &Task) -> Self {
        let due = task
            .due_date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let assignee = task
            .assignee
            .as_ref()
            .map(|a| a.id().to_string())
            .unwrap_or_default();
        Self {
            mode: FormMode::Edit(task.id.clone()),
            focus: FormField::Title,
            title: TextBuffer::from_text(task.title.clone()),
            description: TextBuffer::from_text(task.description.clone()),
            status: task.status,
            priority: task.priority,
            due_date: TextBuffer::from_text(due),
            assignee: TextBuffer::from_text(assignee),
        }
    }

    pub(crate) fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub(crate) fn focus(&self) -> FormField {
        self.focus
    }

    pub(crate) fn focus_next(&mut self) {
        let next = (self.focus.index() + 1) % FormField::ALL.len();
        self.focus = FormField::ALL[next];
    }

    pub(crate) fn focus_prev(&mut self) {
        let len = FormField::ALL.len();
        let prev = (self.focus.index() + len - 1) % len;
        self.focus = FormField::ALL[prev];
    }

    /// Text shown for `field`.
    pub(crate) fn value(&self, field: FormField) -> String {
        match field {
            FormField::Status => self.status.as_str().to_string(),
            FormField::Priority => self.priority.as_str().to_string(),
            _ => self
                .text(field)
                .map(|buffer| buffer.as_str().to_string())
                .unwrap_or_default(),
        }
    }

    pub(crate) fn cursor_column(&self) -> Option<usize> {
        self.text(self.focus).map(TextBuffer::cursor_column)
    }

    pub(crate) fn cycle(&mut self, forward: bool) {
        match self.focus {
            FormField::Status => {
                self.status = if forward {
                    self.status.next()
                } else {
                    self.status.next().next()
                }
            }
            FormField::Priority => {
                self.priority = if forward {
                    self.priority.next()
                } else {
                    self.priority.next().next()
                }
            }
            _ => {}
        }
    }

    pub(crate) fn focused_buffer(&mut self) -> Option<&mut TextBuffer> {
        match self.focus {
            FormField::Title => Some(&mut self.title),
            FormField::Description => Some(&mut self.description),
            FormField::DueDate => Some(&mut self.due_date),
            FormField::Assignee => Some(&mut self.assignee),
            FormField::Status | FormField::Priority => None,
        }
    }

    fn text(&self, field: FormField) -> Option<&TextBuffer> {
        match field {
            FormField::Title => Some(&self.title),
            FormField::Description => Some(&self.description),
            FormField::DueDate => Some(&self.due_date),
            FormField::Assignee => Some(&self.assignee),
            FormField::Status | FormField::Priority => None,
        }
    }

    fn parsed_due(&self) -> Result<Option<chrono::NaiveDate>> {
        if self.due_date.is_blank() {
            Ok(None)
        } else {
            parse_due_date(self.due_date.as_str()).map(Some)
        }
    }

    fn parsed_assignee(&self) -> Option<RecordId> {
        let id = self.assignee.as_str().trim();
        (!id.is_empty()).then(|| RecordId::from(id))
    }

    pub(crate) fn to_draft(&self) -> Result<TaskDraft> {
        let mut draft = TaskDraft::new(
            self.title.as_str().trim(),
            self.description.as_str().trim(),
        );
        draft.status = self.status;
        draft.priority = self.priority;
        draft.due_date = self.parsed_due()?;
        draft.assignee = self.parsed_assignee();
        Ok(draft)
    }

    /// Every field as a patch; unchanged values are harmless to resend.
    pub(crate) fn to_patch(&self) -> Result<TaskPatch> {
        Ok(TaskPatch {
            title: Some(self.title.as_str().trim().to_string()),
            description: Some(self.description.as_str().trim().to_string()),
            status: Some(self.status),
            due_date: Some(self.parsed_due()?),
            priority: Some(self.priority),
            assignee: Some(self.parsed_assignee()),
        })
    }
}
