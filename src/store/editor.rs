use chrono::{DateTime, NaiveDate};

use crate::api::{ApiClient, Task, TaskPatch};
use crate::util::clean_text;

use super::error::{StoreError, ValidationError};
use super::tasks::TaskStore;

/// Outcome of an editor action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Nothing changed; no request was sent.
    Unchanged,
    /// The server accepted the edit.
    Saved,
    /// The task now lives in another category and has left the displayed list.
    Moved { to_category: i64 },
}

/// Edit panel for one task.
///
/// Every change is sent as the full merged record through
/// [`TaskStore::update_fields`]; the title is only sent when the draft is
/// committed (loss of focus), everything else immediately.
#[derive(Debug, Clone)]
pub struct DetailEditor {
    task: Task,
    title_draft: String,
    step_draft: String,
}

impl DetailEditor {
    pub fn open(task: Task) -> Self {
        Self {
            title_draft: task.title.clone(),
            step_draft: String::new(),
            task,
        }
    }

    /// The record as last loaded or saved.
    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn task_id(&self) -> i64 {
        self.task.id
    }

    pub fn title_draft(&self) -> &str {
        &self.title_draft
    }

    pub fn set_title_draft(&mut self, text: impl Into<String>) {
        self.title_draft = text.into();
    }

    pub fn step_draft(&self) -> &str {
        &self.step_draft
    }

    pub fn set_step_draft(&mut self, text: impl Into<String>) {
        self.step_draft = text.into();
    }

    /// Save the title draft if it differs from the loaded title. Both are
    /// compared after cleaning, so surrounding whitespace alone is no change.
    ///
    /// A blank draft is rejected and reset to the loaded title.
    pub async fn commit_title(
        &mut self,
        api: &ApiClient,
        store: &mut TaskStore,
    ) -> Result<Commit, StoreError> {
        self.sync(store);
        let draft = clean_text(&self.title_draft);
        if draft == clean_text(&self.task.title) {
            self.title_draft = draft;
            return Ok(Commit::Unchanged);
        }
        if draft.is_empty() {
            self.title_draft = self.task.title.clone();
            return Err(ValidationError::EmptyTitle.into());
        }
        self.commit(api, store, TaskPatch::title(draft)).await?;
        Ok(Commit::Saved)
    }

    /// Set or clear (empty input) the due date.
    pub async fn set_due_date(
        &mut self,
        api: &ApiClient,
        store: &mut TaskStore,
        date: &str,
    ) -> Result<Commit, StoreError> {
        let date = parse_due_date(date)?;
        self.sync(store);
        if date == self.task.due_date {
            return Ok(Commit::Unchanged);
        }
        self.commit(api, store, TaskPatch::due_date(date)).await?;
        Ok(Commit::Saved)
    }

    /// Append the step draft. A blank draft is ignored.
    pub async fn add_step(
        &mut self,
        api: &ApiClient,
        store: &mut TaskStore,
    ) -> Result<Commit, StoreError> {
        let step = clean_text(&self.step_draft);
        if step.is_empty() {
            return Ok(Commit::Unchanged);
        }
        self.sync(store);
        let mut steps = self.task.steps.clone();
        steps.push(step);
        self.commit(api, store, TaskPatch::steps(steps)).await?;
        self.step_draft.clear();
        Ok(Commit::Saved)
    }

    pub async fn remove_step(
        &mut self,
        api: &ApiClient,
        store: &mut TaskStore,
        index: usize,
    ) -> Result<Commit, StoreError> {
        self.sync(store);
        let len = self.task.steps.len();
        if index >= len {
            return Err(ValidationError::StepOutOfRange { index, len }.into());
        }
        let mut steps = self.task.steps.clone();
        steps.remove(index);
        self.commit(api, store, TaskPatch::steps(steps)).await?;
        Ok(Commit::Saved)
    }

    /// Move the task to another category.
    ///
    /// On success the task is dropped from the displayed list and the target
    /// category's cached list is invalidated so it is refetched on open.
    pub async fn set_category(
        &mut self,
        api: &ApiClient,
        store: &mut TaskStore,
        category_id: i64,
    ) -> Result<Commit, StoreError> {
        self.sync(store);
        if category_id == self.task.category_id {
            return Ok(Commit::Unchanged);
        }
        self.commit(api, store, TaskPatch::category(category_id))
            .await?;
        store.evict(self.task.id);
        store.invalidate(category_id);
        tracing::debug!(
            task_id = self.task.id,
            to_category = category_id,
            "Task moved"
        );
        Ok(Commit::Moved {
            to_category: category_id,
        })
    }

    /// Pick up changes made to the task through the list (e.g. a toggle).
    fn sync(&mut self, store: &TaskStore) {
        if let Some(current) = store.get(self.task.id) {
            if *current != self.task {
                self.task = current.clone();
            }
        }
    }

    async fn commit(
        &mut self,
        api: &ApiClient,
        store: &mut TaskStore,
        patch: TaskPatch,
    ) -> Result<(), StoreError> {
        match store.update_fields(api, self.task.id, &patch).await {
            Ok(saved) => {
                self.title_draft = saved.title.clone();
                self.task = saved;
                Ok(())
            }
            Err(e) => {
                // The store has rolled back; show what it holds now
                self.sync(store);
                self.title_draft = self.task.title.clone();
                Err(e)
            }
        }
    }
}

/// Validate a due date. Empty input clears the date; otherwise a calendar
/// date (`2026-03-01`) or an RFC 3339 date-time is required.
pub fn parse_due_date(input: &str) -> Result<String, ValidationError> {
    let input = input.trim();
    if input.is_empty()
        || NaiveDate::parse_from_str(input, "%Y-%m-%d").is_ok()
        || DateTime::parse_from_rfc3339(input).is_ok()
    {
        return Ok(input.to_string());
    }
    Err(ValidationError::InvalidDueDate(input.to_string()))
}
