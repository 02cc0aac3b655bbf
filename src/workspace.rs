use std::borrow::Cow;
use std::time::Duration;
use tokio::time::Instant;

use crate::api::{ApiClient, ApiError, Category, Task};
use crate::config::Config;
use crate::store::{
    CategoryStore, Commit, DetailEditor, Selection, StoreError, TaskStore, ValidationError,
};

/// How long a status message stays visible.
pub const STATUS_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Error,
}

/// Transient notification for the user.
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: Cow<'static, str>,
    set_at: Instant,
}

/// Everything the user is looking at: categories, the tasks of the selected
/// category, and the task open in the editor.
///
/// Operations return `Result` and also turn failures into a status message,
/// so a caller that only renders state can ignore the return value.
#[derive(Debug)]
pub struct Workspace {
    api: ApiClient,
    categories: CategoryStore,
    tasks: TaskStore,
    selection: Selection,
    editor: Option<DetailEditor>,
    status: Option<StatusMessage>,
}

impl Workspace {
    pub fn new(api: ApiClient, tasks: TaskStore) -> Self {
        Self {
            api,
            categories: CategoryStore::default(),
            tasks,
            selection: Selection::new(),
            editor: None,
            status: None,
        }
    }

    /// Build a workspace from configuration. The token, if any, is installed
    /// on the client.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let mut api = ApiClient::with_timeout(&config.base_url, config.request_timeout())?;
        if let Some(token) = config.token() {
            api.set_token(token);
        }
        let tasks = TaskStore::new(config.task_cache_ttl(), config.task_cache_capacity);
        Ok(Self::new(api, tasks))
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn api_mut(&mut self) -> &mut ApiClient {
        &mut self.api
    }

    pub fn categories(&self) -> &CategoryStore {
        &self.categories
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn editor(&self) -> Option<&DetailEditor> {
        self.editor.as_ref()
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    /// Tasks of the selected category in display order.
    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.selection.visible(self.tasks.items())
    }

    // ========================================================================
    // Status
    // ========================================================================

    pub fn set_status(&mut self, level: StatusLevel, text: impl Into<Cow<'static, str>>) {
        self.status = Some(StatusMessage {
            level,
            text: text.into(),
            set_at: Instant::now(),
        });
    }

    /// Clear the status message once it is older than [`STATUS_TTL`].
    /// Returns true if a message was cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some(status) = &self.status {
            if status.set_at.elapsed() >= STATUS_TTL {
                self.status = None;
                return true;
            }
        }
        false
    }

    fn report<T>(&mut self, action: &'static str, result: Result<T, StoreError>) -> Result<T, StoreError> {
        if let Err(e) = &result {
            tracing::warn!(action, error = %e, "Operation failed");
            let text = match e {
                StoreError::Api(api) if api.is_auth_failure() => {
                    format!("{action}: not signed in or session expired")
                }
                other => format!("{action}: {other}"),
            };
            self.set_status(StatusLevel::Error, text);
        }
        result
    }

    // ========================================================================
    // Categories
    // ========================================================================

    pub async fn refresh_categories(&mut self) -> Result<(), StoreError> {
        let result = self.categories.refresh(&self.api).await;
        self.report("Loading categories", result)
    }

    /// Select a category from a navigation query (`catId=..&title=..`).
    ///
    /// A query without a category clears the selection. A missing title is
    /// taken from the loaded categories.
    pub async fn navigate(&mut self, query: &str) -> Result<(), StoreError> {
        let target = Selection::from_query(query);
        let Some(category) = target.category() else {
            self.selection.clear();
            self.editor = None;
            self.tasks.clear();
            return Ok(());
        };
        let title = if category.title.is_empty() {
            self.categories
                .get(category.id)
                .map(|c| c.name.clone())
                .unwrap_or_default()
        } else {
            category.title.clone()
        };
        self.open_category(category.id, title).await
    }

    /// Select `id` and load its tasks. Switching to another category closes
    /// the editor.
    pub async fn open_category(
        &mut self,
        id: i64,
        title: impl Into<String>,
    ) -> Result<(), StoreError> {
        if self.selection.select_category(id, title) {
            self.editor = None;
        }
        let result = self.tasks.load(&self.api, id, false).await;
        self.report("Loading tasks", result)
    }

    /// Refetch the selected category's tasks, bypassing the cache.
    pub async fn reload_tasks(&mut self) -> Result<(), StoreError> {
        let Some(id) = self.selection.category_id() else {
            return self.report("Loading tasks", Err(ValidationError::NoActiveCategory.into()));
        };
        let result = self.tasks.load(&self.api, id, true).await;
        self.report("Loading tasks", result)
    }

    pub async fn add_category(&mut self, name: &str) -> Result<Category, StoreError> {
        let result = self.categories.create(&self.api, name).await;
        if let Ok(category) = &result {
            self.set_status(StatusLevel::Info, format!("Created \"{}\"", category.name));
        }
        self.report("Creating category", result)
    }

    /// Delete a category. If it is selected, the selection, editor, and task
    /// list are cleared.
    pub async fn delete_category(&mut self, id: i64) -> Result<(), StoreError> {
        let result = self.categories.remove(&self.api, id).await;
        if result.is_ok() {
            self.tasks.invalidate(id);
            if self.selection.category_id() == Some(id) {
                self.selection.clear();
                self.editor = None;
                self.tasks.clear();
            }
        }
        self.report("Deleting category", result)
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    pub async fn add_task(&mut self, title: &str) -> Result<Task, StoreError> {
        let result = self.tasks.create(&self.api, title).await;
        self.report("Adding task", result)
    }

    /// Returns the new completed flag.
    pub async fn toggle_task(&mut self, id: i64) -> Result<bool, StoreError> {
        let result = self.tasks.toggle_complete(&self.api, id).await;
        self.report("Updating task", result)
    }

    pub async fn delete_task(&mut self, id: i64) -> Result<(), StoreError> {
        let result = self.tasks.remove(&self.api, id).await;
        if result.is_ok() && self.editor.as_ref().is_some_and(|e| e.task_id() == id) {
            self.close_task();
        }
        self.report("Deleting task", result)
    }

    /// Open the editor for task `id`.
    pub fn open_task(&mut self, id: i64) -> Result<(), StoreError> {
        let result = match self.tasks.get(id) {
            Some(task) if task.is_placeholder() => Err(ValidationError::NotSaved(id).into()),
            Some(task) => {
                self.editor = Some(DetailEditor::open(task.clone()));
                self.selection.select_task(id);
                Ok(())
            }
            None => Err(ValidationError::UnknownTask(id).into()),
        };
        self.report("Opening task", result)
    }

    pub fn close_task(&mut self) {
        self.editor = None;
        self.selection.clear_task();
    }

    // ========================================================================
    // Editor
    // ========================================================================

    /// Replace the title draft. Nothing is sent until [`Workspace::blur_title`].
    pub fn edit_title(&mut self, text: impl Into<String>) -> Result<(), StoreError> {
        match self.editor.as_mut() {
            Some(editor) => {
                editor.set_title_draft(text);
                Ok(())
            }
            None => self.report("Editing title", Err(ValidationError::NoOpenTask.into())),
        }
    }

    /// The title field lost focus: save the draft if it changed.
    pub async fn blur_title(&mut self) -> Result<Commit, StoreError> {
        let result = match self.editor.as_mut() {
            Some(editor) => editor.commit_title(&self.api, &mut self.tasks).await,
            None => Err(ValidationError::NoOpenTask.into()),
        };
        self.report("Saving title", result)
    }

    pub async fn set_due_date(&mut self, date: &str) -> Result<Commit, StoreError> {
        let result = match self.editor.as_mut() {
            Some(editor) => editor.set_due_date(&self.api, &mut self.tasks, date).await,
            None => Err(ValidationError::NoOpenTask.into()),
        };
        self.report("Saving due date", result)
    }

    pub async fn add_step(&mut self, text: &str) -> Result<Commit, StoreError> {
        let result = match self.editor.as_mut() {
            Some(editor) => {
                editor.set_step_draft(text);
                editor.add_step(&self.api, &mut self.tasks).await
            }
            None => Err(ValidationError::NoOpenTask.into()),
        };
        self.report("Adding step", result)
    }

    pub async fn remove_step(&mut self, index: usize) -> Result<Commit, StoreError> {
        let result = match self.editor.as_mut() {
            Some(editor) => editor.remove_step(&self.api, &mut self.tasks, index).await,
            None => Err(ValidationError::NoOpenTask.into()),
        };
        self.report("Removing step", result)
    }

    /// Move the open task to another category and close the editor.
    pub async fn move_task(&mut self, category_id: i64) -> Result<Commit, StoreError> {
        let result = match self.editor.as_mut() {
            Some(_) if self.categories.is_loaded() && self.categories.get(category_id).is_none() => {
                Err(ValidationError::UnknownCategory(category_id).into())
            }
            Some(editor) => editor.set_category(&self.api, &mut self.tasks, category_id).await,
            None => Err(ValidationError::NoOpenTask.into()),
        };
        if let Ok(Commit::Moved { to_category }) = &result {
            let name = self
                .categories
                .get(*to_category)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| format!("category {to_category}"));
            self.close_task();
            self.set_status(StatusLevel::Info, format!("Moved to \"{name}\""));
        }
        self.report("Moving task", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time;

    fn offline_workspace() -> Workspace {
        let api = ApiClient::new("http://localhost:8080").unwrap();
        Workspace::new(api, TaskStore::default())
    }

    #[tokio::test]
    async fn test_status_expires_after_3_seconds() {
        let mut ws = offline_workspace();
        time::pause();
        ws.set_status(StatusLevel::Info, "Saved");
        assert!(ws.status().is_some());

        time::advance(Duration::from_secs(2)).await;
        assert!(!ws.clear_expired_status());
        assert!(ws.status().is_some());

        time::advance(Duration::from_secs(2)).await;
        assert!(ws.clear_expired_status());
        assert!(ws.status().is_none());
    }

    #[test]
    fn test_editing_without_open_task_sets_error_status() {
        let mut ws = offline_workspace();
        let result = ws.edit_title("New title");
        assert!(matches!(
            result,
            Err(StoreError::Validation(ValidationError::NoOpenTask))
        ));
        let status = ws.status().unwrap();
        assert_eq!(status.level, StatusLevel::Error);
        assert!(status.text.contains("No task is open"));
    }

    #[test]
    fn test_open_unknown_task() {
        let mut ws = offline_workspace();
        assert!(ws.open_task(42).is_err());
        assert!(ws.editor().is_none());
        assert_eq!(ws.selection().task_id(), None);
    }

    #[tokio::test]
    async fn test_unauthenticated_status_text() {
        let mut ws = offline_workspace();
        let result = ws.refresh_categories().await;
        assert!(result.is_err());
        assert!(ws.status().unwrap().text.contains("not signed in"));
    }

    #[tokio::test]
    async fn test_navigate_without_category_clears() {
        let mut ws = offline_workspace();
        ws.navigate("title=Work").await.unwrap();
        assert!(ws.selection().category().is_none());
        assert!(ws.visible_tasks().is_empty());
    }
}
