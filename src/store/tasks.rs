use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::api::{ApiClient, ApiError, Task, TaskPatch};
use crate::util::clean_text;

use super::error::{StoreError, ValidationError};
use super::optimistic::{Mutation, OptimisticList};

/// Freshness window of a cached task list.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);
/// Number of categories whose task lists are kept.
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

struct CachedTasks {
    tasks: Arc<Vec<Task>>,
    fetched_at: Instant,
}

/// Placeholder task waiting for the server to confirm its creation.
#[derive(Debug)]
pub struct PendingTask {
    mutation: Mutation<Task>,
    temp_id: i64,
    category_id: i64,
    title: String,
}

impl PendingTask {
    pub fn temp_id(&self) -> i64 {
        self.temp_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

/// Any other optimistic task change in flight: toggle, update, or delete.
#[derive(Debug)]
pub struct PendingChange {
    mutation: Mutation<Task>,
    task_id: i64,
    /// Category the server files the task under before this change.
    category_id: i64,
    /// Task as sent to the server (`None` for deletes).
    task: Option<Task>,
}

impl PendingChange {
    pub fn task_id(&self) -> i64 {
        self.task_id
    }

    pub fn category_id(&self) -> i64 {
        self.category_id
    }

    pub fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }
}

/// Tasks of the active category, with a small per-category cache.
///
/// Local changes are written back into the cache entry of their category but
/// do not extend its freshness; a list older than the TTL is refetched on the
/// next [`TaskStore::load`].
pub struct TaskStore {
    category_id: Option<i64>,
    list: OptimisticList<Task>,
    cache: LruCache<i64, CachedTasks>,
    ttl: Duration,
    next_temp_id: i64,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL, DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore")
            .field("category_id", &self.category_id)
            .field("tasks", &self.list.items().len())
            .field("cached_categories", &self.cache.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TaskStore {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            category_id: None,
            list: OptimisticList::new(),
            cache: LruCache::new(capacity),
            ttl,
            next_temp_id: -1,
        }
    }

    /// Category whose tasks are currently loaded.
    pub fn category_id(&self) -> Option<i64> {
        self.category_id
    }

    pub fn items(&self) -> &[Task] {
        self.list.items()
    }

    pub fn get(&self, id: i64) -> Option<&Task> {
        self.list.items().iter().find(|t| t.id == id)
    }

    pub fn is_cached(&self, category_id: i64) -> bool {
        self.cache.contains(&category_id)
    }

    /// Load the tasks of `category_id`.
    ///
    /// A cached list younger than the TTL is used without a request unless
    /// `force` is set. If the request for another category fails, the
    /// previous list is dropped and no category is active.
    pub async fn load(
        &mut self,
        api: &ApiClient,
        category_id: i64,
        force: bool,
    ) -> Result<(), StoreError> {
        if !force {
            if let Some(cached) = self.fresh_cached(category_id) {
                tracing::debug!(category_id, count = cached.len(), "Serving cached task list");
                self.category_id = Some(category_id);
                self.list.replace_shared(cached);
                return Ok(());
            }
        }

        let mut tasks = match api.list_tasks(category_id).await {
            Ok(tasks) => tasks,
            Err(e) => {
                if !self.owns(category_id) {
                    self.clear();
                }
                return Err(e.into());
            }
        };
        for task in &mut tasks {
            if task.category_id == 0 {
                task.category_id = category_id;
            }
        }
        tracing::debug!(category_id, count = tasks.len(), "Loaded tasks");

        self.load_local(category_id, tasks);
        Ok(())
    }

    fn fresh_cached(&mut self, category_id: i64) -> Option<Arc<Vec<Task>>> {
        let ttl = self.ttl;
        let entry = self
            .cache
            .get(&category_id)
            .map(|e| (e.fetched_at.elapsed() < ttl, Arc::clone(&e.tasks)));
        match entry {
            Some((true, tasks)) => Some(tasks),
            Some((false, _)) => {
                self.cache.pop(&category_id);
                None
            }
            None => None,
        }
    }

    /// Show `tasks` as the list of `category_id` without a request, e.g. a
    /// list fetched by another component. The cache entry counts as fresh.
    pub fn load_local(&mut self, category_id: i64, tasks: Vec<Task>) {
        self.category_id = Some(category_id);
        self.list.replace(tasks);
        self.cache.put(
            category_id,
            CachedTasks {
                tasks: self.list.shared(),
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drop the loaded list (no category selected).
    pub fn clear(&mut self) {
        self.category_id = None;
        self.list.replace(Vec::new());
    }

    /// Forget the cached list of `category_id` so the next load refetches it.
    pub fn invalidate(&mut self, category_id: i64) {
        self.cache.pop(&category_id);
    }

    /// Remove a task from the displayed list without telling the server.
    pub fn evict(&mut self, id: i64) {
        self.list.edit(|tasks| tasks.retain(|t| t.id != id));
        self.write_back();
    }

    fn owns(&self, category_id: i64) -> bool {
        self.category_id == Some(category_id)
    }

    fn active_category(&self) -> Result<i64, ValidationError> {
        self.category_id.ok_or(ValidationError::NoActiveCategory)
    }

    fn saved_task(&self, id: i64) -> Result<&Task, ValidationError> {
        let task = self.get(id).ok_or(ValidationError::UnknownTask(id))?;
        if task.is_placeholder() {
            return Err(ValidationError::NotSaved(id));
        }
        Ok(task)
    }

    /// Mirror the current list into the cache entry of its category.
    fn write_back(&mut self) {
        let Some(category_id) = self.category_id else {
            return;
        };
        let tasks = self.list.shared();
        match self.cache.get_mut(&category_id) {
            Some(entry) => entry.tasks = tasks,
            None => {
                self.cache.put(
                    category_id,
                    CachedTasks {
                        tasks,
                        fetched_at: Instant::now(),
                    },
                );
            }
        }
    }

    /// Confirm or compensate a change. When the displayed list has since
    /// switched to another category, the change's category cache entry is
    /// dropped instead so its next load comes from the server.
    fn settle(
        &mut self,
        mutation: Mutation<Task>,
        category_id: i64,
        result: Result<(), ApiError>,
    ) -> Result<(), StoreError> {
        match result {
            Ok(()) => {
                if self.owns(category_id) {
                    self.list.confirm(mutation);
                }
                Ok(())
            }
            Err(e) => Err(self.roll_back(mutation, category_id, e)),
        }
    }

    fn roll_back(&mut self, mutation: Mutation<Task>, category_id: i64, error: ApiError) -> StoreError {
        tracing::warn!(
            category_id,
            mutation = mutation.label(),
            error = %error,
            "Task change failed, rolling back"
        );
        if self.owns(category_id) {
            self.list.compensate(mutation);
            self.write_back();
        } else {
            self.cache.pop(&category_id);
        }
        error.into()
    }

    // ========================================================================
    // Create
    // ========================================================================

    pub fn begin_create(&mut self, title: &str) -> Result<PendingTask, StoreError> {
        let category_id = self.active_category()?;
        let title = clean_text(title);
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }

        let temp_id = self.next_temp_id;
        self.next_temp_id -= 1;

        let placeholder = Task::placeholder(temp_id, title.clone(), category_id);
        let mutation = self.list.apply("create_task", |tasks| tasks.push(placeholder));
        self.write_back();

        Ok(PendingTask {
            mutation,
            temp_id,
            category_id,
            title,
        })
    }

    pub fn settle_create(
        &mut self,
        pending: PendingTask,
        result: Result<Task, ApiError>,
    ) -> Result<Task, StoreError> {
        let PendingTask {
            mutation,
            temp_id,
            category_id,
            ..
        } = pending;

        match result {
            Ok(mut created) => {
                if created.category_id == 0 {
                    created.category_id = category_id;
                }
                if self.owns(category_id) {
                    self.list.confirm(mutation);
                    let replacement = created.clone();
                    self.list.edit(|tasks| {
                        if let Some(slot) = tasks.iter_mut().find(|t| t.id == temp_id) {
                            *slot = replacement;
                        }
                    });
                    self.write_back();
                } else {
                    self.cache.pop(&category_id);
                }
                Ok(created)
            }
            Err(e) => Err(self.roll_back(mutation, category_id, e)),
        }
    }

    pub async fn create(&mut self, api: &ApiClient, title: &str) -> Result<Task, StoreError> {
        let pending = self.begin_create(title)?;
        let result = api.create_task(pending.category_id, pending.title()).await;
        self.settle_create(pending, result)
    }

    // ========================================================================
    // Toggle
    // ========================================================================

    /// Flip the completed flag locally. Synchronous; nothing is sent yet.
    pub fn begin_toggle(&mut self, id: i64) -> Result<PendingChange, StoreError> {
        let category_id = self.active_category()?;
        let completed = !self.saved_task(id)?.completed;

        let mutation = self.list.apply("toggle_task", |tasks| {
            if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
                task.completed = completed;
            }
        });
        self.write_back();

        Ok(PendingChange {
            mutation,
            task_id: id,
            category_id,
            task: self.get(id).cloned(),
        })
    }

    /// Returns the new completed flag.
    pub async fn toggle_complete(&mut self, api: &ApiClient, id: i64) -> Result<bool, StoreError> {
        let pending = self.begin_toggle(id)?;
        let completed = pending.task.as_ref().is_some_and(|t| t.completed);
        let result = api
            .set_task_completed(pending.task_id, pending.category_id, completed)
            .await;
        self.settle_change(pending, result)?;
        Ok(completed)
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Merge `patch` into task `id` and show the result locally. Returns
    /// `None` when the patch changes nothing.
    pub fn begin_update(
        &mut self,
        id: i64,
        patch: &TaskPatch,
    ) -> Result<Option<PendingChange>, StoreError> {
        let category_id = self.active_category()?;
        let current = self.saved_task(id)?;
        let mut merged = patch.apply_to(current);
        if patch.title.is_some() {
            merged.title = clean_text(&merged.title);
            if merged.title.is_empty() {
                return Err(ValidationError::EmptyTitle.into());
            }
        }
        if &merged == current {
            return Ok(None);
        }

        let replacement = merged.clone();
        let mutation = self.list.apply("update_task", |tasks| {
            if let Some(slot) = tasks.iter_mut().find(|t| t.id == id) {
                *slot = replacement;
            }
        });
        self.write_back();

        Ok(Some(PendingChange {
            mutation,
            task_id: id,
            category_id,
            task: Some(merged),
        }))
    }

    /// Send the merged record and keep it, or restore the previous list.
    ///
    /// Returns the record as it now stands locally. A patch that changes
    /// nothing sends no request.
    pub async fn update_fields(
        &mut self,
        api: &ApiClient,
        id: i64,
        patch: &TaskPatch,
    ) -> Result<Task, StoreError> {
        let Some(pending) = self.begin_update(id, patch)? else {
            return Ok(self.saved_task(id)?.clone());
        };
        let merged = pending.task.clone().ok_or(ValidationError::UnknownTask(id))?;
        let result = api.update_task(pending.category_id, &merged).await;
        self.settle_change(pending, result)?;
        Ok(merged)
    }

    // ========================================================================
    // Delete
    // ========================================================================

    pub fn begin_remove(&mut self, id: i64) -> Result<PendingChange, StoreError> {
        let category_id = self.active_category()?;
        self.saved_task(id)?;

        let mutation = self
            .list
            .apply("remove_task", |tasks| tasks.retain(|t| t.id != id));
        self.write_back();

        Ok(PendingChange {
            mutation,
            task_id: id,
            category_id,
            task: None,
        })
    }

    pub async fn remove(&mut self, api: &ApiClient, id: i64) -> Result<(), StoreError> {
        let pending = self.begin_remove(id)?;
        let result = api.delete_task(pending.task_id, pending.category_id).await;
        self.settle_change(pending, result)
    }

    /// Settle a toggle, update, or delete.
    pub fn settle_change(
        &mut self,
        pending: PendingChange,
        result: Result<(), ApiError>,
    ) -> Result<(), StoreError> {
        let task_id = pending.task_id;
        let outcome = self.settle(pending.mutation, pending.category_id, result);
        if outcome.is_ok() {
            tracing::debug!(task_id, category_id = pending.category_id, "Task change saved");
        }
        outcome
    }
}
