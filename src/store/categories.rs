use crate::api::{ApiClient, ApiError, Category};
use crate::util::clean_text;

use super::error::{StoreError, ValidationError};
use super::optimistic::{Mutation, OptimisticList};

/// The category that is always listed first and cannot be deleted.
pub const PINNED_CATEGORY: &str = "My Day";

/// Order categories for display: the pinned category first, the rest in
/// server order.
pub fn pin_first(categories: &[Category]) -> Vec<&Category> {
    let (pinned, rest): (Vec<&Category>, Vec<&Category>) = categories
        .iter()
        .partition(|c| c.name == PINNED_CATEGORY);
    pinned.into_iter().chain(rest).collect()
}

/// Placeholder category waiting for the server to confirm its creation.
#[derive(Debug)]
pub struct PendingCategory {
    mutation: Mutation<Category>,
    temp_id: i64,
    name: String,
}

impl PendingCategory {
    pub fn temp_id(&self) -> i64 {
        self.temp_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Category removed locally, waiting for the server.
#[derive(Debug)]
pub struct PendingRemoval {
    mutation: Mutation<Category>,
    id: i64,
}

impl PendingRemoval {
    pub fn id(&self) -> i64 {
        self.id
    }
}

/// Cached category list of the signed-in user.
#[derive(Debug)]
pub struct CategoryStore {
    list: OptimisticList<Category>,
    next_temp_id: i64,
    loaded: bool,
}

impl Default for CategoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryStore {
    pub fn new() -> Self {
        Self {
            list: OptimisticList::new(),
            next_temp_id: -1,
            loaded: false,
        }
    }

    /// Categories in server order (placeholders appended).
    pub fn items(&self) -> &[Category] {
        self.list.items()
    }

    /// Categories in display order.
    pub fn ordered(&self) -> Vec<&Category> {
        pin_first(self.list.items())
    }

    pub fn get(&self, id: i64) -> Option<&Category> {
        self.list.items().iter().find(|c| c.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Category> {
        self.list.items().iter().find(|c| c.name == name)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Replace the local list with the server's.
    pub async fn refresh(&mut self, api: &ApiClient) -> Result<(), StoreError> {
        let categories = api.list_categories().await?;
        tracing::debug!(count = categories.len(), "Loaded categories");
        self.list.replace(categories);
        self.loaded = true;
        Ok(())
    }

    /// Show a placeholder for `name` right away.
    pub fn begin_create(&mut self, name: &str) -> Result<PendingCategory, StoreError> {
        let name = clean_text(name);
        if name.is_empty() {
            return Err(ValidationError::EmptyCategoryName.into());
        }

        let temp_id = self.next_temp_id;
        self.next_temp_id -= 1;

        let placeholder = Category {
            id: temp_id,
            name: name.clone(),
        };
        let mutation = self.list.apply("create_category", |cats| cats.push(placeholder));

        Ok(PendingCategory {
            mutation,
            temp_id,
            name,
        })
    }

    /// Swap the placeholder for the server's category, or retract it.
    pub fn settle_create(
        &mut self,
        pending: PendingCategory,
        result: Result<Category, ApiError>,
    ) -> Result<Category, StoreError> {
        match result {
            Ok(created) => {
                self.list.confirm(pending.mutation);
                let temp_id = pending.temp_id;
                let replacement = created.clone();
                self.list.edit(|cats| {
                    if let Some(slot) = cats.iter_mut().find(|c| c.id == temp_id) {
                        *slot = replacement;
                    }
                });
                Ok(created)
            }
            Err(e) => {
                tracing::warn!(name = %pending.name, error = %e, "Category create failed, retracting placeholder");
                self.list.compensate(pending.mutation);
                Err(e.into())
            }
        }
    }

    /// Create a category optimistically, then resync the whole list.
    ///
    /// A failed resync after a successful create is logged and leaves the
    /// server's category in place.
    pub async fn create(&mut self, api: &ApiClient, name: &str) -> Result<Category, StoreError> {
        let pending = self.begin_create(name)?;
        let result = api.create_category(pending.name()).await;
        let created = self.settle_create(pending, result)?;

        if let Err(e) = self.refresh(api).await {
            tracing::warn!(error = %e, "Category list resync failed after create");
        }
        Ok(created)
    }

    /// Hide category `id` right away.
    pub fn begin_remove(&mut self, id: i64) -> Result<PendingRemoval, StoreError> {
        let category = self
            .get(id)
            .ok_or(ValidationError::UnknownCategory(id))?;
        if category.name == PINNED_CATEGORY {
            return Err(ValidationError::PinnedCategory(category.name.clone()).into());
        }
        if category.is_placeholder() {
            return Err(ValidationError::NotSaved(id).into());
        }

        let mutation = self
            .list
            .apply("remove_category", |cats| cats.retain(|c| c.id != id));
        Ok(PendingRemoval { mutation, id })
    }

    /// Keep the removal, or put the category back where it was.
    pub fn settle_remove(
        &mut self,
        pending: PendingRemoval,
        result: Result<(), ApiError>,
    ) -> Result<(), StoreError> {
        match result {
            Ok(()) => {
                self.list.confirm(pending.mutation);
                tracing::info!(category_id = pending.id, "Category deleted");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(category_id = pending.id, error = %e, "Category delete failed, restoring");
                self.list.compensate(pending.mutation);
                Err(e.into())
            }
        }
    }

    pub async fn remove(&mut self, api: &ApiClient, id: i64) -> Result<(), StoreError> {
        let pending = self.begin_remove(id)?;
        let result = api.delete_category(id).await;
        self.settle_remove(pending, result)
    }
}
