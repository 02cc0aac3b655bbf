//! Client-side state: category and task lists with optimistic updates,
//! navigation selection, and the task detail editor.

mod categories;
mod editor;
mod error;
mod optimistic;
mod selection;
mod tasks;

pub use categories::{pin_first, CategoryStore, PendingCategory, PendingRemoval, PINNED_CATEGORY};
pub use editor::{parse_due_date, Commit, DetailEditor};
pub use error::{StoreError, ValidationError};
pub use optimistic::{Mutation, OptimisticList};
pub use selection::{ActiveCategory, Selection, CATEGORY_PARAM, TITLE_PARAM};
pub use tasks::{PendingChange, PendingTask, TaskStore, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};
