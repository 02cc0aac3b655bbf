use thiserror::Error;

use crate::api::ApiError;

/// Input rejected before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Category name cannot be empty")]
    EmptyCategoryName,
    #[error("Task title cannot be empty")]
    EmptyTitle,
    #[error("\"{0}\" cannot be deleted")]
    PinnedCategory(String),
    #[error("Unknown category {0}")]
    UnknownCategory(i64),
    #[error("Unknown task {0}")]
    UnknownTask(i64),
    #[error("Item {0} has not been saved yet")]
    NotSaved(i64),
    #[error("No category is selected")]
    NoActiveCategory,
    #[error("No task is open")]
    NoOpenTask,
    #[error("Step {index} does not exist (task has {len} steps)")]
    StepOutOfRange { index: usize, len: usize },
    #[error("Invalid due date \"{0}\": expected YYYY-MM-DD or an RFC 3339 date-time")]
    InvalidDueDate(String),
    #[error("Email and password are required")]
    MissingCredentials,
    #[error("Username is required")]
    MissingUsername,
    #[error("New passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),
    #[error("Enter your current password to change it")]
    CurrentPasswordRequired,
}

/// Everything a store operation can fail with.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl StoreError {
    /// True when the failure happened locally and nothing reached the server.
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }
}
