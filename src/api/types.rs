use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Categories
// ============================================================================

/// A named grouping of tasks.
///
/// On the wire the name travels as `category`: `{"id": 1, "category": "My Day"}`.
/// Negative ids mark local placeholders that the server has not confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    #[serde(rename = "category")]
    pub name: String,
}

impl Category {
    pub fn is_placeholder(&self) -> bool {
        self.id < 0
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct NewCategory<'a> {
    #[serde(rename = "category")]
    pub name: &'a str,
}

// ============================================================================
// Tasks
// ============================================================================

/// A single todo item.
///
/// The server names the owning category `categoryId` in request bodies and
/// `category` in some responses; both are accepted when reading. A missing
/// owner decodes as 0 and is filled in from the list the task was fetched for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub due_date: String,
    #[serde(default, alias = "category")]
    pub category_id: i64,
}

impl Task {
    /// Local stand-in shown while a create request is in flight.
    pub(crate) fn placeholder(temp_id: i64, title: String, category_id: i64) -> Self {
        Self {
            id: temp_id,
            title,
            completed: false,
            steps: Vec::new(),
            due_date: String::new(),
            category_id,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id < 0
    }
}

/// Full-record body of a task update. The API has no partial-update format;
/// every edit sends all fields.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaskUpdate<'a> {
    pub category_id: i64,
    pub title: &'a str,
    pub completed: bool,
    pub due_date: &'a str,
    pub steps: &'a [String],
}

impl<'a> From<&'a Task> for TaskUpdate<'a> {
    fn from(task: &'a Task) -> Self {
        Self {
            category_id: task.category_id,
            title: &task.title,
            completed: task.completed,
            due_date: &task.due_date,
            steps: &task.steps,
        }
    }
}

/// Client-side partial edit of a task. Unset fields keep their current value
/// when merged with [`TaskPatch::apply_to`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub steps: Option<Vec<String>>,
    pub due_date: Option<String>,
    pub category_id: Option<i64>,
}

impl TaskPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn steps(steps: Vec<String>) -> Self {
        Self {
            steps: Some(steps),
            ..Self::default()
        }
    }

    pub fn due_date(due_date: impl Into<String>) -> Self {
        Self {
            due_date: Some(due_date.into()),
            ..Self::default()
        }
    }

    pub fn category(category_id: i64) -> Self {
        Self {
            category_id: Some(category_id),
            ..Self::default()
        }
    }

    /// Merge this patch over `task`, producing the full record to send.
    pub fn apply_to(&self, task: &Task) -> Task {
        Task {
            id: task.id,
            title: self.title.clone().unwrap_or_else(|| task.title.clone()),
            completed: self.completed.unwrap_or(task.completed),
            steps: self.steps.clone().unwrap_or_else(|| task.steps.clone()),
            due_date: self
                .due_date
                .clone()
                .unwrap_or_else(|| task.due_date.clone()),
            category_id: self.category_id.unwrap_or(task.category_id),
        }
    }
}

// ============================================================================
// Users
// ============================================================================

/// Login and registration form. Registration also carries a username.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("username", &self.username)
            .finish()
    }
}

#[derive(Deserialize)]
pub(crate) struct LoginResponse {
    pub jwt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub username: String,
    pub email: String,
}

/// Body of a profile update. The password is omitted unless it changes.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl std::fmt::Debug for ProfileUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileUpdate")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
