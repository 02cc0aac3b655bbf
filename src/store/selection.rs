use url::form_urlencoded;

use crate::api::Task;

/// Navigation parameter carrying the category id.
pub const CATEGORY_PARAM: &str = "catId";
/// Navigation parameter carrying the category title.
pub const TITLE_PARAM: &str = "title";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveCategory {
    pub id: i64,
    pub title: String,
}

/// Which category and which task the user is looking at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    category: Option<ActiveCategory>,
    task: Option<i64>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the active category from a navigation query string such as
    /// `catId=3&title=Work`. A leading `?` is ignored. A missing or
    /// non-numeric `catId` selects nothing; a missing title is left empty.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut id = None;
        let mut title = String::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match &*key {
                CATEGORY_PARAM => id = value.trim().parse::<i64>().ok(),
                TITLE_PARAM => title = value.into_owned(),
                _ => {}
            }
        }
        Self {
            category: id.map(|id| ActiveCategory { id, title }),
            task: None,
        }
    }

    /// Query string that [`Selection::from_query`] reads back.
    pub fn to_query(&self) -> Option<String> {
        let category = self.category.as_ref()?;
        Some(
            form_urlencoded::Serializer::new(String::new())
                .append_pair(CATEGORY_PARAM, &category.id.to_string())
                .append_pair(TITLE_PARAM, &category.title)
                .finish(),
        )
    }

    pub fn category(&self) -> Option<&ActiveCategory> {
        self.category.as_ref()
    }

    pub fn category_id(&self) -> Option<i64> {
        self.category.as_ref().map(|c| c.id)
    }

    pub fn title(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.title.as_str())
    }

    pub fn task_id(&self) -> Option<i64> {
        self.task
    }

    /// Make `id` the active category. Returns true when the category changed,
    /// in which case the active task is cleared.
    pub fn select_category(&mut self, id: i64, title: impl Into<String>) -> bool {
        let changed = self.category_id() != Some(id);
        self.category = Some(ActiveCategory {
            id,
            title: title.into(),
        });
        if changed {
            self.task = None;
        }
        changed
    }

    pub fn select_task(&mut self, id: i64) {
        self.task = Some(id);
    }

    pub fn clear_task(&mut self) {
        self.task = None;
    }

    pub fn clear(&mut self) {
        self.category = None;
        self.task = None;
    }

    /// Tasks belonging to the active category, in list order.
    pub fn visible<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        match self.category_id() {
            Some(id) => tasks.iter().filter(|t| t.category_id == id).collect(),
            None => Vec::new(),
        }
    }
}
