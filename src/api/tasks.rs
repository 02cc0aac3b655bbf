use reqwest::Method;
use serde::Serialize;

use super::client::{ApiClient, ApiError, Auth};
use super::types::{Task, TaskUpdate};

const TASKS_PATH: &str = "/categories/item";
const COMPLETE_PATH: &str = "/categories/item/complete";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewTask<'a> {
    title: &'a str,
    completed: bool,
    steps: [&'a str; 0],
    due_date: &'a str,
    category_id: i64,
}

fn task_query(task_id: i64, category_id: i64) -> [(&'static str, String); 2] {
    [("id", task_id.to_string()), ("catId", category_id.to_string())]
}

impl ApiClient {
    pub async fn list_tasks(&self, category_id: i64) -> Result<Vec<Task>, ApiError> {
        self.get_json(TASKS_PATH, &[("id", category_id.to_string())])
            .await
    }

    pub async fn create_task(&self, category_id: i64, title: &str) -> Result<Task, ApiError> {
        let body = NewTask {
            title,
            completed: false,
            steps: [],
            due_date: "",
            category_id,
        };
        let task: Task = self
            .send_json(
                Method::POST,
                TASKS_PATH,
                &[("id", category_id.to_string())],
                &body,
                Auth::Bearer,
            )
            .await?;
        tracing::debug!(task_id = task.id, category_id, "Task created");
        Ok(task)
    }

    /// Replace a task with `task`. `owner_category_id` is the category the
    /// server currently files the task under, which differs from
    /// `task.category_id` when the edit moves it.
    pub async fn update_task(&self, owner_category_id: i64, task: &Task) -> Result<(), ApiError> {
        self.send_unit(
            Method::PUT,
            TASKS_PATH,
            &task_query(task.id, owner_category_id),
            Some(&TaskUpdate::from(task)),
            Auth::Bearer,
        )
        .await
    }

    pub async fn set_task_completed(
        &self,
        task_id: i64,
        category_id: i64,
        completed: bool,
    ) -> Result<(), ApiError> {
        let [id, cat] = task_query(task_id, category_id);
        self.send_unit::<()>(
            Method::PUT,
            COMPLETE_PATH,
            &[id, cat, ("status", completed.to_string())],
            None,
            Auth::Bearer,
        )
        .await
    }

    pub async fn delete_task(&self, task_id: i64, category_id: i64) -> Result<(), ApiError> {
        self.send_unit::<()>(
            Method::DELETE,
            TASKS_PATH,
            &task_query(task_id, category_id),
            None,
            Auth::Bearer,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn signed_in(server: &MockServer) -> ApiClient {
        let mut api = ApiClient::new(&server.uri()).unwrap();
        api.set_token(SecretString::from("test-token"));
        api
    }

    #[tokio::test]
    async fn test_list_tasks_by_category() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categories/item"))
            .and(query_param("id", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 10, "title": "Milk", "completed": false, "steps": [], "dueDate": "", "categoryId": 3},
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let tasks = signed_in(&server).list_tasks(3).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Milk");
    }

    #[tokio::test]
    async fn test_create_task_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/categories/item"))
            .and(query_param("id", "3"))
            .and(body_json(serde_json::json!({
                "title": "Eggs",
                "completed": false,
                "steps": [],
                "dueDate": "",
                "categoryId": 3,
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!(
                {"id": 11, "title": "Eggs", "completed": false, "steps": [], "dueDate": "", "categoryId": 3}
            )))
            .expect(1)
            .mount(&server)
            .await;

        let task = signed_in(&server).create_task(3, "Eggs").await.unwrap();
        assert_eq!(task.id, 11);
    }

    #[tokio::test]
    async fn test_toggle_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/categories/item/complete"))
            .and(query_param("id", "11"))
            .and(query_param("catId", "3"))
            .and(query_param("status", "true"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        signed_in(&server)
            .set_task_completed(11, 3, true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_uses_owner_category_in_query() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/categories/item"))
            .and(query_param("id", "11"))
            .and(query_param("catId", "3"))
            .and(body_json(serde_json::json!({
                "categoryId": 4,
                "title": "Eggs",
                "completed": false,
                "dueDate": "",
                "steps": [],
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let moved = Task {
            id: 11,
            title: "Eggs".to_string(),
            completed: false,
            steps: Vec::new(),
            due_date: String::new(),
            category_id: 4,
        };
        signed_in(&server).update_task(3, &moved).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_task_query() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/categories/item"))
            .and(query_param("id", "11"))
            .and(query_param("catId", "3"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        signed_in(&server).delete_task(11, 3).await.unwrap();
    }
}
