use reqwest::Method;

use super::client::{ApiClient, ApiError, Auth};
use super::types::{Category, NewCategory};

impl ApiClient {
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.get_json("/categories/", &[]).await
    }

    pub async fn create_category(&self, name: &str) -> Result<Category, ApiError> {
        let category: Category = self
            .send_json(
                Method::POST,
                "/categories/",
                &[],
                &NewCategory { name },
                Auth::Bearer,
            )
            .await?;
        tracing::debug!(category_id = category.id, "Category created");
        Ok(category)
    }

    /// Delete a category. Always uses the path form `/categories/{id}`.
    pub async fn delete_category(&self, id: i64) -> Result<(), ApiError> {
        self.send_unit::<()>(
            Method::DELETE,
            &format!("/categories/{id}"),
            &[],
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
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn signed_in(server: &MockServer) -> ApiClient {
        let mut api = ApiClient::new(&server.uri()).unwrap();
        api.set_token(SecretString::from("test-token"));
        api
    }

    #[tokio::test]
    async fn test_list_categories() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categories/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 2, "category": "Work"},
                {"id": 1, "category": "My Day"},
            ])))
            .mount(&server)
            .await;

        let cats = signed_in(&server).list_categories().await.unwrap();
        assert_eq!(cats.len(), 2);
        assert_eq!(cats[1].name, "My Day");
    }

    #[tokio::test]
    async fn test_create_category_posts_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/categories/"))
            .and(body_json(serde_json::json!({"category": "Errands"})))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"id": 17, "category": "Errands"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cat = signed_in(&server)
            .create_category("Errands")
            .await
            .unwrap();
        assert_eq!(cat.id, 17);
    }

    #[tokio::test]
    async fn test_delete_category_uses_path_form() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/categories/5"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        signed_in(&server).delete_category(5).await.unwrap();
    }
}
