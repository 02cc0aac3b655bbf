use reqwest::Method;
use secrecy::SecretString;

use super::client::{ApiClient, ApiError, Auth};
use super::types::{Credentials, LoginResponse, Profile, ProfileUpdate};

impl ApiClient {
    /// Exchange credentials for a bearer token. Does not store the token; see
    /// [`crate::account::login`].
    pub async fn login(&self, credentials: &Credentials) -> Result<SecretString, ApiError> {
        let response: LoginResponse = self
            .send_json(Method::POST, "/users/login", &[], credentials, Auth::None)
            .await?;
        tracing::info!(email = %credentials.email, "Signed in");
        Ok(SecretString::from(response.jwt))
    }

    pub async fn register(&self, credentials: &Credentials) -> Result<(), ApiError> {
        self.send_unit(
            Method::POST,
            "/users/register",
            &[],
            Some(credentials),
            Auth::None,
        )
        .await?;
        tracing::info!(email = %credentials.email, "Registered account");
        Ok(())
    }

    pub async fn profile(&self) -> Result<Profile, ApiError> {
        self.get_json("/users/me", &[]).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<(), ApiError> {
        self.send_unit(Method::PUT, "/users/update", &[], Some(update), Auth::Bearer)
            .await
    }

    pub async fn delete_account(&self) -> Result<(), ApiError> {
        self.send_unit::<()>(Method::DELETE, "/users/delete", &[], None, Auth::Bearer)
            .await
    }
}
