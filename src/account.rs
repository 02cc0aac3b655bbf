//! Sign-in, registration, and profile management.
//!
//! Everything here validates input first; a rejected form sends no request.

use secrecy::{ExposeSecret, SecretString};

use crate::api::{ApiClient, Credentials, Profile, ProfileUpdate};
use crate::store::{StoreError, ValidationError};

/// Shortest password accepted when changing it.
pub const MIN_PASSWORD_LEN: usize = 6;

fn check_credentials(credentials: &Credentials) -> Result<(), ValidationError> {
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    Ok(())
}

/// Sign in and keep the token on `api` for subsequent requests.
///
/// Returns the token as well so the caller can persist it if it wants to.
pub async fn login(
    api: &mut ApiClient,
    credentials: &Credentials,
) -> Result<SecretString, StoreError> {
    check_credentials(credentials)?;
    let token = api.login(credentials).await?;
    api.set_token(SecretString::from(token.expose_secret().to_owned()));
    Ok(token)
}

pub async fn register(api: &ApiClient, credentials: &Credentials) -> Result<(), StoreError> {
    check_credentials(credentials)?;
    if credentials
        .username
        .as_deref()
        .map_or(true, |u| u.trim().is_empty())
    {
        return Err(ValidationError::MissingUsername.into());
    }
    api.register(credentials).await?;
    Ok(())
}

pub fn logout(api: &mut ApiClient) {
    api.clear_token();
    tracing::info!("Signed out");
}

pub async fn profile(api: &ApiClient) -> Result<Profile, StoreError> {
    Ok(api.profile().await?)
}

/// Profile edit form.
///
/// The password fields are optional; leaving both new-password fields empty
/// keeps the current password.
#[derive(Clone, Default)]
pub struct ProfileForm {
    pub username: String,
    pub email: String,
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl std::fmt::Debug for ProfileForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileForm")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("current_password", &"[REDACTED]")
            .field("new_password", &"[REDACTED]")
            .field("confirm_password", &"[REDACTED]")
            .finish()
    }
}

impl ProfileForm {
    /// Prefill from the current profile.
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            username: profile.username.clone(),
            email: profile.email.clone(),
            ..Self::default()
        }
    }

    /// Check the form and build the request body.
    pub fn validate(&self) -> Result<ProfileUpdate, ValidationError> {
        let username = self.username.trim();
        let email = self.email.trim();
        if username.is_empty() {
            return Err(ValidationError::MissingUsername);
        }
        if email.is_empty() {
            return Err(ValidationError::MissingCredentials);
        }

        let changing_password = !self.new_password.is_empty() || !self.confirm_password.is_empty();
        let password = if changing_password {
            if self.new_password != self.confirm_password {
                return Err(ValidationError::PasswordMismatch);
            }
            if self.new_password.chars().count() < MIN_PASSWORD_LEN {
                return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LEN));
            }
            if self.current_password.is_empty() {
                return Err(ValidationError::CurrentPasswordRequired);
            }
            Some(self.new_password.clone())
        } else {
            None
        };

        Ok(ProfileUpdate {
            username: username.to_string(),
            email: email.to_string(),
            password,
        })
    }
}

pub async fn update_profile(api: &ApiClient, form: &ProfileForm) -> Result<(), StoreError> {
    let update = form.validate()?;
    api.update_profile(&update).await?;
    tracing::info!(password_changed = update.password.is_some(), "Profile updated");
    Ok(())
}

/// Delete the account and drop the token.
pub async fn delete_account(api: &mut ApiClient) -> Result<(), StoreError> {
    api.delete_account().await?;
    api.clear_token();
    tracing::info!("Account deleted");
    Ok(())
}
