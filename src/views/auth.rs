//! Auth View
//!
//! Sign-in and sign-up forms. Errors are reported inline on the form;
//! storing the session after a successful sign-in is the caller's job.

use serde::Serialize;
use std::sync::Arc;

use crate::api::{ApiError, ApiGateway, ErrorKind, LoginResponse};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoginForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub error: Option<String>,
}

impl LoginForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegisterForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub confirm_password: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

impl RegisterForm {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
            ..Self::default()
        }
    }

    /// Local checks run before anything is sent
    pub fn validate(&self) -> Result<(), &'static str> {
        let username = self.username.trim();
        if username.is_empty() || self.password.is_empty() || self.confirm_password.is_empty() {
            return Err("Please fill in all fields");
        }
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err("Username must be at least 3 characters long");
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err("Password must be at least 6 characters");
        }
        if self.password != self.confirm_password {
            return Err("Passwords do not match");
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.username.clear();
        self.password.clear();
        self.confirm_password.clear();
    }
}

/// Inline message for a failed sign-in
pub fn login_error_message(err: &ApiError) -> String {
    match (err.kind, err.code()) {
        (_, Some("invalid")) | (ErrorKind::SessionExpired, _) => {
            "Invalid username or password".to_string()
        }
        (_, Some("missing")) => "Please enter both username and password".to_string(),
        (ErrorKind::RequestFailed, _) => "Login failed. Please check your credentials.".to_string(),
        _ => format!("An error occurred. {}", err.message),
    }
}

/// Inline message for a failed sign-up
pub fn register_error_message(err: &ApiError, username: &str) -> String {
    match err.code() {
        Some("exists") => format!(
            "Username '{}' is already taken. Please choose a different username.",
            username
        ),
        Some("missing") => "Please provide all required fields".to_string(),
        Some("database") => "Database error. Please try again later.".to_string(),
        Some("creation_failed") => "Failed to create user. Please try again.".to_string(),
        Some("server_error") => "Server error occurred. Please try again later.".to_string(),
        _ if err.kind == ErrorKind::RequestFailed => err.message.clone(),
        _ => format!("An error occurred: {}", err.message),
    }
}

pub struct AuthView {
    gateway: Arc<ApiGateway>,
}

impl AuthView {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self { gateway }
    }

    /// Submit the sign-in form.
    ///
    /// On failure the message is left in `form.error` and `None` is
    /// returned.
    pub async fn sign_in(&self, form: &mut LoginForm) -> Option<LoginResponse> {
        form.error = None;

        if form.username.trim().is_empty() || form.password.is_empty() {
            form.error = Some("Please enter both username and password".to_string());
            return None;
        }

        match self
            .gateway
            .authenticate(form.username.trim(), &form.password)
            .await
        {
            Ok(login) if !login.token.is_empty() => {
                tracing::info!(username = %login.user.username, role = %login.user.role, "Signed in");
                Some(login)
            }
            Ok(_) => {
                form.error = Some("Login failed. Please check your credentials.".to_string());
                None
            }
            Err(e) => {
                tracing::debug!(kind = %e.kind, "Sign-in rejected");
                form.error = Some(login_error_message(&e));
                None
            }
        }
    }

    /// Submit the sign-up form.
    ///
    /// On success the form is cleared, a success message is set and the
    /// sign-in form is prefilled with the new username.
    pub async fn sign_up(&self, form: &mut RegisterForm, login: &mut LoginForm) -> bool {
        form.error = None;
        form.success = None;

        if let Err(message) = form.validate() {
            form.error = Some(message.to_string());
            return false;
        }

        let username = form.username.trim().to_string();
        match self.gateway.register(&username, &form.password).await {
            Ok(_) => {
                tracing::info!(username = %username, "Account created");
                form.clear();
                form.success = Some("Registration successful! Switching to sign in...".to_string());
                *login = LoginForm::new(username, "");
                true
            }
            Err(e) => {
                tracing::debug!(kind = %e.kind, code = ?e.code(), "Sign-up rejected");
                form.error = Some(register_error_message(&e, &username));
                false
            }
        }
    }
}
