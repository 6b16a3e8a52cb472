use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::error_handling::{AppError, AppResult, LogHelper};
use super::gateway::AuthGateway;
use crate::domain::user::{AuthResponse, LoginRequest, RegisterRequest, User};
use crate::session::Session;

pub const CREDENTIALS_REQUIRED: &str = "Email and password are required.";
pub const REGISTRATION_FIELDS_REQUIRED: &str = "Name, email and password are required.";
pub const PASSWORD_MISMATCH: &str = "Passwords do not match.";

/// Login, registration and logout: the only writers of the session credential.
pub struct AuthService {
    gateway: Arc<dyn AuthGateway>,
    session: Session,
}

impl AuthService {
    pub fn new(gateway: Arc<dyn AuthGateway>, session: Session) -> Self {
        Self { gateway, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn persist(&self, response: AuthResponse) -> AppResult<Option<User>> {
        self.session.init(&response.token).map_err(AppError::Storage)?;
        Ok(response.data)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> AppResult<Option<User>> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            LogHelper::log_validation_failure("credentials", "email and password are required");
            return Err(AppError::validation(CREDENTIALS_REQUIRED));
        }

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.gateway.login(&request).await.map_err(|e| {
            LogHelper::log_request_failure("login", &e);
            AppError::Request(e)
        })?;
        info!("Signed in");
        self.persist(response)
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> AppResult<Option<User>> {
        if request.name.trim().is_empty() || request.email.trim().is_empty() || request.password.is_empty() {
            LogHelper::log_validation_failure("registration", "missing required field");
            return Err(AppError::validation(REGISTRATION_FIELDS_REQUIRED));
        }
        if request.password != request.password_confirmation {
            LogHelper::log_validation_failure("password_confirmation", "mismatch");
            return Err(AppError::validation(PASSWORD_MISMATCH));
        }

        let response = self.gateway.register(request).await.map_err(|e| {
            LogHelper::log_request_failure("register", &e);
            AppError::Request(e)
        })?;
        info!("Account registered");
        self.persist(response)
    }

    /// Invalidates the credential server-side, then drops it locally. The
    /// local credential is dropped even when the remote call fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> AppResult<()> {
        if !self.session.is_authenticated() {
            return Ok(());
        }
        let remote = self.gateway.logout().await;
        self.session.clear().map_err(AppError::Storage)?;
        match remote {
            Ok(()) => {
                info!("Signed out");
                Ok(())
            }
            Err(e) => {
                LogHelper::log_request_failure("logout", &e);
                Err(e.into())
            }
        }
    }

    /// Best-effort identity lookup; any failure degrades to `None`.
    pub async fn current_user(&self) -> Option<User> {
        match self.gateway.current_user().await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Could not load current user");
                None
            }
        }
    }
}
