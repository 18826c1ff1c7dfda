use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    api::AuthApi,
    models::{AppRole, UserProfile},
    storage::SessionStorage,
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Supplies the bearer token attached to backend requests.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// Fixed token, mainly for tools and tests.
pub struct StaticToken(pub Option<String>);

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Phone/OTP sign-in that records the resulting session in local storage.
pub struct AuthSession<A: AuthApi> {
    api: Arc<A>,
    storage: SessionStorage,
}

impl<A: AuthApi> AuthSession<A> {
    pub fn new(api: Arc<A>, storage: SessionStorage) -> Self {
        Self { api, storage }
    }

    pub async fn request_otp(&self, phone_number: &str) -> Result<String> {
        self.api
            .send_otp(phone_number)
            .await
            .with_context(|| format!("failed to send OTP to {phone_number}"))
    }

    /// Verifies the OTP and stores token, profile and default role.
    pub async fn verify_otp(&self, phone_number: &str, otp: &str) -> Result<UserProfile> {
        let session = self
            .api
            .verify_otp(phone_number, otp)
            .await
            .context("OTP verification failed")?;

        self.storage.save_auth_token(&session.token)?;
        self.storage.save_user(&session.user)?;

        // Attenders land on the route screen; other roles pick one explicitly.
        if session.user.roles.len() == 1 || session.user.has_role(AppRole::Attender) {
            let role = if session.user.has_role(AppRole::Attender) {
                AppRole::Attender
            } else {
                session.user.roles[0]
            };
            self.storage.save_selected_role(role)?;
        }

        log_info!("Signed in as {} ({})", session.user.name, session.user.id);
        Ok(session.user)
    }

    /// Best-effort server logout, then local session removal.
    pub async fn sign_out(&self) -> Result<()> {
        if let Err(err) = self.api.logout().await {
            log_warn!("Logout request failed, clearing local session anyway: {err}");
        }
        self.storage.clear_all()
    }

    pub fn current_user(&self) -> Result<Option<UserProfile>> {
        self.storage.user()
    }
}
