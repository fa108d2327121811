// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token-acquiring endpoints: login, Google login, email confirmation, and
//! the profile re-fetch that keeps the user snapshot current.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::session::{AuthUser, CredentialPair, TokenGrant, UserPayload};
use crate::token;
use crate::transport::{ApiRequest, Authorization};

pub const LOGIN_PATH: &str = "/api/v1/talents/sessions";
pub const GOOGLE_LOGIN_PATH: &str = "/api/v1/talents/sessions/google";
pub const CONFIRMATION_PATH: &str = "/api/v1/talents/users/confirmation";
pub const CURRENT_USER_PATH: &str = "/api/v1/talents/users";

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct GoogleLoginBody<'a> {
    id_token: &'a str,
}

/// Registration progress reported with the profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupSteps {
    #[serde(default)]
    pub step_confirmation: bool,
    #[serde(default)]
    pub step_password: bool,
    #[serde(default)]
    pub step_set_names: bool,
    #[serde(default)]
    pub step_personal_data: bool,
}

/// Profile returned by `GET /api/v1/talents/users`.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    #[serde(flatten)]
    pub user: UserPayload,
    #[serde(default)]
    pub signup_steps: Option<SignupSteps>,
}

#[derive(Deserialize)]
struct CurrentUserData {
    user: CurrentUser,
}

impl ApiClient {
    /// Sign in with email and password.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<AuthUser>, ApiError> {
        let request = ApiRequest::post(LOGIN_PATH).json(&LoginBody { email, password })?;
        self.exchange_credentials(request).await
    }

    /// Sign in with a Google ID token.
    pub async fn login_with_google(&self, id_token: &str) -> Result<Option<AuthUser>, ApiError> {
        let request = ApiRequest::post(GOOGLE_LOGIN_PATH).json(&GoogleLoginBody { id_token })?;
        self.exchange_credentials(request).await
    }

    /// Confirm an email address. Returns `true` when the server also issued
    /// tokens and a session was established.
    pub async fn confirm_email(&self, confirmation_token: &str) -> Result<bool, ApiError> {
        let request =
            ApiRequest::get(CONFIRMATION_PATH).query("confirmation_token", confirmation_token);
        let held = self.store().access_token();
        let resp = self
            .transport()
            .execute(&request, Authorization::Bearer(held.as_deref()))
            .await?
            .error_for_status()?;
        let grant = resp.envelope::<TokenGrant>()?.data.unwrap_or_default().normalized();

        if grant.access_token.is_none() && grant.refresh_token.is_none() {
            return Ok(false);
        }
        self.store().set_tokens(CredentialPair {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
        });
        self.coordinator().schedule();
        info!("email confirmed, session established");
        Ok(true)
    }

    /// Re-fetch the signed-in user's profile and update the snapshot.
    pub async fn current_user(&self) -> Result<CurrentUser, ApiError> {
        let envelope = self.get_json::<CurrentUserData>(CURRENT_USER_PATH).await?;
        let profile = envelope.into_data(200)?.user;
        self.store().set_current_user(Some(AuthUser::from(profile.user.clone())));
        self.store().set_last_fetched_user_at(Some(token::epoch_millis()));
        Ok(profile)
    }

    /// One guarded attempt, no retry. Replaces the held pair with whatever
    /// the server returned.
    async fn exchange_credentials(
        &self,
        request: ApiRequest,
    ) -> Result<Option<AuthUser>, ApiError> {
        let resp = self
            .transport()
            .execute(&request, Authorization::Caller)
            .await?
            .error_for_status()?;
        let grant = resp.envelope::<TokenGrant>()?.data.unwrap_or_default().normalized();

        if grant.access_token.is_some() || grant.refresh_token.is_some() {
            self.store().set_tokens(CredentialPair {
                access_token: grant.access_token,
                refresh_token: grant.refresh_token,
            });
        }
        let user = grant.user.map(AuthUser::from);
        if let Some(ref user) = user {
            self.store().set_current_user(Some(user.clone()));
        }
        self.coordinator().schedule();
        info!(signed_in = self.store().access_token().is_some(), "login completed");
        Ok(user)
    }
}
