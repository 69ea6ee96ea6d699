use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use feed_shared::clients::db;
use feed_shared::errors::{AppError, AppResult, ErrorCode};
use feed_shared::types::auth::{TokenPair, UserRole};
use feed_shared::types::ApiResponse;

use crate::models::{Credential, NewCredential};
use crate::schema::credentials;
use crate::services::{auth_service, token_service};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
    pub password_confirm: String,
}

impl RegisterRequest {
    /// Validates the form and returns the normalized username and email.
    fn clean(&self) -> AppResult<(String, Option<String>)> {
        let email = self
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_lowercase);
        if let Some(e) = &email {
            if !validator::validate_email(e.as_str()) {
                return Err(AppError::new(ErrorCode::ValidationError, "invalid email format"));
            }
        }

        let username = auth_service::normalize_username(&self.username)?;
        auth_service::confirm_password(&self.password, &self.password_confirm)?;
        auth_service::validate_password(&self.password, &username)?;
        Ok((username, email))
    }
}

const REGISTRATION_LOCK_KEY: i64 = 0x0feed_0001;

/// The first account is the site administrator.
fn role_for_new_account(existing_accounts: i64) -> UserRole {
    if existing_accounts == 0 { UserRole::Admin } else { UserRole::User }
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let (username, email) = req.clean()?;
    let password_hash = auth_service::hash_password(&req.password)?;
    let mut conn = db::checkout(&state.db)?;

    let exists: bool = credentials::table
        .filter(credentials::username.eq(&username))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)?;

    if exists {
        return Err(AppError::new(ErrorCode::UsernameTaken, "a user with that username already exists"));
    }

    let (credential, role) = conn.transaction::<_, AppError, _>(|conn| {
        // Serializes concurrent registrations so only one of them can see an empty table.
        diesel::sql_query("SELECT pg_advisory_xact_lock($1)")
            .bind::<diesel::sql_types::BigInt, _>(REGISTRATION_LOCK_KEY)
            .execute(conn)?;

        let existing_accounts: i64 = credentials::table.count().get_result(conn)?;
        let role = role_for_new_account(existing_accounts);

        let new_cred = NewCredential {
            username,
            email,
            password_hash,
            role: role.to_string(),
        };

        let credential: Credential = diesel::insert_into(credentials::table)
            .values(&new_cred)
            .get_result(conn)
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(diesel::result::DatabaseErrorKind::UniqueViolation, _) => {
                    AppError::new(ErrorCode::UsernameTaken, "a user with that username already exists")
                }
                other => AppError::from(other),
            })?;
        Ok((credential, role))
    })?;

    let token_pair = token_service::issue_session(&mut conn, &state.config, &credential)?;

    crate::events::publisher::publish_user_registered(
        &state.rabbitmq,
        credential.id,
        &credential.username,
        credential.email.as_deref(),
        role,
    )
    .await;

    tracing::info!(user_id = %credential.id, username = %credential.username, role = %role, "user registered");

    Ok(Json(ApiResponse::ok(token_pair)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_first_account_is_admin() {
        assert_eq!(role_for_new_account(0), UserRole::Admin);
        assert_eq!(role_for_new_account(1), UserRole::User);
        assert_eq!(role_for_new_account(42), UserRole::User);
    }

    fn request(username: &str, email: Option<&str>, password: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.map(Into::into),
            password: password.into(),
            password_confirm: confirm.into(),
        }
    }

    #[test]
    fn clean_normalizes_username_and_email() {
        let (username, email) = request("  Dana ", Some(" Dana@Example.COM "), "garden-path-9", "garden-path-9")
            .clean()
            .unwrap();
        assert_eq!(username, "dana");
        assert_eq!(email.as_deref(), Some("dana@example.com"));
    }

    #[test]
    fn blank_email_is_dropped() {
        let (_, email) = request("erin", Some("   "), "garden-path-9", "garden-path-9").clean().unwrap();
        assert!(email.is_none());
    }

    #[test]
    fn invalid_email_is_a_validation_error() {
        let err = request("erin", Some("not-an-email"), "garden-path-9", "garden-path-9")
            .clean()
            .unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::ValidationError);
    }

    #[test]
    fn mismatched_confirmation_is_rejected() {
        let err = request("erin", None, "garden-path-9", "garden-path-8").clean().unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::PasswordMismatch);
    }
}
