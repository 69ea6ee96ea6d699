use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use feed_shared::clients::db;
use feed_shared::errors::{AppError, AppResult, ErrorCode};
use feed_shared::types::auth::AuthUser;
use feed_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{Profile, ProfileChanges};
use crate::schema::profiles;
use crate::services::profile_service;
use crate::AppState;

const NAME_MAX_LEN: usize = 200;
const EMAIL_MAX_LEN: usize = 300;

// --- GET /profile ---

pub async fn get_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let mut conn = db::checkout(&state.db)?;
    let profile = profile_service::ensure_profile(&mut conn, &user)?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- PUT /profile ---

/// The submitted form replaces every editable field; absent fields are cleared.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub dob: Option<NaiveDate>,
    pub bio: String,
}

fn field_error(field: &str, message: impl Into<String>) -> AppError {
    AppError::with_details(
        ErrorCode::ValidationError,
        message,
        serde_json::json!({ "field": field }),
    )
}

impl ProfileForm {
    fn clean(self, today: NaiveDate) -> AppResult<ProfileChanges> {
        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();
        for (field, value) in [("first_name", &first_name), ("last_name", &last_name)] {
            if value.chars().count() > NAME_MAX_LEN {
                return Err(field_error(field, format!("{field} must be at most {NAME_MAX_LEN} characters")));
            }
        }

        let email = self.email.trim().to_lowercase();
        if email.chars().count() > EMAIL_MAX_LEN {
            return Err(field_error("email", format!("email must be at most {EMAIL_MAX_LEN} characters")));
        }
        if !email.is_empty() && !validator::validate_email(email.as_str()) {
            return Err(field_error("email", "invalid email format"));
        }

        if let Some(dob) = self.dob {
            if dob > today {
                return Err(field_error("dob", "date of birth cannot be in the future"));
            }
        }

        Ok(ProfileChanges {
            first_name,
            last_name,
            email,
            dob: self.dob,
            bio: self.bio.trim().to_string(),
        })
    }
}

pub async fn update_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(form): Json<ProfileForm>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let changes = form.clean(chrono::Utc::now().date_naive())?;
    let mut conn = db::checkout(&state.db)?;
    let profile = profile_service::ensure_profile(&mut conn, &user)?;

    let updated = diesel::update(profiles::table.filter(profiles::id.eq(profile.id)))
        .set((
            &changes,
            profiles::updated_at.eq(chrono::Utc::now()),
        ))
        .get_result::<Profile>(&mut conn)?;

    publisher::publish_profile_updated(&state.rabbitmq, updated.id, updated.credential_id).await;

    Ok(Json(ApiResponse::ok(updated)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn missing_fields_are_blanked() {
        let form: ProfileForm = serde_json::from_str(r#"{"first_name": " Ada "}"#).unwrap();
        let changes = form.clean(today()).unwrap();
        assert_eq!(changes.first_name, "Ada");
        assert_eq!(changes.last_name, "");
        assert_eq!(changes.email, "");
        assert_eq!(changes.dob, None);
    }

    #[test]
    fn email_is_normalized_and_checked() {
        let form = ProfileForm { email: " Ada@Example.COM ".into(), ..Default::default() };
        assert_eq!(form.clean(today()).unwrap().email, "ada@example.com");

        let form = ProfileForm { email: "not-an-email".into(), ..Default::default() };
        assert_eq!(form.clean(today()).unwrap_err().error_code(), ErrorCode::ValidationError);
    }

    #[test]
    fn future_birthdays_are_rejected() {
        let form = ProfileForm {
            dob: NaiveDate::from_ymd_opt(2030, 1, 1),
            ..Default::default()
        };
        assert!(form.clean(today()).is_err());

        let form = ProfileForm { dob: Some(today()), ..Default::default() };
        assert_eq!(form.clean(today()).unwrap().dob, Some(today()));
    }

    #[test]
    fn long_names_are_rejected() {
        let form = ProfileForm { last_name: "x".repeat(NAME_MAX_LEN + 1), ..Default::default() };
        assert!(form.clean(today()).is_err());
    }
}
