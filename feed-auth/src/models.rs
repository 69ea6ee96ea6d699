use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use feed_shared::types::auth::UserRole;

use crate::schema::{credentials, refresh_tokens};

// --- Credentials ---

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = credentials)]
pub struct Credential {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    pub fn user_role(&self) -> UserRole {
        self.role.parse::<UserRole>().unwrap_or(UserRole::User)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = credentials)]
pub struct NewCredential {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: String,
}

// --- Refresh Tokens ---

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = refresh_tokens)]
pub struct RefreshToken {
    pub id: Uuid,
    pub credential_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = refresh_tokens)]
pub struct NewRefreshToken {
    pub credential_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}
