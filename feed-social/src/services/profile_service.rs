use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use feed_shared::clients::db::{self, DbPool};
use feed_shared::errors::AppResult;
use feed_shared::types::auth::AuthUser;

use crate::models::{NewProfile, Profile};
use crate::schema::profiles;

/// Creates a default profile for a newly registered user.
/// Called from the RabbitMQ subscriber when a `user.registered` event is received;
/// redelivered events leave the existing profile untouched.
pub fn create_default_profile(
    pool: &DbPool,
    credential_id: Uuid,
    username: &str,
    is_admin: bool,
) -> AppResult<Profile> {
    let mut conn = db::checkout(pool)?;
    let profile = insert_or_get(&mut conn, credential_id, username, is_admin)?;

    tracing::info!(
        profile_id = %profile.id,
        credential_id = %credential_id,
        "default profile ready"
    );

    Ok(profile)
}

/// Returns the caller's profile, creating it when the registration event has not been seen yet.
pub fn ensure_profile(conn: &mut PgConnection, user: &AuthUser) -> AppResult<Profile> {
    let existing = profiles::table
        .filter(profiles::credential_id.eq(user.id))
        .first::<Profile>(conn)
        .optional()?;

    match existing {
        Some(profile) => Ok(profile),
        None => {
            tracing::debug!(credential_id = %user.id, "creating profile on first access");
            insert_or_get(conn, user.id, &user.username, user.is_admin())
        }
    }
}

fn insert_or_get(
    conn: &mut PgConnection,
    credential_id: Uuid,
    username: &str,
    is_admin: bool,
) -> AppResult<Profile> {
    diesel::insert_into(profiles::table)
        .values(&NewProfile {
            credential_id,
            username: username.to_string(),
            is_admin,
        })
        .on_conflict(profiles::credential_id)
        .do_nothing()
        .execute(conn)?;

    let profile = profiles::table
        .filter(profiles::credential_id.eq(credential_id))
        .first::<Profile>(conn)?;
    Ok(profile)
}

/// The site administrator's profile: the admin-flagged profile, else the oldest one.
pub fn find_admin_profile(conn: &mut PgConnection) -> AppResult<Option<Profile>> {
    let admin = profiles::table
        .filter(profiles::is_admin.eq(true))
        .order(profiles::created_at.asc())
        .first::<Profile>(conn)
        .optional()?;

    if admin.is_some() {
        return Ok(admin);
    }

    let oldest = profiles::table
        .order(profiles::created_at.asc())
        .first::<Profile>(conn)
        .optional()?;
    Ok(oldest)
}
