use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{comments, friendships, likes, posts, profiles, relationships};

// --- Profile ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: Uuid,
    pub credential_id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub dob: Option<NaiveDate>,
    pub bio: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub credential_id: Uuid,
    pub username: String,
    pub is_admin: bool,
}

/// The editable part of a profile. Every field is written on save.
#[derive(Debug, AsChangeset, Clone, PartialEq)]
#[diesel(table_name = profiles, treat_none_as_null = true)]
pub struct ProfileChanges {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub dob: Option<NaiveDate>,
    pub bio: String,
}

// --- Friendship ---

#[derive(Debug, Insertable)]
#[diesel(table_name = friendships)]
pub struct NewFriendship {
    pub profile_id: Uuid,
    pub friend_id: Uuid,
}

// --- Relationship ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipStatus {
    Sent,
    Accepted,
}

impl RelationshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipStatus::Sent => "sent",
            RelationshipStatus::Accepted => "accepted",
        }
    }
}

impl std::str::FromStr for RelationshipStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(RelationshipStatus::Sent),
            "accepted" => Ok(RelationshipStatus::Accepted),
            _ => Err(format!("unknown relationship status: {s}")),
        }
    }
}

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = relationships)]
pub struct Relationship {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Relationship {
    pub fn is_pending(&self) -> bool {
        self.status == RelationshipStatus::Sent.as_str()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = relationships)]
pub struct NewRelationship {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub status: String,
}

// --- Post ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = posts)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub description: String,
    pub image_url: Option<String>,
    pub date_posted: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = posts)]
pub struct NewPost {
    pub author_id: Uuid,
    pub description: String,
    pub image_url: Option<String>,
}

// --- Comment ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = comments)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    pub date_added: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
}

// --- Like ---

#[derive(Debug, Insertable)]
#[diesel(table_name = likes)]
pub struct NewLike {
    pub author_id: Uuid,
    pub post_id: Uuid,
}
