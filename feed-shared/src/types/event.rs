use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ event envelope wrapping all domain events.
///
/// Routing key format: `feed.{domain}.{entity}.{action}`
/// Example: `feed.auth.user.registered`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    // Auth events
    pub const AUTH_USER_REGISTERED: &str = "feed.auth.user.registered";

    // Social events
    pub const SOCIAL_PROFILE_UPDATED: &str = "feed.social.profile.updated";
    pub const SOCIAL_FRIEND_REQUEST_SENT: &str = "feed.social.friend_request.sent";
    pub const SOCIAL_FRIEND_REQUEST_ACCEPTED: &str = "feed.social.friend_request.accepted";
    pub const SOCIAL_POST_CREATED: &str = "feed.social.post.created";
    pub const SOCIAL_POST_LIKED: &str = "feed.social.post.liked";
    pub const SOCIAL_COMMENT_ADDED: &str = "feed.social.comment.added";
}

/// Common event data payloads
pub mod payloads {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    use crate::types::auth::UserRole;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct UserRegistered {
        pub credential_id: Uuid,
        pub username: String,
        pub email: Option<String>,
        pub role: UserRole,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ProfileUpdated {
        pub profile_id: Uuid,
        pub credential_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct FriendRequestSent {
        pub relationship_id: Uuid,
        pub sender_id: Uuid,
        pub receiver_id: Uuid,
        pub sender_username: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct FriendRequestAccepted {
        pub relationship_id: Uuid,
        pub sender_id: Uuid,
        pub receiver_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PostCreated {
        pub post_id: Uuid,
        pub author_id: Uuid,
        pub has_image: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PostLiked {
        pub post_id: Uuid,
        pub post_author_id: Uuid,
        pub liker_id: Uuid,
        pub liker_username: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CommentAdded {
        pub comment_id: Uuid,
        pub post_id: Uuid,
        pub author_id: Uuid,
        pub text_preview: String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_user_and_type() {
        let user = Uuid::new_v4();
        let event = Event::new(
            "feed-auth",
            routing_keys::AUTH_USER_REGISTERED,
            payloads::UserRegistered {
                credential_id: user,
                username: "alice".into(),
                email: None,
                role: crate::types::auth::UserRole::User,
            },
        )
        .with_user(user);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "feed.auth.user.registered");
        assert_eq!(json["user_id"], user.to_string());
        assert_eq!(json["data"]["role"], "user");

        let back: Event<payloads::UserRegistered> = serde_json::from_value(json).unwrap();
        assert_eq!(back.data.username, "alice");
    }
}
