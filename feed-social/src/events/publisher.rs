use uuid::Uuid;

use feed_shared::clients::rabbitmq::RabbitMQClient;
use feed_shared::types::event::{routing_keys, payloads, Event};

const SOURCE: &str = "feed-social";

pub async fn publish_profile_updated(rabbitmq: &RabbitMQClient, profile_id: Uuid, credential_id: Uuid) {
    let event = Event::new(
        SOURCE,
        routing_keys::SOCIAL_PROFILE_UPDATED,
        payloads::ProfileUpdated {
            profile_id,
            credential_id,
        },
    )
    .with_user(credential_id);

    if let Err(e) = rabbitmq.publish(routing_keys::SOCIAL_PROFILE_UPDATED, &event).await {
        tracing::error!(error = %e, "failed to publish profile.updated event");
    }
}

fn friend_request_sent_event(
    credential_id: Uuid,
    relationship_id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    sender_username: &str,
) -> Event<payloads::FriendRequestSent> {
    Event::new(
        SOURCE,
        routing_keys::SOCIAL_FRIEND_REQUEST_SENT,
        payloads::FriendRequestSent {
            relationship_id,
            sender_id,
            receiver_id,
            sender_username: sender_username.to_string(),
        },
    )
    .with_user(credential_id)
}

pub async fn publish_friend_request_sent(
    rabbitmq: &RabbitMQClient,
    credential_id: Uuid,
    relationship_id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    sender_username: &str,
) {
    let event = friend_request_sent_event(credential_id, relationship_id, sender_id, receiver_id, sender_username);

    if let Err(e) = rabbitmq.publish(routing_keys::SOCIAL_FRIEND_REQUEST_SENT, &event).await {
        tracing::error!(error = %e, "failed to publish friend_request.sent event");
    }
}

fn friend_request_accepted_event(
    credential_id: Uuid,
    relationship_id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
) -> Event<payloads::FriendRequestAccepted> {
    Event::new(
        SOURCE,
        routing_keys::SOCIAL_FRIEND_REQUEST_ACCEPTED,
        payloads::FriendRequestAccepted {
            relationship_id,
            sender_id,
            receiver_id,
        },
    )
    .with_user(credential_id)
}

pub async fn publish_friend_request_accepted(
    rabbitmq: &RabbitMQClient,
    credential_id: Uuid,
    relationship_id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
) {
    let event = friend_request_accepted_event(credential_id, relationship_id, sender_id, receiver_id);

    if let Err(e) = rabbitmq.publish(routing_keys::SOCIAL_FRIEND_REQUEST_ACCEPTED, &event).await {
        tracing::error!(error = %e, "failed to publish friend_request.accepted event");
    }
}

pub async fn publish_post_created(
    rabbitmq: &RabbitMQClient,
    credential_id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    has_image: bool,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::SOCIAL_POST_CREATED,
        payloads::PostCreated { post_id, author_id, has_image },
    )
    .with_user(credential_id);

    if let Err(e) = rabbitmq.publish(routing_keys::SOCIAL_POST_CREATED, &event).await {
        tracing::error!(error = %e, "failed to publish post.created event");
    }
}

pub async fn publish_post_liked(
    rabbitmq: &RabbitMQClient,
    credential_id: Uuid,
    post_id: Uuid,
    post_author_id: Uuid,
    liker_id: Uuid,
    liker_username: &str,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::SOCIAL_POST_LIKED,
        payloads::PostLiked {
            post_id,
            post_author_id,
            liker_id,
            liker_username: liker_username.to_string(),
        },
    )
    .with_user(credential_id);

    if let Err(e) = rabbitmq.publish(routing_keys::SOCIAL_POST_LIKED, &event).await {
        tracing::error!(error = %e, "failed to publish post.liked event");
    }
}

pub async fn publish_comment_added(
    rabbitmq: &RabbitMQClient,
    credential_id: Uuid,
    comment_id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    text_preview: String,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::SOCIAL_COMMENT_ADDED,
        payloads::CommentAdded {
            comment_id,
            post_id,
            author_id,
            text_preview,
        },
    )
    .with_user(credential_id);

    if let Err(e) = rabbitmq.publish(routing_keys::SOCIAL_COMMENT_ADDED, &event).await {
        tracing::error!(error = %e, "failed to publish comment.added event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friend_request_events_name_the_acting_user() {
        let (actor, rel, sender, receiver) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let sent = friend_request_sent_event(actor, rel, sender, receiver, "erin");
        assert_eq!(sent.user_id, Some(actor));
        assert_eq!(sent.event_type, routing_keys::SOCIAL_FRIEND_REQUEST_SENT);
        assert_eq!(sent.data.sender_username, "erin");

        let accepted = friend_request_accepted_event(actor, rel, sender, receiver);
        assert_eq!(accepted.user_id, Some(actor));
        assert_eq!(accepted.data.relationship_id, rel);
    }
}
