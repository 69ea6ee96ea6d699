use uuid::Uuid;

use feed_shared::clients::rabbitmq::RabbitMQClient;
use feed_shared::types::auth::UserRole;
use feed_shared::types::event::{routing_keys, payloads, Event};

pub async fn publish_user_registered(
    rabbitmq: &RabbitMQClient,
    credential_id: Uuid,
    username: &str,
    email: Option<&str>,
    role: UserRole,
) {
    let event = Event::new(
        "feed-auth",
        routing_keys::AUTH_USER_REGISTERED,
        payloads::UserRegistered {
            credential_id,
            username: username.to_string(),
            email: email.map(str::to_string),
            role,
        },
    )
    .with_user(credential_id);

    if let Err(e) = rabbitmq.publish(routing_keys::AUTH_USER_REGISTERED, &event).await {
        tracing::error!(error = %e, "failed to publish user.registered event");
    }
}
