use std::sync::Arc;
use futures_lite::StreamExt;
use lapin::options::BasicAckOptions;

use feed_shared::types::auth::UserRole;
use feed_shared::types::event::{routing_keys, payloads, Event};

use crate::AppState;
use crate::services::profile_service;

/// Listen for auth.user.registered events to create default profiles
pub async fn listen_user_registered(state: Arc<AppState>) -> anyhow::Result<()> {
    let mut consumer = state.rabbitmq.subscribe(
        "feed-social.auth.user.registered",
        &[routing_keys::AUTH_USER_REGISTERED],
    ).await?;

    tracing::info!("listening for auth.user.registered events");

    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(e) => {
                tracing::error!(error = %e, "consumer error");
                continue;
            }
        };

        match serde_json::from_slice::<Event<payloads::UserRegistered>>(&delivery.data) {
            Ok(event) => {
                let data = &event.data;
                tracing::info!(
                    credential_id = %data.credential_id,
                    username = %data.username,
                    "received user.registered event"
                );

                // Pool checkout and inserts block, keep them off the async workers.
                let db = state.db.clone();
                let (credential_id, username) = (data.credential_id, data.username.clone());
                let is_admin = data.role == UserRole::Admin;
                let result = tokio::task::spawn_blocking(move || {
                    profile_service::create_default_profile(&db, credential_id, &username, is_admin)
                })
                .await;

                match result {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => tracing::error!(
                        error = %e,
                        credential_id = %credential_id,
                        "failed to create default profile"
                    ),
                    Err(e) => tracing::error!(error = %e, "profile creation task panicked"),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to deserialize user.registered event");
            }
        }

        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
            tracing::warn!(error = %e, "failed to ack delivery");
        }
    }

    Ok(())
}
