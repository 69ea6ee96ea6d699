use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use feed_shared::clients::db;
use feed_shared::errors::{AppError, AppResult, ErrorCode};
use feed_shared::types::auth::AuthUser;
use feed_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{Profile, Relationship};
use crate::schema::{profiles, relationships};
use crate::services::relationship_service::{self, Graph, ReceivedRequest, RequestPlan};
use crate::services::profile_service;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct FriendsPage {
    pub friends: Vec<Profile>,
    pub sent_requests: Vec<Relationship>,
    pub eligible_profiles: Vec<Profile>,
    pub received_requests: Vec<ReceivedRequest>,
}

// --- GET /friends ---

pub async fn friends_page(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<FriendsPage>>> {
    let mut conn = db::checkout(&state.db)?;
    let profile = profile_service::ensure_profile(&mut conn, &user)?;
    let mut graph = Graph::load(&mut conn, profile.id)?;

    if state.config.welcome_request {
        let admin = profile_service::find_admin_profile(&mut conn)?;
        if let Some(admin_id) = relationship_service::welcome_target(&profile, admin.as_ref(), &graph) {
            match relationship_service::insert_request(&mut conn, profile.id, admin_id) {
                Ok(welcome) => {
                    tracing::info!(profile_id = %profile.id, admin_id = %admin_id, "welcome request sent");
                    publisher::publish_friend_request_sent(
                        &state.rabbitmq,
                        user.id,
                        welcome.id,
                        profile.id,
                        admin_id,
                        &profile.username,
                    )
                    .await;
                }
                // A concurrent visit already created it.
                Err(e) if e.error_code() == ErrorCode::RequestAlreadySent => {}
                Err(e) => return Err(e),
            }
            graph = Graph::load(&mut conn, profile.id)?;
        }
    }

    let friend_ids: Vec<Uuid> = graph.friends.iter().copied().collect();
    let friends = profiles::table
        .filter(profiles::id.eq_any(&friend_ids))
        .order(profiles::username.asc())
        .load::<Profile>(&mut conn)?;

    let sent_requests = relationships::table
        .filter(relationships::sender_id.eq(profile.id))
        .order(relationships::created_at.desc())
        .load::<Relationship>(&mut conn)?;

    let everyone = profiles::table
        .order(profiles::username.asc())
        .load::<Profile>(&mut conn)?;
    let eligible_profiles = relationship_service::eligible_profiles(everyone, profile.id, &graph);

    let received_requests = relationship_service::load_received_requests(&mut conn, profile.id)?;

    Ok(Json(ApiResponse::ok(FriendsPage {
        friends,
        sent_requests,
        eligible_profiles,
        received_requests,
    })))
}

// --- POST /friends/requests ---

#[derive(Debug, Deserialize)]
pub struct SendRequests {
    pub receiver_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SendRequestsResponse {
    pub sent: Vec<Relationship>,
    /// Requests the receivers had already sent us, accepted instead.
    pub accepted: Vec<Relationship>,
}

pub async fn send_requests(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendRequests>,
) -> AppResult<Json<ApiResponse<SendRequestsResponse>>> {
    if req.receiver_ids.is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "select at least one profile"));
    }

    let mut conn = db::checkout(&state.db)?;
    let profile = profile_service::ensure_profile(&mut conn, &user)?;

    let known: HashSet<Uuid> = profiles::table
        .filter(profiles::id.eq_any(&req.receiver_ids))
        .select(profiles::id)
        .load::<Uuid>(&mut conn)?
        .into_iter()
        .collect();
    let graph = Graph::load(&mut conn, profile.id)?;
    let plans = relationship_service::plan_requests(profile.id, &req.receiver_ids, &known, &graph)?;

    let (sent, accepted) = conn.transaction::<_, AppError, _>(|conn| {
        let mut sent = Vec::new();
        let mut accepted = Vec::new();
        for plan in &plans {
            match *plan {
                RequestPlan::Send { receiver_id } => {
                    sent.push(relationship_service::insert_request(conn, profile.id, receiver_id)?);
                }
                RequestPlan::AcceptIncoming { relationship_id } => {
                    let incoming = relationships::table
                        .find(relationship_id)
                        .first::<Relationship>(conn)?;
                    relationship_service::check_acceptable(&incoming, profile.id)?;
                    accepted.push(relationship_service::accept(conn, &incoming, profile.id)?);
                }
            }
        }
        Ok((sent, accepted))
    })?;

    tracing::info!(
        profile_id = %profile.id,
        sent = sent.len(),
        accepted = accepted.len(),
        "friend requests processed"
    );

    for rel in &sent {
        publisher::publish_friend_request_sent(&state.rabbitmq, user.id, rel.id, rel.sender_id, rel.receiver_id, &profile.username).await;
    }
    for rel in &accepted {
        publisher::publish_friend_request_accepted(&state.rabbitmq, user.id, rel.id, rel.sender_id, rel.receiver_id).await;
    }

    Ok(Json(ApiResponse::ok(SendRequestsResponse { sent, accepted })))
}

// --- POST /friends/requests/accept ---

#[derive(Debug, Deserialize)]
pub struct AcceptRequests {
    pub relationship_ids: Vec<Uuid>,
}

pub async fn accept_requests(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<AcceptRequests>,
) -> AppResult<Json<ApiResponse<Vec<Relationship>>>> {
    if req.relationship_ids.is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "select at least one request"));
    }

    let mut conn = db::checkout(&state.db)?;
    let profile = profile_service::ensure_profile(&mut conn, &user)?;

    let accepted = conn.transaction::<_, AppError, _>(|conn| {
        let mut seen = HashSet::new();
        let mut accepted = Vec::new();
        for &id in &req.relationship_ids {
            if !seen.insert(id) {
                continue;
            }
            let relationship = relationships::table
                .find(id)
                .first::<Relationship>(conn)
                .optional()?
                .ok_or_else(|| AppError::with_details(
                    ErrorCode::RelationshipNotFound,
                    "friend request not found",
                    serde_json::json!({ "relationship_id": id }),
                ))?;
            relationship_service::check_acceptable(&relationship, profile.id)?;
            accepted.push(relationship_service::accept(conn, &relationship, profile.id)?);
        }
        Ok(accepted)
    })?;

    for rel in &accepted {
        publisher::publish_friend_request_accepted(&state.rabbitmq, user.id, rel.id, rel.sender_id, rel.receiver_id).await;
    }

    Ok(Json(ApiResponse::ok_with_message(accepted, "friend requests accepted")))
}
