use axum::Json;
use serde::Serialize;

use feed_shared::middleware::OptionalAuthUser;
use feed_shared::types::ApiResponse;

const ROUTES: &[&str] = &[
    "/profile",
    "/myfeed",
    "/friendsfeed",
    "/posts",
    "/posts/:id/comments",
    "/posts/:id/like",
    "/friends",
    "/friends/requests",
    "/friends/requests/accept",
];

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub authenticated: bool,
    pub routes: &'static [&'static str],
}

pub async fn index(OptionalAuthUser(user): OptionalAuthUser) -> Json<ApiResponse<IndexResponse>> {
    Json(ApiResponse::ok(IndexResponse {
        service: "feed-social",
        version: env!("CARGO_PKG_VERSION"),
        authenticated: user.is_some(),
        routes: ROUTES,
    }))
}
