use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, DecodingKey, Validation, Algorithm};

use crate::errors::{AppError, ErrorCode};
use crate::types::auth::{AuthUser, Claims};

pub const DEFAULT_JWT_SECRET: &str = "development-secret-change-in-production";

/// Secret shared by token issuers and the extractor, from `JWT_SECRET`.
pub fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string())
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;
        let claims = validate_jwt(&token, &jwt_secret())?;

        if claims.is_expired() {
            return Err(AppError::new(ErrorCode::TokenExpired, "token has expired"));
        }

        Ok(AuthUser::from(claims))
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "missing authorization header"))?
        .to_str()
        .map_err(|_| AppError::new(ErrorCode::Unauthorized, "invalid authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "authorization header must use Bearer scheme"))
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::new(ErrorCode::TokenExpired, "token has expired")
        }
        _ => AppError::new(ErrorCode::TokenInvalid, format!("invalid token: {e}")),
    })?;

    Ok(token_data.claims)
}

/// Optional auth extractor
pub struct OptionalAuthUser(pub Option<AuthUser>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(Self(Some(user))),
            Err(_) => Ok(Self(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::auth::UserRole;
    use axum::http::Request;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    fn token_for(claims: &Claims, secret: &str) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/profile");
        if let Some(v) = value {
            builder = builder.header("Authorization", v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn valid_bearer_token_is_accepted() {
        let id = Uuid::new_v4();
        let token = token_for(&Claims::new(id, "alice", UserRole::User, 300), &jwt_secret());
        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));

        let user = AuthUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let mut parts = parts_with_auth(None);
        let err = AuthUser::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn basic_scheme_is_rejected() {
        let mut parts = parts_with_auth(Some("Basic YWxpY2U6cGFzcw=="));
        let err = AuthUser::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::Unauthorized);
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = token_for(&Claims::new(Uuid::new_v4(), "bob", UserRole::User, 300), "secret-a");
        let err = validate_jwt(&token, "secret-b").unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::TokenInvalid);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let mut claims = Claims::new(Uuid::new_v4(), "bob", UserRole::User, 300);
        claims.iat -= 7200;
        claims.exp = claims.iat + 60;
        let token = token_for(&claims, "secret");
        let err = validate_jwt(&token, "secret").unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::TokenExpired);
    }

    #[tokio::test]
    async fn optional_user_swallows_errors() {
        let mut parts = parts_with_auth(Some("Bearer not-a-jwt"));
        let OptionalAuthUser(user) = OptionalAuthUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(user.is_none());
    }
}
