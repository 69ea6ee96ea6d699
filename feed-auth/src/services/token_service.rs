use diesel::prelude::*;
use diesel::pg::PgConnection;
use jsonwebtoken::{encode, EncodingKey, Header};
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use feed_shared::errors::AppError;
use feed_shared::middleware::jwt_secret;
use feed_shared::types::auth::{Claims, TokenPair, UserRole};

use crate::config::AppConfig;
use crate::models::{Credential, NewRefreshToken};
use crate::schema::refresh_tokens;

pub fn create_access_token(
    user_id: Uuid,
    username: &str,
    role: UserRole,
    secret: &str,
    ttl_secs: i64,
) -> Result<String, AppError> {
    let claims = Claims::new(user_id, username, role, ttl_secs);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("JWT encoding failed: {e}")))
}

pub fn create_refresh_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

/// Only the SHA-256 of a refresh token is stored.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn create_token_pair(
    user_id: Uuid,
    username: &str,
    role: UserRole,
    secret: &str,
    access_ttl: i64,
) -> Result<(TokenPair, String), AppError> {
    let access_token = create_access_token(user_id, username, role, secret, access_ttl)?;
    let refresh_token = create_refresh_token();
    let refresh_hash = hash_token(&refresh_token);
    let pair = TokenPair::new(access_token, refresh_token, access_ttl);
    Ok((pair, refresh_hash))
}

/// Token pair for `credential`, signed with the secret every extractor checks against.
pub fn credential_token_pair(credential: &Credential, access_ttl: i64) -> Result<(TokenPair, String), AppError> {
    create_token_pair(
        credential.id,
        &credential.username,
        credential.user_role(),
        &jwt_secret(),
        access_ttl,
    )
}

/// Issues a token pair for `credential` and persists the refresh-token hash.
pub fn issue_session(
    conn: &mut PgConnection,
    config: &AppConfig,
    credential: &Credential,
) -> Result<TokenPair, AppError> {
    let (token_pair, refresh_hash) = credential_token_pair(credential, config.jwt_access_ttl)?;

    let new_rt = NewRefreshToken {
        credential_id: credential.id,
        token_hash: refresh_hash,
        expires_at: chrono::Utc::now() + chrono::Duration::seconds(config.jwt_refresh_ttl),
    };
    diesel::insert_into(refresh_tokens::table)
        .values(&new_rt)
        .execute(conn)?;

    Ok(token_pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_shared::middleware::validate_jwt;

    #[test]
    fn access_token_decodes_with_same_secret() {
        let id = Uuid::new_v4();
        let token = create_access_token(id, "alice", UserRole::Admin, "s3cret", 600).unwrap();
        let claims = validate_jwt(&token, "s3cret").unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, UserRole::Admin);
    }

    #[test]
    fn issued_tokens_pass_the_extractor_check() {
        // A prefixed secret in the environment must not split issuer and verifier.
        let config: AppConfig = config::Config::builder()
            .set_override("jwt_secret", "prod-secret")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        let now = chrono::Utc::now();
        let credential = Credential {
            id: Uuid::new_v4(),
            username: "dana".into(),
            email: None,
            password_hash: String::new(),
            role: "admin".into(),
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };

        let (pair, _) = credential_token_pair(&credential, config.jwt_access_ttl).unwrap();
        let claims = validate_jwt(&pair.access_token, &jwt_secret()).unwrap();
        assert_eq!(claims.sub, credential.id);
        assert_eq!(claims.role, UserRole::Admin);
    }

    #[test]
    fn refresh_tokens_are_random_hex() {
        let a = create_refresh_token();
        let b = create_refresh_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn pair_returns_hash_of_refresh_token() {
        let (pair, hash) = create_token_pair(Uuid::new_v4(), "bob", UserRole::User, "k", 60).unwrap();
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 60);
        assert_eq!(hash_token(&pair.refresh_token), hash);
        assert_ne!(pair.refresh_token, hash);
    }
}
