use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::db;
use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;

/// Tells the core whether a credential has been revoked (logout blacklist,
/// expiry). The issuing side lives outside this service.
#[async_trait]
pub trait RevocationGate: Send + Sync {
    async fn is_revoked(&self, token: &str) -> bool;
}

/// Gate that never revokes anything. Default wiring when no blacklist
/// backend is configured.
pub struct NoRevocation;

#[async_trait]
impl RevocationGate for NoRevocation {
    async fn is_revoked(&self, _token: &str) -> bool {
        false
    }
}

/// Token blacklist held in memory: each entry revokes a token until its
/// expiry instant, after which the entry is moot (the token itself has
/// expired). Tests steer time by choosing past or future expiries.
#[derive(Default)]
pub struct InMemoryRevocationList {
    revoked: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryRevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn revoke_until(&self, token: &str, expires_at: DateTime<Utc>) {
        self.revoked
            .write()
            .await
            .insert(token.to_string(), expires_at);
    }
}

#[async_trait]
impl RevocationGate for InMemoryRevocationList {
    async fn is_revoked(&self, token: &str) -> bool {
        match self.revoked.read().await.get(token) {
            Some(expires_at) => *expires_at > Utc::now(),
            None => false,
        }
    }
}

/// Resolve the requester from the `Authorization: Bearer` header. A missing,
/// revoked, or unknown token is Unauthorized; this runs before any mutation
/// precondition.
pub async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;
    if state.revocation.is_revoked(token).await {
        return Err(AppError::Unauthorized);
    }
    db::users::find_by_token(&state.db, token)
        .await?
        .ok_or(AppError::Unauthorized)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
