use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;

use crate::domain::value_objects::Actor;

use super::{error::ApiError, handlers::AppState};

/// 認証済みの呼び出し元
///
/// `Authorization: Bearer <token>`を認証サービスで検証して得る。
/// ヘッダーがない、形式が違う、トークンが無効のいずれも401。
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedActor(pub Actor);

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(ApiError::Unauthenticated("missing bearer token"))?;
    let value = header
        .to_str()
        .map_err(|_| ApiError::Unauthenticated("malformed authorization header"))?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthenticated("malformed authorization header"))
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let actor = state
            .auth
            .authenticate(token)
            .await
            .map_err(ApiError::AuthServiceError)?
            .ok_or(ApiError::Unauthenticated("invalid or expired token"))?;
        Ok(AuthenticatedActor(actor))
    }
}
