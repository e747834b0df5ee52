use super::AppState;
use crate::domain::{AuthUser, Role};
use crate::error::{FarmError, Result};
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, Request},
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use subtle::ConstantTimeEq;
use uuid::Uuid;

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The signed-in user behind the request's access token.
pub struct CurrentUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = FarmError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(parts).ok_or_else(|| FarmError::Unauthorized("missing bearer token".into()))?;
        Ok(CurrentUser(state.auth.verify(token).await?))
    }
}

/// A user acting inside the organization named by the `:org_id` path segment.
pub struct OrgMember {
    pub user: AuthUser,
    pub organization_id: Uuid,
    pub role: Role,
}

impl OrgMember {
    pub fn require_write(&self) -> Result<()> {
        self.require(self.role.can_write(), "your role is read-only")
    }

    pub fn require_team(&self) -> Result<()> {
        self.require(self.role.can_manage_team(), "only owners and admins can manage the team")
    }

    pub fn require_finance(&self) -> Result<()> {
        self.require(self.role.can_view_finance(), "your role cannot access finances")
    }

    fn require(&self, allowed: bool, message: &str) -> Result<()> {
        if allowed {
            Ok(())
        } else {
            Err(FarmError::Forbidden(message.to_string()))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for OrgMember {
    type Rejection = FarmError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        let axum::extract::Path(params) =
            axum::extract::Path::<HashMap<String, String>>::from_request_parts(parts, state)
                .await
                .map_err(|e| FarmError::validation("org_id", e.body_text()))?;
        let organization_id = params
            .get("org_id")
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| FarmError::validation("org_id", "must be a UUID"))?;

        let membership = state
            .storage
            .get_membership(organization_id, user.id)
            .await?
            .ok_or_else(|| FarmError::Forbidden("not a member of this organization".into()))?;

        Ok(OrgMember { user, organization_id, role: membership.role })
    }
}

/// Caller presented the configured cron secret.
pub struct CronAuth;

#[async_trait]
impl FromRequestParts<AppState> for CronAuth {
    type Rejection = FarmError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let expected = state
            .cron_secret
            .as_deref()
            .ok_or_else(|| FarmError::Unauthorized("cron secret is not configured".into()))?;
        match bearer_token(parts) {
            Some(token) if secrets_match(token, expected) => Ok(CronAuth),
            _ => Err(FarmError::Unauthorized("invalid cron secret".into())),
        }
    }
}

/// `axum::Json` whose rejections render as the API's JSON error body.
pub struct Json<T>(pub T);

#[async_trait]
impl<S, B, T> FromRequest<S, B> for Json<T>
where
    axum::Json<T>: FromRequest<S, B, Rejection = JsonRejection>,
    S: Send + Sync,
    B: Send + 'static,
{
    type Rejection = FarmError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(Json(value))
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// `axum::extract::Path` with JSON rejections.
pub struct Path<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = FarmError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let axum::extract::Path(value) = axum::extract::Path::<T>::from_request_parts(parts, state).await?;
        Ok(Path(value))
    }
}

/// `axum::extract::Query` with JSON rejections.
pub struct Query<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = FarmError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let axum::extract::Query(value) = axum::extract::Query::<T>::from_request_parts(parts, state).await?;
        Ok(Query(value))
    }
}

/// Compares digests in constant time so neither content nor length leaks.
fn secrets_match(presented: &str, expected: &str) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    presented.as_slice().ct_eq(expected.as_slice()).into()
}
