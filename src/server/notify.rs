//! Inbox, push subscription, push-send and cron routes.

use super::{AppState, CronAuth, CurrentUser, Json, Path, Query};
use crate::app::cron::CronSummary;
use crate::app::push_service::PushOutcome;
use crate::domain::{Notification, NotificationType, PushSubscription};
use crate::error::{FarmError, Result};
use crate::notifications::PushPayload;
use axum::{
    extract::State,
    http::{header::USER_AGENT, HeaderMap, StatusCode},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    unread: bool,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<InboxQuery>,
) -> Result<Json<Vec<Notification>>> {
    Ok(Json(state.storage.list_notifications(user.id, query.unread).await?))
}

pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if !state.storage.mark_notification_read(user.id, id, Utc::now()).await? {
        return Err(FarmError::not_found("notification", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionKeys {
    p256dh: String,
    auth: String,
}

/// The browser's `PushSubscription.toJSON()` shape.
#[derive(Debug, Deserialize)]
pub struct SubscribeBody {
    endpoint: String,
    keys: SubscriptionKeys,
}

pub async fn subscribe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
    Json(body): Json<SubscribeBody>,
) -> Result<(StatusCode, Json<PushSubscription>)> {
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let subscription = state
        .push_service()
        .subscribe(user.id, &body.endpoint, &body.keys.p256dh, &body.keys.auth, user_agent)
        .await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeBody {
    endpoint: String,
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<UnsubscribeBody>,
) -> Result<StatusCode> {
    if state.push_service().unsubscribe(user.id, &body.endpoint).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(FarmError::NotFound { entity: "push subscription", id: body.endpoint })
    }
}

#[derive(Debug, Deserialize)]
pub struct SendPush {
    user_id: Uuid,
    #[serde(default = "general")]
    notification_type: NotificationType,
    title: String,
    #[serde(default)]
    body: String,
    related_id: Option<Uuid>,
}

fn general() -> NotificationType {
    NotificationType::General
}

pub async fn send_push(
    State(state): State<AppState>,
    _auth: CronAuth,
    Json(request): Json<SendPush>,
) -> Result<Json<PushOutcome>> {
    crate::validation::require_non_empty("title", &request.title)?;
    let payload = PushPayload::new(request.notification_type, &request.title, &request.body, request.related_id);
    let outcome = state.push_service().send_to_user(request.user_id, &payload).await?;
    info!(
        "Push to {}: {}/{} delivered, {} pruned",
        request.user_id, outcome.delivered, outcome.attempted, outcome.pruned
    );
    Ok(Json(outcome))
}

pub async fn process_notifications(State(state): State<AppState>, _auth: CronAuth) -> Result<Json<CronSummary>> {
    Ok(Json(state.cron().process_due(Utc::now()).await?))
}
