mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{app, user, CRON_SECRET};
use farmstead::app::cron::CronUseCase;
use farmstead::app::push_service::PushService;
use farmstead::storage::Storage;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn cron_endpoint_requires_the_secret() -> Result<()> {
    let app = app();
    let (status, _) = app.call(Method::POST, "/api/cron/process-notifications", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .call(Method::POST, "/api/cron/process-notifications", Some("wrong"), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A user access token is not the cron secret either
    let owner = user("owner@farm.test");
    let (status, _) = app
        .call(Method::GET, "/api/cron/process-notifications", Some(&owner.token), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, summary) = app
        .call(Method::GET, "/api/cron/process-notifications", Some(CRON_SECRET), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary, json!({ "fetched": 0, "sent": 0, "failed": 0, "push_delivered": 0 }));
    Ok(())
}

#[tokio::test]
async fn breeding_reminders_reach_inbox_and_devices() -> Result<()> {
    let app = app();
    let owner = user("owner@farm.test");
    let org = app.organization(&owner, "Reminder Farm").await?;
    let sow = app.animal(&org, &owner, "sow", "S-3").await?;

    let (status, _) = app
        .post(
            "/api/push/subscribe",
            &owner,
            json!({ "endpoint": "https://push.test/phone", "keys": { "p256dh": "BKey", "auth": "secret" } }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, breeding) = app
        .post(
            &format!("/api/orgs/{}/breeding", org),
            &owner,
            json!({ "sow_id": sow, "method": "artificial", "breeding_date": Utc::now().date_naive() }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", breeding);

    let org_id = Uuid::parse_str(&org)?;
    let queued = app.storage.list_scheduled_notifications(org_id).await?;
    assert_eq!(queued.len(), 4);

    // Run the processor as if the whole gestation had passed
    let push = PushService::new(app.storage.clone(), app.push.clone());
    let cron = CronUseCase::new(app.storage.clone(), push, 50);
    let summary = cron.process_due(Utc::now() + Duration::days(120)).await?;
    assert_eq!(summary.fetched, 4);
    assert_eq!(summary.sent, 4);
    assert_eq!(summary.push_delivered, 4);

    let sent = app.push.sent.lock().await;
    assert_eq!(sent.len(), 4);
    assert!(sent.iter().all(|(_, payload)| payload["data"]["url"].as_str().unwrap_or_default().contains("?id=")));
    drop(sent);

    let (status, inbox) = app.get("/api/notifications", &owner).await?;
    assert_eq!(status, StatusCode::OK);
    let items = inbox.as_array().cloned().unwrap_or_default();
    assert_eq!(items.len(), 4);

    let first = items[0]["id"].as_str().unwrap_or_default().to_string();
    let (status, _) = app
        .call(Method::POST, &format!("/api/notifications/{}/read", first), Some(&owner.token), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, unread) = app.get("/api/notifications?unread=true", &owner).await?;
    assert_eq!(unread.as_array().map(Vec::len), Some(3));

    // Another user cannot mark it
    let (status, _) = app
        .call(Method::POST, &format!("/api/notifications/{}/read", first), Some(&user("x@farm.test").token), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn not_pregnant_cancels_pending_reminders() -> Result<()> {
    let app = app();
    let owner = user("owner@farm.test");
    let org = app.organization(&owner, "Open Farm").await?;
    let sow = app.animal(&org, &owner, "sow", "S-9").await?;
    let (_, breeding) = app
        .post(
            &format!("/api/orgs/{}/breeding", org),
            &owner,
            json!({ "sow_id": sow, "method": "artificial", "breeding_date": Utc::now().date_naive() }),
        )
        .await?;

    let (status, record) = app
        .post(
            &format!("/api/orgs/{}/breeding/{}/not-pregnant", org, breeding["id"].as_str().unwrap_or_default()),
            &owner,
            json!({}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["status"], "not_pregnant");

    let org_id = Uuid::parse_str(&org)?;
    assert!(app.storage.list_scheduled_notifications(org_id).await?.is_empty());
    let (_, farrowings) = app.get(&format!("/api/orgs/{}/farrowings", org), &owner).await?;
    assert_eq!(farrowings.as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn push_send_prunes_gone_devices() -> Result<()> {
    let app = app();
    let owner = user("owner@farm.test");
    for endpoint in ["https://push.test/laptop", "https://push.test/gone"] {
        let (status, _) = app
            .post("/api/push/subscribe", &owner, json!({ "endpoint": endpoint, "keys": { "p256dh": "k", "auth": "a" } }))
            .await?;
        assert_eq!(status, StatusCode::CREATED);
    }

    let body = json!({
        "user_id": owner.id,
        "notification_type": "farrowing_due",
        "title": "Farrowing due: Sow #7",
        "body": "Expected today",
    });
    let (status, _) = app.call(Method::POST, "/api/push/send", Some(&owner.token), Some(body.clone())).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, outcome) = app.call(Method::POST, "/api/push/send", Some(CRON_SECRET), Some(body)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome, json!({ "attempted": 2, "delivered": 1, "failed": 1, "pruned": 1 }));
    assert_eq!(app.storage.list_push_subscriptions(owner.id).await?.len(), 1);

    let (status, _) = app
        .call(
            Method::DELETE,
            "/api/push/subscribe",
            Some(&owner.token),
            Some(json!({ "endpoint": "https://push.test/laptop" })),
        )
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.storage.list_push_subscriptions(owner.id).await?.is_empty());
    Ok(())
}
