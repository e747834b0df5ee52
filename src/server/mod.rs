//! HTTP surface: JSON API for the web app plus the cron and push-send hooks.

mod extract;
mod farm;
mod herd;
mod notify;

pub use extract::{CronAuth, CurrentUser, Json, OrgMember, Path, Query};

use crate::app::cron::CronUseCase;
use crate::app::ports::{AuthPort, PushTransport};
use crate::app::push_service::PushService;
use crate::storage::Storage;
use axum::{
    http::Method,
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use hyper::Server;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Everything a handler needs; cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub auth: Arc<dyn AuthPort>,
    pub push: Arc<dyn PushTransport>,
    /// Shared secret for the cron and push-send hooks. Unset disables them.
    pub cron_secret: Option<String>,
    pub batch_size: usize,
    pub app_base_url: String,
}

impl AppState {
    pub fn push_service(&self) -> PushService {
        PushService::new(self.storage.clone(), self.push.clone())
    }

    pub fn cron(&self) -> CronUseCase {
        CronUseCase::new(self.storage.clone(), self.push_service(), self.batch_size)
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "farmstead",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the router with every route and the CORS layer.
pub fn create_server(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        // Account-level
        .route("/api/orgs", get(farm::list_orgs).post(farm::create_org))
        .route("/api/invites/accept", post(farm::accept_invite))
        .route("/api/notifications", get(notify::list_notifications))
        .route("/api/notifications/:id/read", post(notify::mark_read))
        .route("/api/push/subscribe", post(notify::subscribe).delete(notify::unsubscribe))
        // Secret-authenticated hooks
        .route("/api/push/send", post(notify::send_push))
        .route(
            "/api/cron/process-notifications",
            get(notify::process_notifications).post(notify::process_notifications),
        )
        // Organization-scoped
        .route("/api/orgs/:org_id/animals", get(herd::list_animals).post(herd::create_animal))
        .route(
            "/api/orgs/:org_id/animals/:id",
            get(herd::get_animal).patch(herd::update_animal).delete(herd::delete_animal),
        )
        .route("/api/orgs/:org_id/breeding", get(herd::list_breedings).post(herd::record_breeding))
        .route("/api/orgs/:org_id/breeding/:id/confirm", post(herd::confirm_pregnancy))
        .route("/api/orgs/:org_id/breeding/:id/not-pregnant", post(herd::mark_not_pregnant))
        .route("/api/orgs/:org_id/farrowings", get(herd::list_farrowings))
        .route("/api/orgs/:org_id/farrowings/:id/outcome", post(herd::record_farrowing))
        .route("/api/orgs/:org_id/farrowings/:id/weaning", post(herd::record_weaning))
        .route("/api/orgs/:org_id/housing/units", get(herd::list_units).post(herd::create_unit))
        .route(
            "/api/orgs/:org_id/housing/assignments",
            get(herd::list_assignments).post(herd::assign_housing),
        )
        .route("/api/orgs/:org_id/housing/assignments/:id/end", post(herd::end_assignment))
        .route("/api/orgs/:org_id/health", get(herd::list_health).post(herd::record_health))
        .route("/api/orgs/:org_id/health/:id", delete(herd::delete_health))
        .route("/api/orgs/:org_id/finance", get(farm::list_finance).post(farm::record_finance))
        .route("/api/orgs/:org_id/finance/summary", get(farm::finance_summary))
        .route("/api/orgs/:org_id/finance/:id", delete(farm::delete_finance))
        .route("/api/orgs/:org_id/calendar", get(farm::calendar))
        .route("/api/orgs/:org_id/compliance", get(farm::compliance))
        .route("/api/orgs/:org_id/members", get(farm::members))
        .route("/api/orgs/:org_id/invites", get(farm::list_invites).post(farm::create_invite))
        .route("/api/orgs/:org_id/invites/:id", delete(farm::revoke_invite))
        .route("/api/orgs/:org_id/settings", get(farm::get_settings).put(farm::update_settings))
        .route("/api/orgs/:org_id/exports/:dataset", get(farm::export))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

/// Serves the API on `0.0.0.0:port` until the process exits.
pub async fn start_server(state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_server(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("HTTP server running on http://localhost:{}", port);
    info!("Health check: http://localhost:{}/health", port);

    Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}
