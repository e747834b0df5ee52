pub mod jwt_auth;
pub mod supabase_client;
pub mod supabase_storage;
pub mod web_push_transport;

use crate::app::ports::PushTransport;
use crate::config::{AppConfig, StorageBackend};
use crate::error::Result;
use crate::storage::{InMemoryStorage, Storage};
use std::sync::Arc;
use supabase_client::SupabaseClient;
use supabase_storage::SupabaseStorage;
use tracing::{info, warn};
use web_push_transport::{DisabledPushTransport, WebPushTransport};

/// Supabase when credentials are configured, otherwise a process-local store.
pub fn build_storage(config: &AppConfig) -> Arc<dyn Storage> {
    match config.storage_backend() {
        StorageBackend::Supabase { url, service_role_key } => {
            info!("Using Supabase storage at {}", url);
            Arc::new(SupabaseStorage::new(SupabaseClient::new(url, service_role_key)))
        }
        StorageBackend::InMemory => {
            warn!("SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY not set; using in-memory storage");
            Arc::new(InMemoryStorage::new())
        }
    }
}

pub fn build_push_transport(config: &AppConfig) -> Result<Arc<dyn PushTransport>> {
    match config.vapid_private_key()? {
        Some(pem) => {
            let subject = config
                .push
                .vapid_subject
                .clone()
                .unwrap_or_else(|| "mailto:admin@localhost".to_string());
            Ok(Arc::new(WebPushTransport::new(pem, subject)?))
        }
        None => {
            warn!("No VAPID key configured; push notifications are disabled");
            Ok(Arc::new(DisabledPushTransport))
        }
    }
}
