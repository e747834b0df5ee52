use crate::domain::{AuthUser, PushSubscription};
use crate::error::Result;
use async_trait::async_trait;

/// Resolves a bearer token to the signed-in user.
#[async_trait]
pub trait AuthPort: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthUser>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushSendError {
    /// The push service reports the endpoint as expired or unknown.
    Gone,
    Failed(String),
}

impl std::fmt::Display for PushSendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushSendError::Gone => write!(f, "subscription endpoint is gone"),
            PushSendError::Failed(reason) => write!(f, "{}", reason),
        }
    }
}

/// Delivers an encrypted Web Push message to one subscription.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> std::result::Result<(), PushSendError>;
}
