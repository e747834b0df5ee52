use crate::app::ports::{PushSendError, PushTransport};
use crate::constants::PUSH_TTL_SECONDS;
use crate::domain::PushSubscription;
use crate::error::{FarmError, Result};
use async_trait::async_trait;
use tracing::debug;
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushError, WebPushMessageBuilder,
};

/// Sends VAPID-signed, aes128gcm-encrypted Web Push messages.
pub struct WebPushTransport {
    client: IsahcWebPushClient,
    vapid_pem: String,
    subject: String,
}

impl WebPushTransport {
    pub fn new(vapid_pem: String, subject: String) -> Result<Self> {
        let client = IsahcWebPushClient::new().map_err(|e| FarmError::Push(e.to_string()))?;
        Ok(Self { client, vapid_pem, subject })
    }

    fn build(&self, subscription: &PushSubscription, payload: &[u8]) -> std::result::Result<web_push::WebPushMessage, WebPushError> {
        let info = SubscriptionInfo::new(&subscription.endpoint, &subscription.p256dh, &subscription.auth);
        let mut signer = VapidSignatureBuilder::from_pem(self.vapid_pem.as_bytes(), &info)?;
        signer.add_claim("sub", self.subject.as_str());
        let signature = signer.build()?;

        let mut message = WebPushMessageBuilder::new(&info);
        message.set_payload(ContentEncoding::Aes128Gcm, payload);
        message.set_ttl(PUSH_TTL_SECONDS);
        message.set_vapid_signature(signature);
        message.build()
    }
}

#[async_trait]
impl PushTransport for WebPushTransport {
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> std::result::Result<(), PushSendError> {
        let message = self
            .build(subscription, payload)
            .map_err(|e| PushSendError::Failed(e.to_string()))?;
        match self.client.send(message).await {
            Ok(()) => {
                debug!("Push delivered to {}", subscription.endpoint);
                Ok(())
            }
            Err(WebPushError::EndpointNotValid { .. }) | Err(WebPushError::EndpointNotFound { .. }) => {
                Err(PushSendError::Gone)
            }
            Err(e) => Err(PushSendError::Failed(e.to_string())),
        }
    }
}

/// Stand-in used when no VAPID key is configured; every send fails softly.
pub struct DisabledPushTransport;

#[async_trait]
impl PushTransport for DisabledPushTransport {
    async fn send(&self, subscription: &PushSubscription, _payload: &[u8]) -> std::result::Result<(), PushSendError> {
        debug!("Push disabled; not sending to {}", subscription.endpoint);
        Err(PushSendError::Failed("push delivery is not configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test]
    async fn disabled_transport_never_prunes() {
        let subscription = PushSubscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            endpoint: "https://push.test/x".into(),
            p256dh: "k".into(),
            auth: "a".into(),
            user_agent: None,
            last_success_at: None,
            failure_count: 0,
            created_at: Utc::now(),
        };
        let result = DisabledPushTransport.send(&subscription, b"{}").await;
        assert!(matches!(result, Err(PushSendError::Failed(_))));
    }
}
