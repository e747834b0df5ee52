//! Notification routing and the Web Push payload the service worker reads.

use crate::constants::{PUSH_BADGE, PUSH_ICON};
use crate::domain::NotificationType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// App page a notification of this type opens.
pub fn route_for(notification_type: NotificationType) -> &'static str {
    match notification_type {
        NotificationType::BreedingReminder | NotificationType::HeatCheck | NotificationType::PregnancyCheck => {
            "/breeding"
        }
        NotificationType::FarrowingDue | NotificationType::WeaningDue => "/farrowing",
        NotificationType::HealthFollowUp | NotificationType::VaccinationDue => "/health",
        NotificationType::ComplianceAlert => "/compliance",
        NotificationType::TeamInvite => "/team",
        NotificationType::General => "/dashboard",
    }
}

pub fn url_for(notification_type: NotificationType, related_id: Option<Uuid>) -> String {
    let route = route_for(notification_type);
    match related_id {
        Some(id) => format!("{}?id={}", route, id),
        None => route.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushData {
    pub url: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub related_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// Collapses repeated pushes about the same record on the device.
    pub tag: String,
    pub data: PushData,
}

impl PushPayload {
    pub fn new(notification_type: NotificationType, title: &str, body: &str, related_id: Option<Uuid>) -> Self {
        let tag = match related_id {
            Some(id) => format!("{}-{}", notification_type.as_str(), id),
            None => notification_type.as_str().to_string(),
        };
        Self {
            title: title.to_string(),
            body: body.to_string(),
            icon: PUSH_ICON.to_string(),
            badge: PUSH_BADGE.to_string(),
            tag,
            data: PushData {
                url: url_for(notification_type, related_id),
                notification_type,
                related_id,
            },
        }
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_type() {
        assert_eq!(route_for(NotificationType::HeatCheck), "/breeding");
        assert_eq!(route_for(NotificationType::WeaningDue), "/farrowing");
        assert_eq!(route_for(NotificationType::VaccinationDue), "/health");
        assert_eq!(route_for(NotificationType::TeamInvite), "/team");
        assert_eq!(route_for(NotificationType::General), "/dashboard");
    }

    #[test]
    fn payload_carries_url_and_tag() {
        let id = Uuid::nil();
        let payload = PushPayload::new(NotificationType::FarrowingDue, "Farrowing due", "Sow #7", Some(id));
        assert_eq!(payload.tag, format!("farrowing_due-{}", id));
        assert_eq!(payload.data.url, format!("/farrowing?id={}", id));

        let json: serde_json::Value = serde_json::from_slice(&payload.to_bytes().unwrap()).unwrap();
        assert_eq!(json["data"]["type"], "farrowing_due");
        assert_eq!(json["icon"], PUSH_ICON);
    }

    #[test]
    fn untargeted_payload_uses_bare_route() {
        let payload = PushPayload::new(NotificationType::General, "Hello", "", None);
        assert_eq!(payload.tag, "general");
        assert_eq!(payload.data.url, "/dashboard");
    }
}
