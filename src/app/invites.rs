use crate::constants::{INVITE_TOKEN_BYTES, INVITE_TTL_DAYS};
use crate::domain::{AuthUser, Membership, Role, TeamInvite};
use crate::error::{FarmError, Result};
use crate::storage::Storage;
use crate::validation;
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Invite plus the raw token, which is only ever returned here.
#[derive(Debug, Clone)]
pub struct CreatedInvite {
    pub invite: TeamInvite,
    pub token: String,
}

pub fn generate_token() -> String {
    let mut bytes = [0u8; INVITE_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.trim().as_bytes());
    hex::encode(hasher.finalize())
}

pub struct InvitesUseCase {
    storage: Arc<dyn Storage>,
}

impl InvitesUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn create(&self, organization_id: Uuid, email: &str, role: Role, invited_by: Uuid) -> Result<CreatedInvite> {
        validation::validate_email(email)?;
        if role == Role::Owner {
            return Err(FarmError::validation("role", "owners cannot be invited"));
        }
        let email = email.trim().to_lowercase();
        let now = Utc::now();
        let pending = self.storage.list_invites(Some(organization_id)).await?;
        if pending.iter().any(|i| i.email == email && i.is_pending(now)) {
            return Err(FarmError::Conflict(format!("an invite for {} is already pending", email)));
        }

        let token = generate_token();
        let invite = TeamInvite {
            id: Uuid::new_v4(),
            organization_id,
            email,
            role,
            token_hash: hash_token(&token),
            invited_by,
            expires_at: now + Duration::days(INVITE_TTL_DAYS),
            accepted_at: None,
            accepted_by: None,
            created_at: now,
        };
        self.storage.create_invite(&invite).await?;
        info!("Invited {} to organization {} as {:?}", invite.email, organization_id, role);
        Ok(CreatedInvite { invite, token })
    }

    pub async fn list(&self, organization_id: Uuid) -> Result<Vec<TeamInvite>> {
        self.storage.list_invites(Some(organization_id)).await
    }

    pub async fn revoke(&self, organization_id: Uuid, id: Uuid) -> Result<()> {
        let invites = self.storage.list_invites(Some(organization_id)).await?;
        if !invites.iter().any(|i| i.id == id) {
            return Err(FarmError::not_found("invite", id));
        }
        self.storage.delete_invite(id).await?;
        Ok(())
    }

    /// Redeems an invite token for the signed-in user.
    pub async fn accept(&self, token: &str, user: &AuthUser) -> Result<Membership> {
        let mut invite = self
            .storage
            .get_invite_by_token_hash(&hash_token(token))
            .await?
            .ok_or_else(|| FarmError::NotFound { entity: "invite", id: "token".into() })?;
        let now = Utc::now();
        if invite.accepted_at.is_some() {
            return Err(FarmError::Conflict("invite was already accepted".into()));
        }
        if invite.is_expired(now) {
            return Err(FarmError::validation("token", "invite has expired"));
        }
        let email_matches = user
            .email
            .as_deref()
            .map_or(false, |e| e.trim().eq_ignore_ascii_case(&invite.email));
        if !email_matches {
            return Err(FarmError::Forbidden("invite was sent to a different email".into()));
        }
        if self
            .storage
            .get_membership(invite.organization_id, user.id)
            .await?
            .is_some()
        {
            return Err(FarmError::Conflict("already a member of this organization".into()));
        }

        let membership = Membership {
            organization_id: invite.organization_id,
            user_id: user.id,
            role: invite.role,
            created_at: now,
        };
        self.storage.add_membership(&membership).await?;
        invite.accepted_at = Some(now);
        invite.accepted_by = Some(user.id);
        self.storage.update_invite(&invite).await?;
        info!("User {} joined organization {}", user.id, invite.organization_id);
        Ok(membership)
    }
}
