//! Magic-link sign-in and developer access links.
//!
//! Tokens are shown once (in the emailed link) and only their SHA-256 digest
//! is stored. A magic link stays valid as a bearer token until it expires;
//! its first use is recorded.

use crate::access::{is_valid_email, normalize_email, require_admin};
use crate::context::{with_fields, ServiceContext};
use chrono::{DateTime, Duration, Utc};
use handover_common::{Caller, HandoverError, Result};
use handover_db::{tokens, DeveloperMagicLink, MagicLink, Owner};
use handover_notify::Notification;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Returned by `verify`.
#[derive(Debug, Clone, Serialize)]
pub struct CallerProfile {
    #[serde(flatten)]
    pub caller: Caller,
    pub owner: Option<Owner>,
}

/// A freshly created developer link; `token` is not retrievable later.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedDeveloperLink {
    #[serde(flatten)]
    pub link: DeveloperMagicLink,
    pub token: String,
    pub url: String,
}

fn expiry(now: DateTime<Utc>, ttl: Option<Duration>, field: &str) -> Result<DateTime<Utc>> {
    ttl.and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| HandoverError::Config(format!("{} is out of range", field)))
}

#[derive(Clone)]
pub struct AuthService {
    ctx: Arc<ServiceContext>,
}

impl AuthService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    fn link_url(&self, token: &str) -> String {
        format!("{}/auth/verify?token={}", self.ctx.config.server.public_url.trim_end_matches('/'), token)
    }

    /// Email a sign-in link to a known owner or admin. Unknown addresses are
    /// accepted silently.
    pub async fn request_magic_link(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        let is_admin = self.ctx.admins.is_admin(&email);
        let owner = self.ctx.owners.find_by_email(&email).await?;
        if !is_admin && owner.is_none() {
            tracing::info!(email = %email, "Magic link requested for unknown address");
            return Ok(());
        }

        let ttl = self.ctx.config.auth.magic_link_ttl_minutes;
        let issued = tokens::generate();
        let now = Utc::now();
        let expires_at = expiry(now, Duration::try_minutes(ttl), "auth.magic_link_ttl_minutes")?;
        let link = MagicLink {
            id: Uuid::new_v4(),
            email: email.clone(),
            token_hash: issued.hash,
            expires_at,
            used_at: None,
            created_at: now,
        };
        self.ctx.links.insert(&link).await?;
        tracing::info!(link_id = %link.id, email = %email, "Magic link issued");

        let name = owner.map(|o| o.name).unwrap_or_else(|| "there".to_string());
        let context = json!({
            "name": name,
            "link": self.link_url(&issued.token),
            "expires_minutes": ttl,
        });
        self.ctx.notifier.notify(&[email], &Notification::new("magic_link", context)).await;
        Ok(())
    }

    /// Resolve a bearer token to a caller.
    pub async fn authenticate(&self, token: &str) -> Result<Caller> {
        let token = token.trim();
        if token.is_empty() {
            return Err(HandoverError::Unauthorized);
        }
        let hash = tokens::hash(token);
        let now = Utc::now();

        if let Some(link) = self.ctx.links.find_by_hash(&hash).await? {
            if link.is_expired(now) {
                return Err(HandoverError::Unauthorized);
            }
            if link.used_at.is_none() {
                self.ctx.links.mark_used(link.id, now).await?;
            }
            if self.ctx.admins.is_admin(&link.email) {
                return Ok(Caller::admin(link.email));
            }
            return match self.ctx.owners.find_by_email(&link.email).await? {
                Some(owner) => Ok(Caller::owner(owner.email, owner.id)),
                None => Err(HandoverError::Unauthorized),
            };
        }

        if let Some(link) = self.ctx.links.find_developer_by_hash(&hash).await? {
            if link.is_usable(now) {
                return Ok(Caller::developer(link.email, link.property_id));
            }
        }

        Err(HandoverError::Unauthorized)
    }

    pub async fn verify(&self, token: &str) -> Result<CallerProfile> {
        let caller = self.authenticate(token).await?;
        let owner = match caller.owner_id() {
            Some(id) => self.ctx.owners.find_by_id(id).await?,
            None => None,
        };
        Ok(CallerProfile { caller, owner })
    }

    // ── Developer links ──────────────────────────────────────────────────────

    pub async fn create_developer_link(
        &self,
        caller: &Caller,
        property_id: Uuid,
        email: &str,
    ) -> Result<IssuedDeveloperLink> {
        require_admin(caller)?;
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(HandoverError::Validation(format!("'{}' is not an email address", email)));
        }
        let property = self.ctx.property(property_id).await?;

        let ttl = self.ctx.config.auth.developer_link_ttl_hours;
        let issued = tokens::generate();
        let now = Utc::now();
        let expires_at = expiry(now, Duration::try_hours(ttl), "auth.developer_link_ttl_hours")?;
        let link = DeveloperMagicLink {
            id: Uuid::new_v4(),
            property_id,
            email: email.clone(),
            token_hash: issued.hash,
            expires_at,
            revoked: false,
            created_at: now,
        };
        self.ctx.links.insert_developer(&link).await?;
        tracing::info!(link_id = %link.id, property_id = %property_id, email = %email, "Developer link issued");

        let url = self.link_url(&issued.token);
        let context = with_fields(
            json!({ "property_name": property.name }),
            json!({ "link": url, "expires_hours": ttl }),
        );
        self.ctx.notifier.notify(&[email], &Notification::new("developer_link", context)).await;

        Ok(IssuedDeveloperLink { link, token: issued.token, url })
    }

    pub async fn list_developer_links(
        &self,
        caller: &Caller,
        property_id: Uuid,
    ) -> Result<Vec<DeveloperMagicLink>> {
        require_admin(caller)?;
        self.ctx.property(property_id).await?;
        Ok(self.ctx.links.list_developer_links(property_id).await?)
    }

    pub async fn revoke_developer_link(&self, caller: &Caller, id: Uuid) -> Result<()> {
        require_admin(caller)?;
        if !self.ctx.links.revoke_developer(id).await? {
            return Err(HandoverError::not_found(format!("developer link {}", id)));
        }
        tracing::info!(link_id = %id, "Developer link revoked");
        Ok(())
    }
}
