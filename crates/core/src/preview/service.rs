use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::{IssuePreviewLink, PreviewLink, PreviewOutcome};
use super::token::{generate_token, hash_password, verify_password};
use crate::content::validate::{normalize_text, validate_expiry, validate_preview_secrets};
use crate::content::ContentRef;
use crate::error::{CoreError, CoreResult};
use crate::events::{ContentEvent, EventBus};
use crate::store::{ContentRepository, PreviewLinkRepository};

/// Issues and resolves preview links.
///
/// Link states: active until `expires_at` passes or the link is deactivated.
/// Both exits are terminal and resolve as [`PreviewOutcome::Expired`].
#[derive(Clone)]
pub struct PreviewLinkIssuer {
    links: Arc<dyn PreviewLinkRepository>,
    content: Arc<dyn ContentRepository>,
    events: EventBus,
}

impl PreviewLinkIssuer {
    pub fn new(
        links: Arc<dyn PreviewLinkRepository>,
        content: Arc<dyn ContentRepository>,
        events: EventBus,
    ) -> Self {
        Self {
            links,
            content,
            events,
        }
    }

    pub async fn issue(&self, request: IssuePreviewLink) -> CoreResult<PreviewLink> {
        self.issue_at(request, Utc::now()).await
    }

    /// Mint a link for `request.content`. The expiry must be strictly after
    /// `now` and the content must exist.
    pub async fn issue_at(
        &self,
        request: IssuePreviewLink,
        now: DateTime<Utc>,
    ) -> CoreResult<PreviewLink> {
        let issuer = request.issuer_id.ok_or(CoreError::Authorship)?;
        // Whitespace-only means no password; anything else is hashed verbatim.
        let password = request.password.filter(|p| !p.trim().is_empty());
        let message = normalize_text(request.message);

        validate_expiry(request.expires_at, now)?;
        validate_preview_secrets(password.as_deref(), message.as_deref())?;

        if self.content.find_entry(request.content).await?.is_none() {
            return Err(CoreError::not_found(format!("content {}", request.content)));
        }

        let password_hash = password.as_deref().map(hash_password).transpose()?;

        let link = PreviewLink {
            id: Uuid::now_v7(),
            content: request.content,
            token: generate_token(),
            password_hash,
            message,
            expires_at: request.expires_at,
            is_active: true,
            view_count: 0,
            created_by: issuer,
            created_at: now,
            updated_at: now,
        };
        self.links.insert_link(&link).await?;

        tracing::info!(
            link_id = %link.id,
            content = %link.content,
            expires_at = %link.expires_at,
            password_protected = link.requires_password(),
            "preview link issued"
        );
        self.events.emit(ContentEvent::PreviewLinkIssued {
            content: link.content,
            link_id: link.id,
        });

        Ok(link)
    }

    pub async fn resolve(&self, token: &str, password: Option<&str>) -> CoreResult<PreviewOutcome> {
        self.resolve_at(token, password, Utc::now()).await
    }

    /// Look up a token and, on success, count the view.
    ///
    /// The counter moves only when content is returned.
    pub async fn resolve_at(
        &self,
        token: &str,
        password: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<PreviewOutcome> {
        let Some(mut link) = self.links.find_by_token(token).await? else {
            return Ok(PreviewOutcome::NotFound);
        };

        if !link.is_usable_at(now) {
            tracing::debug!(link_id = %link.id, state = ?link.state_at(now), "preview link refused");
            return Ok(PreviewOutcome::Expired);
        }

        if let Some(hash) = link.password_hash.as_deref() {
            let supplied = password.filter(|p| !p.is_empty());
            let accepted = match supplied {
                Some(candidate) => verify_password(candidate, hash)?,
                None => false,
            };
            if !accepted {
                return Ok(PreviewOutcome::PasswordRequired);
            }
        }

        let Some(entry) = self.content.find_entry(link.content).await? else {
            tracing::warn!(link_id = %link.id, content = %link.content, "preview target no longer exists");
            return Ok(PreviewOutcome::NotFound);
        };

        match self.links.record_view(link.id).await? {
            Some(count) => link.view_count = count,
            None => return Ok(PreviewOutcome::NotFound),
        }

        Ok(PreviewOutcome::Content { link, entry })
    }

    pub async fn list_links(&self, content: ContentRef) -> CoreResult<Vec<PreviewLink>> {
        self.links.list_links(content).await
    }

    pub async fn find_link(&self, id: Uuid) -> CoreResult<Option<PreviewLink>> {
        self.links.find_link(id).await
    }

    /// Flip the kill switch. There is no way back.
    pub async fn deactivate(&self, id: Uuid) -> CoreResult<PreviewLink> {
        if !self.links.deactivate_link(id).await? {
            return Err(CoreError::not_found(format!("preview link {id}")));
        }
        tracing::info!(link_id = %id, "preview link deactivated");
        self.links
            .find_link(id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("preview link {id}")))
    }

    /// Physically delete a link.
    pub async fn revoke(&self, id: Uuid) -> CoreResult<()> {
        if !self.links.delete_link(id).await? {
            return Err(CoreError::not_found(format!("preview link {id}")));
        }
        tracing::info!(link_id = %id, "preview link revoked");
        self.events.emit(ContentEvent::PreviewLinkRevoked { link_id: id });
        Ok(())
    }
}
