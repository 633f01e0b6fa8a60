//! Handover document uploads and review.

use crate::access::{ensure_manage_unit, ensure_view_unit, require_admin};
use crate::context::ServiceContext;
use crate::eligibility::SyncState;
use crate::services::ownership::OwnershipService;
use chrono::Utc;
use handover_common::{Caller, DocumentsStatus, HandoverError, RemarkKind, Result, ReviewStatus};
use handover_db::Attachment;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

/// An uploaded file, as received from the transport layer.
#[derive(Debug, Clone)]
pub struct Upload {
    pub document_type: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

fn document_type_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_]{0,63}$").unwrap())
}

#[derive(Clone)]
pub struct DocumentService {
    ctx: Arc<ServiceContext>,
    ownership: OwnershipService,
}

impl DocumentService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ownership: OwnershipService::new(ctx.clone()), ctx }
    }

    async fn attachment(&self, id: Uuid) -> Result<Attachment> {
        self.ctx
            .attachments
            .find_by_id(id)
            .await?
            .ok_or_else(|| HandoverError::not_found(format!("attachment {}", id)))
    }

    fn validate(&self, upload: &Upload) -> Result<String> {
        let storage = &self.ctx.config.storage;
        if upload.bytes.is_empty() {
            return Err(HandoverError::Validation("file is empty".to_string()));
        }
        if upload.bytes.len() > storage.max_upload_bytes {
            return Err(HandoverError::Validation(format!(
                "file is larger than {} bytes",
                storage.max_upload_bytes
            )));
        }
        let content_type = upload.content_type.trim().to_ascii_lowercase();
        if !storage.allowed_content_types.iter().any(|t| t.eq_ignore_ascii_case(&content_type)) {
            return Err(HandoverError::Validation(format!(
                "content type '{}' is not accepted",
                upload.content_type
            )));
        }
        let document_type = upload.document_type.trim().to_ascii_lowercase();
        if document_type.is_empty() {
            return Err(HandoverError::Validation("document_type is required".to_string()));
        }
        if !document_type_regex().is_match(&document_type) {
            return Err(HandoverError::Validation(format!(
                "document_type '{}' must be a lowercase key like sale_agreement",
                upload.document_type.trim()
            )));
        }
        Ok(document_type)
    }

    /// Store an upload. A unit waiting on documents moves to `submitted`.
    pub async fn upload(&self, caller: &Caller, unit_id: Uuid, upload: Upload) -> Result<Attachment> {
        let (unit, owners) = self.ctx.unit_with_owners(unit_id).await?;
        ensure_manage_unit(caller, &unit, &owners)?;
        let document_type = self.validate(&upload)?;

        let stored_path = self.ctx.files.save_upload(unit_id, &upload.file_name, &upload.bytes).await?;
        let attachment = Attachment {
            id: Uuid::new_v4(),
            unit_id,
            owner_id: caller.owner_id(),
            document_type,
            file_name: handover_db::files::sanitize_file_name(&upload.file_name),
            stored_path,
            content_type: upload.content_type.trim().to_ascii_lowercase(),
            size_bytes: upload.bytes.len() as i64,
            review_status: ReviewStatus::Pending,
            reviewed_by: None,
            created_at: Utc::now(),
        };
        if let Err(e) = self.ctx.attachments.insert(&attachment).await {
            // don't leave an orphaned file behind
            let _ = self.ctx.files.remove(&attachment.stored_path).await;
            return Err(e.into());
        }
        tracing::info!(
            attachment_id = %attachment.id,
            unit_id = %unit_id,
            document_type = %attachment.document_type,
            size = attachment.size_bytes,
            "Document uploaded"
        );

        self.ctx
            .remark(
                unit_id,
                &caller.email,
                RemarkKind::Documents,
                format!("Uploaded {} ({})", attachment.document_type, attachment.file_name),
            )
            .await?;

        let waiting = SyncState::of(&owners)
            .effective()
            .map(|(_, documents)| documents.awaits_upload())
            .unwrap_or(false);
        if waiting {
            self.ownership
                .write_documents(&caller.email, unit_id, DocumentsStatus::Submitted, None, false)
                .await?;
        }

        Ok(attachment)
    }

    pub async fn list(&self, caller: &Caller, unit_id: Uuid) -> Result<Vec<Attachment>> {
        let (unit, owners) = self.ctx.unit_with_owners(unit_id).await?;
        ensure_view_unit(caller, &unit, &owners)?;
        Ok(self.ctx.attachments.list_for_unit(unit_id).await?)
    }

    pub async fn download(&self, caller: &Caller, id: Uuid) -> Result<(Attachment, Vec<u8>)> {
        let attachment = self.attachment(id).await?;
        let (unit, owners) = self.ctx.unit_with_owners(attachment.unit_id).await?;
        ensure_view_unit(caller, &unit, &owners)?;
        let bytes = self.ctx.files.read(&attachment.stored_path).await?;
        Ok((attachment, bytes))
    }

    /// Approve or reject a document. Documents become `approved` for all
    /// co-owners once every required type has an approved upload; any
    /// rejection sets `rejected`.
    pub async fn review(
        &self,
        caller: &Caller,
        id: Uuid,
        approve: bool,
        note: Option<String>,
    ) -> Result<Attachment> {
        require_admin(caller)?;
        let attachment = self.attachment(id).await?;
        let status = if approve { ReviewStatus::Approved } else { ReviewStatus::Rejected };
        self.ctx.attachments.set_review(id, status, &caller.email).await?;

        self.ctx
            .remark(
                attachment.unit_id,
                &caller.email,
                RemarkKind::Documents,
                format!("{} {}", attachment.document_type, status),
            )
            .await?;

        // unowned units have no shared state to move yet
        if self.ctx.units.owners(attachment.unit_id).await?.is_empty() {
            return self.attachment(id).await;
        }

        if approve {
            let approved = self.ctx.attachments.approved_types(attachment.unit_id).await?;
            let missing: Vec<&String> = self
                .ctx
                .config
                .documents
                .required_types
                .iter()
                .filter(|t| !approved.iter().any(|a| a.eq_ignore_ascii_case(t)))
                .collect();
            if missing.is_empty() {
                self.ownership
                    .write_documents(&caller.email, attachment.unit_id, DocumentsStatus::Approved, note, true)
                    .await?;
            } else {
                tracing::debug!(unit_id = %attachment.unit_id, missing = missing.len(), "Documents still outstanding");
            }
        } else {
            let note = note.or_else(|| Some(format!("{} was rejected", attachment.document_type)));
            self.ownership
                .write_documents(&caller.email, attachment.unit_id, DocumentsStatus::Rejected, note, true)
                .await?;
        }

        self.attachment(id).await
    }

    pub async fn delete(&self, caller: &Caller, id: Uuid) -> Result<()> {
        require_admin(caller)?;
        let attachment = self.attachment(id).await?;
        self.ctx.attachments.delete(id).await?;
        self.ctx.files.remove(&attachment.stored_path).await?;
        self.ctx
            .remark(
                attachment.unit_id,
                &caller.email,
                RemarkKind::Documents,
                format!("Removed {} ({})", attachment.document_type, attachment.file_name),
            )
            .await?;
        tracing::info!(attachment_id = %id, "Document deleted");
        Ok(())
    }
}
