use crate::access::{ensure_manage_unit, ensure_view_unit, require_admin};
use crate::context::ServiceContext;
use handover_common::{Caller, HandoverError, RemarkKind, Result};
use handover_db::{EmailLog, Remark};
use std::sync::Arc;
use uuid::Uuid;

const MAX_REMARK_CHARS: usize = 4000;
const MAX_LOG_ROWS: i64 = 500;

#[derive(Clone)]
pub struct RemarkService {
    ctx: Arc<ServiceContext>,
}

impl RemarkService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Add a free-text note to the unit timeline.
    pub async fn add(&self, caller: &Caller, unit_id: Uuid, body: &str) -> Result<Remark> {
        let (unit, owners) = self.ctx.unit_with_owners(unit_id).await?;
        ensure_manage_unit(caller, &unit, &owners)?;

        let body = body.trim();
        if body.is_empty() {
            return Err(HandoverError::Validation("remark must not be empty".to_string()));
        }
        if body.chars().count() > MAX_REMARK_CHARS {
            return Err(HandoverError::Validation(format!(
                "remark is longer than {} characters",
                MAX_REMARK_CHARS
            )));
        }
        self.ctx.remark(unit_id, &caller.email, RemarkKind::Note, body).await
    }

    pub async fn list(&self, caller: &Caller, unit_id: Uuid) -> Result<Vec<Remark>> {
        let (unit, owners) = self.ctx.unit_with_owners(unit_id).await?;
        ensure_view_unit(caller, &unit, &owners)?;
        Ok(self.ctx.remarks.list_for_unit(unit_id).await?)
    }

    /// Outbound email log, newest first.
    pub async fn email_logs(
        &self,
        caller: &Caller,
        unit_id: Option<Uuid>,
        limit: Option<i64>,
    ) -> Result<Vec<EmailLog>> {
        require_admin(caller)?;
        let limit = limit.unwrap_or(100).clamp(1, MAX_LOG_ROWS);
        Ok(self.ctx.email_logs.list(unit_id, limit).await?)
    }
}
