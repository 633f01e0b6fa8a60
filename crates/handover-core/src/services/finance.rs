//! Statements of account, proofs of payment, penalties and NOCs.

use crate::access::{ensure_manage_unit, ensure_view_unit, require_admin};
use crate::context::{with_fields, ServiceContext};
use crate::eligibility::SyncState;
use crate::services::ownership::OwnershipService;
use chrono::Utc;
use handover_common::{Caller, HandoverError, PaymentStatus, RemarkKind, Result, ReviewStatus};
use handover_db::{FinanceNoc, FinancePenalty, FinancePop, FinanceSoa};
use handover_notify::{format_money, pdf, EmailAttachment, Notification};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct NewSoa {
    pub total_due_cents: i64,
    pub total_paid_cents: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPop {
    pub amount_cents: i64,
    pub reference: String,
    pub attachment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPenalty {
    pub amount_cents: i64,
    pub reason: String,
}

/// Finance overview of a unit.
#[derive(Debug, Clone, Serialize)]
pub struct FinanceSummary {
    pub currency: String,
    pub soas: Vec<FinanceSoa>,
    pub pops: Vec<FinancePop>,
    pub penalties: Vec<FinancePenalty>,
    pub nocs: Vec<FinanceNoc>,
    pub outstanding_penalties_cents: i64,
}

/// A reviewed proof of payment and the payment status it moved the unit to.
#[derive(Debug, Clone, Serialize)]
pub struct PopReviewOutcome {
    #[serde(flatten)]
    pub pop: FinancePop,
    /// `None` when the review left the payment status unchanged.
    pub payment_status: Option<PaymentStatus>,
}

#[derive(Clone)]
pub struct FinanceService {
    ctx: Arc<ServiceContext>,
    ownership: OwnershipService,
}

impl FinanceService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ownership: OwnershipService::new(ctx.clone()), ctx }
    }

    fn currency(&self) -> &str {
        &self.ctx.config.finance.currency
    }

    async fn check_view(&self, caller: &Caller, unit_id: Uuid) -> Result<()> {
        let (unit, owners) = self.ctx.unit_with_owners(unit_id).await?;
        ensure_view_unit(caller, &unit, &owners)
    }

    pub async fn summary(&self, caller: &Caller, unit_id: Uuid) -> Result<FinanceSummary> {
        self.check_view(caller, unit_id).await?;
        Ok(FinanceSummary {
            currency: self.currency().to_string(),
            soas: self.ctx.finance.list_soas(unit_id).await?,
            pops: self.ctx.finance.list_pops(unit_id).await?,
            penalties: self.ctx.finance.list_penalties(unit_id).await?,
            nocs: self.ctx.finance.list_nocs(unit_id).await?,
            outstanding_penalties_cents: self.ctx.finance.outstanding_penalties(unit_id).await?,
        })
    }

    // ── Statements of account ────────────────────────────────────────────────

    pub async fn generate_soa(&self, caller: &Caller, unit_id: Uuid, input: NewSoa) -> Result<FinanceSoa> {
        require_admin(caller)?;
        if input.total_due_cents < 0 || input.total_paid_cents < 0 {
            return Err(HandoverError::Validation("amounts must not be negative".to_string()));
        }
        let (unit, owners) = self.ctx.unit_with_owners(unit_id).await?;
        let property = self.ctx.property(unit.property_id).await?;
        let penalties = self.ctx.finance.list_penalties(unit_id).await?;

        let mut soa = FinanceSoa {
            id: Uuid::new_v4(),
            unit_id,
            total_due_cents: input.total_due_cents,
            total_paid_cents: input.total_paid_cents,
            generated_by: caller.email.clone(),
            pdf_path: String::new(),
            created_at: Utc::now(),
        };
        let bytes = pdf::statement_of_account(&property, &unit, &soa, &penalties, self.currency())?;
        soa.pdf_path = self.ctx.files.save_pdf("soa", soa.id, &bytes).await?;
        self.ctx.finance.insert_soa(&soa).await?;
        tracing::info!(soa_id = %soa.id, unit_id = %unit_id, balance = soa.balance_cents(), "Statement of account issued");

        self.ctx
            .remark(
                unit_id,
                &caller.email,
                RemarkKind::Finance,
                format!("Statement of account issued, balance {}", format_money(soa.balance_cents(), self.currency())),
            )
            .await?;

        let context = with_fields(
            ServiceContext::unit_context(&property, &unit),
            json!({
                "total_due": format_money(soa.total_due_cents, self.currency()),
                "total_paid": format_money(soa.total_paid_cents, self.currency()),
                "balance": format_money(soa.balance_cents(), self.currency()),
            }),
        );
        let notification = Notification::new("soa_issued", context)
            .for_unit(unit_id)
            .attach(EmailAttachment::pdf(format!("soa-{}.pdf", unit.unit_number), bytes));
        self.ctx.notify_owners(&owners, notification).await;

        Ok(soa)
    }

    pub async fn list_soas(&self, caller: &Caller, unit_id: Uuid) -> Result<Vec<FinanceSoa>> {
        self.check_view(caller, unit_id).await?;
        Ok(self.ctx.finance.list_soas(unit_id).await?)
    }

    pub async fn soa_pdf(&self, caller: &Caller, id: Uuid) -> Result<(FinanceSoa, Vec<u8>)> {
        let soa = self
            .ctx
            .finance
            .find_soa(id)
            .await?
            .ok_or_else(|| HandoverError::not_found(format!("statement {}", id)))?;
        self.check_view(caller, soa.unit_id).await?;
        let bytes = self.ctx.files.read(&soa.pdf_path).await?;
        Ok((soa, bytes))
    }

    // ── Proofs of payment ────────────────────────────────────────────────────

    pub async fn submit_pop(&self, caller: &Caller, unit_id: Uuid, input: NewPop) -> Result<FinancePop> {
        let (unit, owners) = self.ctx.unit_with_owners(unit_id).await?;
        ensure_manage_unit(caller, &unit, &owners)?;
        if input.amount_cents <= 0 {
            return Err(HandoverError::Validation("amount must be positive".to_string()));
        }
        let reference = input.reference.trim();
        if reference.is_empty() {
            return Err(HandoverError::Validation("reference is required".to_string()));
        }
        if let Some(attachment_id) = input.attachment_id {
            let attachment = self.ctx.attachments.find_by_id(attachment_id).await?;
            if attachment.map(|a| a.unit_id) != Some(unit_id) {
                return Err(HandoverError::Validation(
                    "attachment does not belong to this unit".to_string(),
                ));
            }
        }

        let pop = FinancePop {
            id: Uuid::new_v4(),
            unit_id,
            owner_id: caller.owner_id(),
            amount_cents: input.amount_cents,
            reference: reference.to_string(),
            attachment_id: input.attachment_id,
            status: ReviewStatus::Pending,
            reviewed_by: None,
            created_at: Utc::now(),
        };
        self.ctx.finance.insert_pop(&pop).await?;
        tracing::info!(pop_id = %pop.id, unit_id = %unit_id, amount = pop.amount_cents, "Proof of payment submitted");

        self.ctx
            .remark(
                unit_id,
                &caller.email,
                RemarkKind::Finance,
                format!(
                    "Proof of payment {} submitted for {}",
                    pop.reference,
                    format_money(pop.amount_cents, self.currency())
                ),
            )
            .await?;
        Ok(pop)
    }

    /// Approve or reject a proof of payment. An approval moves the unit's
    /// payment to `cleared` when `mark_cleared` is set, otherwise from
    /// `pending` to `partial`.
    pub async fn review_pop(
        &self,
        caller: &Caller,
        id: Uuid,
        approve: bool,
        mark_cleared: bool,
    ) -> Result<PopReviewOutcome> {
        require_admin(caller)?;
        let pop = self
            .ctx
            .finance
            .find_pop(id)
            .await?
            .ok_or_else(|| HandoverError::not_found(format!("proof of payment {}", id)))?;

        let status = if approve { ReviewStatus::Approved } else { ReviewStatus::Rejected };
        if !self.ctx.finance.review_pop(id, status, &caller.email).await? {
            return Err(HandoverError::Conflict(format!("proof of payment is already {}", pop.status)));
        }
        self.ctx
            .remark(
                pop.unit_id,
                &caller.email,
                RemarkKind::Finance,
                format!("Proof of payment {} {}", pop.reference, status),
            )
            .await?;

        let mut payment_status = None;
        if approve {
            let owners = self.ctx.units.owners(pop.unit_id).await?;
            let current = SyncState::of(&owners).effective().map(|(payment, _)| payment);
            let next = match current {
                Some(PaymentStatus::Cleared) => None,
                Some(_) if mark_cleared => Some(PaymentStatus::Cleared),
                Some(PaymentStatus::Pending) => Some(PaymentStatus::Partial),
                _ => None,
            };
            if let Some(next) = next {
                self.ownership.write_payment(&caller.email, pop.unit_id, next).await?;
                payment_status = Some(next);
            }
        }

        let pop = self
            .ctx
            .finance
            .find_pop(id)
            .await?
            .ok_or_else(|| HandoverError::not_found(format!("proof of payment {}", id)))?;
        Ok(PopReviewOutcome { pop, payment_status })
    }

    // ── Penalties ────────────────────────────────────────────────────────────

    pub async fn add_penalty(&self, caller: &Caller, unit_id: Uuid, input: NewPenalty) -> Result<FinancePenalty> {
        require_admin(caller)?;
        if input.amount_cents <= 0 {
            return Err(HandoverError::Validation("amount must be positive".to_string()));
        }
        let reason = input.reason.trim();
        if reason.is_empty() {
            return Err(HandoverError::Validation("reason is required".to_string()));
        }
        let (unit, owners) = self.ctx.unit_with_owners(unit_id).await?;

        let penalty = FinancePenalty {
            id: Uuid::new_v4(),
            unit_id,
            amount_cents: input.amount_cents,
            reason: reason.to_string(),
            waived: false,
            created_at: Utc::now(),
        };
        self.ctx.finance.insert_penalty(&penalty).await?;
        let amount = format_money(penalty.amount_cents, self.currency());
        tracing::info!(penalty_id = %penalty.id, unit_id = %unit_id, amount = penalty.amount_cents, "Penalty added");

        self.ctx
            .remark(unit_id, &caller.email, RemarkKind::Finance, format!("Penalty {}: {}", amount, penalty.reason))
            .await?;

        let property = self.ctx.property(unit.property_id).await?;
        let context = with_fields(
            ServiceContext::unit_context(&property, &unit),
            json!({ "amount": amount, "reason": penalty.reason }),
        );
        self.ctx
            .notify_owners(&owners, Notification::new("penalty_added", context).for_unit(unit_id))
            .await;
        Ok(penalty)
    }

    pub async fn waive_penalty(&self, caller: &Caller, id: Uuid) -> Result<FinancePenalty> {
        require_admin(caller)?;
        let penalty = self
            .ctx
            .finance
            .find_penalty(id)
            .await?
            .ok_or_else(|| HandoverError::not_found(format!("penalty {}", id)))?;
        if !self.ctx.finance.waive_penalty(id).await? {
            return Err(HandoverError::Conflict("penalty is already waived".to_string()));
        }
        self.ctx
            .remark(
                penalty.unit_id,
                &caller.email,
                RemarkKind::Finance,
                format!(
                    "Penalty {} waived: {}",
                    format_money(penalty.amount_cents, self.currency()),
                    penalty.reason
                ),
            )
            .await?;
        Ok(FinancePenalty { waived: true, ..penalty })
    }

    pub async fn list_penalties(&self, caller: &Caller, unit_id: Uuid) -> Result<Vec<FinancePenalty>> {
        self.check_view(caller, unit_id).await?;
        Ok(self.ctx.finance.list_penalties(unit_id).await?)
    }

    pub async fn outstanding_penalties(&self, caller: &Caller, unit_id: Uuid) -> Result<i64> {
        self.check_view(caller, unit_id).await?;
        Ok(self.ctx.finance.outstanding_penalties(unit_id).await?)
    }

    // ── No-objection certificates ────────────────────────────────────────────

    /// Issue an NOC. Every co-owner must be cleared and no penalty may be
    /// outstanding.
    pub async fn issue_noc(&self, caller: &Caller, unit_id: Uuid) -> Result<FinanceNoc> {
        require_admin(caller)?;
        let (unit, owners) = self.ctx.unit_with_owners(unit_id).await?;
        if owners.is_empty() {
            return Err(HandoverError::Conflict("unit has no owners".to_string()));
        }
        if owners.iter().any(|o| o.payment_status != PaymentStatus::Cleared) {
            return Err(HandoverError::Conflict("payment is not cleared for every owner".to_string()));
        }
        let outstanding = self.ctx.finance.outstanding_penalties(unit_id).await?;
        if outstanding > 0 {
            return Err(HandoverError::Conflict(format!(
                "{} in penalties is outstanding",
                format_money(outstanding, self.currency())
            )));
        }

        let property = self.ctx.property(unit.property_id).await?;
        let mut noc = FinanceNoc {
            id: Uuid::new_v4(),
            unit_id,
            issued_by: caller.email.clone(),
            pdf_path: String::new(),
            created_at: Utc::now(),
        };
        let bytes = pdf::noc(&property, &unit, &owners, &noc)?;
        noc.pdf_path = self.ctx.files.save_pdf("noc", noc.id, &bytes).await?;
        self.ctx.finance.insert_noc(&noc).await?;
        tracing::info!(noc_id = %noc.id, unit_id = %unit_id, "NOC issued");

        self.ctx
            .remark(unit_id, &caller.email, RemarkKind::Finance, "No-objection certificate issued")
            .await?;

        let context = with_fields(
            ServiceContext::unit_context(&property, &unit),
            json!({ "issued_at": noc.created_at.format("%d %B %Y").to_string() }),
        );
        let notification = Notification::new("noc_issued", context)
            .for_unit(unit_id)
            .attach(EmailAttachment::pdf(format!("noc-{}.pdf", unit.unit_number), bytes));
        self.ctx.notify_owners(&owners, notification).await;

        Ok(noc)
    }

    pub async fn noc_pdf(&self, caller: &Caller, id: Uuid) -> Result<(FinanceNoc, Vec<u8>)> {
        let noc = self
            .ctx
            .finance
            .find_noc(id)
            .await?
            .ok_or_else(|| HandoverError::not_found(format!("certificate {}", id)))?;
        self.check_view(caller, noc.unit_id).await?;
        let bytes = self.ctx.files.read(&noc.pdf_path).await?;
        Ok((noc, bytes))
    }
}
