//! Finance repository: statements of account, proofs of payment,
//! penalties and no-objection certificates.

use crate::database::Database;
use crate::error::Result;
use crate::schema::{FinanceNoc, FinancePenalty, FinancePop, FinanceSoa};
use handover_common::ReviewStatus;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct FinanceRepository {
    db: Arc<Database>,
}

impl FinanceRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    // ── Statements of account ────────────────────────────────────────────────

    pub async fn insert_soa(&self, soa: &FinanceSoa) -> Result<()> {
        sqlx::query(
            "INSERT INTO finance_soas (id, unit_id, total_due_cents, total_paid_cents,
                                       generated_by, pdf_path, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(soa.id)
        .bind(soa.unit_id)
        .bind(soa.total_due_cents)
        .bind(soa.total_paid_cents)
        .bind(&soa.generated_by)
        .bind(&soa.pdf_path)
        .bind(soa.created_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn find_soa(&self, id: Uuid) -> Result<Option<FinanceSoa>> {
        let row = sqlx::query_as::<_, FinanceSoa>("SELECT * FROM finance_soas WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    pub async fn list_soas(&self, unit_id: Uuid) -> Result<Vec<FinanceSoa>> {
        let rows = sqlx::query_as::<_, FinanceSoa>(
            "SELECT * FROM finance_soas WHERE unit_id = ? ORDER BY created_at DESC",
        )
        .bind(unit_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    // ── Proofs of payment ────────────────────────────────────────────────────

    pub async fn insert_pop(&self, pop: &FinancePop) -> Result<()> {
        sqlx::query(
            "INSERT INTO finance_pops (id, unit_id, owner_id, amount_cents, reference,
                                       attachment_id, status, reviewed_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(pop.id)
        .bind(pop.unit_id)
        .bind(pop.owner_id)
        .bind(pop.amount_cents)
        .bind(&pop.reference)
        .bind(pop.attachment_id)
        .bind(pop.status)
        .bind(&pop.reviewed_by)
        .bind(pop.created_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn find_pop(&self, id: Uuid) -> Result<Option<FinancePop>> {
        let row = sqlx::query_as::<_, FinancePop>("SELECT * FROM finance_pops WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    pub async fn list_pops(&self, unit_id: Uuid) -> Result<Vec<FinancePop>> {
        let rows = sqlx::query_as::<_, FinancePop>(
            "SELECT * FROM finance_pops WHERE unit_id = ? ORDER BY created_at DESC",
        )
        .bind(unit_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    /// Review a pending proof of payment. Returns false if it was not pending.
    pub async fn review_pop(&self, id: Uuid, status: ReviewStatus, reviewer: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE finance_pops SET status = ?, reviewed_by = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(status)
        .bind(reviewer)
        .bind(id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Penalties ────────────────────────────────────────────────────────────

    pub async fn insert_penalty(&self, penalty: &FinancePenalty) -> Result<()> {
        sqlx::query(
            "INSERT INTO finance_penalties (id, unit_id, amount_cents, reason, waived, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(penalty.id)
        .bind(penalty.unit_id)
        .bind(penalty.amount_cents)
        .bind(&penalty.reason)
        .bind(penalty.waived)
        .bind(penalty.created_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn find_penalty(&self, id: Uuid) -> Result<Option<FinancePenalty>> {
        let row = sqlx::query_as::<_, FinancePenalty>("SELECT * FROM finance_penalties WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    pub async fn list_penalties(&self, unit_id: Uuid) -> Result<Vec<FinancePenalty>> {
        let rows = sqlx::query_as::<_, FinancePenalty>(
            "SELECT * FROM finance_penalties WHERE unit_id = ? ORDER BY created_at DESC",
        )
        .bind(unit_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    /// Waive a penalty. Returns false if it was already waived.
    pub async fn waive_penalty(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("UPDATE finance_penalties SET waived = 1 WHERE id = ? AND waived = 0")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Sum of unwaived penalties on a unit.
    pub async fn outstanding_penalties(&self, unit_id: Uuid) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM finance_penalties
             WHERE unit_id = ? AND waived = 0",
        )
        .bind(unit_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(total)
    }

    // ── No-objection certificates ────────────────────────────────────────────

    pub async fn insert_noc(&self, noc: &FinanceNoc) -> Result<()> {
        sqlx::query(
            "INSERT INTO finance_nocs (id, unit_id, issued_by, pdf_path, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(noc.id)
        .bind(noc.unit_id)
        .bind(&noc.issued_by)
        .bind(&noc.pdf_path)
        .bind(noc.created_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn find_noc(&self, id: Uuid) -> Result<Option<FinanceNoc>> {
        let row = sqlx::query_as::<_, FinanceNoc>("SELECT * FROM finance_nocs WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    pub async fn list_nocs(&self, unit_id: Uuid) -> Result<Vec<FinanceNoc>> {
        let rows = sqlx::query_as::<_, FinanceNoc>(
            "SELECT * FROM finance_nocs WHERE unit_id = ? ORDER BY created_at DESC",
        )
        .bind(unit_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }
}
