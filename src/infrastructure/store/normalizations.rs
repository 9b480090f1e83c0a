//! Tag normalization rows

use crate::domain::{
    NormalizationId, NormalizationSource, ReviewStatus, TagId, TagNormalization,
};
use crate::error::{Result, TaxonError};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const NORMALIZATION_COLUMNS: &str = "id, original_name, normalized_name, description, \
     parent_candidate_ids, review_status, source, confidence_score, auto_approved, \
     approved_tag_id, reviewed_by, reviewed_at, admin_notes, created_at, updated_at";

fn normalization_from_row(row: &Row<'_>) -> rusqlite::Result<TagNormalization> {
    let parents_json: String = row.get(4)?;
    let parent_candidate_ids = serde_json::from_str(&parents_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(TagNormalization {
        id: row.get(0)?,
        original_name: row.get(1)?,
        normalized_name: row.get(2)?,
        description: row.get(3)?,
        parent_candidate_ids,
        review_status: row.get(5)?,
        source: row.get(6)?,
        confidence_score: row.get(7)?,
        auto_approved: row.get(8)?,
        approved_tag_id: row.get(9)?,
        reviewed_by: row.get(10)?,
        reviewed_at: row.get(11)?,
        admin_notes: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

/// Validated fields for a new pending row
#[derive(Debug, Clone, PartialEq)]
pub struct NewNormalization {
    pub original_name: String,
    /// Case-folded original, used to find an earlier pending submission
    pub original_key: String,
    pub normalized_name: String,
    pub description: Option<String>,
    pub parent_candidate_ids: Vec<TagId>,
    pub source: NormalizationSource,
    pub confidence_score: f64,
}

/// Normalization row access
pub trait NormalizationRows {
    fn insert_normalization(&self, new: &NewNormalization) -> Result<TagNormalization>;

    fn get_normalization(&self, id: NormalizationId) -> Result<Option<TagNormalization>>;

    fn require_normalization(&self, id: NormalizationId) -> Result<TagNormalization>;

    /// Oldest pending row for a case-folded original name
    fn find_pending_by_original_key(&self, key: &str) -> Result<Option<TagNormalization>>;

    /// All rows, optionally filtered by status, oldest first
    fn list_normalizations(&self, status: Option<ReviewStatus>) -> Result<Vec<TagNormalization>>;

    fn mark_approved(
        &self,
        id: NormalizationId,
        tag: TagId,
        reviewer: &str,
        auto_approved: bool,
        at: DateTime<Utc>,
    ) -> Result<()>;

    fn mark_rejected(
        &self,
        id: NormalizationId,
        reviewer: &str,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()>;

    fn set_admin_notes(&self, id: NormalizationId, notes: Option<&str>) -> Result<()>;

    /// Point every normalization resolved to `from` at `to` instead
    fn redirect_approved_tag(&self, from: TagId, to: TagId) -> Result<usize>;

    fn clear_approved_tag(&self, tag: TagId) -> Result<usize>;
}

impl NormalizationRows for Connection {
    fn insert_normalization(&self, new: &NewNormalization) -> Result<TagNormalization> {
        let now = Utc::now();
        let parents_json = serde_json::to_string(&new.parent_candidate_ids)?;
        self.execute(
            "INSERT INTO tag_normalizations (original_name, original_key, normalized_name,
                 description, parent_candidate_ids, review_status, source, confidence_score,
                 auto_approved, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?9)",
            params![
                new.original_name,
                new.original_key,
                new.normalized_name,
                new.description,
                parents_json,
                ReviewStatus::Pending,
                new.source,
                new.confidence_score,
                now,
            ],
        )?;
        self.require_normalization(NormalizationId(self.last_insert_rowid()))
    }

    fn get_normalization(&self, id: NormalizationId) -> Result<Option<TagNormalization>> {
        let sql = format!(
            "SELECT {} FROM tag_normalizations WHERE id = ?1",
            NORMALIZATION_COLUMNS
        );
        Ok(self
            .query_row(&sql, [id], normalization_from_row)
            .optional()?)
    }

    fn require_normalization(&self, id: NormalizationId) -> Result<TagNormalization> {
        self.get_normalization(id)?
            .ok_or_else(|| TaxonError::normalization_not_found(id))
    }

    fn find_pending_by_original_key(&self, key: &str) -> Result<Option<TagNormalization>> {
        let sql = format!(
            "SELECT {} FROM tag_normalizations
             WHERE original_key = ?1 AND review_status = ?2
             ORDER BY id LIMIT 1",
            NORMALIZATION_COLUMNS
        );
        Ok(self
            .query_row(
                &sql,
                params![key, ReviewStatus::Pending],
                normalization_from_row,
            )
            .optional()?)
    }

    fn list_normalizations(&self, status: Option<ReviewStatus>) -> Result<Vec<TagNormalization>> {
        let rows = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {} FROM tag_normalizations WHERE review_status = ?1 ORDER BY id",
                    NORMALIZATION_COLUMNS
                );
                let mut stmt = self.prepare(&sql)?;
                let rows = stmt
                    .query_map([status], normalization_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM tag_normalizations ORDER BY id",
                    NORMALIZATION_COLUMNS
                );
                let mut stmt = self.prepare(&sql)?;
                let rows = stmt
                    .query_map([], normalization_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        Ok(rows)
    }

    fn mark_approved(
        &self,
        id: NormalizationId,
        tag: TagId,
        reviewer: &str,
        auto_approved: bool,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let updated = self.execute(
            "UPDATE tag_normalizations
             SET review_status = ?1, approved_tag_id = ?2, reviewed_by = ?3,
                 auto_approved = ?4, reviewed_at = ?5, updated_at = ?5
             WHERE id = ?6",
            params![ReviewStatus::Approved, tag, reviewer, auto_approved, at, id],
        )?;
        if updated == 0 {
            return Err(TaxonError::normalization_not_found(id));
        }
        Ok(())
    }

    fn mark_rejected(
        &self,
        id: NormalizationId,
        reviewer: &str,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let updated = self.execute(
            "UPDATE tag_normalizations
             SET review_status = ?1, reviewed_by = ?2, admin_notes = ?3,
                 reviewed_at = ?4, updated_at = ?4
             WHERE id = ?5",
            params![ReviewStatus::Rejected, reviewer, notes, at, id],
        )?;
        if updated == 0 {
            return Err(TaxonError::normalization_not_found(id));
        }
        Ok(())
    }

    fn set_admin_notes(&self, id: NormalizationId, notes: Option<&str>) -> Result<()> {
        let updated = self.execute(
            "UPDATE tag_normalizations SET admin_notes = ?1, updated_at = ?2 WHERE id = ?3",
            params![notes, Utc::now(), id],
        )?;
        if updated == 0 {
            return Err(TaxonError::normalization_not_found(id));
        }
        Ok(())
    }

    fn redirect_approved_tag(&self, from: TagId, to: TagId) -> Result<usize> {
        Ok(self.execute(
            "UPDATE tag_normalizations SET approved_tag_id = ?1, updated_at = ?2
             WHERE approved_tag_id = ?3",
            params![to, Utc::now(), from],
        )?)
    }

    fn clear_approved_tag(&self, tag: TagId) -> Result<usize> {
        Ok(self.execute(
            "UPDATE tag_normalizations SET approved_tag_id = NULL, updated_at = ?1
             WHERE approved_tag_id = ?2",
            params![Utc::now(), tag],
        )?)
    }
}
