//! Normalization review workflow
//!
//! A submission starts `pending` and ends either `approved` (resolved to a
//! canonical tag) or `rejected`. Approval is idempotent; crossing from one
//! terminal state to the other is a validation error.

use crate::application::cache::NameCache;
use crate::application::hierarchy::add_edge_in;
use crate::application::registry::{resolve_or_create_in, NewTagOptions, Registry};
use crate::domain::normalizer::{name_key, normalize, validate_name};
use crate::domain::{
    NormalizationId, NormalizationSubmission, RelationshipType, ReviewStatus, Tag, TagId, TagType,
    TagNormalization,
};
use crate::error::{Result, TaxonError};
use crate::infrastructure::config::ReviewConfig;
use crate::infrastructure::{ContentIndex, NewNormalization, NormalizationRows, SqliteStore, TagRows};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fields for a brand-new tag chosen by the reviewer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTagFields {
    pub name: String,
    pub tag_type: Option<TagType>,
    pub description: Option<String>,
    pub is_featured: bool,
    pub is_private: bool,
}

/// Which tag an approval resolves to
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ApprovalTarget {
    /// The record's own normalized name, created if missing
    #[default]
    Candidate,
    Existing(TagId),
    New(NewTagFields),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkFailure {
    pub id: NormalizationId,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkReport {
    pub succeeded: Vec<TagNormalization>,
    pub failed: Vec<BulkFailure>,
}

/// State change made by one approval transaction
struct Approval {
    record: TagNormalization,
    /// Resolved tag, when this call moved the record out of `pending`
    tag: Option<Tag>,
}

#[derive(Debug, Clone)]
pub struct ReviewWorkflow {
    store: Arc<SqliteStore>,
    cache: Arc<NameCache>,
    registry: Registry,
    config: ReviewConfig,
}

impl ReviewWorkflow {
    pub fn new(
        store: Arc<SqliteStore>,
        cache: Arc<NameCache>,
        registry: Registry,
        config: ReviewConfig,
    ) -> Self {
        ReviewWorkflow {
            store,
            cache,
            registry,
            config,
        }
    }

    /// Record a suggestion as pending.
    ///
    /// Returns the existing record when a pending one with the same
    /// case-folded original name is already queued. A confident suggestion
    /// that matches an existing tag is approved on the spot.
    pub fn submit(&self, submission: NormalizationSubmission) -> Result<TagNormalization> {
        validate_name(&submission.original_name)?;
        if let Some(normalized) = &submission.normalized_name {
            validate_name(normalized)?;
        }
        let confidence = submission.confidence_score;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(TaxonError::Validation(format!(
                "Confidence score must be between 0 and 1, got {}",
                confidence
            )));
        }

        let normalized_name = normalize(
            submission
                .normalized_name
                .as_deref()
                .unwrap_or(&submission.original_name),
        );
        let new = NewNormalization {
            original_key: name_key(&submission.original_name),
            original_name: submission.original_name,
            normalized_name,
            description: submission.description,
            parent_candidate_ids: submission.parent_candidate_ids,
            source: submission.source,
            confidence_score: confidence,
        };

        let (record, created) = self.store.write(|tx| {
            if let Some(existing) = tx.find_pending_by_original_key(&new.original_key)? {
                return Ok((existing, false));
            }
            Ok((tx.insert_normalization(&new)?, true))
        })?;
        if !created {
            debug!(id = %record.id, original = %record.original_name, "reusing pending normalization");
            return Ok(record);
        }
        info!(
            id = %record.id,
            original = %record.original_name,
            normalized = %record.normalized_name,
            "submitted normalization"
        );

        if confidence >= self.config.auto_approve_threshold {
            if let Some(tag) = self.registry.find(&record.normalized_name)? {
                info!(id = %record.id, tag = %tag.name, confidence, "auto-approving normalization");
                let reviewer = self.config.auto_reviewer.clone();
                return self.approve_as(record.id, &reviewer, ApprovalTarget::Existing(tag.id), true);
            }
        }

        Ok(record)
    }

    /// Resolve a pending record to a tag.
    ///
    /// Re-approving an approved record returns it unchanged.
    pub fn approve(
        &self,
        id: NormalizationId,
        reviewer: &str,
        target: ApprovalTarget,
    ) -> Result<TagNormalization> {
        self.approve_as(id, reviewer, target, false)
    }

    fn approve_as(
        &self,
        id: NormalizationId,
        reviewer: &str,
        target: ApprovalTarget,
        auto_approved: bool,
    ) -> Result<TagNormalization> {
        check_reviewer(reviewer)?;

        let approval = self
            .store
            .write(|tx| approve_in(tx, id, reviewer, &target, auto_approved))?;

        let Some(tag) = approval.tag else {
            debug!(%id, "normalization already approved");
            return Ok(approval.record);
        };

        self.cache.insert(tag.name_key.clone(), tag.id);
        info!(%id, tag = %tag.name, reviewer, auto_approved, "approved normalization");

        match self.associate_content(&tag) {
            Ok(tagged) => info!(tag = %tag.name, tagged, "retroactively tagged content"),
            Err(e) => warn!(tag = %tag.name, error = %e, "retroactive content tagging failed"),
        }

        Ok(approval.record)
    }

    /// Tag every content item mentioning the tag's name
    fn associate_content(&self, tag: &Tag) -> Result<usize> {
        self.store.write(|tx| {
            let mut tagged = 0;
            for item in tx.find_content_containing(&tag.name)? {
                if tx.tag_content(item.id, tag.id)? {
                    tagged += 1;
                }
            }
            Ok(tagged)
        })
    }

    /// Mark a record rejected. Rejecting again only replaces the notes.
    pub fn reject(
        &self,
        id: NormalizationId,
        reviewer: &str,
        notes: Option<&str>,
    ) -> Result<TagNormalization> {
        check_reviewer(reviewer)?;

        let record = self.store.write(|tx| {
            let record = tx.require_normalization(id)?;
            match record.review_status {
                ReviewStatus::Pending => tx.mark_rejected(id, reviewer, notes, Utc::now())?,
                ReviewStatus::Rejected => tx.set_admin_notes(id, notes)?,
                ReviewStatus::Approved => {
                    return Err(TaxonError::Validation(format!(
                        "Normalization {} is already approved and cannot be rejected",
                        id
                    )))
                }
            }
            tx.require_normalization(id)
        })?;

        info!(%id, reviewer, "rejected normalization");
        Ok(record)
    }

    /// Approve each record against its own candidate name
    pub fn bulk_approve(&self, ids: &[NormalizationId], reviewer: &str) -> BulkReport {
        self.bulk(ids, |id| self.approve(id, reviewer, ApprovalTarget::Candidate))
    }

    pub fn bulk_reject(
        &self,
        ids: &[NormalizationId],
        reviewer: &str,
        notes: Option<&str>,
    ) -> BulkReport {
        self.bulk(ids, |id| self.reject(id, reviewer, notes))
    }

    fn bulk(
        &self,
        ids: &[NormalizationId],
        apply: impl Fn(NormalizationId) -> Result<TagNormalization>,
    ) -> BulkReport {
        let mut report = BulkReport::default();
        for &id in ids {
            match apply(id) {
                Ok(record) => report.succeeded.push(record),
                Err(e) => {
                    warn!(%id, error = %e, "bulk review step failed");
                    report.failed.push(BulkFailure {
                        id,
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }

    pub fn get(&self, id: NormalizationId) -> Result<TagNormalization> {
        self.store.read(|conn| conn.require_normalization(id))
    }

    pub fn list(&self, status: Option<ReviewStatus>) -> Result<Vec<TagNormalization>> {
        self.store.read(|conn| conn.list_normalizations(status))
    }
}

fn check_reviewer(reviewer: &str) -> Result<()> {
    if reviewer.trim().is_empty() {
        return Err(TaxonError::Validation(
            "Reviewer cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn approve_in(
    conn: &rusqlite::Connection,
    id: NormalizationId,
    reviewer: &str,
    target: &ApprovalTarget,
    auto_approved: bool,
) -> Result<Approval> {
    let record = conn.require_normalization(id)?;
    match record.review_status {
        ReviewStatus::Approved => return Ok(Approval { record, tag: None }),
        ReviewStatus::Rejected => {
            return Err(TaxonError::Validation(format!(
                "Normalization {} was rejected and cannot be approved",
                id
            )))
        }
        ReviewStatus::Pending => {}
    }

    let tag = match target {
        ApprovalTarget::Existing(tag_id) => conn.require_tag(*tag_id)?,
        ApprovalTarget::Candidate => {
            let options = NewTagOptions {
                description: record.description.clone(),
                ..Default::default()
            };
            resolve_or_create_in(conn, &record.normalized_name, &options)?.tag
        }
        ApprovalTarget::New(fields) => {
            let options = NewTagOptions {
                tag_type: fields.tag_type,
                description: fields.description.clone(),
                is_featured: fields.is_featured,
                is_private: fields.is_private,
                ..Default::default()
            };
            resolve_or_create_in(conn, &fields.name, &options)?.tag
        }
    };

    for &parent in &record.parent_candidate_ids {
        match add_edge_in(conn, parent, tag.id, RelationshipType::ParentChild) {
            Ok(_) => {}
            Err(
                e @ (TaxonError::Cycle { .. }
                | TaxonError::SelfReference(_)
                | TaxonError::NotFound { .. }),
            ) => {
                warn!(%id, %parent, child = %tag.id, error = %e, "skipping parent candidate");
            }
            Err(e) => return Err(e),
        }
    }

    conn.mark_approved(id, tag.id, reviewer, auto_approved, Utc::now())?;
    Ok(Approval {
        record: conn.require_normalization(id)?,
        tag: Some(tag),
    })
}
