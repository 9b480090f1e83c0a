//! Suggested tag normalizations awaiting review

use crate::domain::TagId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizationId(pub i64);

impl fmt::Display for NormalizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NormalizationId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(NormalizationId)
            .map_err(|_| format!("Invalid normalization id: '{}'", s))
    }
}

/// Review state. `Pending` moves to one of the two terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            _ => Err(format!(
                "Invalid review status: '{}'. Valid statuses: pending, approved, rejected",
                s
            )),
        }
    }
}

/// Where a suggested name came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationSource {
    #[default]
    AiGenerated,
    UserSubmitted,
    Imported,
}

impl NormalizationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizationSource::AiGenerated => "ai_generated",
            NormalizationSource::UserSubmitted => "user_submitted",
            NormalizationSource::Imported => "imported",
        }
    }
}

impl fmt::Display for NormalizationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NormalizationSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "ai_generated" | "ai" => Ok(NormalizationSource::AiGenerated),
            "user_submitted" | "user" => Ok(NormalizationSource::UserSubmitted),
            "imported" => Ok(NormalizationSource::Imported),
            _ => Err(format!(
                "Invalid source: '{}'. Valid sources: ai_generated, user_submitted, imported",
                s
            )),
        }
    }
}

/// A recorded suggestion to map a raw name onto a canonical tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagNormalization {
    pub id: NormalizationId,
    pub original_name: String,
    /// Candidate canonical form
    pub normalized_name: String,
    pub description: Option<String>,
    pub parent_candidate_ids: Vec<TagId>,
    pub review_status: ReviewStatus,
    pub source: NormalizationSource,
    pub confidence_score: f64,
    pub auto_approved: bool,
    pub approved_tag_id: Option<TagId>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TagNormalization {
    pub fn is_pending(&self) -> bool {
        self.review_status == ReviewStatus::Pending
    }
}

/// Input for a new pending normalization
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizationSubmission {
    pub original_name: String,
    /// Candidate canonical form; derived from `original_name` when absent
    pub normalized_name: Option<String>,
    pub description: Option<String>,
    pub source: NormalizationSource,
    pub confidence_score: f64,
    pub parent_candidate_ids: Vec<TagId>,
}

impl NormalizationSubmission {
    pub fn new(original_name: impl Into<String>, confidence_score: f64) -> Self {
        Self {
            original_name: original_name.into(),
            confidence_score,
            ..Default::default()
        }
    }
}
