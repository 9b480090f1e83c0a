//! Hierarchy edges between tags

use crate::domain::TagId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Meaning of a parent -> child edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// Child is a narrower form of the parent (e.g. JavaScript -> React)
    #[default]
    ParentChild,
    /// Child is a component of the parent
    PartOf,
    /// Loose association, still directed and still subject to acyclicity
    RelatedTo,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::ParentChild => "parent_child",
            RelationshipType::PartOf => "part_of",
            RelationshipType::RelatedTo => "related_to",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "parent_child" => Ok(RelationshipType::ParentChild),
            "part_of" => Ok(RelationshipType::PartOf),
            "related_to" => Ok(RelationshipType::RelatedTo),
            _ => Err(format!(
                "Invalid relationship type: '{}'. Valid types: parent_child, part_of, related_to",
                s
            )),
        }
    }
}

/// A directed parent -> child edge. Unique on `(parent_id, child_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyEdge {
    pub parent_id: TagId,
    pub child_id: TagId,
    pub relationship_type: RelationshipType,
    pub created_at: DateTime<Utc>,
}
