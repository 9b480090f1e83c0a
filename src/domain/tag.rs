//! Tag model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque tag identifier (the row id assigned by the store)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub i64);

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TagId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(TagId)
            .map_err(|_| format!("Invalid tag id: '{}'", s))
    }
}

/// Kind of a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TagType {
    Language,
    Framework,
    #[default]
    Concept,
    Domain,
    SkillLevel,
    Tool,
    Topic,
    Category,
}

impl TagType {
    pub const ALL: [TagType; 8] = [
        TagType::Language,
        TagType::Framework,
        TagType::Concept,
        TagType::Domain,
        TagType::SkillLevel,
        TagType::Tool,
        TagType::Topic,
        TagType::Category,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TagType::Language => "language",
            TagType::Framework => "framework",
            TagType::Concept => "concept",
            TagType::Domain => "domain",
            TagType::SkillLevel => "skill_level",
            TagType::Tool => "tool",
            TagType::Topic => "topic",
            TagType::Category => "category",
        }
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        TagType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "Invalid tag type: '{}'. Valid types: {}",
                    s,
                    TagType::ALL.map(|t| t.as_str()).join(", ")
                )
            })
    }
}

/// A canonical tag row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    /// Case-folded, whitespace-normalized uniqueness key
    pub name_key: String,
    pub tag_type: TagType,
    pub description: Option<String>,
    pub is_featured: bool,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a tag that does not exist yet
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewTag {
    pub name: String,
    pub name_key: String,
    pub tag_type: TagType,
    pub description: Option<String>,
    pub is_featured: bool,
    pub is_private: bool,
}
