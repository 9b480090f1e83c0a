//! Error types for taxon

use crate::domain::TagId;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for taxon
#[derive(Debug, Error)]
pub enum TaxonError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Tag {0} cannot be its own parent")]
    SelfReference(TagId),

    #[error("Edge would create a cycle: {}", format_path(.path))]
    Cycle { path: Vec<TagId> },

    #[error("Tag {id} still has {children} child tag(s)")]
    HasChildren { id: TagId, children: usize },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not a taxon directory: {0}")]
    NotTaxonDirectory(PathBuf),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Render a path as `1 -> 2 -> 3`
pub fn format_path(path: &[TagId]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl TaxonError {
    pub fn tag_not_found(id: impl ToString) -> Self {
        TaxonError::NotFound {
            entity: "Tag",
            id: id.to_string(),
        }
    }

    pub fn normalization_not_found(id: impl ToString) -> Self {
        TaxonError::NotFound {
            entity: "Normalization",
            id: id.to_string(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            TaxonError::NotTaxonDirectory(_) => 2,
            TaxonError::NotFound { .. } => 3,
            TaxonError::Validation(_) => 4,
            TaxonError::SelfReference(_) | TaxonError::Cycle { .. } => 5,
            TaxonError::HasChildren { .. } => 6,
            _ => 1,
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn display_with_suggestions(&self) -> String {
        match self {
            TaxonError::NotTaxonDirectory(path) => {
                format!(
                    "Not a taxon directory: {}\n\n\
                    Suggestions:\n\
                    • Run 'taxon init' in this directory to create a new taxonomy\n\
                    • Navigate to an existing taxon directory\n\
                    • Set TAXON_ROOT environment variable to your taxonomy path",
                    path.display()
                )
            }
            TaxonError::NotFound { entity, id } if *entity == "Tag" => {
                format!(
                    "Tag not found: '{}'\n\n\
                    Suggestions:\n\
                    • Tag names are matched case-insensitively after normalization\n\
                    • Use 'taxon tags' to list existing tags\n\
                    • Use 'taxon resolve <name> --fuzzy' to match near-duplicates",
                    id
                )
            }
            TaxonError::Cycle { .. } => {
                format!(
                    "{}\n\n\
                    The taxonomy must stay acyclic. Remove one of the edges on the\n\
                    path above first, e.g. 'taxon edge remove <parent> <child>'",
                    self
                )
            }
            TaxonError::HasChildren { id, children } => {
                format!(
                    "Tag {} still has {} child tag(s)\n\n\
                    Suggestions:\n\
                    • Use 'taxon children <name>' to see them\n\
                    • Detach them with 'taxon edge remove <parent> <child>'\n\
                    • Or merge the tag into another one with 'taxon merge'",
                    id, children
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Result type using TaxonError
pub type Result<T> = std::result::Result<T, TaxonError>;
