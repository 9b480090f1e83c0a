//! Domain layer - Tag taxonomy models and pure naming rules

pub mod content;
pub mod edge;
pub mod normalization;
pub mod normalizer;
pub mod similarity;
pub mod tag;

pub use content::{ContentId, ContentItem};
pub use edge::{HierarchyEdge, RelationshipType};
pub use normalization::{
    NormalizationId, NormalizationSource, NormalizationSubmission, ReviewStatus, TagNormalization,
};
pub use tag::{NewTag, Tag, TagId, TagType};
