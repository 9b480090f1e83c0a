//! Application layer - Use cases and orchestration

pub mod cache;
pub mod hierarchy;
pub mod init;
pub mod manage_config;
pub mod registry;
pub mod review;
pub mod taxonomy;

pub use cache::NameCache;
pub use hierarchy::{HierarchyGraph, TreeLine};
pub use manage_config::ConfigService;
pub use registry::{
    MergeReport, NewTagOptions, Registry, Resolution, SweepFailure, SweepGroup, SweepReport,
};
pub use review::{ApprovalTarget, BulkFailure, BulkReport, NewTagFields, ReviewWorkflow};
pub use taxonomy::Taxonomy;
