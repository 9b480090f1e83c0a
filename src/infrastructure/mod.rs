//! Infrastructure layer - Persistence, configuration and workspace layout

pub mod config;
pub mod store;
pub mod workspace;

pub use config::Config;
pub use store::{
    ContentIndex, EdgeRows, NewNormalization, NormalizationRows, SqliteStore, TagRows,
};
pub use workspace::Workspace;
