//! taxon - Tag taxonomy engine
//!
//! Keeps a set of canonical tags arranged in a multi-parent hierarchy (a DAG),
//! resolves free-form names onto them, folds duplicates together and runs a
//! review workflow for suggested normalizations. Everything persists to a
//! single SQLite database inside a `.taxon` workspace.
//!
//! ```no_run
//! use taxon::application::Taxonomy;
//! use taxon::domain::RelationshipType;
//! use taxon::infrastructure::Workspace;
//!
//! # fn main() -> taxon::error::Result<()> {
//! let taxonomy = Taxonomy::open(&Workspace::discover()?)?;
//! let registry = taxonomy.registry();
//! let languages = registry.resolve_or_create("programming languages")?;
//! let rust = registry.resolve_or_create("RUST")?;
//! taxonomy
//!     .hierarchy()
//!     .add_edge(languages.id, rust.id, RelationshipType::ParentChild)?;
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::TaxonError;
