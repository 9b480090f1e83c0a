//! Initialize taxonomy use case

use crate::error::Result;
use crate::infrastructure::{Config, Workspace};
use std::path::Path;
use tracing::info;

/// Initialize a new taxonomy workspace at the specified path.
///
/// Creates the directory if needed, writes a default config and creates the
/// database with its schema.
pub fn init(path: &Path) -> Result<(Workspace, Config)> {
    let workspace = Workspace::new(path.to_path_buf());
    let config = workspace.initialize()?;
    info!(root = %path.display(), "initialized taxonomy");
    Ok((workspace, config))
}
