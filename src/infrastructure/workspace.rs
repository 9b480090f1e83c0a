//! Workspace discovery and layout
//!
//! A workspace is any directory containing `.taxon/config.toml`; the database
//! lives next to the config unless configured elsewhere.

use crate::error::{Result, TaxonError};
use crate::infrastructure::config::CONFIG_DIR;
use crate::infrastructure::{Config, SqliteStore};
use std::fs;
use std::path::{Path, PathBuf};

pub const ROOT_ENV: &str = "TAXON_ROOT";

/// A taxonomy workspace on disk
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
}

impl Workspace {
    pub fn new(root: PathBuf) -> Self {
        Workspace { root }
    }

    /// Locate the workspace: TAXON_ROOT first, then walk up from the current
    /// directory
    pub fn discover() -> Result<Self> {
        if let Ok(root_path) = std::env::var(ROOT_ENV) {
            let path = PathBuf::from(root_path);
            if Self::has_taxon_dir(&path) {
                return Ok(Workspace::new(path));
            }
            return Err(TaxonError::Config(format!(
                "{} is set to '{}' but no .taxon directory found. \
                Run 'taxon init' in that directory or unset {}.",
                ROOT_ENV,
                path.display(),
                ROOT_ENV
            )));
        }

        let current_dir = std::env::current_dir()?;
        Self::discover_from(&current_dir)
    }

    /// Walk up from `start` until a directory holding `.taxon` is found
    pub fn discover_from(start: &Path) -> Result<Self> {
        start
            .ancestors()
            .find(|dir| Self::has_taxon_dir(dir))
            .map(|dir| Workspace::new(dir.to_path_buf()))
            .ok_or_else(|| TaxonError::NotTaxonDirectory(start.to_path_buf()))
    }

    fn has_taxon_dir(path: &Path) -> bool {
        path.join(CONFIG_DIR).is_dir()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_initialized(&self) -> bool {
        Self::has_taxon_dir(&self.root)
    }

    /// Create `.taxon/` with a default config and an empty, migrated database
    pub fn initialize(&self) -> Result<Config> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)?;
        }

        let taxon_dir = self.root.join(CONFIG_DIR);
        if taxon_dir.exists() {
            return Err(TaxonError::Config(format!(
                "Directory already initialized: {}",
                self.root.display()
            )));
        }
        fs::create_dir(&taxon_dir)?;

        let config = Config::new();
        self.save_config(&config)?;
        self.open_store(&config)?;
        Ok(config)
    }

    pub fn load_config(&self) -> Result<Config> {
        Config::load_from_dir(&self.root)
    }

    pub fn save_config(&self, config: &Config) -> Result<()> {
        config.save_to_dir(&self.root)
    }

    /// Resolved path of the database file
    pub fn database_path(&self, config: &Config) -> PathBuf {
        let configured = Path::new(&config.store.database);
        if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            self.root.join(CONFIG_DIR).join(configured)
        }
    }

    pub fn open_store(&self, config: &Config) -> Result<SqliteStore> {
        SqliteStore::open(
            &self.database_path(config),
            config.store.busy_timeout(),
        )
    }
}
