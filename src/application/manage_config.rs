//! Config management use case

use crate::error::Result;
use crate::infrastructure::config::CONFIG_KEYS;
use crate::infrastructure::{Config, Workspace};

/// Service for reading and editing `.taxon/config.toml`
pub struct ConfigService {
    workspace: Workspace,
}

impl ConfigService {
    pub fn new(workspace: Workspace) -> Self {
        ConfigService { workspace }
    }

    /// Get a single config value
    pub fn get(&self, key: &str) -> Result<String> {
        self.workspace.load_config()?.get(key)
    }

    /// Set a config value; the file is only written when the new value is valid
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut config = self.workspace.load_config()?;
        config.set(key, value)?;
        self.workspace.save_config(&config)
    }

    /// All keys with their current values, in display order
    pub fn list(&self) -> Result<Vec<(&'static str, String)>> {
        let config = self.load()?;
        CONFIG_KEYS
            .iter()
            .map(|key| Ok((*key, config.get(key)?)))
            .collect()
    }

    pub fn load(&self) -> Result<Config> {
        self.workspace.load_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service() -> (TempDir, ConfigService) {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::new(temp.path().to_path_buf());
        workspace.initialize().unwrap();
        (temp, ConfigService::new(workspace))
    }

    #[test]
    fn test_set_persists() {
        let (_temp, service) = service();
        service.set("registry.fuzzy_threshold", "0.8").unwrap();
        assert_eq!(service.get("registry.fuzzy_threshold").unwrap(), "0.8");
    }

    #[test]
    fn test_invalid_value_leaves_file_untouched() {
        let (_temp, service) = service();
        assert!(service.set("review.auto_approve_threshold", "2").is_err());
        assert_eq!(service.get("review.auto_approve_threshold").unwrap(), "0.9");
    }

    #[test]
    fn test_list_covers_every_key() {
        let (_temp, service) = service();
        let keys: Vec<&str> = service.list().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, CONFIG_KEYS);
    }
}
