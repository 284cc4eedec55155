use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::attachments::{AttachmentPolicy, DEFAULT_MAX_UPLOAD_MB};
use crate::db::{BackendType, DatabaseConfig};

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "TAXPORTAL_CONFIG";
/// Environment variable overriding the data file location
pub const DATA_PATH_ENV: &str = "TAXPORTAL_DATA";

fn default_max_upload_mb() -> u64 {
    DEFAULT_MAX_UPLOAD_MB
}

/// User-level settings, stored as YAML
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortalConfig {
    /// Where the portal keeps its data; `None` means the platform data dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,

    /// Storage backend; inferred from the data file extension when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendType>,

    /// Largest accepted upload, in megabytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            backend: None,
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
        }
    }
}

impl PortalConfig {
    /// Loads the config from the provided path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
    }

    /// Save the config to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(&self)?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Creates a default config file if it doesn't exist
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        if path.as_ref().exists() {
            return Ok(());
        }
        PortalConfig::default().save(path)
    }

    /// Loads the config from its usual location, creating it on first use
    pub fn load_or_create() -> Result<Self> {
        let path = get_config_path()?;
        if !path.exists() {
            Self::create_default(&path)?;
        }
        Self::load(&path)
    }

    pub fn attachment_policy(&self) -> AttachmentPolicy {
        AttachmentPolicy::with_max_size_mb(self.max_upload_mb)
    }

    /// Resolves where and how to open the data store
    ///
    /// Priority: explicit path (the `--data` flag), `TAXPORTAL_DATA`, the
    /// config's `data_path`, then `<data dir>/taxportal/portal.json`.
    pub fn database_config(&self, explicit_path: Option<&Path>) -> Result<DatabaseConfig> {
        let path = self.resolve_data_path(explicit_path, env::var(DATA_PATH_ENV).ok())?;
        let backend_type = self
            .backend
            .unwrap_or_else(|| BackendType::from_path(&path));

        Ok(DatabaseConfig { path, backend_type })
    }

    fn resolve_data_path(
        &self,
        explicit_path: Option<&Path>,
        env_path: Option<String>,
    ) -> Result<PathBuf> {
        if let Some(p) = explicit_path {
            return Ok(p.to_path_buf());
        }
        match env_path {
            Some(p) if !p.is_empty() => Ok(PathBuf::from(p)),
            _ => match &self.data_path {
                Some(p) => Ok(p.clone()),
                None => default_data_path(),
            },
        }
    }
}

/// Gets the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    config_path_from(env::var(CONFIG_PATH_ENV).ok())
}

fn config_path_from(env_path: Option<String>) -> Result<PathBuf> {
    if let Some(path) = env_path.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let home_dir = dirs::home_dir().context("Failed to determine home directory")?;
    Ok(home_dir.join(".taxportal.config"))
}

/// Default location of the data file
pub fn default_data_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .or_else(dirs::home_dir)
        .context("Failed to determine data directory")?;
    Ok(data_dir.join("taxportal").join("portal.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_default_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cfg/.taxportal.config");

        PortalConfig::create_default(&path).unwrap();
        let config = PortalConfig::load(&path).unwrap();
        assert_eq!(config, PortalConfig::default());
        assert_eq!(config.max_upload_mb, 10);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "backend: sqlite\n").unwrap();

        let config = PortalConfig::load(&path).unwrap();
        assert_eq!(config.backend, Some(BackendType::Sqlite));
        assert_eq!(config.max_upload_mb, DEFAULT_MAX_UPLOAD_MB);
        assert!(config.data_path.is_none());
    }

    #[test]
    fn test_save_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        let config = PortalConfig {
            data_path: Some(temp_dir.path().join("portal.db")),
            backend: None,
            max_upload_mb: 25,
        };
        config.save(&path).unwrap();
        assert_eq!(PortalConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_explicit_path_wins_and_infers_backend() {
        let config = PortalConfig {
            data_path: Some(PathBuf::from("/ignored/portal.json")),
            ..Default::default()
        };
        let db = config
            .database_config(Some(Path::new("/tmp/x/portal.sqlite")))
            .unwrap();
        assert_eq!(db.path, PathBuf::from("/tmp/x/portal.sqlite"));
        assert_eq!(db.backend_type, BackendType::Sqlite);

        let forced = PortalConfig {
            backend: Some(BackendType::Json),
            ..Default::default()
        }
        .database_config(Some(Path::new("portal.db")))
        .unwrap();
        assert_eq!(forced.backend_type, BackendType::Json);
    }

    #[test]
    fn test_attachment_policy_uses_limit() {
        let config = PortalConfig {
            max_upload_mb: 2,
            ..Default::default()
        };
        assert_eq!(config.attachment_policy().max_size_bytes(), 2 * 1024 * 1024);
    }

    #[test]
    fn test_data_path_priority() {
        let config = PortalConfig {
            data_path: Some(PathBuf::from("/from/config.json")),
            ..Default::default()
        };
        let flag = Path::new("/from/flag.db");
        let env_path = Some("/from/env.sqlite".to_string());

        assert_eq!(
            config.resolve_data_path(Some(flag), env_path.clone()).unwrap(),
            PathBuf::from("/from/flag.db")
        );
        assert_eq!(
            config.resolve_data_path(None, env_path).unwrap(),
            PathBuf::from("/from/env.sqlite")
        );
        // An empty variable counts as unset
        assert_eq!(
            config.resolve_data_path(None, Some(String::new())).unwrap(),
            PathBuf::from("/from/config.json")
        );
        assert_eq!(
            config.resolve_data_path(None, None).unwrap(),
            PathBuf::from("/from/config.json")
        );
        assert_eq!(
            PortalConfig::default().resolve_data_path(None, None).unwrap(),
            default_data_path().unwrap()
        );
    }

    #[test]
    fn test_default_data_path_layout() {
        let path = default_data_path().unwrap();
        assert!(path.ends_with("taxportal/portal.json"));
        assert_eq!(BackendType::from_path(&path), BackendType::Json);
    }

    #[test]
    fn test_config_path_override() {
        assert_eq!(
            config_path_from(Some("/etc/taxportal.yaml".to_string())).unwrap(),
            PathBuf::from("/etc/taxportal.yaml")
        );
        let home = config_path_from(None).unwrap();
        assert!(home.ends_with(".taxportal.config"));
        assert_eq!(config_path_from(Some(String::new())).unwrap(), home);
    }

    /// Restores an environment variable when dropped
    struct EnvGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let original = env::var(key).ok();
            env::set_var(key, value);
            Self { key, original }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match self.original.take() {
                Some(val) => env::set_var(self.key, val),
                None => env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn test_environment_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("custom.config");
        let data_file = temp_dir.path().join("env-data.db");

        let _config_guard = EnvGuard::set(CONFIG_PATH_ENV, config_file.to_str().unwrap());
        let _data_guard = EnvGuard::set(DATA_PATH_ENV, data_file.to_str().unwrap());

        assert_eq!(get_config_path().unwrap(), config_file);
        let config = PortalConfig::load_or_create().unwrap();
        assert!(config_file.exists());

        let db = config.database_config(None).unwrap();
        assert_eq!(db.path, data_file);
        assert_eq!(db.backend_type, BackendType::Sqlite);
    }
}
