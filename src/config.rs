use crate::constants;
use crate::error::{FarmError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Runtime configuration: an optional TOML file overlaid with environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub supabase: SupabaseConfig,
    pub push: PushConfig,
    pub cron: CronConfig,
    pub database_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub app_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: constants::DEFAULT_PORT,
            metrics_port: constants::DEFAULT_METRICS_PORT,
            app_base_url: "http://localhost:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub service_role_key: Option<String>,
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub vapid_private_key_pem: Option<String>,
    pub vapid_private_key_path: Option<PathBuf>,
    pub vapid_subject: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CronConfig {
    pub secret: Option<String>,
    pub batch_size: usize,
}

impl Default for CronConfig {
    fn default() -> Self {
        Self {
            secret: None,
            batch_size: constants::DEFAULT_NOTIFICATION_BATCH_SIZE,
        }
    }
}

pub enum StorageBackend {
    Supabase { url: String, service_role_key: String },
    InMemory,
}

impl AppConfig {
    /// Loads `farmstead.toml` (or `$FARMSTEAD_CONFIG`) when present, then applies env overrides.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        let path = std::env::var("FARMSTEAD_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(constants::DEFAULT_CONFIG_FILE));
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FarmError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Overlays values from an environment lookup. Takes the lookup as a closure so tests
    /// don't have to mutate the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SUPABASE_URL") {
            self.supabase.url = Some(url);
        } else if let Some(project_ref) = lookup("SUPABASE_PROJECT_REF") {
            self.supabase.url = Some(format!("https://{}.supabase.co", project_ref));
        }
        if let Some(key) = lookup("SUPABASE_SERVICE_ROLE_KEY") {
            self.supabase.service_role_key = Some(key);
        }
        if let Some(secret) = lookup("SUPABASE_JWT_SECRET") {
            self.supabase.jwt_secret = Some(secret);
        }
        if let Some(secret) = lookup("CRON_SECRET") {
            self.cron.secret = Some(secret);
        }
        if let Some(pem) = lookup("VAPID_PRIVATE_KEY_PEM") {
            self.push.vapid_private_key_pem = Some(pem);
        }
        if let Some(path) = lookup("VAPID_PRIVATE_KEY_PATH") {
            self.push.vapid_private_key_path = Some(PathBuf::from(path));
        }
        if let Some(subject) = lookup("VAPID_SUBJECT") {
            self.push.vapid_subject = Some(subject);
        }
        if let Some(url) = lookup("APP_BASE_URL") {
            self.server.app_base_url = url;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_env("PORT", &port)?;
        }
        if let Some(port) = lookup("FARMSTEAD_METRICS_PORT") {
            self.server.metrics_port = parse_env("FARMSTEAD_METRICS_PORT", &port)?;
        }
        if let Some(size) = lookup("NOTIFICATION_BATCH_SIZE") {
            let size: usize = parse_env("NOTIFICATION_BATCH_SIZE", &size)?;
            if size == 0 {
                return Err(FarmError::Config("NOTIFICATION_BATCH_SIZE must be at least 1".into()));
            }
            self.cron.batch_size = size;
        }
        Ok(())
    }

    pub fn storage_backend(&self) -> StorageBackend {
        match (&self.supabase.url, &self.supabase.service_role_key) {
            (Some(url), Some(key)) => StorageBackend::Supabase {
                url: url.clone(),
                service_role_key: key.clone(),
            },
            _ => StorageBackend::InMemory,
        }
    }

    pub fn jwt_secret(&self) -> Result<&str> {
        self.supabase
            .jwt_secret
            .as_deref()
            .ok_or_else(|| FarmError::Config("SUPABASE_JWT_SECRET is not set".into()))
    }

    /// VAPID private key PEM, read from the inline value or the key file.
    pub fn vapid_private_key(&self) -> Result<Option<String>> {
        if let Some(pem) = &self.push.vapid_private_key_pem {
            return Ok(Some(pem.clone()));
        }
        match &self.push.vapid_private_key_path {
            Some(path) => Ok(Some(fs::read_to_string(path).map_err(|e| {
                FarmError::Config(format!("Failed to read VAPID key '{}': {}", path.display(), e))
            })?)),
            None => Ok(None),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| FarmError::Config(format!("{} has an invalid value '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn project_ref_expands_to_url() {
        let mut config = AppConfig::default();
        config
            .apply_env(lookup(&[
                ("SUPABASE_PROJECT_REF", "abcxyz"),
                ("SUPABASE_SERVICE_ROLE_KEY", "service"),
            ]))
            .unwrap();
        assert_eq!(config.supabase.url.as_deref(), Some("https://abcxyz.supabase.co"));
        assert!(matches!(config.storage_backend(), StorageBackend::Supabase { .. }));
    }

    #[test]
    fn defaults_to_in_memory_without_credentials() {
        let config = AppConfig::default();
        assert!(matches!(config.storage_backend(), StorageBackend::InMemory));
        assert_eq!(config.cron.batch_size, constants::DEFAULT_NOTIFICATION_BATCH_SIZE);
    }

    #[test]
    fn rejects_bad_numbers() {
        let mut config = AppConfig::default();
        assert!(config.apply_env(lookup(&[("PORT", "eighty")])).is_err());
        assert!(config
            .apply_env(lookup(&[("NOTIFICATION_BATCH_SIZE", "0")]))
            .is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nport = 4000\n\n[cron]\nsecret = \"from-file\"\nbatch_size = 10"
        )
        .unwrap();

        let mut config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.cron.batch_size, 10);

        config.apply_env(lookup(&[("CRON_SECRET", "from-env")])).unwrap();
        assert_eq!(config.cron.secret.as_deref(), Some("from-env"));
        assert_eq!(config.server.port, 4000);
    }
}
