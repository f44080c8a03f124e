use anyhow::{Result, anyhow};
use config::{Config, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub store: Store,
    pub log: Log,
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub backend: String, // "fake" or "real"
    /// Pinned signing algorithm, e.g. "HS256".
    pub algorithm: String,
    /// Environment variable holding the HMAC secret.
    pub signing_key_env: String,
    /// PEM files for asymmetric algorithms. Ignored for HS*.
    #[serde(default)]
    pub private_key_path: Option<String>,
    #[serde(default)]
    pub public_key_path: Option<String>,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    #[serde(default)]
    pub leeway_secs: i64,
    #[serde(default)]
    pub revoke_family_on_reuse: bool,
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "memory" or "redis"
    #[serde(default)]
    pub redis_url: Option<String>,
    pub prefix: String,
    pub tombstone_grace_secs: i64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
    #[serde(default)]
    pub format: String, // "text" (default) or "json"
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    settings.validate()?;
    Ok(settings)
}

impl Settings {
    fn validate(&self) -> Result<()> {
        if self.auth.access_ttl_secs <= 0 || self.auth.refresh_ttl_secs <= 0 {
            return Err(anyhow!("token TTLs must be positive"));
        }
        if self.auth.leeway_secs < 0 {
            return Err(anyhow!("leeway_secs must not be negative"));
        }
        if self.store.tombstone_grace_secs < 0 {
            return Err(anyhow!("tombstone_grace_secs must not be negative"));
        }
        if self.store.sweep_interval_secs == 0 {
            return Err(anyhow!("sweep_interval_secs must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_settings_load() {
        let settings = parse_settings(Some("settings/dev.toml")).unwrap();
        assert_eq!(settings.auth.algorithm, "HS256");
        assert_eq!(settings.auth.access_ttl_secs, 300);
        assert_eq!(settings.auth.refresh_ttl_secs, 604_800);
        assert_eq!(settings.auth.leeway_secs, 0);
        assert_eq!(settings.store.backend, "memory");
    }

    #[test]
    fn missing_file_is_error() {
        assert!(parse_settings(Some("settings/does-not-exist.toml")).is_err());
    }
}
