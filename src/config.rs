use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::storage::StoreConfig;

/// Environment variable naming the database, `sqlite:///path` or a bare path
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EtexConfig {
    pub database: Option<String>,
    pub busy_timeout_ms: Option<u64>,
}

impl EtexConfig {
    pub fn store_config(&self) -> StoreConfig {
        let mut config = StoreConfig::default();
        if let Some(ms) = self.busy_timeout_ms {
            config.busy_timeout = Duration::from_millis(ms);
        }
        config
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("etex.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("./data/database/etex.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<EtexConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: EtexConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &EtexConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Turn a `DATABASE_URL` value into a file path
pub fn parse_database_url(url: &str) -> anyhow::Result<PathBuf> {
    let url = url.trim();
    if let Some(rest) = url.strip_prefix("sqlite://") {
        // sqlite:///./data/etex.db -> ./data/etex.db, sqlite:////abs/etex.db -> /abs/etex.db
        let path = rest.strip_prefix('/').unwrap_or(rest);
        if path.is_empty() {
            anyhow::bail!("{} has no path: {}", DATABASE_URL_ENV, url);
        }
        return Ok(PathBuf::from(path));
    }
    if url.contains("://") {
        anyhow::bail!("unsupported database url {} (only sqlite is supported)", url);
    }
    Ok(PathBuf::from(url))
}

/// Pick the database: flag, then environment, then config, then default
pub fn resolve_database_path(
    flag: Option<&Path>,
    env_value: Option<&str>,
    config: Option<&EtexConfig>,
) -> anyhow::Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    if let Some(url) = env_value {
        return parse_database_url(url);
    }
    if let Some(db) = config.and_then(|c| c.database.as_deref()) {
        return Ok(PathBuf::from(db));
    }
    Ok(default_database_path())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_database_url() {
        assert_eq!(
            parse_database_url("sqlite:///./data/database/etex.db").unwrap(),
            PathBuf::from("./data/database/etex.db")
        );
        assert_eq!(parse_database_url("sqlite:////var/etex.db").unwrap(), PathBuf::from("/var/etex.db"));
        assert_eq!(parse_database_url("terms.db").unwrap(), PathBuf::from("terms.db"));
        assert!(parse_database_url("postgres://localhost/etex").is_err());
        assert!(parse_database_url("sqlite://").is_err());
    }

    #[test]
    fn test_resolution_precedence() {
        let config = EtexConfig {
            database: Some("from_config.db".to_string()),
            busy_timeout_ms: None,
        };
        let flag = PathBuf::from("flag.db");

        let resolved = resolve_database_path(Some(&flag), Some("sqlite:///env.db"), Some(&config)).unwrap();
        assert_eq!(resolved, flag);
        let resolved = resolve_database_path(None, Some("sqlite:///env.db"), Some(&config)).unwrap();
        assert_eq!(resolved, PathBuf::from("env.db"));
        let resolved = resolve_database_path(None, None, Some(&config)).unwrap();
        assert_eq!(resolved, PathBuf::from("from_config.db"));
        assert_eq!(resolve_database_path(None, None, None).unwrap(), default_database_path());
    }

    #[test]
    fn test_config_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etex.toml");
        let config = EtexConfig {
            database: Some("terms.db".to_string()),
            busy_timeout_ms: Some(250),
        };

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.store_config().busy_timeout, Duration::from_millis(250));
        assert!(load_config(Some(&dir.path().join("missing.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_ensure_db_dir_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("data").join("database").join("etex.db");
        ensure_db_dir(&db).unwrap();
        assert!(db.parent().unwrap().is_dir());
    }
}
