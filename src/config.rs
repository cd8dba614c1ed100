use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CatalogConfig {
    pub database: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub busy_timeout_ms: Option<u64>,
}

impl CatalogConfig {
    /// Database path: flag, then config, then `.catalog/catalog.db` under `base`.
    ///
    /// A relative flag is taken from the working directory; a relative
    /// config value is taken from `base`, the config file's directory.
    pub fn database_path(&self, flag: Option<&Path>, base: &Path) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.database.as_ref().map(|db| base.join(db)))
            .unwrap_or_else(|| default_database_path_in(base))
    }

    pub fn server_addr(&self, host: Option<&str>, port: Option<u16>) -> anyhow::Result<SocketAddr> {
        let ip = match host.or(self.host.as_deref()) {
            Some(host) => host.parse::<IpAddr>()?,
            None => DEFAULT_HOST,
        };
        Ok(SocketAddr::new(ip, port.or(self.port).unwrap_or(DEFAULT_PORT)))
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(crate::storage::DEFAULT_BUSY_TIMEOUT)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("catalog.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".catalog").join("catalog.db")
}

/// Directory a config file's relative paths are resolved against
pub fn config_base(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// How `database` is written into a config file living in `base`, so that
/// `database_path` reads it back as the same file.
pub fn database_entry(database: &Path, base: &Path) -> anyhow::Result<PathBuf> {
    if let Ok(relative) = database.strip_prefix(base) {
        return Ok(relative.to_path_buf());
    }
    if database.is_absolute() || base == Path::new(".") {
        return Ok(database.to_path_buf());
    }
    Ok(std::path::absolute(database)?)
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<CatalogConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: CatalogConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &CatalogConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn ensure_gitignore(project_root: &Path) -> anyhow::Result<()> {
    let gitignore_path = project_root.join(".gitignore");
    let entry = ".catalog/";

    let mut content = String::new();
    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        if existing.lines().any(|line| line.trim() == entry) {
            return Ok(());
        }
        content.push_str(&existing);
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
    }
    content.push_str(entry);
    content.push('\n');
    std::fs::write(&gitignore_path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let config = CatalogConfig {
            database: Some("shop.db".into()),
            port: Some(9000),
            ..Default::default()
        };
        let base = Path::new("/srv");

        assert_eq!(config.database_path(Some(Path::new("flag.db")), base), PathBuf::from("flag.db"));
        assert_eq!(config.database_path(None, base), PathBuf::from("/srv/shop.db"));
        let absolute = CatalogConfig {
            database: Some("/var/lib/shop.db".into()),
            ..Default::default()
        };
        assert_eq!(absolute.database_path(None, base), PathBuf::from("/var/lib/shop.db"));
        assert_eq!(
            CatalogConfig::default().database_path(None, base),
            PathBuf::from("/srv/.catalog/catalog.db")
        );

        let addr = config.server_addr(None, None).unwrap();
        assert_eq!(addr, SocketAddr::new(DEFAULT_HOST, 9000));
        let addr = config.server_addr(Some("0.0.0.0"), Some(80)).unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:80");
        assert!(config.server_addr(Some("not a host"), None).is_err());
    }

    #[test]
    fn test_config_relative_database() {
        assert_eq!(config_base(Path::new("catalog.toml")), PathBuf::from("."));
        assert_eq!(config_base(Path::new("shop/catalog.toml")), PathBuf::from("shop"));

        let base = config_base(Path::new("shop/catalog.toml"));
        let database = default_database_path_in(&base);
        let entry = database_entry(&database, &base).unwrap();
        assert_eq!(entry, PathBuf::from(".catalog/catalog.db"));

        // Written then read back from the same config resolves to the same file
        let config = CatalogConfig {
            database: Some(entry.display().to_string()),
            ..Default::default()
        };
        assert_eq!(config.database_path(None, &base), database);

        let cwd = Path::new(".");
        assert_eq!(database_entry(Path::new("mine.db"), cwd).unwrap(), PathBuf::from("mine.db"));
        assert!(database_entry(Path::new("mine.db"), &base).unwrap().is_absolute());
    }

    #[test]
    fn test_write_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        let config = CatalogConfig {
            database: Some(".catalog/catalog.db".into()),
            busy_timeout_ms: Some(250),
            ..Default::default()
        };

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.busy_timeout(), Duration::from_millis(250));
        assert!(load_config(Some(&dir.path().join("missing.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_gitignore_entry_added_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target/").unwrap();

        ensure_gitignore(dir.path()).unwrap();
        ensure_gitignore(dir.path()).unwrap();

        let contents = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(contents, "target/\n.catalog/\n");
    }
}
