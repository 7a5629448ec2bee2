use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration (loaded from sfs.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SfsConfig {
    pub store: StoreConfig,
    pub kdf: KdfConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Whole-state snapshot file (default: ~/.local/share/sfs/store.json)
    pub path: PathBuf,
    /// Unix permission bits applied to the snapshot on every flush
    pub file_mode: u32,
}

/// Argon2id password stretching, applied once per Signup/Login.
///
/// The values used at Signup are recorded in the account, so changing them
/// only affects accounts created afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    /// Memory cost in KiB (default: 19456 = 19 MiB)
    pub mem_cost_kib: u32,
    /// Iterations (default: 2)
    pub time_cost: u32,
    /// Lanes (default: 1)
    pub parallelism: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level filter (default: warn)
    pub level: String,
    /// "text" or "json"
    pub format: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("~/.local/share/sfs/store.json"),
            file_mode: 0o600,
        }
    }
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            mem_cost_kib: 19456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[store]
path = "/var/lib/sfs/store.json"
file_mode = 0o640

[kdf]
mem_cost_kib = 65536
time_cost = 3
parallelism = 4

[log]
level = "debug"
format = "json"
"#;
        let config: SfsConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.store.path, PathBuf::from("/var/lib/sfs/store.json"));
        assert_eq!(config.store.file_mode, 0o640);
        assert_eq!(config.kdf.mem_cost_kib, 65536);
        assert_eq!(config.kdf.time_cost, 3);
        assert_eq!(config.kdf.parallelism, 4);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");
    }

    #[test]
    fn test_parse_defaults() {
        let config: SfsConfig = toml::from_str("").unwrap();

        assert_eq!(
            config.store.path,
            PathBuf::from("~/.local/share/sfs/store.json")
        );
        assert_eq!(config.store.file_mode, 0o600);
        assert_eq!(config.kdf.mem_cost_kib, 19456);
        assert_eq!(config.log.level, "warn");
        assert_eq!(config.log.format, "text");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[kdf]
time_cost = 5
"#;
        let config: SfsConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.kdf.time_cost, 5);
        // Defaults
        assert_eq!(config.kdf.mem_cost_kib, 19456);
        assert_eq!(config.kdf.parallelism, 1);
        assert_eq!(config.store.file_mode, 0o600);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = SfsConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: SfsConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.store.path, parsed.store.path);
        assert_eq!(config.kdf.mem_cost_kib, parsed.kdf.mem_cost_kib);
        assert_eq!(config.log.format, parsed.log.format);
    }
}
