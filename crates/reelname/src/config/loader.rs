use std::path::Path;

use crate::config::schema::EngineConfig;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if !(0.0..=1.0).contains(&config.auto_match_threshold) {
        return Err(ConfigError::Validation {
            message: format!(
                "autoMatchThreshold must be between 0 and 1, got {}",
                config.auto_match_threshold
            ),
        });
    }

    if config.max_concurrent_transfers == 0 {
        return Err(ConfigError::Validation {
            message: "maxConcurrentTransfers must be at least 1".to_string(),
        });
    }

    let rate_limit = &config.catalog.rate_limit;
    if rate_limit.quota == 0 || rate_limit.window_secs == 0 {
        return Err(ConfigError::Validation {
            message: "catalog.rateLimit quota and windowSecs must be positive".to_string(),
        });
    }

    if !config.catalog.base_url.starts_with("http://")
        && !config.catalog.base_url.starts_with("https://")
    {
        return Err(ConfigError::Validation {
            message: format!("catalog.baseUrl is not an http(s) URL: {}", config.catalog.base_url),
        });
    }

    if config.transfer.chunk_size == 0 {
        return Err(ConfigError::Validation {
            message: "transfer.chunkSize must be positive".to_string(),
        });
    }

    for (field, value) in [
        ("naming.specialsFolderName", &config.naming.specials_folder_name),
        ("naming.extrasFolderName", &config.naming.extras_folder_name),
    ] {
        if value.trim().is_empty() || value.contains('/') {
            return Err(ConfigError::Validation {
                message: format!("{} must be a single non-empty folder name", field),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamingPreset;

    #[test]
    fn test_load_empty_object_uses_defaults() {
        let config = load_config_from_str("{}").unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.auto_match_threshold, 0.85);
        assert_eq!(config.max_concurrent_transfers, 2);
    }

    #[test]
    fn test_load_full_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "databasePath": "/var/lib/reelname/db.sqlite",
            "autoMatchThreshold": 0.9,
            "maxConcurrentTransfers": 4,
            "catalog": {
                "apiKeyEnvVar": "TMDB_API_KEY",
                "rateLimit": { "quota": 20, "windowSecs": 5 },
                "requestTimeoutSecs": 15
            },
            "naming": {
                "preset": "plex",
                "specialsFolderName": "Specials"
            },
            "transfer": { "chunkSize": 1048576, "connectTimeoutSecs": 5 }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.auto_match_threshold, 0.9);
        assert_eq!(config.max_concurrent_transfers, 4);
        assert_eq!(config.catalog.api_key_env_var.as_deref(), Some("TMDB_API_KEY"));
        assert_eq!(config.catalog.rate_limit.quota, 20);
        assert_eq!(config.catalog.rate_limit.window_secs, 5);
        assert_eq!(config.naming.preset, NamingPreset::Plex);
        assert_eq!(config.naming.extras_folder_name, "Extras");
        assert_eq!(config.transfer.chunk_size, 1_048_576);
    }

    #[test]
    fn test_invalid_version() {
        let result = load_config_from_str(r#"{ "version": "2.0" }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let result = load_config_from_str(r#"{ "autoMatchThreshold": 1.5 }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let result = load_config_from_str(r#"{ "maxConcurrentTransfers": 0 }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_zero_quota_rejected() {
        let result = load_config_from_str(r#"{ "catalog": { "rateLimit": { "quota": 0 } } }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_unknown_preset_is_parse_error() {
        let result = load_config_from_str(r#"{ "naming": { "preset": "kodi" } }"#);
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            load_config_from_str("{ not json"),
            Err(ConfigError::ParseJson(_))
        ));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reelname.json");
        std::fs::write(&path, r#"{ "maxConcurrentTransfers": 3 }"#).unwrap();
        assert_eq!(load_config(&path).unwrap().max_concurrent_transfers, 3);

        let missing = load_config(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ConfigError::ReadFile { .. })));
    }
}
