//! Runtime configuration.
//!
//! Every setting has a compiled-in default and can be overridden through a
//! `CARDIOSURV_*` environment variable.

use std::path::PathBuf;

/// Fixed file name of the cached survival forest.
pub const MODEL_FILE_NAME: &str = "rsf_model.json";

/// Fixed file name of the cached feature schema.
pub const FEATURES_FILE_NAME: &str = "model_features.json";

pub const DEFAULT_MODEL_URL: &str =
    "https://drive.google.com/uc?id=15EkxZs9U8Xjro3dTTLxmozE-LaWT0vOI";

pub const DEFAULT_FEATURES_URL: &str =
    "https://drive.google.com/uc?id=1YrDDcQfaloaEDuKnmWPy8OmMRkHPzfcK";

/// What an artifact file holds, and so how its contents are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Random survival forest export
    Model,
    /// JSON array of model input column names
    FeatureSchema,
}

/// Where an artifact comes from and where it is cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub kind: ArtifactKind,
    pub url: String,
    pub file_name: String,
    /// Expected SHA-256 (lowercase hex) of the file contents, if pinned
    pub sha256: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub cache_dir: PathBuf,
    pub model: ArtifactSpec,
    pub features: ArtifactSpec,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("."),
            model: ArtifactSpec {
                kind: ArtifactKind::Model,
                url: DEFAULT_MODEL_URL.to_string(),
                file_name: MODEL_FILE_NAME.to_string(),
                sha256: None,
            },
            features: ArtifactSpec {
                kind: ArtifactKind::FeatureSchema,
                url: DEFAULT_FEATURES_URL.to_string(),
                file_name: FEATURES_FILE_NAME.to_string(),
                sha256: None,
            },
        }
    }
}

impl AppConfig {
    /// Build the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            cache_dir: get("CARDIOSURV_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            model: ArtifactSpec {
                kind: ArtifactKind::Model,
                url: get("CARDIOSURV_MODEL_URL").unwrap_or(defaults.model.url),
                file_name: defaults.model.file_name,
                sha256: get("CARDIOSURV_MODEL_SHA256").map(|v| v.to_ascii_lowercase()),
            },
            features: ArtifactSpec {
                kind: ArtifactKind::FeatureSchema,
                url: get("CARDIOSURV_FEATURES_URL").unwrap_or(defaults.features.url),
                file_name: defaults.features.file_name,
                sha256: get("CARDIOSURV_FEATURES_SHA256").map(|v| v.to_ascii_lowercase()),
            },
        }
    }

    /// Local path of the cached model file.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.cache_dir.join(&self.model.file_name)
    }

    /// Local path of the cached feature schema file.
    #[must_use]
    pub fn features_path(&self) -> PathBuf {
        self.cache_dir.join(&self.features.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_environment() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.model_path(), PathBuf::from("./rsf_model.json"));
        assert_eq!(config.features_path(), PathBuf::from("./model_features.json"));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CARDIOSURV_CACHE_DIR", "/var/cache/cardiosurv"),
            ("CARDIOSURV_MODEL_URL", "https://example.org/rsf.json"),
            ("CARDIOSURV_MODEL_SHA256", "ABCDEF"),
            ("CARDIOSURV_FEATURES_URL", "  "),
        ]);
        let config = AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/cardiosurv"));
        assert_eq!(config.model.url, "https://example.org/rsf.json");
        assert_eq!(config.model.sha256.as_deref(), Some("abcdef"));
        // Blank values fall back to the default.
        assert_eq!(config.features.url, DEFAULT_FEATURES_URL);
        assert_eq!(config.features.sha256, None);
        // File names are fixed.
        assert_eq!(config.model.file_name, MODEL_FILE_NAME);
    }
}
