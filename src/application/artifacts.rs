//! Artifact fetching and loading.
//!
//! Startup makes sure the survival forest and its feature schema exist in the
//! cache directory (downloading whatever is missing), then deserializes both.
//! Any failure here is fatal: the form cannot work without them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::adapters::forest::{ForestError, RandomSurvivalForest};
use crate::config::{AppConfig, ArtifactKind, ArtifactSpec};
use crate::domain::FeatureSchema;
use crate::ports::{ArtifactSource, FetchError, SurvivalModel};

/// Errors raised while fetching or loading artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("Cannot load survival model: {0}")]
    Model(#[from] ForestError),

    #[error("Malformed feature schema in {}: {message}", .path.display())]
    Schema { path: PathBuf, message: String },

    #[error("Model and feature schema are incompatible: {0}")]
    Incompatible(String),
}

impl ArtifactError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What [`ArtifactFetcher::ensure`] did for one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The file was already cached; nothing was retrieved.
    Cached,
    /// The file was missing and has been downloaded.
    Downloaded { bytes: usize },
}

/// Local paths of both artifacts once they are known to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub features: PathBuf,
}

/// Deserialized artifacts, ready for inference.
#[derive(Debug, Clone)]
pub struct LoadedArtifacts {
    pub model: RandomSurvivalForest,
    pub schema: FeatureSchema,
}

/// Ensures artifacts are present in a cache directory.
pub struct ArtifactFetcher<S: ArtifactSource> {
    source: S,
    cache_dir: PathBuf,
}

impl<S: ArtifactSource> ArtifactFetcher<S> {
    pub fn new(source: S, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            cache_dir: cache_dir.into(),
        }
    }

    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Make sure one artifact is cached, downloading it if absent.
    ///
    /// Safe to call on every start: an existing file is never fetched again.
    /// Downloaded bytes must parse as the artifact's kind before anything is
    /// written; they then go to `<file>.part` and are renamed into place.
    ///
    /// # Errors
    /// Returns `ArtifactError` on download failure, checksum mismatch,
    /// unparseable contents or a filesystem error.
    pub fn ensure(&self, spec: &ArtifactSpec) -> Result<FetchOutcome, ArtifactError> {
        let path = self.cache_dir.join(&spec.file_name);

        if path.exists() {
            if let Some(expected) = &spec.sha256 {
                let bytes = fs::read(&path).map_err(|e| ArtifactError::io(&path, e))?;
                verify_checksum(&spec.file_name, &bytes, expected)?;
            }
            tracing::info!("Using cached artifact {:?}", path);
            return Ok(FetchOutcome::Cached);
        }

        fs::create_dir_all(&self.cache_dir).map_err(|e| ArtifactError::io(&self.cache_dir, e))?;

        tracing::info!("Downloading {} from {}", spec.file_name, spec.url);
        let bytes = self.source.fetch(&spec.url)?;

        if let Some(expected) = &spec.sha256 {
            verify_checksum(&spec.file_name, &bytes, expected)?;
        }
        check_contents(spec, &path, &bytes)?;

        let partial = self.cache_dir.join(format!("{}.part", spec.file_name));
        fs::write(&partial, &bytes).map_err(|e| ArtifactError::io(&partial, e))?;
        fs::rename(&partial, &path).map_err(|e| ArtifactError::io(&path, e))?;

        tracing::info!("Saved {} ({} bytes) to {:?}", spec.file_name, bytes.len(), path);
        Ok(FetchOutcome::Downloaded { bytes: bytes.len() })
    }

    /// Ensure both artifacts named by the configuration.
    ///
    /// # Errors
    /// See [`ArtifactFetcher::ensure`].
    pub fn ensure_all(&self, config: &AppConfig) -> Result<ArtifactPaths, ArtifactError> {
        self.ensure(&config.model)?;
        self.ensure(&config.features)?;
        Ok(ArtifactPaths {
            model: self.cache_dir.join(&config.model.file_name),
            features: self.cache_dir.join(&config.features.file_name),
        })
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn verify_checksum(file: &str, bytes: &[u8], expected: &str) -> Result<(), ArtifactError> {
    let actual = sha256_hex(bytes);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(ArtifactError::ChecksumMismatch {
            file: file.to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Reject downloaded bytes that the loader could never read.
fn check_contents(spec: &ArtifactSpec, path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    match spec.kind {
        ArtifactKind::Model => {
            RandomSurvivalForest::from_json_slice(bytes)?;
        }
        ArtifactKind::FeatureSchema => {
            parse_feature_schema(path, bytes)?;
        }
    }
    Ok(())
}

fn parse_feature_schema(path: &Path, bytes: &[u8]) -> Result<FeatureSchema, ArtifactError> {
    serde_json::from_slice(bytes).map_err(|e| ArtifactError::Schema {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load the feature schema (a JSON array of column names).
///
/// # Errors
/// Returns `ArtifactError` if the file cannot be read or is not a valid,
/// duplicate-free, non-empty list of names.
pub fn load_feature_schema(path: &Path) -> Result<FeatureSchema, ArtifactError> {
    let bytes = fs::read(path).map_err(|e| ArtifactError::io(path, e))?;
    let schema = parse_feature_schema(path, &bytes)?;

    tracing::info!("Loaded feature schema from {:?} ({} columns)", path, schema.len());
    Ok(schema)
}

/// Deserialize both artifacts and check they belong together.
///
/// # Errors
/// Returns `ArtifactError` if either file is malformed or the model's input
/// width or feature names disagree with the schema.
pub fn load_artifacts(paths: &ArtifactPaths) -> Result<LoadedArtifacts, ArtifactError> {
    let model = RandomSurvivalForest::load(&paths.model)?;
    let schema = load_feature_schema(&paths.features)?;
    check_compatible(&model, &schema)?;
    Ok(LoadedArtifacts { model, schema })
}

/// Check a model against the schema it will be fed with.
///
/// # Errors
/// Returns `ArtifactError::Incompatible` on a width or name mismatch.
pub fn check_compatible<M: SurvivalModel>(
    model: &M,
    schema: &FeatureSchema,
) -> Result<(), ArtifactError> {
    if model.n_features() != schema.len() {
        return Err(ArtifactError::Incompatible(format!(
            "model expects {} features, schema lists {}",
            model.n_features(),
            schema.len()
        )));
    }

    if let Some(names) = model.feature_names() {
        if names != schema.columns() {
            return Err(ArtifactError::Incompatible(
                "model feature names differ from the feature schema".into(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tempfile::tempdir;

    const SCHEMA_JSON: &str = r#"["Age", "Sex_Woman"]"#;

    const FOREST_JSON: &str = r#"{
        "n_features": 2,
        "unique_times": [1.0, 5.0],
        "trees": [ { "nodes": [ { "survival": [0.97, 0.92] } ] } ]
    }"#;

    /// In-memory source that counts requests per URL.
    struct FakeSource {
        files: HashMap<String, Vec<u8>>,
        requests: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn new(files: &[(&str, &str)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.as_bytes().to_vec()))
                    .collect(),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.borrow().len()
        }
    }

    impl ArtifactSource for &FakeSource {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.requests.borrow_mut().push(url.to_string());
            self.files.get(url).cloned().ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    fn config(dir: &Path) -> AppConfig {
        AppConfig {
            cache_dir: dir.to_path_buf(),
            model: ArtifactSpec {
                kind: ArtifactKind::Model,
                url: "mem://model".into(),
                file_name: "rsf_model.json".into(),
                sha256: None,
            },
            features: ArtifactSpec {
                kind: ArtifactKind::FeatureSchema,
                url: "mem://features".into(),
                file_name: "model_features.json".into(),
                sha256: None,
            },
        }
    }

    fn source() -> FakeSource {
        FakeSource::new(&[("mem://model", FOREST_JSON), ("mem://features", SCHEMA_JSON)])
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let dir = tempdir().expect("tempdir");
        let source = source();
        let config = config(dir.path());
        let fetcher = ArtifactFetcher::new(&source, dir.path());

        let first = fetcher.ensure(&config.model).expect("first ensure");
        assert_eq!(
            first,
            FetchOutcome::Downloaded {
                bytes: FOREST_JSON.len()
            }
        );
        let second = fetcher.ensure(&config.model).expect("second ensure");
        assert_eq!(second, FetchOutcome::Cached);
        assert_eq!(source.request_count(), 1);

        fetcher.ensure_all(&config).expect("ensure all");
        fetcher.ensure_all(&config).expect("ensure all again");
        assert_eq!(source.request_count(), 2);
        assert!(!dir.path().join("rsf_model.json.part").exists());
    }

    #[test]
    fn test_existing_file_is_never_fetched() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("model_features.json"), SCHEMA_JSON).expect("write");
        let source = source();
        let config = config(dir.path());

        let outcome = ArtifactFetcher::new(&source, dir.path())
            .ensure(&config.features)
            .expect("ensure");
        assert_eq!(outcome, FetchOutcome::Cached);
        assert_eq!(source.request_count(), 0);
    }

    #[test]
    fn test_fetch_failure_is_fatal_and_leaves_nothing_behind() {
        let dir = tempdir().expect("tempdir");
        let source = FakeSource::new(&[]);
        let config = config(dir.path());

        let err = ArtifactFetcher::new(&source, dir.path())
            .ensure(&config.model)
            .unwrap_err();
        assert!(matches!(err, ArtifactError::Fetch(FetchError::Status { status: 404, .. })));
        assert!(!dir.path().join("rsf_model.json").exists());
    }

    #[test]
    fn test_checksum_pinning() {
        let dir = tempdir().expect("tempdir");
        let source = source();
        let mut config = config(dir.path());
        let fetcher = ArtifactFetcher::new(&source, dir.path());

        config.features.sha256 = Some("00".repeat(32));
        let err = fetcher.ensure(&config.features).unwrap_err();
        assert!(matches!(err, ArtifactError::ChecksumMismatch { .. }));
        assert!(!dir.path().join("model_features.json").exists());

        config.features.sha256 = Some(sha256_hex(SCHEMA_JSON.as_bytes()).to_uppercase());
        fetcher.ensure(&config.features).expect("matching digest");
        // Cached copy is verified too.
        fetcher.ensure(&config.features).expect("cached digest");
    }

    #[test]
    fn test_unparseable_download_is_not_cached() {
        let dir = tempdir().expect("tempdir");
        let mut config = config(dir.path());
        let pickled = FakeSource::new(&[
            ("mem://model", "\u{80}\u{4}pickled forest"),
            ("mem://features", "\u{80}\u{4}pickled list"),
        ]);
        let fetcher = ArtifactFetcher::new(&pickled, dir.path());

        assert!(matches!(
            fetcher.ensure(&config.model),
            Err(ArtifactError::Model(_))
        ));
        assert!(matches!(
            fetcher.ensure(&config.features),
            Err(ArtifactError::Schema { .. })
        ));
        assert!(!dir.path().join("rsf_model.json").exists());
        assert!(!dir.path().join("model_features.json").exists());
        assert!(!dir.path().join("model_features.json.part").exists());

        // Pointing at a JSON export afterwards downloads it instead of
        // reporting a cached file.
        config.model.url = "mem://model.json".into();
        config.features.url = "mem://features.json".into();
        let exports = FakeSource::new(&[
            ("mem://model.json", FOREST_JSON),
            ("mem://features.json", SCHEMA_JSON),
        ]);
        let fetcher = ArtifactFetcher::new(&exports, dir.path());
        assert_eq!(
            fetcher.ensure(&config.features).expect("schema export"),
            FetchOutcome::Downloaded {
                bytes: SCHEMA_JSON.len()
            }
        );
        let paths = fetcher.ensure_all(&config).expect("ensure all");
        assert!(load_artifacts(&paths).is_ok());
    }

    #[test]
    fn test_creates_missing_cache_dir() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("a").join("b");
        let source = source();
        let config = config(&nested);

        let paths = ArtifactFetcher::new(&source, &nested)
            .ensure_all(&config)
            .expect("ensure all");
        assert!(paths.model.exists());
        assert!(paths.features.exists());
    }

    #[test]
    fn test_load_artifacts() {
        let dir = tempdir().expect("tempdir");
        let source = source();
        let paths = ArtifactFetcher::new(&source, dir.path())
            .ensure_all(&config(dir.path()))
            .expect("ensure all");

        let loaded = load_artifacts(&paths).expect("load");
        assert_eq!(loaded.schema.columns(), &["Age".to_string(), "Sex_Woman".to_string()]);
        assert_eq!(loaded.model.n_features, 2);
    }

    #[test]
    fn test_load_rejects_malformed_and_incompatible() {
        let dir = tempdir().expect("tempdir");
        let model = dir.path().join("rsf_model.json");
        let features = dir.path().join("model_features.json");
        let paths = ArtifactPaths {
            model: model.clone(),
            features: features.clone(),
        };

        std::fs::write(&model, FOREST_JSON).expect("write");
        std::fs::write(&features, b"\x80\x04pickle").expect("write");
        assert!(matches!(
            load_artifacts(&paths),
            Err(ArtifactError::Schema { .. })
        ));

        std::fs::write(&features, r#"["Age", "Sex_Woman", "HDL"]"#).expect("write");
        assert!(matches!(
            load_artifacts(&paths),
            Err(ArtifactError::Incompatible(_))
        ));

        std::fs::write(&model, "{}").expect("write");
        assert!(matches!(load_artifacts(&paths), Err(ArtifactError::Model(_))));
    }
}
