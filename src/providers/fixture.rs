// Fixture backend: resolves entries from a local JSON dataset.
// The dataset is read and parsed once, at construction.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{LoadHandle, MediaEntryProvider, ProviderConfig};
use crate::config::FixtureConfig;
use crate::entry::{DrmParams, DrmScheme, MediaEntry, MediaEntryType, MediaFormat, MediaSource};
use crate::error::ErrorValue;
use crate::result::ResultEnvelope;

/// Entry record as stored in a fixture dataset
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureRecord {
    id: Option<String>,
    name: Option<String>,
    /// Milliseconds
    duration: Option<u64>,
    media_type: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    #[serde(default)]
    sources: Vec<FixtureSource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureSource {
    id: String,
    url: String,
    mime_type: Option<String>,
    media_format: Option<String>,
    #[serde(default)]
    drm_data: Vec<FixtureDrm>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureDrm {
    scheme: String,
    license_uri: Option<String>,
}

/// Read-only mapping from asset id to entry.
#[derive(Debug, Default)]
pub struct FixtureDataset {
    entries: HashMap<String, MediaEntry>,
}

impl FixtureDataset {
    /// Parse a dataset document. The document is either a map of asset id to
    /// entry record, or a single entry record carrying its own `id`.
    pub fn from_value(document: Value) -> Result<Self, ErrorValue> {
        let Value::Object(map) = document else {
            return Err(ErrorValue::generic("fixture dataset must be a JSON object"));
        };

        let single_id = map
            .get("id")
            .and_then(Value::as_str)
            .filter(|_| map.get("sources").is_some_and(Value::is_array))
            .map(str::to_string);

        let records: Vec<(String, Value)> = match single_id {
            Some(id) => vec![(id, Value::Object(map))],
            None => map.into_iter().collect(),
        };

        let mut entries = HashMap::with_capacity(records.len());
        for (asset_id, value) in records {
            let record: FixtureRecord = serde_json::from_value(value).map_err(|e| {
                ErrorValue::generic(format!("invalid fixture record '{}': {}", asset_id, e))
            })?;
            let entry = Self::to_entry(&asset_id, record);
            entries.insert(asset_id, entry);
        }

        Ok(Self { entries })
    }

    pub fn get(&self, asset_id: &str) -> Option<&MediaEntry> {
        self.entries.get(asset_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn to_entry(asset_id: &str, record: FixtureRecord) -> MediaEntry {
        if let Some(record_id) = record.id.as_deref().filter(|id| *id != asset_id) {
            debug!("Fixture record id '{}' differs from key '{}'; using key", record_id, asset_id);
        }

        // Sources without a recognizable URL fall back to the first source's mime type
        let fallback_format = record
            .sources
            .first()
            .and_then(|s| s.mime_type.as_deref())
            .and_then(MediaFormat::from_mime_type);

        let sources = record
            .sources
            .into_iter()
            .map(|source| {
                let format = source
                    .media_format
                    .as_deref()
                    .and_then(MediaFormat::from_name)
                    .or_else(|| MediaFormat::from_url(&source.url))
                    .or(fallback_format);

                MediaSource {
                    id: source.id,
                    format,
                    url: source.url,
                    drm: source
                        .drm_data
                        .into_iter()
                        .map(|drm| DrmParams {
                            scheme: DrmScheme::from_backend(&drm.scheme),
                            license_url: drm.license_uri,
                        })
                        .collect(),
                }
            })
            .collect();

        MediaEntry {
            id: asset_id.to_string(),
            name: record.name,
            media_type: record
                .media_type
                .as_deref()
                .map(MediaEntryType::from_name)
                .unwrap_or_default(),
            duration_ms: record.duration.unwrap_or(0),
            is_vr: false,
            metadata: record.metadata,
            sources,
        }
    }
}

/// Media entry provider backed by a pre-loaded fixture dataset.
///
/// A dataset that fails to load is remembered: every load on this instance
/// then fails with `Generic`, and the file is not read again.
pub struct FixtureProvider {
    dataset: Result<Arc<FixtureDataset>, ErrorValue>,
    config: ProviderConfig,
}

impl FixtureProvider {
    /// Load the dataset at `path`. When `scope` is given, the file is read from
    /// the `scope` subdirectory next to it (`dir/scope/file`).
    pub fn from_file<P: AsRef<Path>>(path: P, scope: Option<&str>) -> Self {
        let path = Self::scoped_path(path.as_ref(), scope);
        info!("Loading fixture dataset: {}", path.display());

        let dataset = std::fs::read_to_string(&path)
            .map_err(|e| {
                ErrorValue::generic(format!("failed to read fixture dataset {}: {}", path.display(), e))
            })
            .and_then(|content| {
                serde_json::from_str::<Value>(&content).map_err(|e| {
                    ErrorValue::generic(format!("failed to parse fixture dataset {}: {}", path.display(), e))
                })
            })
            .and_then(FixtureDataset::from_value);

        Self::with_dataset(dataset)
    }

    pub fn from_json(document: Value) -> Self {
        Self::with_dataset(FixtureDataset::from_value(document))
    }

    pub fn from_json_str(document: &str) -> Self {
        let dataset = serde_json::from_str::<Value>(document)
            .map_err(|e| ErrorValue::generic(format!("failed to parse fixture dataset: {}", e)))
            .and_then(FixtureDataset::from_value);
        Self::with_dataset(dataset)
    }

    pub fn from_config(config: &FixtureConfig) -> Self {
        Self::from_file(&config.dataset, config.scope.as_deref())
    }

    pub fn with_asset_id(mut self, asset_id: impl Into<String>) -> Self {
        self.config.asset_id(asset_id);
        self
    }

    /// Whether the dataset loaded successfully.
    pub fn is_ready(&self) -> bool {
        self.dataset.is_ok()
    }

    fn with_dataset(dataset: Result<FixtureDataset, ErrorValue>) -> Self {
        match &dataset {
            Ok(data) => debug!("Fixture dataset ready with {} entries", data.len()),
            Err(e) => warn!("Fixture dataset unavailable: {}", e),
        }
        Self {
            dataset: dataset.map(Arc::new),
            config: ProviderConfig::new(),
        }
    }

    fn scoped_path(path: &Path, scope: Option<&str>) -> PathBuf {
        match (scope, path.file_name()) {
            (Some(scope), Some(file_name)) => path
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(scope)
                .join(file_name),
            _ => path.to_path_buf(),
        }
    }

    async fn resolve(
        dataset: Result<Arc<FixtureDataset>, ErrorValue>,
        asset_id: String,
    ) -> ResultEnvelope<MediaEntry> {
        let dataset = match dataset {
            Ok(dataset) => dataset,
            Err(e) => return ResultEnvelope::Failure(e),
        };

        match dataset.get(&asset_id) {
            Some(entry) => {
                debug!("Fixture entry found: {}", asset_id);
                ResultEnvelope::Success(entry.clone())
            }
            None => {
                debug!("Fixture entry not found: {}", asset_id);
                ResultEnvelope::Failure(ErrorValue::not_found(format!(
                    "entry '{}' not found in fixture dataset",
                    asset_id
                )))
            }
        }
    }
}

impl MediaEntryProvider for FixtureProvider {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut ProviderConfig {
        &mut self.config
    }

    fn load(&self) -> LoadHandle {
        let dataset = self.dataset.clone();
        let asset_id = self.config.asset_id.clone();
        LoadHandle::spawn(self.name(), Self::resolve(dataset, asset_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use assert_fs::prelude::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::oneshot;

    fn dataset_path() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/entries.playkit.json")
    }

    #[tokio::test]
    async fn test_known_entry_resolves_with_first_source() {
        let provider = FixtureProvider::from_file(dataset_path(), None).with_asset_id("1_1h1vsv3z");

        let envelope = provider.load().await;
        assert!(envelope.is_success());
        assert!(envelope.error().is_none());

        let entry = envelope.response().unwrap();
        assert_eq!(entry.id, "1_1h1vsv3z");
        assert_eq!(entry.sources[0].id, "1_ude4l5pb");
        assert_eq!(entry.sources[0].format, Some(MediaFormat::Dash));
        assert_eq!(entry.sources[0].drm[0].scheme, DrmScheme::Widevine);
        assert_eq!(entry.sources[1].format, Some(MediaFormat::Hls));
        assert_eq!(entry.media_type, MediaEntryType::Vod);
    }

    #[tokio::test]
    async fn test_missing_entry_is_not_found() {
        let provider = FixtureProvider::from_file(dataset_path(), None).with_asset_id("notexists");

        let envelope = provider.load().await;
        assert!(!envelope.is_success());
        assert_eq!(envelope.error().map(|e| e.kind()), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_reconfigured_loads_are_independent() {
        let mut provider = FixtureProvider::from_file(dataset_path(), None);

        let first = provider.set_asset_id("harold").load();
        let second = provider.set_asset_id("1_1h1vsv3z").load();
        let third = provider.set_asset_id("notexists").load();

        let first = first.await;
        let second = second.await;
        let third = third.await;

        assert_eq!(first.response().unwrap().id, "harold");
        assert_eq!(second.response().unwrap().id, "1_1h1vsv3z");
        assert_eq!(third.error().unwrap(), &ErrorValue::not_found(""));
    }

    #[tokio::test]
    async fn test_identical_loads_are_idempotent() {
        let provider = FixtureProvider::from_file(dataset_path(), None).with_asset_id("1_1h1vsv3z");

        let first = provider.load().await.into_result().unwrap();
        let second = provider.load().await.into_result().unwrap();

        assert_eq!(first.id, second.id);
        let first_ids: Vec<_> = first.sources.iter().map(|s| &s.id).collect();
        let second_ids: Vec<_> = second.sources.iter().map(|s| &s.id).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[tokio::test]
    async fn test_every_present_id_resolves_to_itself() {
        let provider = FixtureProvider::from_file(dataset_path(), None);
        let dataset = provider.dataset.clone().unwrap();

        for asset_id in dataset.entries.keys() {
            let mut provider = FixtureProvider::from_file(dataset_path(), None);
            let envelope = provider.set_asset_id(asset_id).load().await;
            assert_eq!(&envelope.response().unwrap().id, asset_id);
        }
    }

    #[tokio::test]
    async fn test_entry_without_sources_is_success() {
        let provider = FixtureProvider::from_file(dataset_path(), None).with_asset_id("empty_entry");

        let entry = provider.load().await.into_result().unwrap();
        assert!(!entry.has_sources());
    }

    #[tokio::test]
    async fn test_format_falls_back_to_mime_type() {
        let provider = FixtureProvider::from_file(dataset_path(), None).with_asset_id("harold");

        let entry = provider.load().await.into_result().unwrap();
        assert_eq!(entry.sources[0].format, Some(MediaFormat::Hls));
        assert_eq!(entry.media_type, MediaEntryType::Live);
    }

    #[tokio::test]
    async fn test_missing_dataset_fails_generic_every_time() {
        let mut provider = FixtureProvider::from_file("/nonexistent/entries.json", None);
        assert!(!provider.is_ready());

        let first = provider.set_asset_id("1_1h1vsv3z").load().await;
        let second = provider.set_asset_id("harold").load().await;

        assert_eq!(first.error().map(|e| e.kind()), Some(ErrorKind::Generic));
        assert_eq!(second.error().map(|e| e.kind()), Some(ErrorKind::Generic));
    }

    #[tokio::test]
    async fn test_unparsable_dataset_fails_generic() {
        let provider = FixtureProvider::from_json_str("{ not json").with_asset_id("a");

        let envelope = provider.load().await;
        assert_eq!(envelope.error().map(|e| e.kind()), Some(ErrorKind::Generic));
    }

    #[tokio::test]
    async fn test_dataset_is_read_only_once() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"a": {"id": "a", "sources": []}}"#).unwrap();

        let mut provider = FixtureProvider::from_file(file.path(), None);
        std::fs::write(file.path(), r#"{"b": {"id": "b", "sources": []}}"#).unwrap();

        assert!(provider.set_asset_id("a").load().await.is_success());
        let envelope = provider.set_asset_id("b").load().await;
        assert_eq!(envelope.error().map(|e| e.kind()), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_scope_selects_partition_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("tenant-a/entries.json")
            .write_str(r#"{"only_a": {"id": "only_a", "sources": []}}"#)
            .unwrap();
        temp.child("entries.json")
            .write_str(r#"{"root": {"id": "root", "sources": []}}"#)
            .unwrap();

        let dataset = temp.path().join("entries.json");
        let scoped = FixtureProvider::from_file(&dataset, Some("tenant-a")).with_asset_id("only_a");
        let unscoped = FixtureProvider::from_file(&dataset, None).with_asset_id("only_a");

        assert!(scoped.load().await.is_success());
        assert_eq!(
            unscoped.load().await.error().map(|e| e.kind()),
            Some(ErrorKind::NotFound)
        );
    }

    #[tokio::test]
    async fn test_single_entry_document() {
        let provider = FixtureProvider::from_json(json!({
            "id": "solo",
            "sources": [{ "id": "s1", "url": "https://cdn.example.com/solo.mp4" }]
        }))
        .with_asset_id("solo");

        let entry = provider.load().await.into_result().unwrap();
        assert_eq!(entry.id, "solo");
        assert_eq!(entry.sources[0].format, Some(MediaFormat::Mp4));
    }

    #[tokio::test]
    async fn test_callback_runs_after_load_with_returns() {
        let provider = FixtureProvider::from_file(dataset_path(), None).with_asset_id("1_1h1vsv3z");
        let returned = Arc::new(AtomicBool::new(false));
        let (tx, rx) = oneshot::channel();

        let flag = returned.clone();
        provider.load_with(Box::new(move |envelope| {
            let _ = tx.send((flag.load(Ordering::SeqCst), envelope));
        }));
        returned.store(true, Ordering::SeqCst);

        let (returned_before_callback, envelope) = rx.await.unwrap();
        assert!(returned_before_callback);
        assert!(envelope.is_success());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_loads_share_dataset() {
        let provider = FixtureProvider::from_file(dataset_path(), None);

        let mut handles = Vec::new();
        for _ in 0..16 {
            for asset_id in ["1_1h1vsv3z", "0_uka1msg4", "notexists"] {
                let mut config_provider = FixtureProvider {
                    dataset: provider.dataset.clone(),
                    config: ProviderConfig::new(),
                };
                handles.push((asset_id, config_provider.set_asset_id(asset_id).load()));
            }
        }

        for (asset_id, handle) in handles {
            let envelope = handle.await;
            if asset_id == "notexists" {
                assert_eq!(envelope.error().map(|e| e.kind()), Some(ErrorKind::NotFound));
            } else {
                assert_eq!(envelope.response().unwrap().id, asset_id);
            }
        }
    }
}
