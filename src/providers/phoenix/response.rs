// Catalog response interpretation: multirequest results to MediaEntry.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::request::{AssetRequest, ResultLayout};
use super::transport::CatalogResponse;
use crate::entry::{DrmParams, DrmScheme, MediaEntry, MediaEntryType, MediaFormat, MediaSource};
use crate::error::{ErrorKind, ErrorValue};
use crate::providers::{AssetType, PlaybackContextType};

const API_EXCEPTION_OBJECT_TYPE: &str = "KalturaAPIException";
const LIVE_ASSET_OBJECT_TYPE: &str = "KalturaLiveAsset";
const RECORDING_ASSET_OBJECT_TYPE: &str = "KalturaRecordingAsset";
const ACCESS_OK: &str = "OK";

/// API exception codes meaning the requested object does not exist
const NOT_FOUND_CODES: &[&str] = &["500007", "4024", "3001"];
/// API exception codes meaning the session token was rejected
const INVALID_SESSION_CODES: &[&str] = &["500016", "500015", "1016"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaybackContext {
    #[serde(default)]
    pub sources: Vec<PlaybackSource>,
    #[serde(default)]
    pub messages: Vec<AccessControlMessage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSource {
    pub id: i64,
    /// Media file type name, e.g. "Mobile_Devices_Main_HD"
    #[serde(rename = "type", default)]
    pub file_type: String,
    /// Streamer format, e.g. "applehttp", "mpegdash", "url"
    #[serde(default)]
    pub format: String,
    pub url: String,
    /// Seconds
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub drm: Vec<PlaybackDrm>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackDrm {
    pub scheme: String,
    #[serde(rename = "licenseURL", default)]
    pub license_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessControlMessage {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub entry_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub external_ids: Option<String>,
    #[serde(default)]
    pub tags: Map<String, Value>,
    #[serde(default)]
    pub metas: Map<String, Value>,
    #[serde(default)]
    pub images: Vec<Thumbnail>,
    #[serde(default)]
    pub recording_id: Option<Value>,
    #[serde(default)]
    pub recording_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// Interpret a multirequest reply for `asset` laid out as `layout`.
pub fn parse_entry(
    response: &CatalogResponse,
    asset: &AssetRequest,
    layout: &ResultLayout,
) -> Result<MediaEntry, ErrorValue> {
    if !response.is_success() {
        return Err(ErrorValue::transport(format!(
            "catalog returned HTTP {}",
            response.status
        )));
    }

    let body: Value = serde_json::from_str(&response.body)
        .map_err(|e| ErrorValue::parse(format!("catalog response is not JSON: {}", e)))?;

    let results = match body.get("result") {
        Some(Value::Array(items)) => items.as_slice(),
        Some(result @ Value::Object(_)) => {
            if let Some(error) = api_exception(result) {
                return Err(error);
            }
            // Some backends answer a one-call multirequest with a bare object
            std::slice::from_ref(result)
        }
        _ => return Err(ErrorValue::parse("catalog response has no 'result'")),
    };

    if let Some(error) = results.iter().find_map(api_exception) {
        return Err(error);
    }

    if results.len() < layout.expected_len() {
        return Err(ErrorValue::parse(format!(
            "expected {} results in multirequest response, got {}",
            layout.expected_len(),
            results.len()
        )));
    }

    if let Some(idx) = layout.login {
        let ks = results[idx].get("ks").and_then(Value::as_str).unwrap_or_default();
        if ks.is_empty() {
            return Err(ErrorValue::session("anonymous login returned no session token"));
        }
    }

    let context: PlaybackContext = serde_json::from_value(results[layout.playback_context].clone())
        .map_err(|e| ErrorValue::parse(format!("invalid playback context: {}", e)))?;

    check_access(&context)?;

    let media_asset = layout
        .asset
        .map(|idx| {
            serde_json::from_value::<MediaAsset>(results[idx].clone())
                .map_err(|e| ErrorValue::parse(format!("invalid asset: {}", e)))
        })
        .transpose()?;

    Ok(build_entry(asset, context, media_asset.as_ref()))
}

/// Classify an API exception found in a result item, if any.
fn api_exception(item: &Value) -> Option<ErrorValue> {
    let error = match item.get("error") {
        Some(error @ Value::Object(_)) => error,
        _ if item.get("objectType").and_then(Value::as_str) == Some(API_EXCEPTION_OBJECT_TYPE) => item,
        _ => return None,
    };

    let code = error.get("code").map(value_to_string).unwrap_or_default();
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or("unknown error")
        .to_string();

    let kind = classify_api_error(&code, &message);
    warn!("Catalog API exception {} ({}): {}", code, kind, message);
    Some(ErrorValue::new(kind, message).with_code(code))
}

fn classify_api_error(code: &str, message: &str) -> ErrorKind {
    let lowered = message.to_lowercase();
    if NOT_FOUND_CODES.contains(&code) || lowered.contains("not found") || lowered.contains("does not exist") {
        ErrorKind::NotFound
    } else if INVALID_SESSION_CODES.contains(&code) || lowered.contains("ks expired") || lowered.contains("invalid ks") {
        ErrorKind::SessionFailure
    } else {
        ErrorKind::Generic
    }
}

fn check_access(context: &PlaybackContext) -> Result<(), ErrorValue> {
    match context
        .messages
        .iter()
        .find(|m| m.code.as_deref() != Some(ACCESS_OK))
    {
        Some(denied) => {
            let code = denied.code.clone().unwrap_or_else(|| "Unavailable".to_string());
            let message = denied.message.clone().unwrap_or_else(|| "unknown error".to_string());
            Err(ErrorValue::access_denied(message).with_code(code))
        }
        None => Ok(()),
    }
}

/// Map the streamer format name to a media format; `None` for unplayable ones.
pub fn source_format(format: &str, url: &str, has_drm: bool) -> Option<MediaFormat> {
    match format {
        "applehttp" => Some(MediaFormat::Hls),
        "mpegdash" => Some(MediaFormat::Dash),
        "url" if has_drm => Some(MediaFormat::Wvm),
        "url" => match MediaFormat::from_url(url) {
            Some(MediaFormat::Mp3) => Some(MediaFormat::Mp3),
            _ => Some(MediaFormat::Mp4),
        },
        _ => None,
    }
}

fn build_entry(
    asset: &AssetRequest,
    context: PlaybackContext,
    media_asset: Option<&MediaAsset>,
) -> MediaEntry {
    let filter = &asset.source_filter;
    let mut max_duration: u64 = 0;
    let mut sources = Vec::with_capacity(context.sources.len());

    for source in context.sources {
        let id = source.id.to_string();
        if !filter.is_empty() && !filter.contains(&source.file_type) && !filter.contains(&id) {
            continue;
        }

        let Some(format) = source_format(&source.format, &source.url, !source.drm.is_empty()) else {
            debug!("Skipping source {} with unsupported format '{}'", id, source.format);
            continue;
        };

        let protected = !source.drm.is_empty();
        let drm: Vec<DrmParams> = source
            .drm
            .into_iter()
            .map(|drm| DrmParams {
                scheme: DrmScheme::from_backend(&drm.scheme),
                license_url: drm.license_url,
            })
            .filter(|drm| drm.scheme != DrmScheme::Unknown)
            .collect();

        // A protected source is only playable with at least one known scheme
        if protected && drm.is_empty() {
            debug!("Skipping source {} with no supported DRM scheme", id);
            continue;
        }

        max_duration = max_duration.max(source.duration);
        sources.push(MediaSource {
            id,
            format: Some(format),
            url: source.url,
            drm,
        });
    }

    let metadata = media_asset
        .map(|media| asset_metadata(media, asset.asset_type))
        .unwrap_or_default();

    MediaEntry {
        id: asset.asset_id.clone(),
        name: media_asset.and_then(|media| media.name.clone()),
        media_type: entry_type(asset, media_asset),
        duration_ms: max_duration.saturating_mul(1000),
        is_vr: metadata.get("tags").is_some_and(|tags| tags == "360"),
        metadata,
        sources,
    }
}

fn entry_type(asset: &AssetRequest, media_asset: Option<&MediaAsset>) -> MediaEntryType {
    let start_over_epg =
        asset.asset_type == AssetType::Epg && asset.context_type == PlaybackContextType::StartOver;
    if start_over_epg {
        return MediaEntryType::DvrLive;
    }

    let Some(media) = media_asset else {
        return MediaEntryType::Vod;
    };

    let live_object = media.object_type.as_deref() == Some(LIVE_ASSET_OBJECT_TYPE);
    let live_external_id = media
        .external_ids
        .as_deref()
        .filter(|ids| !ids.is_empty() && ids.chars().all(|c| c.is_ascii_digit()))
        .and_then(|ids| ids.parse::<u64>().ok())
        .is_some_and(|id| id != 0);

    if live_object || live_external_id {
        MediaEntryType::Live
    } else {
        MediaEntryType::Vod
    }
}

fn asset_metadata(media: &MediaAsset, asset_type: AssetType) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();

    // tags: { "Genre": { "objects": [ { "value": "Drama" }, ... ] } }; the last value wins
    for (key, tag) in &media.tags {
        let Some(fields) = tag.as_object() else { continue };
        for values in fields.values().filter_map(Value::as_array) {
            for value in values {
                if let Some(v) = wrapped_value(value) {
                    metadata.insert(key.clone(), v);
                }
            }
        }
    }

    // metas: { "Year": { "value": 2012 } }
    for (key, meta) in &media.metas {
        if let Some(v) = wrapped_value(meta) {
            metadata.insert(key.clone(), v);
        }
    }

    for image in &media.images {
        metadata.insert(format!("{}X{}", image.width, image.height), image.url.clone());
    }

    metadata.insert("assetId".to_string(), media.id.to_string());
    if let Some(entry_id) = media.entry_id.as_deref().filter(|id| !id.is_empty()) {
        metadata.insert("entryId".to_string(), entry_id.to_string());
    }
    if let Some(name) = &media.name {
        metadata.insert("name".to_string(), name.clone());
    }
    if let Some(description) = &media.description {
        metadata.insert("description".to_string(), description.clone());
    }
    metadata.insert("assetType".to_string(), asset_type.value().to_string());

    if media.object_type.as_deref() == Some(RECORDING_ASSET_OBJECT_TYPE) {
        if let Some(recording_id) = &media.recording_id {
            metadata.insert("recordingId".to_string(), value_to_string(recording_id));
        }
        if let Some(recording_type) = &media.recording_type {
            metadata.insert("recordingType".to_string(), recording_type.clone());
        }
    }

    metadata
}

/// Extract `value` from a `{ "value": ... }` wrapper object.
fn wrapped_value(wrapper: &Value) -> Option<String> {
    match wrapper.as_object()?.get("value")? {
        Value::Null => None,
        value => Some(value_to_string(value)),
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
