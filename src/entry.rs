use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Normalized description of a playable asset, produced by every backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub media_type: MediaEntryType,
    /// Duration in milliseconds, 0 when unknown.
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub is_vr: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Deliverable variants in the order the backend reported them.
    #[serde(default)]
    pub sources: Vec<MediaSource>,
}

impl MediaEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            media_type: MediaEntryType::Unknown,
            duration_ms: 0,
            is_vr: false,
            metadata: BTreeMap::new(),
            sources: Vec::new(),
        }
    }

    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }
}

/// One deliverable variant of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSource {
    pub id: String,
    #[serde(default)]
    pub format: Option<MediaFormat>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drm: Vec<DrmParams>,
}

/// DRM descriptor as reported by a backend. Carried as data only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrmParams {
    pub scheme: DrmScheme,
    #[serde(default)]
    pub license_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrmScheme {
    Widevine,
    WidevineClassic,
    PlayReady,
    FairPlay,
    Unknown,
}

impl DrmScheme {
    pub fn from_backend(scheme: &str) -> Self {
        match scheme.to_uppercase().as_str() {
            "WIDEVINE_CENC" | "DRM.WIDEVINE_CENC" => Self::Widevine,
            "WIDEVINE" | "WIDEVINE.WIDEVINE" | "WIDEVINE_CLASSIC" => Self::WidevineClassic,
            "PLAYREADY_CENC" | "DRM.PLAYREADY_CENC" | "PLAYREADY" => Self::PlayReady,
            "FAIRPLAY" | "FAIRPLAY.FAIRPLAY" => Self::FairPlay,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Dash,
    Hls,
    Wvm,
    Mp4,
    Mp3,
}

impl MediaFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Dash => "application/dash+xml",
            Self::Hls => "application/x-mpegURL",
            Self::Wvm => "video/wvm",
            Self::Mp4 => "video/mp4",
            Self::Mp3 => "audio/mpeg",
        }
    }

    /// Infer the format from the path extension of a URL, ignoring query and fragment.
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let last_segment = path.rsplit('/').next().unwrap_or(path);
        let (_, extension) = last_segment.rsplit_once('.')?;

        match extension.to_lowercase().as_str() {
            "mpd" => Some(Self::Dash),
            "m3u8" => Some(Self::Hls),
            "wvm" => Some(Self::Wvm),
            "mp4" => Some(Self::Mp4),
            "mp3" => Some(Self::Mp3),
            _ => None,
        }
    }

    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        [Self::Dash, Self::Hls, Self::Wvm, Self::Mp4, Self::Mp3]
            .into_iter()
            .find(|format| format.mime_type().eq_ignore_ascii_case(mime_type))
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "dash" => Some(Self::Dash),
            "hls" => Some(Self::Hls),
            "wvm" => Some(Self::Wvm),
            "mp4" => Some(Self::Mp4),
            "mp3" => Some(Self::Mp3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MediaEntryType {
    Vod,
    Live,
    DvrLive,
    #[default]
    Unknown,
}

impl MediaEntryType {
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "vod" => Self::Vod,
            "live" => Self::Live,
            "dvrlive" => Self::DvrLive,
            _ => Self::Unknown,
        }
    }
}
