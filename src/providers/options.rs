use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::MediaProviderError;
use crate::session::SessionContext;

/// Playback context the asset is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackContextType {
    Download,
    Trailer,
    Catchup,
    StartOver,
    Playback,
}

impl PlaybackContextType {
    pub fn value(&self) -> &'static str {
        match self {
            Self::Download => "DOWNLOAD",
            Self::Trailer => "TRAILER",
            Self::Catchup => "CATCHUP",
            Self::StartOver => "START_OVER",
            Self::Playback => "PLAYBACK",
        }
    }

    /// Asset type implied by the context when none was configured.
    pub fn default_asset_type(&self) -> AssetType {
        match self {
            Self::Playback | Self::Trailer | Self::Download => AssetType::Media,
            Self::StartOver | Self::Catchup => AssetType::Epg,
        }
    }
}

impl FromStr for PlaybackContextType {
    type Err = MediaProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "download" => Ok(Self::Download),
            "trailer" => Ok(Self::Trailer),
            "catchup" => Ok(Self::Catchup),
            "startover" => Ok(Self::StartOver),
            "playback" => Ok(Self::Playback),
            _ => Err(MediaProviderError::Config(format!(
                "Invalid context type '{}'. Valid types: download, trailer, catchup, start-over, playback",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetType {
    Media,
    Epg,
    Recording,
}

impl AssetType {
    pub fn value(&self) -> &'static str {
        match self {
            Self::Media => "media",
            Self::Epg => "epg",
            Self::Recording => "recording",
        }
    }

    /// Reference type implied by the asset type; recordings carry none.
    pub fn default_reference_type(&self) -> Option<AssetReferenceType> {
        match self {
            Self::Media => Some(AssetReferenceType::Media),
            Self::Epg => Some(AssetReferenceType::InternalEpg),
            Self::Recording => None,
        }
    }
}

impl FromStr for AssetType {
    type Err = MediaProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "media" => Ok(Self::Media),
            "epg" => Ok(Self::Epg),
            "recording" => Ok(Self::Recording),
            _ => Err(MediaProviderError::Config(format!(
                "Invalid asset type '{}'. Valid types: media, epg, recording",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetReferenceType {
    Media,
    InternalEpg,
    ExternalEpg,
    Npvr,
}

impl AssetReferenceType {
    pub fn value(&self) -> &'static str {
        match self {
            Self::Media => "media",
            Self::InternalEpg => "epg_internal",
            Self::ExternalEpg => "epg_external",
            Self::Npvr => "npvr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrlType {
    PlayManifest,
    Direct,
}

impl UrlType {
    pub fn value(&self) -> &'static str {
        match self {
            Self::PlayManifest => "PLAYMANIFEST",
            Self::Direct => "DIRECT",
        }
    }
}

/// Delivery protocol preference for returned sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
    /// Do not filter sources by protocol.
    All,
}

impl Protocol {
    pub fn value(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::All => "all",
        }
    }
}

impl FromStr for Protocol {
    type Err = MediaProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            "all" => Ok(Self::All),
            _ => Err(MediaProviderError::Config(format!(
                "Invalid protocol '{}'. Valid protocols: http, https, all",
                s
            ))),
        }
    }
}

/// Mutable request settings held by a provider.
///
/// Every `load` clones the current value, so changes made afterwards never
/// reach a load that is already running.
#[derive(Clone, Default)]
pub struct ProviderConfig {
    pub asset_id: String,
    pub formats: Vec<String>,
    pub file_ids: Vec<String>,
    pub context_type: Option<PlaybackContextType>,
    pub asset_type: Option<AssetType>,
    pub asset_reference_type: Option<AssetReferenceType>,
    pub url_type: Option<UrlType>,
    pub protocol: Option<Protocol>,
    pub referrer: Option<String>,
    pub session: Option<Arc<dyn SessionContext>>,
}

impl ProviderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asset_id(&mut self, asset_id: impl Into<String>) -> &mut Self {
        self.asset_id = asset_id.into();
        self
    }

    pub fn formats<I, S>(&mut self, formats: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.formats = formats.into_iter().map(Into::into).collect();
        self
    }

    pub fn file_ids<I, S>(&mut self, file_ids: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_ids = file_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn context_type(&mut self, context_type: PlaybackContextType) -> &mut Self {
        self.context_type = Some(context_type);
        self
    }

    pub fn asset_type(&mut self, asset_type: AssetType) -> &mut Self {
        self.asset_type = Some(asset_type);
        self
    }

    pub fn asset_reference_type(&mut self, reference_type: AssetReferenceType) -> &mut Self {
        self.asset_reference_type = Some(reference_type);
        self
    }

    pub fn url_type(&mut self, url_type: UrlType) -> &mut Self {
        self.url_type = Some(url_type);
        self
    }

    pub fn protocol(&mut self, protocol: Protocol) -> &mut Self {
        self.protocol = Some(protocol);
        self
    }

    pub fn referrer(&mut self, referrer: impl Into<String>) -> &mut Self {
        self.referrer = Some(referrer.into());
        self
    }

    pub fn session(&mut self, session: Arc<dyn SessionContext>) -> &mut Self {
        self.session = Some(session);
        self
    }

    /// Formats if any were requested, otherwise file ids. Empty means no filtering.
    pub fn source_filter(&self) -> &[String] {
        if !self.formats.is_empty() {
            &self.formats
        } else {
            &self.file_ids
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("asset_id", &self.asset_id)
            .field("formats", &self.formats)
            .field("file_ids", &self.file_ids)
            .field("context_type", &self.context_type)
            .field("asset_type", &self.asset_type)
            .field("asset_reference_type", &self.asset_reference_type)
            .field("url_type", &self.url_type)
            .field("protocol", &self.protocol)
            .field("referrer", &self.referrer)
            .field("session", &self.session.as_ref().map(|s| s.base_url()))
            .finish()
    }
}
