// Multirequest construction for the OTT catalog API.
//
// One HTTP call carries numbered sub-requests:
//   [ottUser.anonymousLogin]    only for anonymous sessions
//   asset.getPlaybackContext    sources, DRM and access-control messages
//   [asset.get]                 asset metadata, when a reference type applies
// Later sub-requests may reference the login result as "{1:result:ks}".

use serde_json::{Map, Value, json};

use super::transport::CatalogRequest;
use crate::providers::{AssetReferenceType, AssetType, PlaybackContextType, UrlType};

const ANONYMOUS_KS_REFERENCE: &str = "{1:result:ks}";

/// Fully resolved parameters of one catalog load; every default is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRequest {
    pub asset_id: String,
    pub asset_type: AssetType,
    pub reference_type: Option<AssetReferenceType>,
    pub context_type: PlaybackContextType,
    pub url_type: UrlType,
    /// `None` means no protocol filtering
    pub protocol: Option<String>,
    pub file_ids: Vec<String>,
    pub referrer: Option<String>,
    /// Formats or file ids a source must match; empty keeps all
    pub source_filter: Vec<String>,
}

/// Positions of each sub-request result inside the response list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultLayout {
    pub login: Option<usize>,
    pub playback_context: usize,
    pub asset: Option<usize>,
}

impl ResultLayout {
    pub fn expected_len(&self) -> usize {
        self.asset.unwrap_or(self.playback_context) + 1
    }
}

/// Ensure the API base ends with a slash so service paths append cleanly.
pub fn api_base_url(base_url: &str) -> String {
    if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{}/", base_url)
    }
}

/// Build the multirequest. `ks = None` requests an anonymous login first.
pub fn build_multirequest(
    base_url: &str,
    api_version: &str,
    partner_id: i64,
    ks: Option<&str>,
    asset: &AssetRequest,
) -> (CatalogRequest, ResultLayout) {
    let mut body = Map::new();
    body.insert("apiVersion".to_string(), json!(api_version));

    let mut calls: Vec<Value> = Vec::with_capacity(3);
    let request_ks = match ks {
        Some(ks) => {
            body.insert("ks".to_string(), json!(ks));
            ks.to_string()
        }
        None => {
            calls.push(anonymous_login(partner_id));
            ANONYMOUS_KS_REFERENCE.to_string()
        }
    };

    let login = ks.is_none().then_some(0);
    let playback_context = calls.len();
    calls.push(playback_context_call(&request_ks, asset));

    let asset_index = asset.reference_type.map(|reference_type| {
        calls.push(asset_get_call(&request_ks, &asset.asset_id, reference_type));
        calls.len() - 1
    });

    for (idx, call) in calls.into_iter().enumerate() {
        body.insert((idx + 1).to_string(), call);
    }

    let request = CatalogRequest {
        url: format!("{}service/multirequest", api_base_url(base_url)),
        body: Value::Object(body),
        tag: "asset-play-data-multireq",
    };

    let layout = ResultLayout {
        login,
        playback_context,
        asset: asset_index,
    };

    (request, layout)
}

fn anonymous_login(partner_id: i64) -> Value {
    json!({
        "service": "ottUser",
        "action": "anonymousLogin",
        "partnerId": partner_id,
    })
}

fn playback_context_call(ks: &str, asset: &AssetRequest) -> Value {
    let mut options = Map::new();
    options.insert("objectType".to_string(), json!("KalturaPlaybackContextOptions"));
    options.insert("context".to_string(), json!(asset.context_type.value()));
    options.insert("urlType".to_string(), json!(asset.url_type.value()));

    if let Some(protocol) = asset.protocol.as_deref().filter(|p| !p.is_empty()) {
        options.insert("mediaProtocol".to_string(), json!(protocol));
    }
    if !asset.file_ids.is_empty() {
        options.insert("assetFileIds".to_string(), json!(asset.file_ids.join(",")));
    }
    if let Some(referrer) = asset.referrer.as_deref().filter(|r| !r.is_empty()) {
        options.insert("referrer".to_string(), json!(referrer));
    }

    json!({
        "service": "asset",
        "action": "getPlaybackContext",
        "ks": ks,
        "assetId": asset.asset_id,
        "assetType": asset.asset_type.value(),
        "contextDataParams": Value::Object(options),
    })
}

fn asset_get_call(ks: &str, asset_id: &str, reference_type: AssetReferenceType) -> Value {
    json!({
        "service": "asset",
        "action": "get",
        "ks": ks,
        "id": asset_id,
        "assetReferenceType": reference_type.value(),
    })
}
