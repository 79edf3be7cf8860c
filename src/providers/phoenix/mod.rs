// Remote OTT catalog backend
//
// A load runs three phases in order:
// - Session: one `session_token()` call; failure stops the load
// - Fetch: a single multirequest carrying playback context and asset calls
// - Map: HTTP status, API exceptions and payload into a `MediaEntry`

pub mod request;
pub mod response;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tracing::{debug, info, warn};

pub use request::{AssetRequest, ResultLayout};
pub use transport::{CatalogRequest, CatalogResponse, CatalogTransport, HttpTransport};

use super::{
    AssetReferenceType, AssetType, LoadHandle, MediaEntryProvider, PlaybackContextType, Protocol,
    ProviderConfig, UrlType,
};
use crate::config::CatalogConfig;
use crate::entry::MediaEntry;
use crate::error::{ErrorValue, Result};
use crate::result::ResultEnvelope;
use crate::session::{SessionContext, StaticSessionContext};

const DEFAULT_API_VERSION: &str = "5.2.6";

/// Everything a load needs, fixed at `load()` time.
#[derive(Clone)]
struct LoadPlan {
    session: Arc<dyn SessionContext>,
    base_url: String,
    asset: AssetRequest,
}

/// Media entry provider backed by the OTT catalog API.
pub struct PhoenixMediaProvider {
    config: ProviderConfig,
    transport: Arc<dyn CatalogTransport>,
    api_version: String,
    require_formats: bool,
    allow_anonymous: bool,
}

impl PhoenixMediaProvider {
    pub fn new() -> Self {
        Self {
            config: ProviderConfig::new(),
            transport: Arc::new(HttpTransport::default()),
            api_version: DEFAULT_API_VERSION.to_string(),
            require_formats: false,
            allow_anonymous: false,
        }
    }

    /// Provider wired from the `[catalog]` config section with a static session.
    pub fn from_config(catalog: &CatalogConfig) -> Result<Self> {
        let transport = HttpTransport::new(Duration::from_secs(catalog.timeout_secs))?;
        let session = StaticSessionContext::new(&catalog.base_url, catalog.partner_id, &catalog.ks);

        let mut provider = Self::new()
            .with_transport(Arc::new(transport))
            .with_session(Arc::new(session))
            .with_formats(catalog.formats.clone())
            .require_formats(catalog.require_formats)
            .allow_anonymous(catalog.allow_anonymous);
        provider.api_version = catalog.api_version.clone();

        if let Some(protocol) = catalog.protocol {
            provider.config.protocol(protocol);
        }
        if let Some(referrer) = &catalog.referrer {
            provider.config.referrer(referrer.clone());
        }

        Ok(provider)
    }

    pub fn with_session(mut self, session: Arc<dyn SessionContext>) -> Self {
        self.config.session(session);
        self
    }

    pub fn with_static_session(
        self,
        base_url: impl Into<String>,
        partner_id: i64,
        token: impl Into<String>,
    ) -> Self {
        self.with_session(Arc::new(StaticSessionContext::new(base_url, partner_id, token)))
    }

    pub fn with_asset_id(mut self, asset_id: impl Into<String>) -> Self {
        self.config.asset_id(asset_id);
        self
    }

    pub fn with_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.formats(formats);
        self
    }

    pub fn with_file_ids<I, S>(mut self, file_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.file_ids(file_ids);
        self
    }

    pub fn with_context_type(mut self, context_type: PlaybackContextType) -> Self {
        self.config.context_type(context_type);
        self
    }

    pub fn with_asset_type(mut self, asset_type: AssetType) -> Self {
        self.config.asset_type(asset_type);
        self
    }

    pub fn with_asset_reference_type(mut self, reference_type: AssetReferenceType) -> Self {
        self.config.asset_reference_type(reference_type);
        self
    }

    pub fn with_url_type(mut self, url_type: UrlType) -> Self {
        self.config.url_type(url_type);
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.config.protocol(protocol);
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.config.referrer(referrer);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn CatalogTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Reject loads that do not name at least one format.
    pub fn require_formats(mut self, required: bool) -> Self {
        self.require_formats = required;
        self
    }

    /// Log in anonymously instead of failing when the session token is empty.
    pub fn allow_anonymous(mut self, allowed: bool) -> Self {
        self.allow_anonymous = allowed;
        self
    }

    /// Check the snapshot and resolve every default. No I/O happens here.
    fn plan(config: &ProviderConfig, require_formats: bool) -> std::result::Result<LoadPlan, ErrorValue> {
        if config.asset_id.trim().is_empty() {
            return Err(ErrorValue::invalid_params("asset id is required"));
        }
        if require_formats && config.formats.is_empty() {
            return Err(ErrorValue::invalid_params("at least one format is required"));
        }

        let session = config
            .session
            .clone()
            .ok_or_else(|| ErrorValue::invalid_params("session context is required"))?;

        let base_url = session.base_url();
        let parsed = Url::parse(&base_url)
            .map_err(|e| ErrorValue::invalid_params(format!("invalid base URL '{}': {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ErrorValue::invalid_params(format!(
                "unsupported base URL scheme '{}'",
                parsed.scheme()
            )));
        }

        let context_type = config.context_type.unwrap_or(PlaybackContextType::Playback);
        let asset_type = config
            .asset_type
            .unwrap_or_else(|| context_type.default_asset_type());
        let reference_type = config
            .asset_reference_type
            .or_else(|| asset_type.default_reference_type());

        let protocol = match config.protocol {
            Some(Protocol::All) => None,
            Some(protocol) => Some(protocol.value().to_string()),
            None => Some(parsed.scheme().to_string()),
        };

        Ok(LoadPlan {
            session,
            base_url,
            asset: AssetRequest {
                asset_id: config.asset_id.trim().to_string(),
                asset_type,
                reference_type,
                context_type,
                url_type: config.url_type.unwrap_or(UrlType::PlayManifest),
                protocol,
                file_ids: config.file_ids.clone(),
                referrer: config.referrer.clone(),
                source_filter: config.source_filter().to_vec(),
            },
        })
    }

    async fn resolve(
        plan: std::result::Result<LoadPlan, ErrorValue>,
        transport: Arc<dyn CatalogTransport>,
        api_version: String,
        allow_anonymous: bool,
    ) -> ResultEnvelope<MediaEntry> {
        let plan = match plan {
            Ok(plan) => plan,
            Err(e) => {
                warn!("Rejected catalog load: {}", e.message);
                return ResultEnvelope::Failure(e);
            }
        };

        debug!("Requesting session token");
        let ks = match plan.session.session_token().await {
            Ok(token) if !token.is_empty() => Some(token),
            Ok(_) if allow_anonymous => {
                debug!("Empty session token; falling back to anonymous login");
                None
            }
            Ok(_) => {
                return ResultEnvelope::Failure(ErrorValue::session("session token is empty"));
            }
            Err(e) => {
                warn!("Session token request failed: {}", e);
                return ResultEnvelope::Failure(ErrorValue::session(e.message));
            }
        };

        let (request, layout) = request::build_multirequest(
            &plan.base_url,
            &api_version,
            plan.session.partner_id(),
            ks.as_deref(),
            &plan.asset,
        );
        debug!("Fetching asset {} via {}", plan.asset.asset_id, request.url);

        let response = match transport.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Catalog request failed: {}", e);
                return ResultEnvelope::Failure(e);
            }
        };

        debug!("Mapping catalog response, HTTP {}", response.status);
        match response::parse_entry(&response, &plan.asset, &layout) {
            Ok(entry) => {
                info!(
                    "Resolved catalog asset {} with {} sources",
                    entry.id,
                    entry.sources.len()
                );
                ResultEnvelope::Success(entry)
            }
            Err(e) => {
                warn!("Catalog asset {} failed: {}", plan.asset.asset_id, e);
                ResultEnvelope::Failure(e)
            }
        }
    }
}

impl Default for PhoenixMediaProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaEntryProvider for PhoenixMediaProvider {
    fn name(&self) -> &'static str {
        "phoenix"
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut ProviderConfig {
        &mut self.config
    }

    fn load(&self) -> LoadHandle {
        let plan = Self::plan(&self.config, self.require_formats);
        LoadHandle::spawn(
            self.name(),
            Self::resolve(
                plan,
                Arc::clone(&self.transport),
                self.api_version.clone(),
                self.allow_anonymous,
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use transport::MockCatalogTransport;

    const BASE_URL: &str = "https://ott.example.com/api_v3/";

    /// Session that counts token requests.
    struct CountingSession {
        base_url: String,
        token: std::result::Result<String, ErrorValue>,
        calls: AtomicUsize,
    }

    impl CountingSession {
        fn new(token: std::result::Result<&str, ErrorValue>) -> Arc<Self> {
            Arc::new(Self {
                base_url: BASE_URL.to_string(),
                token: token.map(str::to_string),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SessionContext for CountingSession {
        fn base_url(&self) -> String {
            self.base_url.clone()
        }

        fn partner_id(&self) -> i64 {
            198
        }

        async fn session_token(&self) -> std::result::Result<String, ErrorValue> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.token.clone()
        }
    }

    fn stub_payload() -> String {
        json!({
            "result": [
                {
                    "objectType": "KalturaPlaybackContext",
                    "sources": [
                        { "id": 101, "type": "Mobile_Main", "format": "applehttp", "url": "https://cdn.example.com/101/a.m3u8", "duration": 600 },
                        { "id": 102, "type": "Web_HD", "format": "mpegdash", "url": "https://cdn.example.com/102/a.mpd", "duration": 601 },
                        { "id": 103, "type": "Mobile_Main", "format": "url", "url": "https://cdn.example.com/103/a.mp4", "duration": 599 }
                    ],
                    "messages": [{ "code": "OK", "message": "OK" }]
                },
                { "objectType": "KalturaMediaAsset", "id": 480989, "name": "Big Buck Bunny", "tags": {}, "metas": {} }
            ]
        })
        .to_string()
    }

    fn stub_transport(times: usize) -> MockCatalogTransport {
        let mut transport = MockCatalogTransport::new();
        transport
            .expect_execute()
            .times(times)
            .returning(|_| Ok(CatalogResponse { status: 200, body: stub_payload() }));
        transport
    }

    fn provider(transport: MockCatalogTransport, session: Arc<dyn SessionContext>) -> PhoenixMediaProvider {
        PhoenixMediaProvider::new()
            .with_transport(Arc::new(transport))
            .with_session(session)
            .with_asset_id("480989")
    }

    #[tokio::test]
    async fn test_well_formed_payload_resolves_entry() {
        let session = CountingSession::new(Ok("ks-token"));
        let provider = provider(stub_transport(1), session.clone()).with_formats(["Mobile_Main"]);

        let entry = provider.load().await.into_result().unwrap();
        assert_eq!(entry.id, "480989");
        assert_eq!(entry.name.as_deref(), Some("Big Buck Bunny"));
        let ids: Vec<_> = entry.sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["101", "103"]);
        assert_eq!(entry.duration_ms, 600_000);
        assert_eq!(session.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_repeated_loads_are_identical() {
        let provider = provider(stub_transport(2), CountingSession::new(Ok("ks-token")));

        let first = provider.load().await.into_result().unwrap();
        let second = provider.load().await.into_result().unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.sources, second.sources);
    }

    #[tokio::test]
    async fn test_session_failure_skips_fetch() {
        let session = CountingSession::new(Err(ErrorValue::generic("token service down")));
        let provider = provider(stub_transport(0), session.clone());

        let envelope = provider.load().await;
        assert_eq!(envelope.error().map(|e| e.kind()), Some(ErrorKind::SessionFailure));
        assert_eq!(session.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_token_is_session_failure() {
        let provider = provider(stub_transport(0), CountingSession::new(Ok("")));
        let envelope = provider.load().await;
        assert_eq!(envelope.error().map(|e| e.kind()), Some(ErrorKind::SessionFailure));
    }

    #[tokio::test]
    async fn test_empty_token_with_anonymous_login() {
        let mut transport = MockCatalogTransport::new();
        transport
            .expect_execute()
            .withf(|request| {
                request.body.get("ks").is_none()
                    && request.body["1"]["action"] == "anonymousLogin"
                    && request.body["2"]["ks"] == "{1:result:ks}"
            })
            .times(1)
            .returning(|_| {
                let mut body: serde_json::Value = serde_json::from_str(&stub_payload()).unwrap();
                if let Some(results) = body["result"].as_array_mut() {
                    results.insert(0, json!({ "objectType": "KalturaLoginSession", "ks": "anon" }));
                }
                Ok(CatalogResponse { status: 200, body: body.to_string() })
            });

        let provider = provider(transport, CountingSession::new(Ok(""))).allow_anonymous(true);
        let entry = provider.load().await.into_result().unwrap();
        assert_eq!(entry.sources.len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_params_never_touch_session_or_transport() {
        let session = CountingSession::new(Ok("ks-token"));

        let no_asset = provider(stub_transport(0), session.clone()).with_asset_id("");
        let envelope = no_asset.load().await;
        assert_eq!(envelope.error().map(|e| e.kind()), Some(ErrorKind::InvalidParams));

        let no_formats = provider(stub_transport(0), session.clone()).require_formats(true);
        let envelope = no_formats.load().await;
        assert_eq!(envelope.error().map(|e| e.kind()), Some(ErrorKind::InvalidParams));

        let no_session = PhoenixMediaProvider::new()
            .with_transport(Arc::new(stub_transport(0)))
            .with_asset_id("480989");
        let envelope = no_session.load().await;
        assert_eq!(envelope.error().map(|e| e.kind()), Some(ErrorKind::InvalidParams));

        let bad_url = PhoenixMediaProvider::new()
            .with_transport(Arc::new(stub_transport(0)))
            .with_static_session("not a url", 198, "ks-token")
            .with_asset_id("480989");
        let envelope = bad_url.load().await;
        assert_eq!(envelope.error().map(|e| e.kind()), Some(ErrorKind::InvalidParams));

        assert_eq!(session.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_response_failures_are_classified() {
        let cases = [
            (CatalogResponse { status: 404, body: String::new() }, ErrorKind::TransportFailure),
            (CatalogResponse { status: 200, body: "not json".to_string() }, ErrorKind::ParseFailure),
            (
                CatalogResponse {
                    status: 200,
                    body: json!({
                        "result": { "error": { "objectType": "KalturaAPIException", "code": "500007", "message": "Asset not found" } }
                    })
                    .to_string(),
                },
                ErrorKind::NotFound,
            ),
        ];

        for (response, expected) in cases {
            let mut transport = MockCatalogTransport::new();
            transport
                .expect_execute()
                .times(1)
                .returning(move |_| Ok(response.clone()));

            let provider = provider(transport, CountingSession::new(Ok("ks-token")));
            let envelope = provider.load().await;
            assert_eq!(envelope.error().map(|e| e.kind()), Some(expected));
        }
    }

    #[tokio::test]
    async fn test_transport_error_passes_through() {
        let mut transport = MockCatalogTransport::new();
        transport
            .expect_execute()
            .times(1)
            .returning(|_| Err(ErrorValue::transport("connection reset")));

        let provider = provider(transport, CountingSession::new(Ok("ks-token")));
        let envelope = provider.load().await;
        assert_eq!(envelope.error().map(|e| e.kind()), Some(ErrorKind::TransportFailure));
    }

    #[tokio::test]
    async fn test_request_carries_resolved_defaults() {
        let mut transport = MockCatalogTransport::new();
        transport
            .expect_execute()
            .withf(|request| {
                let call = &request.body["1"];
                request.url == "https://ott.example.com/api_v3/service/multirequest"
                    && request.body["ks"] == "ks-token"
                    && call["assetType"] == "epg"
                    && call["contextDataParams"]["context"] == "CATCHUP"
                    && call["contextDataParams"]["urlType"] == "PLAYMANIFEST"
                    && call["contextDataParams"]["mediaProtocol"] == "https"
                    && request.body["2"]["assetReferenceType"] == "epg_internal"
            })
            .times(1)
            .returning(|_| Ok(CatalogResponse { status: 200, body: stub_payload() }));

        let provider = provider(transport, CountingSession::new(Ok("ks-token")))
            .with_context_type(PlaybackContextType::Catchup);
        assert!(provider.load().await.is_success());
    }

    #[tokio::test]
    async fn test_protocol_all_is_omitted() {
        let mut transport = MockCatalogTransport::new();
        transport
            .expect_execute()
            .withf(|request| request.body["1"]["contextDataParams"].get("mediaProtocol").is_none())
            .times(1)
            .returning(|_| Ok(CatalogResponse { status: 200, body: stub_payload() }));

        let provider = provider(transport, CountingSession::new(Ok("ks-token")))
            .with_protocol(Protocol::All);
        assert!(provider.load().await.is_success());
    }

    /// Stub that answers with the playback context plus an asset whose
    /// catalog id differs from the requested one.
    fn echo_transport(times: usize) -> MockCatalogTransport {
        let mut transport = MockCatalogTransport::new();
        transport.expect_execute().times(times).returning(|request| {
            let requested = request.body["1"]["assetId"].as_str().unwrap_or_default().to_string();
            let body = json!({
                "result": [
                    { "sources": [], "messages": [] },
                    { "objectType": "KalturaProgramAsset", "id": 98765, "name": requested }
                ]
            });
            Ok(CatalogResponse { status: 200, body: body.to_string() })
        });
        transport
    }

    #[tokio::test]
    async fn test_reconfiguration_during_load_keeps_snapshot() {
        let mut provider = provider(echo_transport(2), CountingSession::new(Ok("ks-token")))
            .with_asset_reference_type(AssetReferenceType::ExternalEpg);

        provider.set_asset_id("ext-epg-abc");
        let first = provider.load();
        provider.set_asset_id("ext-epg-xyz");
        let second = provider.load();

        let first = first.await.into_result().unwrap();
        let second = second.await.into_result().unwrap();
        assert_eq!(first.id, "ext-epg-abc");
        assert_eq!(first.name.as_deref(), Some("ext-epg-abc"));
        assert_eq!(second.id, "ext-epg-xyz");
        assert_eq!(second.name.as_deref(), Some("ext-epg-xyz"));
        assert_eq!(first.metadata["assetId"], "98765");
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_provider_times_out_on_stalled_backend() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_delay(Duration::from_secs(120)))
            .mount(&server)
            .await;

        let provider = PhoenixMediaProvider::new()
            .with_static_session(server.uri(), 198, "ks-token")
            .with_asset_id("480989");
        let outcome = tokio::time::timeout(Duration::from_secs(45), provider.load()).await;

        let envelope = outcome.expect("load never completed");
        assert_eq!(envelope.error().map(|e| e.kind()), Some(ErrorKind::TransportFailure));
    }

    #[test]
    fn test_from_config_applies_catalog_section() {
        let mut catalog = crate::config::Config::default().catalog;
        catalog.formats = vec!["Mobile_Main".to_string()];
        catalog.protocol = Some(Protocol::Http);
        catalog.require_formats = true;

        let provider = PhoenixMediaProvider::from_config(&catalog).unwrap();
        assert_eq!(provider.config().formats, ["Mobile_Main"]);
        assert_eq!(provider.config().protocol, Some(Protocol::Http));
        assert!(provider.require_formats);
        assert!(provider.config().session.is_some());
    }
}
