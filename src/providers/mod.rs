// Pluggable media entry providers
//
// Every backend implements `MediaEntryProvider`; callers hold a
// `Box<dyn MediaEntryProvider>` and never depend on a concrete backend:
// - Fixture: entries from a local JSON dataset (offline mode, tests)
// - Phoenix: entries from a remote OTT catalog
//
// To add a backend:
// 1. Implement an async resolve function taking a `ProviderConfig` snapshot
// 2. Implement `MediaEntryProvider::load` by spawning it with `LoadHandle::spawn`
// 3. Add the backend to `ProviderImplementation` and the factory

pub mod fixture;
pub mod options;
pub mod phoenix;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

pub use fixture::FixtureProvider;
pub use options::*;
pub use phoenix::PhoenixMediaProvider;

use crate::config::Config;
use crate::entry::MediaEntry;
use crate::error::{ErrorValue, Result};
use crate::result::ResultEnvelope;

/// Completion callback for `MediaEntryProvider::load_with`.
pub type OnComplete = Box<dyn FnOnce(ResultEnvelope<MediaEntry>) + Send + 'static>;

/// Common contract of all media entry backends.
pub trait MediaEntryProvider: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    fn config(&self) -> &ProviderConfig;

    fn config_mut(&mut self) -> &mut ProviderConfig;

    /// Start one resolution cycle with a snapshot of the current configuration.
    ///
    /// The work runs on a spawned Tokio task, so this must be called from
    /// within a Tokio runtime. The returned handle resolves exactly once.
    fn load(&self) -> LoadHandle;

    /// Callback flavor of `load`. The callback runs exactly once, on a
    /// runtime task, never inline in this call.
    fn load_with(&self, on_complete: OnComplete) -> Uuid {
        let handle = self.load();
        let load_id = handle.load_id();
        tokio::spawn(async move {
            on_complete(handle.await);
        });
        load_id
    }

    /// Point the provider at another asset, keeping everything else.
    fn set_asset_id(&mut self, asset_id: &str) -> &mut Self
    where
        Self: Sized,
    {
        self.config_mut().asset_id(asset_id);
        self
    }
}

/// In-flight load. Awaiting it yields the envelope; it never completes empty.
#[derive(Debug)]
pub struct LoadHandle {
    load_id: Uuid,
    task: JoinHandle<ResultEnvelope<MediaEntry>>,
}

impl LoadHandle {
    /// Spawn `resolve` as its own task, tagged with a fresh load id.
    pub fn spawn<F>(provider: &'static str, resolve: F) -> Self
    where
        F: Future<Output = ResultEnvelope<MediaEntry>> + Send + 'static,
    {
        let load_id = Uuid::new_v4();
        let span = info_span!("load", provider, load_id = %load_id);
        let task = tokio::spawn(resolve.instrument(span));
        debug!("{}: load {} started", provider, load_id);
        Self { load_id, task }
    }

    pub fn load_id(&self) -> Uuid {
        self.load_id
    }

    /// Abort the load. Awaiting the handle afterwards yields `Canceled`
    /// unless the load had already finished.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Future for LoadHandle {
    type Output = ResultEnvelope<MediaEntry>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let load_id = self.load_id;
        match Pin::new(&mut self.task).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(envelope)) => Poll::Ready(envelope),
            Poll::Ready(Err(e)) if e.is_cancelled() => {
                debug!("load {} canceled", load_id);
                Poll::Ready(ResultEnvelope::Failure(ErrorValue::canceled()))
            }
            Poll::Ready(Err(e)) => {
                warn!("load {} task failed: {}", load_id, e);
                Poll::Ready(ResultEnvelope::Failure(ErrorValue::generic(format!(
                    "load task failed: {}",
                    e
                ))))
            }
        }
    }
}

/// Provider backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderImplementation {
    Fixture,
    Phoenix,
}

/// Factory for creating providers from application configuration
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_provider(
        implementation: ProviderImplementation,
        config: &Config,
    ) -> Result<Box<dyn MediaEntryProvider>> {
        match implementation {
            ProviderImplementation::Fixture => {
                Ok(Box::new(FixtureProvider::from_config(&config.fixture)))
            }
            ProviderImplementation::Phoenix => {
                Ok(Box::new(PhoenixMediaProvider::from_config(&config.catalog)?))
            }
        }
    }
}
