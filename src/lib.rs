//! Media entry resolution
//!
//! Resolves an asset identifier into a playable `MediaEntry` (sources, DRM,
//! metadata) through interchangeable backends: a remote OTT catalog or a
//! local JSON fixture dataset.

pub mod cli;
pub mod config;
pub mod entry;
pub mod error;
pub mod providers;
pub mod result;
pub mod session;

pub use entry::{DrmParams, DrmScheme, MediaEntry, MediaEntryType, MediaFormat, MediaSource};
pub use error::{ErrorKind, ErrorValue, MediaProviderError, Result};
pub use providers::{
    FixtureProvider, LoadHandle, MediaEntryProvider, PhoenixMediaProvider, ProviderConfig,
    ProviderFactory, ProviderImplementation,
};
pub use result::ResultEnvelope;
pub use session::{SessionContext, StaticSessionContext};
