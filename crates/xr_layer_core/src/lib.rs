//! Negotiation and call-routing core of an OpenXR API layer.
//!
//! Validates the loader handshake, negotiates the extension set forwarded
//! down the layer chain, creates the downstream instance, and routes symbol
//! lookups to local overrides or to the wrapped per-call layer.

pub mod abi;
pub mod catalog;
pub mod chain;
pub mod config;
pub mod error;
pub mod handshake;
pub mod invoker;
pub mod layer;
pub mod logging;
pub mod negotiator;
pub mod registry;
pub mod reporter;
pub mod router;
pub mod wrapped;

pub use catalog::{
    discover_available_extensions, ExtensionCatalog, ExtensionRecord, VersionPolicy,
};
pub use config::{ConfigError, LayerConfig};
pub use error::{LayerError, LayerResult};
pub use layer::{ApiLayer, LayerExports};
pub use logging::{default_log_level, init_logging, logging_status};
pub use negotiator::{negotiate, NegotiatedExtensionSet};
pub use registry::{InstanceRegistry, LayerInstanceState};
pub use router::LocalSymbol;
pub use wrapped::{WrappedLayer, WrappedLayerFactory};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
