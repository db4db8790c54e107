//! Contract between the negotiation core and the wrapped per-call layer.
//!
//! The core owns handshake, negotiation and routing; everything the layer
//! does with individual API calls lives behind `WrappedLayer`.

use crate::abi::{GetInstanceProcAddrFn, VoidFunction, XrInstance, XrInstanceCreateInfo};
use crate::error::LayerResult;
use std::ffi::CStr;

/// Per-instance interception logic plugged into the core.
///
/// Setup methods run once, before the state is published; afterwards only
/// `resolve` is called, possibly from several threads.
pub trait WrappedLayer: Send + Sync {
    fn set_downstream_resolver(&mut self, resolver: GetInstanceProcAddrFn, instance: XrInstance);

    fn set_granted_extensions(&mut self, extensions: Vec<String>);

    /// Runs after the downstream instance exists. Receives the application's
    /// unfiltered create info.
    fn on_instance_created(&mut self, create_info: &XrInstanceCreateInfo) -> LayerResult<()>;

    /// Resolves any symbol not overridden by the core.
    fn resolve(&self, instance: XrInstance, name: &CStr) -> LayerResult<VoidFunction>;
}

/// Builds one fresh collaborator per created instance.
pub type WrappedLayerFactory = Box<dyn Fn() -> Box<dyn WrappedLayer> + Send + Sync>;
