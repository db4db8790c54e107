//! OpenXR API layer shared library.
//!
//! Exports the loader-facing entry points and owns the process-wide layer
//! built from the embedded configuration.

pub mod api;
pub mod passthrough;

pub use api::{
    layer, logging_outcome, xrCreateApiLayerInstance, xrEnumerateApiLayerProperties,
    xrEnumerateInstanceExtensionProperties, xrGetInstanceProcAddr,
    xrNegotiateLoaderApiLayerInterface,
};
pub use passthrough::PassthroughLayer;
