//! Exported C-ABI entry points.
//!
//! # Responsibility
//! - Expose the loader-facing functions under their OpenXR symbol names.
//! - Build the process-wide layer once from the embedded configuration.
//! - Start file logging once, from environment overrides or defaults.
//!
//! # Invariants
//! - Exported functions never unwind into the loader.
//! - A layer that failed to build answers every call with a failure code.

#![allow(non_snake_case)]

use crate::passthrough::PassthroughLayer;
use log::{error, info};
use once_cell::sync::Lazy;
use std::ffi::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::OnceLock;
use xr_layer_core::abi::{
    PfnVoidFunction, XrApiLayerCreateInfo, XrApiLayerProperties, XrExtensionProperties,
    XrInstance, XrInstanceCreateInfo, XrNegotiateApiLayerRequest, XrNegotiateLoaderInfo,
    XrResult, XR_ERROR_FUNCTION_UNSUPPORTED, XR_ERROR_INITIALIZATION_FAILED,
    XR_ERROR_RUNTIME_FAILURE,
};
use xr_layer_core::{default_log_level, init_logging, ApiLayer, LayerConfig, LayerExports};

const LAYER_CONFIG_JSON: &str = include_str!("../layer_config.json");
const LOG_DIR_ENV: &str = "XR_APILAYER_LOG_DIR";
const LOG_LEVEL_ENV: &str = "XR_APILAYER_LOG_LEVEL";
const LOG_DIR_NAME: &str = "xr_apilayer_logs";

static LOGGING: OnceLock<Result<(), String>> = OnceLock::new();
static LAYER: Lazy<Option<ApiLayer>> = Lazy::new(build_layer);

/// Returns the process-wide layer, building it on first use.
///
/// `None` means the embedded configuration was rejected; the reason is logged.
pub fn layer() -> Option<&'static ApiLayer> {
    ensure_logging();
    LAYER.as_ref()
}

/// Outcome of the one-time logging bootstrap, once it has run.
pub fn logging_outcome() -> Option<&'static Result<(), String>> {
    LOGGING.get()
}

/// Function pointers handed to the loader and returned by local overrides.
pub fn exports() -> LayerExports {
    LayerExports {
        get_instance_proc_addr: xrGetInstanceProcAddr,
        create_api_layer_instance: xrCreateApiLayerInstance,
        enumerate_api_layer_properties: xrEnumerateApiLayerProperties,
        enumerate_instance_extension_properties: xrEnumerateInstanceExtensionProperties,
    }
}

fn build_layer() -> Option<ApiLayer> {
    let built = LayerConfig::from_json_str(LAYER_CONFIG_JSON).and_then(|config| {
        ApiLayer::new(
            config,
            exports(),
            Box::new(|| Box::new(PassthroughLayer::default())),
        )
    });
    match built {
        Ok(layer) => {
            info!(
                "event=layer_ready module=api status=ok layer={} version={}",
                layer.config().layer_name,
                layer.config().layer_version
            );
            Some(layer)
        }
        Err(err) => {
            error!(
                "event=layer_ready module=api status=error error={}",
                err
            );
            None
        }
    }
}

fn ensure_logging() {
    LOGGING.get_or_init(|| {
        let level = env_override(LOG_LEVEL_ENV).unwrap_or_else(|| default_log_level().to_string());
        let log_dir = env_override(LOG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(LOG_DIR_NAME));
        init_logging(&level, &log_dir.to_string_lossy())
    });
}

fn env_override(name: &str) -> Option<String> {
    let raw = std::env::var(name).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Runs `body` against the layer, converting a missing layer or a panic into
/// a result code.
fn guard(unavailable: XrResult, body: impl FnOnce(&ApiLayer) -> XrResult) -> XrResult {
    catch_unwind(AssertUnwindSafe(|| match layer() {
        Some(layer) => body(layer),
        None => unavailable,
    }))
    .unwrap_or(XR_ERROR_RUNTIME_FAILURE)
}

/// Loader negotiation entry point.
///
/// # Safety
/// Called by the OpenXR loader with loader-owned structures.
#[no_mangle]
pub unsafe extern "system" fn xrNegotiateLoaderApiLayerInterface(
    loader_info: *const XrNegotiateLoaderInfo,
    layer_name: *const c_char,
    api_layer_request: *mut XrNegotiateApiLayerRequest,
) -> XrResult {
    guard(XR_ERROR_INITIALIZATION_FAILED, |layer| {
        layer.negotiate_loader_interface(loader_info, layer_name, api_layer_request)
    })
}

/// # Safety
/// Called by the loader (or the previous layer) with a valid layer chain.
#[no_mangle]
pub unsafe extern "system" fn xrCreateApiLayerInstance(
    instance_create_info: *const XrInstanceCreateInfo,
    api_layer_info: *const XrApiLayerCreateInfo,
    instance: *mut XrInstance,
) -> XrResult {
    guard(XR_ERROR_INITIALIZATION_FAILED, |layer| {
        layer.create_api_layer_instance(instance_create_info, api_layer_info, instance)
    })
}

/// # Safety
/// `name` must be null or NUL-terminated; `function` null or writable.
#[no_mangle]
pub unsafe extern "system" fn xrGetInstanceProcAddr(
    instance: XrInstance,
    name: *const c_char,
    function: *mut PfnVoidFunction,
) -> XrResult {
    if let Some(function) = function.as_mut() {
        *function = None;
    }
    guard(XR_ERROR_FUNCTION_UNSUPPORTED, |layer| {
        layer.get_instance_proc_addr(instance, name, function)
    })
}

/// # Safety
/// Follows the two-call enumeration contract for its pointer arguments.
#[no_mangle]
pub unsafe extern "system" fn xrEnumerateInstanceExtensionProperties(
    layer_name: *const c_char,
    property_capacity_input: u32,
    property_count_output: *mut u32,
    properties: *mut XrExtensionProperties,
) -> XrResult {
    guard(XR_ERROR_RUNTIME_FAILURE, |layer| {
        layer.enumerate_instance_extension_properties(
            layer_name,
            property_capacity_input,
            property_count_output,
            properties,
        )
    })
}

/// # Safety
/// Follows the two-call enumeration contract for its pointer arguments.
#[no_mangle]
pub unsafe extern "system" fn xrEnumerateApiLayerProperties(
    property_capacity_input: u32,
    property_count_output: *mut u32,
    properties: *mut XrApiLayerProperties,
) -> XrResult {
    guard(XR_ERROR_RUNTIME_FAILURE, |layer| {
        layer.enumerate_api_layer_properties(property_capacity_input, property_count_output, properties)
    })
}
