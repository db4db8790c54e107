//! Process-level layer object behind every exported entry point.
//!
//! # Responsibility
//! - Hold the validated config, the collaborator factory and live instances.
//! - Turn every internal outcome into one fixed result code.
//!
//! # Invariants
//! - No `LayerError` or panic escapes an entry method; callers get `XrResult`.
//! - Every failure is logged with the entry point name.

use crate::abi::{
    result_name, CreateApiLayerInstanceFn, EnumerateApiLayerPropertiesFn,
    EnumerateInstanceExtensionPropertiesFn, GetInstanceProcAddrFn, PfnVoidFunction,
    XrApiLayerCreateInfo, XrApiLayerProperties, XrExtensionProperties, XrInstance,
    XrInstanceCreateInfo, XrNegotiateApiLayerRequest, XrNegotiateLoaderInfo, XrResult, XR_SUCCESS,
};
use crate::config::{ConfigError, LayerConfig};
use crate::error::{LayerError, LayerResult};
use crate::handshake::{self, LayerEntryPoints};
use crate::invoker::InstanceChainInvoker;
use crate::registry::InstanceRegistry;
use crate::reporter;
use crate::router::{self, LocalOverrides};
use crate::wrapped::WrappedLayerFactory;
use log::{debug, error};
use std::ffi::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// The four functions this layer exports to the loader.
#[derive(Clone, Copy)]
pub struct LayerExports {
    pub get_instance_proc_addr: GetInstanceProcAddrFn,
    pub create_api_layer_instance: CreateApiLayerInstanceFn,
    pub enumerate_api_layer_properties: EnumerateApiLayerPropertiesFn,
    pub enumerate_instance_extension_properties: EnumerateInstanceExtensionPropertiesFn,
}

impl LayerExports {
    fn entry_points(&self) -> LayerEntryPoints {
        LayerEntryPoints {
            get_instance_proc_addr: self.get_instance_proc_addr,
            create_api_layer_instance: self.create_api_layer_instance,
        }
    }

    fn overrides(&self) -> LocalOverrides {
        LocalOverrides {
            enumerate_api_layer_properties: self.enumerate_api_layer_properties,
            enumerate_instance_extension_properties: self.enumerate_instance_extension_properties,
        }
    }
}

pub struct ApiLayer {
    config: LayerConfig,
    exports: LayerExports,
    factory: WrappedLayerFactory,
    registry: InstanceRegistry,
}

impl ApiLayer {
    /// Builds the layer after validating its config.
    pub fn new(
        config: LayerConfig,
        exports: LayerExports,
        factory: WrappedLayerFactory,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            exports,
            factory,
            registry: InstanceRegistry::new(),
        })
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn instances(&self) -> &InstanceRegistry {
        &self.registry
    }

    /// `xrNegotiateLoaderApiLayerInterface`.
    ///
    /// # Safety
    /// Pointers must be null or valid for the duration of the call.
    pub unsafe fn negotiate_loader_interface(
        &self,
        loader_info: *const XrNegotiateLoaderInfo,
        layer_name: *const c_char,
        request: *mut XrNegotiateApiLayerRequest,
    ) -> XrResult {
        let outcome = boundary(|| {
            handshake::negotiate_loader_interface(
                loader_info,
                layer_name,
                request,
                &self.config.layer_name,
                self.exports.entry_points(),
            )
            .map(|()| XR_SUCCESS)
        });
        finish("xrNegotiateLoaderApiLayerInterface", outcome)
    }

    /// `xrCreateApiLayerInstance`.
    ///
    /// # Safety
    /// Pointers must be null or valid loader/application structures.
    pub unsafe fn create_api_layer_instance(
        &self,
        instance_create_info: *const XrInstanceCreateInfo,
        api_layer_info: *const XrApiLayerCreateInfo,
        instance: *mut XrInstance,
    ) -> XrResult {
        let invoker = InstanceChainInvoker {
            config: &self.config,
            factory: &self.factory,
            registry: &self.registry,
        };
        let outcome = boundary(|| invoker.create_instance(instance_create_info, api_layer_info, instance));
        finish("xrCreateApiLayerInstance", outcome)
    }

    /// `xrGetInstanceProcAddr`.
    ///
    /// # Safety
    /// `name` must be null or NUL-terminated; `function` null or writable.
    pub unsafe fn get_instance_proc_addr(
        &self,
        instance: XrInstance,
        name: *const c_char,
        function: *mut PfnVoidFunction,
    ) -> XrResult {
        let outcome = boundary(|| {
            let function = function
                .as_mut()
                .ok_or_else(|| LayerError::Validation("function output is null".to_string()))?;
            *function = None;
            let resolved = router::resolve(&self.exports.overrides(), &self.registry, instance, name)?;
            *function = Some(resolved);
            Ok(XR_SUCCESS)
        });
        match outcome {
            Ok(result) => result,
            Err(err) => {
                debug!(
                    "event=entry_result module=layer status=error entry=xrGetInstanceProcAddr result={} error={}",
                    result_name(err.result_code()),
                    err
                );
                err.result_code()
            }
        }
    }

    /// `xrEnumerateInstanceExtensionProperties`.
    ///
    /// # Safety
    /// See [`reporter::enumerate_instance_extension_properties`].
    pub unsafe fn enumerate_instance_extension_properties(
        &self,
        layer_name: *const c_char,
        capacity: u32,
        count_output: *mut u32,
        properties: *mut XrExtensionProperties,
    ) -> XrResult {
        let outcome = boundary(|| {
            reporter::enumerate_instance_extension_properties(
                &self.config,
                layer_name,
                capacity,
                count_output,
                properties,
            )
            .map(|()| XR_SUCCESS)
        });
        finish("xrEnumerateInstanceExtensionProperties", outcome)
    }

    /// `xrEnumerateApiLayerProperties`.
    ///
    /// # Safety
    /// See [`reporter::enumerate_api_layer_properties`].
    pub unsafe fn enumerate_api_layer_properties(
        &self,
        capacity: u32,
        count_output: *mut u32,
        properties: *mut XrApiLayerProperties,
    ) -> XrResult {
        let outcome = boundary(|| {
            reporter::enumerate_api_layer_properties(&self.config, capacity, count_output, properties)
                .map(|()| XR_SUCCESS)
        });
        finish("xrEnumerateApiLayerProperties", outcome)
    }
}

fn boundary(body: impl FnOnce() -> LayerResult<XrResult>) -> LayerResult<XrResult> {
    catch_unwind(AssertUnwindSafe(body))
        .unwrap_or_else(|payload| Err(LayerError::from_panic(payload.as_ref())))
}

fn finish(entry: &str, outcome: LayerResult<XrResult>) -> XrResult {
    match outcome {
        Ok(result) => {
            debug!(
                "event=entry_result module=layer status=ok entry={} result={}",
                entry,
                result_name(result)
            );
            result
        }
        Err(err) => {
            let result = err.result_code();
            error!(
                "event=entry_result module=layer status=error entry={} result={} error={}",
                entry,
                result_name(result),
                err
            );
            result
        }
    }
}
