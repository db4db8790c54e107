//! Default wrapped layer: forwards every lookup to the next chain participant.
//!
//! Two symbols are answered locally. `xrGetInstanceProcAddr` resolves to this
//! library's export, and `xrDestroyInstance` destroys downstream and then
//! retires the instance state.

use crate::api::{layer, xrGetInstanceProcAddr};
use log::{info, warn};
use std::ffi::CStr;
use std::panic::catch_unwind;
use xr_layer_core::abi::{
    cast_function, erase_function, succeeded, DestroyInstanceFn, GetInstanceProcAddrFn,
    PfnVoidFunction, VoidFunction, XrInstance, XrInstanceCreateInfo, XrResult,
    XR_ERROR_HANDLE_INVALID, XR_ERROR_RUNTIME_FAILURE,
};
use xr_layer_core::error::check;
use xr_layer_core::{LayerError, LayerResult, WrappedLayer};

const DESTROY_INSTANCE_SYMBOL: &CStr = c"xrDestroyInstance";

#[derive(Default)]
pub struct PassthroughLayer {
    downstream: Option<GetInstanceProcAddrFn>,
    granted_extensions: Vec<String>,
}

impl WrappedLayer for PassthroughLayer {
    fn set_downstream_resolver(&mut self, resolver: GetInstanceProcAddrFn, _instance: XrInstance) {
        self.downstream = Some(resolver);
    }

    fn set_granted_extensions(&mut self, extensions: Vec<String>) {
        self.granted_extensions = extensions;
    }

    fn on_instance_created(&mut self, create_info: &XrInstanceCreateInfo) -> LayerResult<()> {
        info!(
            "event=instance_created module=passthrough status=ok requested={} granted={}",
            create_info.enabled_extension_count,
            self.granted_extensions.len()
        );
        Ok(())
    }

    fn resolve(&self, instance: XrInstance, name: &CStr) -> LayerResult<VoidFunction> {
        match name.to_bytes() {
            // SAFETY: both are `extern "system"` function items of this library.
            b"xrDestroyInstance" => {
                return Ok(unsafe { erase_function(destroy_instance as DestroyInstanceFn) })
            }
            b"xrGetInstanceProcAddr" => {
                return Ok(unsafe {
                    erase_function(xrGetInstanceProcAddr as GetInstanceProcAddrFn)
                })
            }
            _ => {}
        }

        let resolver = self
            .downstream
            .ok_or_else(|| LayerError::Runtime("downstream resolver is not set".to_string()))?;
        resolve_downstream(resolver, instance, name)
    }
}

fn resolve_downstream(
    resolver: GetInstanceProcAddrFn,
    instance: XrInstance,
    name: &CStr,
) -> LayerResult<VoidFunction> {
    let mut function: PfnVoidFunction = None;
    // SAFETY: resolver is the downstream getInstanceProcAddr for this instance.
    check(unsafe { resolver(instance, name.as_ptr(), &mut function) })?;
    function.ok_or_else(|| LayerError::FunctionUnsupported(name.to_string_lossy().into_owned()))
}

/// `xrDestroyInstance` as seen by the application through this layer.
unsafe extern "system" fn destroy_instance(instance: XrInstance) -> XrResult {
    catch_unwind(|| destroy_and_retire(instance)).unwrap_or(XR_ERROR_RUNTIME_FAILURE)
}

fn destroy_and_retire(instance: XrInstance) -> XrResult {
    let Some(layer) = layer() else {
        return XR_ERROR_RUNTIME_FAILURE;
    };
    let Some(state) = layer.instances().get(instance) else {
        warn!(
            "event=instance_destroy module=passthrough status=error instance={:#x} reason=unknown",
            instance
        );
        return XR_ERROR_HANDLE_INVALID;
    };

    let destroy = resolve_downstream(state.downstream_resolver, instance, DESTROY_INSTANCE_SYMBOL);
    let result = match destroy {
        // SAFETY: the downstream resolver returned this pointer for xrDestroyInstance.
        Ok(function) => unsafe { cast_function::<DestroyInstanceFn>(function)(instance) },
        Err(err) => err.result_code(),
    };
    // The handle is dead downstream whatever the destroy reported.
    layer.instances().retire(instance);
    info!(
        "event=instance_destroy module=passthrough status={} instance={:#x} result={}",
        if succeeded(result) { "ok" } else { "error" },
        instance,
        result
    );
    result
}
