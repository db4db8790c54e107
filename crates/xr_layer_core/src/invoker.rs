//! Forwards instance creation down the chain and wires up the wrapped layer.
//!
//! # Responsibility
//! - Rewrite a copy of the create info with the negotiated extension list.
//! - Pop this layer off a copy of the layer info and call the next link.
//! - Initialize and publish per-instance state, or destroy the half-built
//!   downstream instance when anything after the downstream call fails.
//!
//! # Invariants
//! - Caller-owned structures are never written, except the instance output.
//! - Panics from the wrapped layer never leave this module.

use crate::abi::{
    c_str_opt, cast_function, succeeded, DestroyInstanceFn, GetInstanceProcAddrFn,
    PfnVoidFunction, XrApiLayerCreateInfo, XrInstance, XrInstanceCreateInfo, XrResult,
    XR_NULL_HANDLE,
};
use crate::catalog::discover_available_extensions;
use crate::config::LayerConfig;
use crate::error::{LayerError, LayerResult};
use crate::handshake::validate_create_info;
use crate::negotiator::{negotiate, NegotiatedExtensionSet};
use crate::registry::{InstanceRegistry, LayerInstanceState};
use crate::wrapped::WrappedLayerFactory;
use log::{error, info, warn};
use std::ffi::{c_char, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};

const DESTROY_INSTANCE_SYMBOL: &CStr = c"xrDestroyInstance";

/// Collaborators needed to create one instance.
pub struct InstanceChainInvoker<'a> {
    pub config: &'a LayerConfig,
    pub factory: &'a WrappedLayerFactory,
    pub registry: &'a InstanceRegistry,
}

impl InstanceChainInvoker<'_> {
    /// Runs the full creation sequence.
    ///
    /// # Safety
    /// Pointers must be null or valid loader/application structures for the
    /// duration of the call.
    pub unsafe fn create_instance(
        &self,
        instance_create_info: *const XrInstanceCreateInfo,
        api_layer_info: *const XrApiLayerCreateInfo,
        instance_out: *mut XrInstance,
    ) -> LayerResult<XrResult> {
        let handshake = validate_create_info(api_layer_info, &self.config.layer_name)?;

        let create_info = instance_create_info
            .as_ref()
            .ok_or_else(|| LayerError::Validation("instance create info is null".to_string()))?;
        if instance_out.is_null() {
            return Err(LayerError::Validation("instance output is null".to_string()));
        }

        for link in handshake.head.iter() {
            info!(
                "event=chain_layer module=invoker status=ok layer={}",
                link.layer_name()
            );
        }

        let requested = read_requested_extensions(create_info)?;
        let catalog = if self.config.implicit_extensions.is_empty() {
            None
        } else {
            Some(discover_available_extensions(
                handshake.head,
                self.config.version_policy,
            ))
        };
        let negotiated = negotiate(
            &self.config.implicit_extensions,
            &requested,
            &self.config.blocked_extensions,
            catalog.as_ref(),
        )?;

        let names = to_c_strings(&negotiated)?;
        let name_ptrs = names.iter().map(|name| name.as_ptr()).collect::<Vec<_>>();
        let mut chain_create_info = *create_info;
        chain_create_info.enabled_extension_count = name_ptrs.len() as u32;
        chain_create_info.enabled_extension_names = if name_ptrs.is_empty() {
            std::ptr::null()
        } else {
            name_ptrs.as_ptr()
        };

        let mut chain_layer_info = *handshake.create_info;
        chain_layer_info.next_info = handshake.head.raw().next;

        *instance_out = XR_NULL_HANDLE;
        let result = (handshake.next_create_api_layer_instance)(
            &chain_create_info,
            &chain_layer_info,
            instance_out,
        );
        if !succeeded(result) {
            // A failing link may still have produced a handle.
            destroy_downstream(handshake.next_get_instance_proc_addr, *instance_out);
            return Err(LayerError::Downstream(result));
        }
        let instance = *instance_out;

        if let Err(err) = self.attach_wrapped_layer(
            instance,
            handshake.next_get_instance_proc_addr,
            negotiated.granted_implicit,
            create_info,
        ) {
            error!(
                "event=wrapped_layer_init module=invoker status=error instance={:#x} error={}",
                instance, err
            );
            destroy_downstream(handshake.next_get_instance_proc_addr, instance);
            return Err(err);
        }
        Ok(result)
    }

    fn attach_wrapped_layer(
        &self,
        instance: XrInstance,
        downstream_resolver: GetInstanceProcAddrFn,
        granted_extensions: Vec<String>,
        create_info: &XrInstanceCreateInfo,
    ) -> LayerResult<()> {
        let wrapped = catch_unwind(AssertUnwindSafe(|| {
            let mut wrapped = (self.factory)();
            wrapped.set_downstream_resolver(downstream_resolver, instance);
            wrapped.set_granted_extensions(granted_extensions.clone());
            wrapped.on_instance_created(create_info).map(|()| wrapped)
        }))
        .map_err(|payload| LayerError::from_panic(payload.as_ref()))??;

        self.registry.publish(LayerInstanceState {
            instance,
            downstream_resolver,
            granted_extensions,
            wrapped,
        })?;
        Ok(())
    }
}

/// Reads the application's requested extension names in order.
///
/// # Safety
/// `create_info` must describe `enabled_extension_count` valid C strings.
unsafe fn read_requested_extensions(create_info: &XrInstanceCreateInfo) -> LayerResult<Vec<String>> {
    let count = create_info.enabled_extension_count as usize;
    if count == 0 {
        return Ok(Vec::new());
    }
    if create_info.enabled_extension_names.is_null() {
        return Err(LayerError::Validation(
            "extension names are null with a non-zero count".to_string(),
        ));
    }
    let raw = std::slice::from_raw_parts(create_info.enabled_extension_names, count);
    raw.iter()
        .map(|ptr: &*const c_char| {
            c_str_opt(*ptr)
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| LayerError::Validation("extension name is null".to_string()))
        })
        .collect()
}

// Names come from C strings or pattern-checked config, so NUL cannot occur
// today; the error arm covers any future unchecked source.
fn to_c_strings(negotiated: &NegotiatedExtensionSet) -> LayerResult<Vec<CString>> {
    negotiated
        .names()
        .map(|name| {
            CString::new(name).map_err(|_| {
                LayerError::Validation(format!("extension name contains NUL: {name}"))
            })
        })
        .collect()
}

/// Best-effort destroy of a downstream instance; failures are only logged.
pub fn destroy_downstream(resolver: GetInstanceProcAddrFn, instance: XrInstance) {
    if instance == XR_NULL_HANDLE {
        return;
    }
    let mut function: PfnVoidFunction = None;
    // SAFETY: resolver comes from the validated chain head.
    let result = unsafe { resolver(instance, DESTROY_INSTANCE_SYMBOL.as_ptr(), &mut function) };
    match function {
        Some(function) if succeeded(result) => {
            // SAFETY: the resolver returned this pointer for xrDestroyInstance.
            let destroy = unsafe { cast_function::<DestroyInstanceFn>(function) };
            // SAFETY: instance was produced by the downstream create call.
            let destroyed = unsafe { destroy(instance) };
            info!(
                "event=cleanup_destroy module=invoker status={} instance={:#x} result={}",
                if succeeded(destroyed) { "ok" } else { "error" },
                instance,
                destroyed
            );
        }
        _ => warn!(
            "event=cleanup_destroy module=invoker status=error instance={:#x} reason=unresolved",
            instance
        ),
    }
}
