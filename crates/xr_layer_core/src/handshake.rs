//! Structural validation of the loader handshake payloads.
//!
//! # Responsibility
//! - Check tags, versions and sizes of every loader structure before use.
//! - Confirm the chain head names this layer and carries both entry pointers.
//! - Answer the loader-interface negotiation request.
//!
//! # Invariants
//! - Validation runs before any chain traversal.
//! - Every violation is `LayerError::InitializationFailed`, with no side effects.

use crate::abi::{
    CreateApiLayerInstanceFn, GetInstanceProcAddrFn, XrApiLayerCreateInfo, XrApiLayerNextInfo,
    XrNegotiateApiLayerRequest, XrNegotiateLoaderInfo, XrVersion,
    XR_API_LAYER_CREATE_INFO_STRUCT_VERSION, XR_API_LAYER_INFO_STRUCT_VERSION,
    XR_API_LAYER_NEXT_INFO_STRUCT_VERSION, XR_CURRENT_API_VERSION,
    XR_CURRENT_LOADER_API_LAYER_VERSION, XR_LOADER_INFO_STRUCT_VERSION,
    XR_LOADER_INTERFACE_STRUCT_API_LAYER_CREATE_INFO, XR_LOADER_INTERFACE_STRUCT_API_LAYER_NEXT_INFO,
    XR_LOADER_INTERFACE_STRUCT_API_LAYER_REQUEST, XR_LOADER_INTERFACE_STRUCT_LOADER_INFO,
};
use crate::chain::ChainLink;
use crate::error::{LayerError, LayerResult};
use std::ffi::{c_char, CStr};
use std::mem::size_of;

/// Handshake payload that passed structural validation.
pub struct ValidatedHandshake<'a> {
    pub create_info: &'a XrApiLayerCreateInfo,
    pub head: ChainLink<'a>,
    pub next_get_instance_proc_addr: GetInstanceProcAddrFn,
    pub next_create_api_layer_instance: CreateApiLayerInstanceFn,
}

/// Validates the `xrCreateApiLayerInstance` layer payload.
///
/// # Safety
/// `api_layer_info` must be null or point to a loader-built structure whose
/// chain stays alive for `'a`.
pub unsafe fn validate_create_info<'a>(
    api_layer_info: *const XrApiLayerCreateInfo,
    layer_name: &str,
) -> LayerResult<ValidatedHandshake<'a>> {
    let create_info = api_layer_info
        .as_ref()
        .ok_or_else(|| failed("api layer create info is null"))?;
    if create_info.struct_type != XR_LOADER_INTERFACE_STRUCT_API_LAYER_CREATE_INFO
        || create_info.struct_version != XR_API_LAYER_CREATE_INFO_STRUCT_VERSION
        || create_info.struct_size != size_of::<XrApiLayerCreateInfo>()
    {
        return Err(failed("api layer create info header mismatch"));
    }

    let head = ChainLink::from_raw(create_info.next_info)
        .ok_or_else(|| failed("next info is null"))?;
    let next_info: &XrApiLayerNextInfo = head.raw();
    if next_info.struct_type != XR_LOADER_INTERFACE_STRUCT_API_LAYER_NEXT_INFO
        || next_info.struct_version != XR_API_LAYER_NEXT_INFO_STRUCT_VERSION
        || next_info.struct_size != size_of::<XrApiLayerNextInfo>()
    {
        return Err(failed("next info header mismatch"));
    }
    if head.layer_name() != layer_name {
        return Err(failed("next info names a different layer"));
    }

    let next_get_instance_proc_addr = head
        .resolver()
        .ok_or_else(|| failed("next getInstanceProcAddr is null"))?;
    let next_create_api_layer_instance = head
        .creator()
        .ok_or_else(|| failed("next createApiLayerInstance is null"))?;

    Ok(ValidatedHandshake {
        create_info,
        head,
        next_get_instance_proc_addr,
        next_create_api_layer_instance,
    })
}

/// Entry points this layer hands back to the loader on negotiation.
#[derive(Clone, Copy)]
pub struct LayerEntryPoints {
    pub get_instance_proc_addr: GetInstanceProcAddrFn,
    pub create_api_layer_instance: CreateApiLayerInstanceFn,
}

/// Validates `xrNegotiateLoaderApiLayerInterface` and fills the request.
///
/// # Safety
/// Each pointer must be null or valid for the duration of the call.
pub unsafe fn negotiate_loader_interface(
    loader_info: *const XrNegotiateLoaderInfo,
    requested_layer_name: *const c_char,
    request: *mut XrNegotiateApiLayerRequest,
    layer_name: &str,
    entry_points: LayerEntryPoints,
) -> LayerResult<()> {
    let loader_info = loader_info
        .as_ref()
        .ok_or_else(|| failed("loader info is null"))?;
    let request = request
        .as_mut()
        .ok_or_else(|| failed("api layer request is null"))?;

    if loader_info.struct_type != XR_LOADER_INTERFACE_STRUCT_LOADER_INFO
        || loader_info.struct_version != XR_LOADER_INFO_STRUCT_VERSION
        || loader_info.struct_size != size_of::<XrNegotiateLoaderInfo>()
    {
        return Err(failed("loader info header mismatch"));
    }
    if request.struct_type != XR_LOADER_INTERFACE_STRUCT_API_LAYER_REQUEST
        || request.struct_version != XR_API_LAYER_INFO_STRUCT_VERSION
        || request.struct_size != size_of::<XrNegotiateApiLayerRequest>()
    {
        return Err(failed("api layer request header mismatch"));
    }

    if requested_layer_name.is_null()
        || CStr::from_ptr(requested_layer_name).to_bytes() != layer_name.as_bytes()
    {
        return Err(failed("loader requested a different layer"));
    }

    if !(loader_info.min_interface_version..=loader_info.max_interface_version)
        .contains(&XR_CURRENT_LOADER_API_LAYER_VERSION)
    {
        return Err(failed("loader interface version range excludes this layer"));
    }
    if !api_version_in_range(
        loader_info.min_api_version,
        loader_info.max_api_version,
        XR_CURRENT_API_VERSION,
    ) {
        return Err(failed("loader api version range excludes this layer"));
    }

    request.layer_interface_version = XR_CURRENT_LOADER_API_LAYER_VERSION;
    request.layer_api_version = XR_CURRENT_API_VERSION;
    request.get_instance_proc_addr = Some(entry_points.get_instance_proc_addr);
    request.create_api_layer_instance = Some(entry_points.create_api_layer_instance);
    Ok(())
}

fn api_version_in_range(min: XrVersion, max: XrVersion, version: XrVersion) -> bool {
    min <= version && version <= max
}

fn failed(reason: &str) -> LayerError {
    LayerError::InitializationFailed(reason.to_string())
}
