//! C-ABI mirror of the loader/layer interface.
//!
//! # Responsibility
//! - Declare `#[repr(C)]` structures exchanged with the host loader.
//! - Declare the function-pointer shapes resolved through the chain.
//! - Own the fixed result-code taxonomy and structure tags.
//!
//! # Invariants
//! - Field order and widths match the loader headers exactly.
//! - Function pointers are `Option<fn>` so a null pointer is representable.

use std::ffi::{c_char, c_void, CStr};

pub type XrResult = i32;
pub type XrInstance = u64;
pub type XrVersion = u64;
pub type XrStructureType = i32;
pub type XrLoaderInterfaceStructs = i32;
pub type XrInstanceCreateFlags = u64;

pub const XR_NULL_HANDLE: XrInstance = 0;

pub const XR_SUCCESS: XrResult = 0;
pub const XR_ERROR_VALIDATION_FAILURE: XrResult = -1;
pub const XR_ERROR_RUNTIME_FAILURE: XrResult = -2;
pub const XR_ERROR_INITIALIZATION_FAILED: XrResult = -6;
pub const XR_ERROR_FUNCTION_UNSUPPORTED: XrResult = -7;
pub const XR_ERROR_EXTENSION_NOT_PRESENT: XrResult = -9;
pub const XR_ERROR_SIZE_INSUFFICIENT: XrResult = -11;
pub const XR_ERROR_HANDLE_INVALID: XrResult = -12;

pub const XR_TYPE_API_LAYER_PROPERTIES: XrStructureType = 1;
pub const XR_TYPE_EXTENSION_PROPERTIES: XrStructureType = 2;
pub const XR_TYPE_INSTANCE_CREATE_INFO: XrStructureType = 3;

pub const XR_LOADER_INTERFACE_STRUCT_LOADER_INFO: XrLoaderInterfaceStructs = 1;
pub const XR_LOADER_INTERFACE_STRUCT_API_LAYER_REQUEST: XrLoaderInterfaceStructs = 2;
pub const XR_LOADER_INTERFACE_STRUCT_API_LAYER_CREATE_INFO: XrLoaderInterfaceStructs = 4;
pub const XR_LOADER_INTERFACE_STRUCT_API_LAYER_NEXT_INFO: XrLoaderInterfaceStructs = 5;

pub const XR_LOADER_INFO_STRUCT_VERSION: u32 = 1;
pub const XR_API_LAYER_INFO_STRUCT_VERSION: u32 = 1;
pub const XR_API_LAYER_CREATE_INFO_STRUCT_VERSION: u32 = 1;
pub const XR_API_LAYER_NEXT_INFO_STRUCT_VERSION: u32 = 1;
pub const XR_CURRENT_LOADER_API_LAYER_VERSION: u32 = 1;

pub const XR_MAX_API_LAYER_NAME_SIZE: usize = 256;
pub const XR_MAX_API_LAYER_DESCRIPTION_SIZE: usize = 256;
pub const XR_MAX_EXTENSION_NAME_SIZE: usize = 128;
pub const XR_MAX_APPLICATION_NAME_SIZE: usize = 128;
pub const XR_MAX_ENGINE_NAME_SIZE: usize = 128;
pub const XR_API_LAYER_MAX_SETTINGS_PATH_SIZE: usize = 512;

/// Packs a `major.minor.patch` triple the way the loader expects.
pub const fn make_version(major: u64, minor: u64, patch: u64) -> XrVersion {
    ((major & 0xffff) << 48) | ((minor & 0xffff) << 32) | (patch & 0xffff_ffff)
}

pub const fn version_major(version: XrVersion) -> u64 {
    (version >> 48) & 0xffff
}

pub const fn version_minor(version: XrVersion) -> u64 {
    (version >> 32) & 0xffff
}

pub const fn version_patch(version: XrVersion) -> u64 {
    version & 0xffff_ffff
}

/// API version this layer is built against.
pub const XR_CURRENT_API_VERSION: XrVersion = make_version(1, 0, 34);

pub type VoidFunction = unsafe extern "system" fn();
pub type PfnVoidFunction = Option<VoidFunction>;

pub type GetInstanceProcAddrFn = unsafe extern "system" fn(
    instance: XrInstance,
    name: *const c_char,
    function: *mut PfnVoidFunction,
) -> XrResult;
pub type PfnGetInstanceProcAddr = Option<GetInstanceProcAddrFn>;

pub type CreateApiLayerInstanceFn = unsafe extern "system" fn(
    info: *const XrInstanceCreateInfo,
    api_layer_info: *const XrApiLayerCreateInfo,
    instance: *mut XrInstance,
) -> XrResult;
pub type PfnCreateApiLayerInstance = Option<CreateApiLayerInstanceFn>;

pub type EnumerateInstanceExtensionPropertiesFn = unsafe extern "system" fn(
    layer_name: *const c_char,
    property_capacity_input: u32,
    property_count_output: *mut u32,
    properties: *mut XrExtensionProperties,
) -> XrResult;
pub type PfnEnumerateInstanceExtensionProperties = Option<EnumerateInstanceExtensionPropertiesFn>;

pub type EnumerateApiLayerPropertiesFn = unsafe extern "system" fn(
    property_capacity_input: u32,
    property_count_output: *mut u32,
    properties: *mut XrApiLayerProperties,
) -> XrResult;
pub type PfnEnumerateApiLayerProperties = Option<EnumerateApiLayerPropertiesFn>;

pub type DestroyInstanceFn = unsafe extern "system" fn(instance: XrInstance) -> XrResult;
pub type PfnDestroyInstance = Option<DestroyInstanceFn>;

/// One link of the loader-owned layer chain.
#[repr(C)]
pub struct XrApiLayerNextInfo {
    pub struct_type: XrLoaderInterfaceStructs,
    pub struct_version: u32,
    pub struct_size: usize,
    pub layer_name: [c_char; XR_MAX_API_LAYER_NAME_SIZE],
    pub next_get_instance_proc_addr: PfnGetInstanceProcAddr,
    pub next_create_api_layer_instance: PfnCreateApiLayerInstance,
    pub next: *mut XrApiLayerNextInfo,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct XrApiLayerCreateInfo {
    pub struct_type: XrLoaderInterfaceStructs,
    pub struct_version: u32,
    pub struct_size: usize,
    pub loader_instance: *mut c_void,
    pub settings_file_location: [c_char; XR_API_LAYER_MAX_SETTINGS_PATH_SIZE],
    pub next_info: *mut XrApiLayerNextInfo,
}

#[repr(C)]
pub struct XrNegotiateLoaderInfo {
    pub struct_type: XrLoaderInterfaceStructs,
    pub struct_version: u32,
    pub struct_size: usize,
    pub min_interface_version: u32,
    pub max_interface_version: u32,
    pub min_api_version: XrVersion,
    pub max_api_version: XrVersion,
}

#[repr(C)]
pub struct XrNegotiateApiLayerRequest {
    pub struct_type: XrLoaderInterfaceStructs,
    pub struct_version: u32,
    pub struct_size: usize,
    pub layer_interface_version: u32,
    pub layer_api_version: XrVersion,
    pub get_instance_proc_addr: PfnGetInstanceProcAddr,
    pub create_api_layer_instance: PfnCreateApiLayerInstance,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct XrApplicationInfo {
    pub application_name: [c_char; XR_MAX_APPLICATION_NAME_SIZE],
    pub application_version: u32,
    pub engine_name: [c_char; XR_MAX_ENGINE_NAME_SIZE],
    pub engine_version: u32,
    pub api_version: XrVersion,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct XrInstanceCreateInfo {
    pub ty: XrStructureType,
    pub next: *const c_void,
    pub create_flags: XrInstanceCreateFlags,
    pub application_info: XrApplicationInfo,
    pub enabled_api_layer_count: u32,
    pub enabled_api_layer_names: *const *const c_char,
    pub enabled_extension_count: u32,
    pub enabled_extension_names: *const *const c_char,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct XrExtensionProperties {
    pub ty: XrStructureType,
    pub next: *mut c_void,
    pub extension_name: [c_char; XR_MAX_EXTENSION_NAME_SIZE],
    pub extension_version: u32,
}

impl XrExtensionProperties {
    /// Blank record with the structure tag preset, ready to be filled.
    pub fn empty() -> Self {
        Self {
            ty: XR_TYPE_EXTENSION_PROPERTIES,
            next: std::ptr::null_mut(),
            extension_name: [0; XR_MAX_EXTENSION_NAME_SIZE],
            extension_version: 0,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct XrApiLayerProperties {
    pub ty: XrStructureType,
    pub next: *mut c_void,
    pub layer_name: [c_char; XR_MAX_API_LAYER_NAME_SIZE],
    pub spec_version: XrVersion,
    pub layer_version: u32,
    pub description: [c_char; XR_MAX_API_LAYER_DESCRIPTION_SIZE],
}

impl XrApiLayerProperties {
    pub fn empty() -> Self {
        Self {
            ty: XR_TYPE_API_LAYER_PROPERTIES,
            next: std::ptr::null_mut(),
            layer_name: [0; XR_MAX_API_LAYER_NAME_SIZE],
            spec_version: 0,
            layer_version: 0,
            description: [0; XR_MAX_API_LAYER_DESCRIPTION_SIZE],
        }
    }
}

/// Copies `value` into a fixed C char field, truncating and NUL-terminating.
pub fn write_c_chars<const N: usize>(target: &mut [c_char; N], value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(N.saturating_sub(1));
    for (slot, byte) in target.iter_mut().zip(bytes[..len].iter()) {
        *slot = *byte as c_char;
    }
    for slot in target.iter_mut().skip(len) {
        *slot = 0;
    }
}

/// Reads a fixed C char field up to its first NUL (or the full width).
pub fn read_c_chars(source: &[c_char]) -> String {
    let bytes = source
        .iter()
        .take_while(|value| **value != 0)
        .map(|value| *value as u8)
        .collect::<Vec<_>>();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Borrows a NUL-terminated string from a raw pointer.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
pub unsafe fn c_str_opt<'a>(ptr: *const c_char) -> Option<&'a CStr> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr))
    }
}

/// Reinterprets a resolved symbol as its concrete function-pointer type.
///
/// # Safety
/// `F` must be the function-pointer type the symbol was resolved for.
pub unsafe fn cast_function<F: Copy>(function: VoidFunction) -> F {
    debug_assert_eq!(
        std::mem::size_of::<F>(),
        std::mem::size_of::<VoidFunction>()
    );
    std::mem::transmute_copy(&function)
}

/// Erases a concrete function pointer so it can be handed out by name.
///
/// # Safety
/// `F` must be an `extern "system"` function-pointer type.
pub unsafe fn erase_function<F: Copy>(function: F) -> VoidFunction {
    debug_assert_eq!(
        std::mem::size_of::<F>(),
        std::mem::size_of::<VoidFunction>()
    );
    std::mem::transmute_copy(&function)
}

/// Stable symbolic name for a result code, used in diagnostics.
pub fn result_name(result: XrResult) -> &'static str {
    match result {
        XR_SUCCESS => "XR_SUCCESS",
        XR_ERROR_VALIDATION_FAILURE => "XR_ERROR_VALIDATION_FAILURE",
        XR_ERROR_RUNTIME_FAILURE => "XR_ERROR_RUNTIME_FAILURE",
        XR_ERROR_INITIALIZATION_FAILED => "XR_ERROR_INITIALIZATION_FAILED",
        XR_ERROR_FUNCTION_UNSUPPORTED => "XR_ERROR_FUNCTION_UNSUPPORTED",
        XR_ERROR_EXTENSION_NOT_PRESENT => "XR_ERROR_EXTENSION_NOT_PRESENT",
        XR_ERROR_SIZE_INSUFFICIENT => "XR_ERROR_SIZE_INSUFFICIENT",
        XR_ERROR_HANDLE_INVALID => "XR_ERROR_HANDLE_INVALID",
        value if value < 0 => "XR_ERROR_UNKNOWN",
        _ => "XR_UNQUALIFIED_SUCCESS",
    }
}

pub fn succeeded(result: XrResult) -> bool {
    result >= 0
}

#[cfg(test)]
mod tests {
    use super::{
        make_version, read_c_chars, result_name, version_major, version_minor, version_patch,
        write_c_chars, XR_ERROR_SIZE_INSUFFICIENT,
    };
    use std::ffi::c_char;

    #[test]
    fn version_packing_round_trips_components() {
        let version = make_version(1, 2, 34);
        assert_eq!(version_major(version), 1);
        assert_eq!(version_minor(version), 2);
        assert_eq!(version_patch(version), 34);
    }

    #[test]
    fn write_c_chars_truncates_and_terminates() {
        let mut field: [c_char; 4] = [1; 4];
        write_c_chars(&mut field, "abcdef");
        assert_eq!(field[3], 0);
        assert_eq!(read_c_chars(&field), "abc");
    }

    #[test]
    fn write_c_chars_clears_trailing_bytes() {
        let mut field: [c_char; 8] = [b'z' as c_char; 8];
        write_c_chars(&mut field, "ab");
        assert!(field[2..].iter().all(|value| *value == 0));
    }

    #[test]
    fn result_name_covers_size_insufficient() {
        assert_eq!(
            result_name(XR_ERROR_SIZE_INSUFFICIENT),
            "XR_ERROR_SIZE_INSUFFICIENT"
        );
        assert_eq!(result_name(-999), "XR_ERROR_UNKNOWN");
    }
}
