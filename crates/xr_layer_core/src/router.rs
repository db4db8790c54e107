//! Symbol resolution: fixed local overrides first, then the wrapped layer.

use crate::abi::{
    c_str_opt, erase_function, EnumerateApiLayerPropertiesFn,
    EnumerateInstanceExtensionPropertiesFn, VoidFunction, XrInstance, XR_NULL_HANDLE,
};
use crate::error::{LayerError, LayerResult};
use crate::registry::InstanceRegistry;
use std::ffi::{c_char, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Symbols always answered by this layer, with or without an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalSymbol {
    EnumerateApiLayerProperties,
    EnumerateInstanceExtensionProperties,
}

impl LocalSymbol {
    pub const ALL: [LocalSymbol; 2] = [
        Self::EnumerateApiLayerProperties,
        Self::EnumerateInstanceExtensionProperties,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::EnumerateApiLayerProperties => "xrEnumerateApiLayerProperties",
            Self::EnumerateInstanceExtensionProperties => "xrEnumerateInstanceExtensionProperties",
        }
    }

    pub fn from_name(name: &CStr) -> Option<Self> {
        let name = name.to_bytes();
        Self::ALL
            .into_iter()
            .find(|symbol| symbol.name().as_bytes() == name)
    }
}

/// Addresses of the exported local override implementations.
#[derive(Clone, Copy)]
pub struct LocalOverrides {
    pub enumerate_api_layer_properties: EnumerateApiLayerPropertiesFn,
    pub enumerate_instance_extension_properties: EnumerateInstanceExtensionPropertiesFn,
}

impl LocalOverrides {
    pub fn address(&self, symbol: LocalSymbol) -> VoidFunction {
        // SAFETY: both fields are `extern "system"` function pointers.
        unsafe {
            match symbol {
                LocalSymbol::EnumerateApiLayerProperties => {
                    erase_function(self.enumerate_api_layer_properties)
                }
                LocalSymbol::EnumerateInstanceExtensionProperties => {
                    erase_function(self.enumerate_instance_extension_properties)
                }
            }
        }
    }
}

/// Routes one lookup.
///
/// # Safety
/// `name` must be null or a valid NUL-terminated string.
pub unsafe fn resolve(
    overrides: &LocalOverrides,
    registry: &InstanceRegistry,
    instance: XrInstance,
    name: *const c_char,
) -> LayerResult<VoidFunction> {
    let name = c_str_opt(name);
    if let Some(symbol) = name.and_then(LocalSymbol::from_name) {
        return Ok(overrides.address(symbol));
    }

    let Some(name) = name else {
        return Err(LayerError::FunctionUnsupported("<null>".to_string()));
    };
    // Null, unknown and retired handles have nothing to delegate to.
    let state = match instance {
        XR_NULL_HANDLE => None,
        handle => registry.get(handle),
    };
    match state {
        Some(state) => catch_unwind(AssertUnwindSafe(|| state.wrapped.resolve(instance, name)))
            .map_err(|payload| LayerError::from_panic(payload.as_ref()))?,
        None => Err(LayerError::FunctionUnsupported(
            name.to_string_lossy().into_owned(),
        )),
    }
}
