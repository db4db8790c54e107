//! Layer and extension property enumeration.
//!
//! Both queries follow the two-call convention: capacity 0 reports the count,
//! a short non-zero capacity fails without writing, a sufficient capacity
//! fills the records and reports the count.

use crate::abi::{
    c_str_opt, make_version, version_patch, write_c_chars, XrApiLayerProperties,
    XrExtensionProperties, XR_CURRENT_API_VERSION,
};
use crate::config::LayerConfig;
use crate::error::{LayerError, LayerResult};
use std::ffi::c_char;

/// Writes `items` using the two-call convention.
///
/// # Safety
/// `count_output` must be null or writable; `buffer` must be null or valid for
/// `capacity` writes.
pub unsafe fn fill_two_phase<T: Copy>(
    capacity: u32,
    count_output: *mut u32,
    buffer: *mut T,
    items: &[T],
) -> LayerResult<()> {
    let count_output = count_output
        .as_mut()
        .ok_or_else(|| LayerError::Validation("count output is null".to_string()))?;
    let required = items.len() as u32;
    if capacity == 0 {
        *count_output = required;
        return Ok(());
    }
    if buffer.is_null() {
        return Err(LayerError::Validation(
            "buffer is null with a non-zero capacity".to_string(),
        ));
    }
    if capacity < required {
        return Err(LayerError::SizeInsufficient { required, capacity });
    }
    std::ptr::copy_nonoverlapping(items.as_ptr(), buffer, items.len());
    *count_output = required;
    Ok(())
}

/// The single record describing this layer.
pub fn layer_properties(config: &LayerConfig) -> XrApiLayerProperties {
    let mut properties = XrApiLayerProperties::empty();
    write_c_chars(&mut properties.layer_name, &config.layer_name);
    write_c_chars(&mut properties.description, &config.description);
    properties.layer_version = config.layer_version;
    properties.spec_version = make_version(1, 0, version_patch(XR_CURRENT_API_VERSION));
    properties
}

pub fn extension_properties(config: &LayerConfig) -> Vec<XrExtensionProperties> {
    config
        .advertised_extensions
        .iter()
        .map(|record| {
            let mut properties = XrExtensionProperties::empty();
            write_c_chars(&mut properties.extension_name, &record.name);
            properties.extension_version = record.version;
            properties
        })
        .collect()
}

/// # Safety
/// See [`fill_two_phase`].
pub unsafe fn enumerate_api_layer_properties(
    config: &LayerConfig,
    capacity: u32,
    count_output: *mut u32,
    properties: *mut XrApiLayerProperties,
) -> LayerResult<()> {
    fill_two_phase(capacity, count_output, properties, &[layer_properties(config)])
}

/// Enumerates this layer's advertised extensions; `layer_name` must name it.
///
/// # Safety
/// `layer_name` must be null or NUL-terminated; see [`fill_two_phase`].
pub unsafe fn enumerate_instance_extension_properties(
    config: &LayerConfig,
    layer_name: *const c_char,
    capacity: u32,
    count_output: *mut u32,
    properties: *mut XrExtensionProperties,
) -> LayerResult<()> {
    match c_str_opt(layer_name) {
        Some(name) if name.to_bytes() == config.layer_name.as_bytes() => {}
        Some(name) => {
            return Err(LayerError::Validation(format!(
                "layer name mismatch: {}",
                name.to_string_lossy()
            )))
        }
        None => return Err(LayerError::Validation("layer name is null".to_string())),
    }
    fill_two_phase(
        capacity,
        count_output,
        properties,
        &extension_properties(config),
    )
}
