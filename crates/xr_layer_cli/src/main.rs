//! CLI smoke entry point.
//!
//! # Responsibility
//! - Load the layer library without a loader and print what it reports.
//! - Keep output deterministic for quick local sanity checks.

use std::ffi::CString;
use std::process::ExitCode;
use xr_layer_core::abi::{
    read_c_chars, result_name, succeeded, version_major, version_minor, version_patch,
    XrApiLayerProperties, XrExtensionProperties, XrResult, XR_ERROR_VALIDATION_FAILURE,
};
use xr_layer_ffi::{xrEnumerateApiLayerProperties, xrEnumerateInstanceExtensionProperties};

fn main() -> ExitCode {
    println!("xr_layer_core version={}", xr_layer_core::core_version());

    let layers = match enumerate_layers() {
        Ok(layers) => layers,
        Err(result) => {
            eprintln!("xrEnumerateApiLayerProperties failed: {}", result_name(result));
            return ExitCode::FAILURE;
        }
    };

    for layer in &layers {
        let name = read_c_chars(&layer.layer_name);
        println!(
            "layer={} version={} api={}.{}.{} description={}",
            name,
            layer.layer_version,
            version_major(layer.spec_version),
            version_minor(layer.spec_version),
            version_patch(layer.spec_version),
            read_c_chars(&layer.description)
        );
        match enumerate_extensions(&name) {
            Ok(extensions) if extensions.is_empty() => println!("  extensions=none"),
            Ok(extensions) => {
                for extension in extensions {
                    println!(
                        "  extension={} version={}",
                        read_c_chars(&extension.extension_name),
                        extension.extension_version
                    );
                }
            }
            Err(result) => {
                eprintln!(
                    "xrEnumerateInstanceExtensionProperties failed: {}",
                    result_name(result)
                );
                return ExitCode::FAILURE;
            }
        }
    }

    if let Some((level, log_dir)) = xr_layer_core::logging_status() {
        println!("log_level={} log_dir={}", level, log_dir.display());
    } else if let Some(Err(err)) = xr_layer_ffi::logging_outcome() {
        println!("logging=disabled reason={err}");
    }
    ExitCode::SUCCESS
}

fn enumerate_layers() -> Result<Vec<XrApiLayerProperties>, XrResult> {
    let mut count = 0;
    // SAFETY: count query with a null buffer.
    let result = unsafe { xrEnumerateApiLayerProperties(0, &mut count, std::ptr::null_mut()) };
    if !succeeded(result) {
        return Err(result);
    }
    let mut layers = vec![XrApiLayerProperties::empty(); count as usize];
    // SAFETY: the buffer holds `count` records.
    let result = unsafe { xrEnumerateApiLayerProperties(count, &mut count, layers.as_mut_ptr()) };
    if !succeeded(result) {
        return Err(result);
    }
    layers.truncate(count as usize);
    Ok(layers)
}

fn enumerate_extensions(layer_name: &str) -> Result<Vec<XrExtensionProperties>, XrResult> {
    let name = CString::new(layer_name).map_err(|_| XR_ERROR_VALIDATION_FAILURE)?;
    let mut count = 0;
    // SAFETY: count query with a null buffer.
    let result = unsafe {
        xrEnumerateInstanceExtensionProperties(name.as_ptr(), 0, &mut count, std::ptr::null_mut())
    };
    if !succeeded(result) {
        return Err(result);
    }
    if count == 0 {
        return Ok(Vec::new());
    }
    let mut extensions = vec![XrExtensionProperties::empty(); count as usize];
    // SAFETY: the buffer holds `count` records.
    let result = unsafe {
        xrEnumerateInstanceExtensionProperties(
            name.as_ptr(),
            count,
            &mut count,
            extensions.as_mut_ptr(),
        )
    };
    if !succeeded(result) {
        return Err(result);
    }
    extensions.truncate(count as usize);
    Ok(extensions)
}
