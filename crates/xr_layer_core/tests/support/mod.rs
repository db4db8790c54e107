//! Fake loader chain, fake downstream participants and a recording wrapped
//! layer shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::ffi::{c_char, CStr, CString};
use std::sync::{Arc, Mutex};
use xr_layer_core::abi::{
    c_str_opt, erase_function, write_c_chars, CreateApiLayerInstanceFn, DestroyInstanceFn,
    EnumerateInstanceExtensionPropertiesFn, GetInstanceProcAddrFn, PfnVoidFunction, VoidFunction,
    XrApiLayerCreateInfo, XrApiLayerNextInfo, XrApiLayerProperties, XrApplicationInfo,
    XrExtensionProperties, XrInstance, XrInstanceCreateInfo, XrResult,
    XR_API_LAYER_CREATE_INFO_STRUCT_VERSION, XR_API_LAYER_MAX_SETTINGS_PATH_SIZE,
    XR_API_LAYER_NEXT_INFO_STRUCT_VERSION, XR_ERROR_FUNCTION_UNSUPPORTED,
    XR_ERROR_RUNTIME_FAILURE, XR_ERROR_SIZE_INSUFFICIENT, XR_LOADER_INTERFACE_STRUCT_API_LAYER_CREATE_INFO,
    XR_LOADER_INTERFACE_STRUCT_API_LAYER_NEXT_INFO, XR_MAX_API_LAYER_NAME_SIZE,
    XR_MAX_APPLICATION_NAME_SIZE, XR_MAX_ENGINE_NAME_SIZE, XR_NULL_HANDLE, XR_SUCCESS,
    XR_TYPE_INSTANCE_CREATE_INFO,
};
use xr_layer_core::{
    ApiLayer, LayerConfig, LayerError, LayerExports, LayerResult, WrappedLayer,
    WrappedLayerFactory,
};

pub const LAYER_NAME: &str = "XR_APILAYER_NOVENDOR_template";
pub const CREATED_HANDLE: XrInstance = 0x42;

/// Everything the fake downstream participants report and observe.
pub struct FakeWorld {
    /// Advertised extensions per participant; `None` is the runtime.
    pub advertised: HashMap<Option<String>, Vec<(String, u32)>>,
    pub failing_participants: HashSet<Option<String>>,
    pub create_result: XrResult,
    pub create_calls: u32,
    pub forwarded_extensions: Vec<String>,
    pub forwarded_next_layer: Option<String>,
    pub enumerate_calls: Vec<(Option<String>, u32)>,
    pub destroy_calls: Vec<XrInstance>,
    pub destroy_result: XrResult,
    pub resolve_destroy: bool,
}

impl Default for FakeWorld {
    fn default() -> Self {
        Self {
            advertised: HashMap::new(),
            failing_participants: HashSet::new(),
            create_result: XR_SUCCESS,
            create_calls: 0,
            forwarded_extensions: Vec::new(),
            forwarded_next_layer: None,
            enumerate_calls: Vec::new(),
            destroy_calls: Vec::new(),
            destroy_result: XR_SUCCESS,
            resolve_destroy: true,
        }
    }
}

thread_local! {
    static WORLD: RefCell<FakeWorld> = RefCell::new(FakeWorld::default());
}

pub fn reset_world() {
    WORLD.with(|world| *world.borrow_mut() = FakeWorld::default());
}

pub fn with_world<R>(f: impl FnOnce(&mut FakeWorld) -> R) -> R {
    WORLD.with(|world| f(&mut world.borrow_mut()))
}

pub fn advertise(participant: Option<&str>, extensions: &[(&str, u32)]) {
    with_world(|world| {
        world.advertised.insert(
            participant.map(str::to_string),
            extensions
                .iter()
                .map(|(name, version)| (name.to_string(), *version))
                .collect(),
        );
    });
}

pub unsafe extern "system" fn fake_get_instance_proc_addr(
    _instance: XrInstance,
    name: *const c_char,
    function: *mut PfnVoidFunction,
) -> XrResult {
    let resolved: PfnVoidFunction = match CStr::from_ptr(name).to_bytes() {
        b"xrEnumerateInstanceExtensionProperties" => Some(erase_function(
            fake_enumerate_instance_extension_properties as EnumerateInstanceExtensionPropertiesFn,
        )),
        b"xrDestroyInstance" if with_world(|world| world.resolve_destroy) => {
            Some(erase_function(fake_destroy_instance as DestroyInstanceFn))
        }
        _ => None,
    };
    *function = resolved;
    if resolved.is_some() {
        XR_SUCCESS
    } else {
        XR_ERROR_FUNCTION_UNSUPPORTED
    }
}

pub unsafe extern "system" fn fake_enumerate_instance_extension_properties(
    layer_name: *const c_char,
    capacity: u32,
    count_output: *mut u32,
    properties: *mut XrExtensionProperties,
) -> XrResult {
    let participant = c_str_opt(layer_name).map(|name| name.to_string_lossy().into_owned());
    with_world(|world| {
        world.enumerate_calls.push((participant.clone(), capacity));
        if world.failing_participants.contains(&participant) {
            return XR_ERROR_RUNTIME_FAILURE;
        }
        let list = world.advertised.get(&participant).cloned().unwrap_or_default();
        if capacity == 0 {
            *count_output = list.len() as u32;
            return XR_SUCCESS;
        }
        if (capacity as usize) < list.len() {
            return XR_ERROR_SIZE_INSUFFICIENT;
        }
        for (index, (name, version)) in list.iter().enumerate() {
            let slot = &mut *properties.add(index);
            write_c_chars(&mut slot.extension_name, name);
            slot.extension_version = *version;
        }
        *count_output = list.len() as u32;
        XR_SUCCESS
    })
}

pub unsafe extern "system" fn fake_create_api_layer_instance(
    info: *const XrInstanceCreateInfo,
    api_layer_info: *const XrApiLayerCreateInfo,
    instance: *mut XrInstance,
) -> XrResult {
    let info = &*info;
    let forwarded = if info.enabled_extension_count == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(
            info.enabled_extension_names,
            info.enabled_extension_count as usize,
        )
        .iter()
        .map(|name| CStr::from_ptr(*name).to_string_lossy().into_owned())
        .collect()
    };
    let next_layer = (*api_layer_info)
        .next_info
        .as_ref()
        .map(|next| xr_layer_core::abi::read_c_chars(&next.layer_name));
    with_world(|world| {
        world.create_calls += 1;
        world.forwarded_extensions = forwarded;
        world.forwarded_next_layer = next_layer;
        *instance = if world.create_result >= 0 {
            CREATED_HANDLE
        } else {
            XR_NULL_HANDLE
        };
        world.create_result
    })
}

pub unsafe extern "system" fn fake_destroy_instance(instance: XrInstance) -> XrResult {
    with_world(|world| {
        world.destroy_calls.push(instance);
        world.destroy_result
    })
}

/// Loader-shaped chain: first name is this layer, the rest are downstream.
pub struct FakeChain {
    nodes: Vec<Box<XrApiLayerNextInfo>>,
    create_info: Box<XrApiLayerCreateInfo>,
}

impl FakeChain {
    pub fn new(layer_names: &[&str]) -> Self {
        let mut nodes = layer_names
            .iter()
            .map(|name| {
                let mut layer_name = [0; XR_MAX_API_LAYER_NAME_SIZE];
                write_c_chars(&mut layer_name, name);
                Box::new(XrApiLayerNextInfo {
                    struct_type: XR_LOADER_INTERFACE_STRUCT_API_LAYER_NEXT_INFO,
                    struct_version: XR_API_LAYER_NEXT_INFO_STRUCT_VERSION,
                    struct_size: std::mem::size_of::<XrApiLayerNextInfo>(),
                    layer_name,
                    next_get_instance_proc_addr: Some(
                        fake_get_instance_proc_addr as GetInstanceProcAddrFn,
                    ),
                    next_create_api_layer_instance: Some(
                        fake_create_api_layer_instance as CreateApiLayerInstanceFn,
                    ),
                    next: std::ptr::null_mut(),
                })
            })
            .collect::<Vec<_>>();
        for index in (0..nodes.len().saturating_sub(1)).rev() {
            let next: *mut XrApiLayerNextInfo = &mut *nodes[index + 1];
            nodes[index].next = next;
        }
        let head: *mut XrApiLayerNextInfo = nodes
            .first_mut()
            .map_or(std::ptr::null_mut(), |node| &mut **node as *mut _);
        let create_info = Box::new(XrApiLayerCreateInfo {
            struct_type: XR_LOADER_INTERFACE_STRUCT_API_LAYER_CREATE_INFO,
            struct_version: XR_API_LAYER_CREATE_INFO_STRUCT_VERSION,
            struct_size: std::mem::size_of::<XrApiLayerCreateInfo>(),
            loader_instance: std::ptr::null_mut(),
            settings_file_location: [0; XR_API_LAYER_MAX_SETTINGS_PATH_SIZE],
            next_info: head,
        });
        Self { nodes, create_info }
    }

    pub fn as_ptr(&self) -> *const XrApiLayerCreateInfo {
        self.create_info.as_ref()
    }

    pub fn info_mut(&mut self) -> &mut XrApiLayerCreateInfo {
        &mut self.create_info
    }

    pub fn node_mut(&mut self, index: usize) -> &mut XrApiLayerNextInfo {
        &mut self.nodes[index]
    }
}

/// Application create info with a fixed list of requested extensions.
pub struct AppRequest {
    _names: Vec<CString>,
    pointers: Vec<*const c_char>,
    pub info: XrInstanceCreateInfo,
}

impl AppRequest {
    pub fn new(extensions: &[&str]) -> Self {
        let names = extensions
            .iter()
            .map(|name| CString::new(*name).expect("test names have no NUL"))
            .collect::<Vec<_>>();
        let pointers = names.iter().map(|name| name.as_ptr()).collect::<Vec<_>>();
        let info = XrInstanceCreateInfo {
            ty: XR_TYPE_INSTANCE_CREATE_INFO,
            next: std::ptr::null(),
            create_flags: 0,
            application_info: XrApplicationInfo {
                application_name: [0; XR_MAX_APPLICATION_NAME_SIZE],
                application_version: 1,
                engine_name: [0; XR_MAX_ENGINE_NAME_SIZE],
                engine_version: 1,
                api_version: xr_layer_core::abi::XR_CURRENT_API_VERSION,
            },
            enabled_api_layer_count: 0,
            enabled_api_layer_names: std::ptr::null(),
            enabled_extension_count: pointers.len() as u32,
            enabled_extension_names: pointers.as_ptr(),
        };
        Self {
            _names: names,
            pointers,
            info,
        }
    }

    pub fn requested(&self) -> Vec<String> {
        self.pointers
            .iter()
            .map(|ptr| unsafe { CStr::from_ptr(*ptr) }.to_string_lossy().into_owned())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    Succeed,
    Fail(XrResult),
    Panic,
}

/// What the recording wrapped layer saw.
#[derive(Debug, Default)]
pub struct Observed {
    pub created: u32,
    pub instance: XrInstance,
    pub resolver_set: bool,
    pub granted: Vec<String>,
    pub hook_saw_extensions: Vec<String>,
    pub resolved: Vec<String>,
}

pub struct RecordingLayer {
    outcome: HookOutcome,
    observed: Arc<Mutex<Observed>>,
}

pub unsafe extern "system" fn wrapped_marker() {}

impl WrappedLayer for RecordingLayer {
    fn set_downstream_resolver(&mut self, _resolver: GetInstanceProcAddrFn, instance: XrInstance) {
        let mut observed = self.observed.lock().expect("observed lock");
        observed.resolver_set = true;
        observed.instance = instance;
    }

    fn set_granted_extensions(&mut self, extensions: Vec<String>) {
        self.observed.lock().expect("observed lock").granted = extensions;
    }

    fn on_instance_created(&mut self, create_info: &XrInstanceCreateInfo) -> LayerResult<()> {
        let seen = (0..create_info.enabled_extension_count as usize)
            .map(|index| unsafe {
                CStr::from_ptr(*create_info.enabled_extension_names.add(index))
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        {
            let mut observed = self.observed.lock().expect("observed lock");
            observed.created += 1;
            observed.hook_saw_extensions = seen;
        }
        match self.outcome {
            HookOutcome::Succeed => Ok(()),
            HookOutcome::Fail(code) => Err(LayerError::Downstream(code)),
            HookOutcome::Panic => panic!("wrapped layer exploded"),
        }
    }

    fn resolve(&self, _instance: XrInstance, name: &CStr) -> LayerResult<VoidFunction> {
        let name = name.to_string_lossy().into_owned();
        self.observed
            .lock()
            .expect("observed lock")
            .resolved
            .push(name.clone());
        match name.as_str() {
            "xrWrappedSymbol" => Ok(wrapped_marker as VoidFunction),
            "xrPanicSymbol" => panic!("resolver exploded"),
            _ => Err(LayerError::FunctionUnsupported(name)),
        }
    }
}

pub fn recording_factory(outcome: HookOutcome, observed: Arc<Mutex<Observed>>) -> WrappedLayerFactory {
    Box::new(move || {
        Box::new(RecordingLayer {
            outcome,
            observed: Arc::clone(&observed),
        })
    })
}

pub unsafe extern "system" fn local_enumerate_api_layer_properties(
    _capacity: u32,
    _count_output: *mut u32,
    _properties: *mut XrApiLayerProperties,
) -> XrResult {
    XR_SUCCESS
}

pub unsafe extern "system" fn local_enumerate_instance_extension_properties(
    _layer_name: *const c_char,
    _capacity: u32,
    _count_output: *mut u32,
    _properties: *mut XrExtensionProperties,
) -> XrResult {
    XR_SUCCESS
}

unsafe extern "system" fn local_create_api_layer_instance(
    _info: *const XrInstanceCreateInfo,
    _api_layer_info: *const XrApiLayerCreateInfo,
    _instance: *mut XrInstance,
) -> XrResult {
    XR_SUCCESS
}

pub fn test_exports() -> LayerExports {
    LayerExports {
        get_instance_proc_addr: fake_get_instance_proc_addr,
        create_api_layer_instance: local_create_api_layer_instance,
        enumerate_api_layer_properties: local_enumerate_api_layer_properties,
        enumerate_instance_extension_properties: local_enumerate_instance_extension_properties,
    }
}

pub fn test_config() -> LayerConfig {
    LayerConfig::new(LAYER_NAME, "An API layer template", 1)
}

pub fn test_layer(config: LayerConfig, factory: WrappedLayerFactory) -> ApiLayer {
    ApiLayer::new(config, test_exports(), factory).expect("test config is valid")
}

pub fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
