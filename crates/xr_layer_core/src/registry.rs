//! Per-instance layer state, keyed by instance handle.
//!
//! # Invariants
//! - At most one state is live per handle.
//! - A state is inserted fully initialized and never mutated afterwards.

use crate::abi::{GetInstanceProcAddrFn, XrInstance};
use crate::error::{LayerError, LayerResult};
use crate::wrapped::WrappedLayer;
use log::info;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// State published once the downstream instance and the wrapped hook succeeded.
pub struct LayerInstanceState {
    pub instance: XrInstance,
    pub downstream_resolver: GetInstanceProcAddrFn,
    pub granted_extensions: Vec<String>,
    pub wrapped: Box<dyn WrappedLayer>,
}

#[derive(Default)]
pub struct InstanceRegistry {
    entries: RwLock<HashMap<XrInstance, Arc<LayerInstanceState>>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a fully initialized state for its handle.
    pub fn publish(&self, state: LayerInstanceState) -> LayerResult<Arc<LayerInstanceState>> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| LayerError::Runtime("instance registry lock poisoned".to_string()))?;
        if entries.contains_key(&state.instance) {
            return Err(LayerError::Runtime(format!(
                "instance {:#x} already has layer state",
                state.instance
            )));
        }
        let instance = state.instance;
        let state = Arc::new(state);
        entries.insert(instance, Arc::clone(&state));
        info!(
            "event=instance_published module=registry status=ok instance={:#x} live={}",
            instance,
            entries.len()
        );
        Ok(state)
    }

    pub fn get(&self, instance: XrInstance) -> Option<Arc<LayerInstanceState>> {
        self.entries.read().ok()?.get(&instance).cloned()
    }

    /// Removes the state of a destroyed instance.
    pub fn retire(&self, instance: XrInstance) -> Option<Arc<LayerInstanceState>> {
        let removed = self.entries.write().ok()?.remove(&instance);
        if removed.is_some() {
            info!(
                "event=instance_retired module=registry status=ok instance={:#x}",
                instance
            );
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
