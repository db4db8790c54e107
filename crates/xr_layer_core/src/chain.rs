//! Read-only view over the loader-owned layer chain.
//!
//! # Invariants
//! - Nothing here allocates, frees, reorders or writes chain nodes.
//! - A `ChainLink<'a>` never outlives the negotiation call that produced it.

use crate::abi::{
    read_c_chars, CreateApiLayerInstanceFn, GetInstanceProcAddrFn, XrApiLayerNextInfo,
};
use std::ffi::CString;

/// One borrowed node of the chain.
#[derive(Clone, Copy)]
pub struct ChainLink<'a> {
    info: &'a XrApiLayerNextInfo,
}

impl<'a> ChainLink<'a> {
    /// Wraps a raw chain pointer.
    ///
    /// # Safety
    /// `ptr` must be null or point to a well-formed, NULL-terminated chain that
    /// stays alive and unmodified for `'a`.
    pub unsafe fn from_raw(ptr: *const XrApiLayerNextInfo) -> Option<Self> {
        ptr.as_ref().map(|info| Self { info })
    }

    pub fn raw(&self) -> &'a XrApiLayerNextInfo {
        self.info
    }

    pub fn layer_name(&self) -> String {
        read_c_chars(&self.info.layer_name)
    }

    /// Layer name as an owned C string, ready to pass back through the ABI.
    pub fn layer_name_c(&self) -> CString {
        // read_c_chars stops at the first NUL, so no interior NUL can remain.
        CString::new(self.layer_name()).unwrap_or_default()
    }

    /// Resolver reaching the participant after this link.
    pub fn resolver(&self) -> Option<GetInstanceProcAddrFn> {
        self.info.next_get_instance_proc_addr
    }

    pub fn creator(&self) -> Option<CreateApiLayerInstanceFn> {
        self.info.next_create_api_layer_instance
    }

    pub fn next(&self) -> Option<ChainLink<'a>> {
        // SAFETY: the chain invariant from `from_raw` covers every reachable node.
        unsafe { Self::from_raw(self.info.next) }
    }

    pub fn is_terminal(&self) -> bool {
        self.info.next.is_null()
    }

    /// Iterates this link and every link after it.
    pub fn iter(self) -> ChainIter<'a> {
        ChainIter {
            current: Some(self),
        }
    }
}

pub struct ChainIter<'a> {
    current: Option<ChainLink<'a>>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = ChainLink<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let link = self.current.take()?;
        self.current = link.next();
        Some(link)
    }
}
