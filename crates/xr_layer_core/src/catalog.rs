//! Extension catalog built from every downstream chain participant.
//!
//! # Responsibility
//! - Query each downstream layer, then the runtime, for its extensions.
//! - Merge the answers into one name-keyed catalog.
//!
//! # Invariants
//! - Discovery is best-effort: a failing participant contributes nothing.
//! - Under `VersionPolicy::FirstSeen` a name keeps the first reported version.

use crate::abi::{
    cast_function, read_c_chars, succeeded, EnumerateInstanceExtensionPropertiesFn,
    GetInstanceProcAddrFn, PfnVoidFunction, XrExtensionProperties, XR_NULL_HANDLE,
};
use crate::chain::ChainLink;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::{c_char, CStr};

const ENUMERATE_EXTENSIONS_SYMBOL: &CStr = c"xrEnumerateInstanceExtensionProperties";

/// One extension name and version as reported by a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRecord {
    pub name: String,
    pub version: u32,
}

impl ExtensionRecord {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

/// Duplicate-name resolution when several participants report one extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionPolicy {
    #[default]
    FirstSeen,
    HighestVersion,
}

/// Name-keyed extension catalog, preserving first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct ExtensionCatalog {
    policy: VersionPolicy,
    records: Vec<ExtensionRecord>,
    index: HashMap<String, usize>,
}

impl ExtensionCatalog {
    pub fn new(policy: VersionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Merges one record according to the catalog policy.
    pub fn insert(&mut self, record: ExtensionRecord) {
        match self.index.get(record.name.as_str()) {
            Some(&position) => {
                if self.policy == VersionPolicy::HighestVersion
                    && record.version > self.records[position].version
                {
                    self.records[position].version = record.version;
                }
            }
            None => {
                self.index.insert(record.name.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = ExtensionRecord>) {
        for record in records {
            self.insert(record);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn version_of(&self, name: &str) -> Option<u32> {
        self.index
            .get(name)
            .map(|&position| self.records[position].version)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ExtensionRecord] {
        &self.records
    }
}

/// Builds the catalog from every participant after `head`, runtime last.
///
/// Each link's resolver reaches the participant named by the following link;
/// the terminal link's resolver reaches the runtime, queried with a null name.
pub fn discover_available_extensions(head: ChainLink<'_>, policy: VersionPolicy) -> ExtensionCatalog {
    let mut catalog = ExtensionCatalog::new(policy);
    let mut last = head;
    for link in head.iter() {
        last = link;
        let Some(next) = link.next() else {
            break;
        };
        let Some(resolver) = link.resolver() else {
            continue;
        };
        let layer_name = next.layer_name_c();
        let records = query_extensions(resolver, Some(layer_name.as_c_str()));
        debug!(
            "event=extensions_discovered module=catalog status=ok participant={} count={}",
            next.layer_name(),
            records.len()
        );
        catalog.extend(records);
    }

    if let Some(resolver) = last.resolver() {
        let records = query_extensions(resolver, None);
        debug!(
            "event=extensions_discovered module=catalog status=ok participant=runtime count={}",
            records.len()
        );
        catalog.extend(records);
    }
    catalog
}

/// Runs the two-call enumeration against one participant.
///
/// Returns an empty list when resolution or either call fails.
pub fn query_extensions(
    resolver: GetInstanceProcAddrFn,
    layer_name: Option<&CStr>,
) -> Vec<ExtensionRecord> {
    let name_ptr: *const c_char = layer_name.map_or(std::ptr::null(), CStr::as_ptr);
    let mut function: PfnVoidFunction = None;
    // SAFETY: resolver comes from the loader chain; arguments are valid for the call.
    let result = unsafe {
        resolver(
            XR_NULL_HANDLE,
            ENUMERATE_EXTENSIONS_SYMBOL.as_ptr(),
            &mut function,
        )
    };
    let enumerate = match function {
        // SAFETY: the resolver returned this pointer for the enumerate symbol.
        Some(function) if succeeded(result) => unsafe {
            cast_function::<EnumerateInstanceExtensionPropertiesFn>(function)
        },
        _ => {
            warn!(
                "event=extensions_query module=catalog status=error stage=resolve participant={}",
                participant_label(layer_name)
            );
            return Vec::new();
        }
    };

    let mut count = 0_u32;
    // SAFETY: capacity 0 with a null buffer is the count-query form.
    let result = unsafe { enumerate(name_ptr, 0, &mut count, std::ptr::null_mut()) };
    if !succeeded(result) {
        warn!(
            "event=extensions_query module=catalog status=error stage=count participant={} result={}",
            participant_label(layer_name),
            result
        );
        return Vec::new();
    }
    if count == 0 {
        return Vec::new();
    }

    let mut properties = vec![XrExtensionProperties::empty(); count as usize];
    let mut filled = 0_u32;
    // SAFETY: the buffer holds exactly `count` records.
    let result = unsafe { enumerate(name_ptr, count, &mut filled, properties.as_mut_ptr()) };
    if !succeeded(result) {
        warn!(
            "event=extensions_query module=catalog status=error stage=fill participant={} result={}",
            participant_label(layer_name),
            result
        );
        return Vec::new();
    }

    properties
        .iter()
        .take(filled.min(count) as usize)
        .map(|property| {
            ExtensionRecord::new(
                read_c_chars(&property.extension_name),
                property.extension_version,
            )
        })
        .filter(|record| !record.name.is_empty())
        .collect()
}

fn participant_label(layer_name: Option<&CStr>) -> String {
    layer_name.map_or_else(
        || "runtime".to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

#[cfg(test)]
mod tests {
    use super::{ExtensionCatalog, ExtensionRecord, VersionPolicy};

    #[test]
    fn first_seen_version_wins_by_default() {
        let mut catalog = ExtensionCatalog::new(VersionPolicy::FirstSeen);
        catalog.insert(ExtensionRecord::new("XR_EXT_a", 1));
        catalog.insert(ExtensionRecord::new("XR_EXT_a", 3));
        assert_eq!(catalog.version_of("XR_EXT_a"), Some(1));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn highest_version_policy_upgrades_duplicates() {
        let mut catalog = ExtensionCatalog::new(VersionPolicy::HighestVersion);
        catalog.extend([
            ExtensionRecord::new("XR_EXT_a", 2),
            ExtensionRecord::new("XR_EXT_a", 5),
            ExtensionRecord::new("XR_EXT_a", 4),
        ]);
        assert_eq!(catalog.version_of("XR_EXT_a"), Some(5));
    }

    #[test]
    fn records_keep_first_insertion_order() {
        let mut catalog = ExtensionCatalog::default();
        catalog.extend([
            ExtensionRecord::new("XR_EXT_b", 1),
            ExtensionRecord::new("XR_EXT_a", 1),
            ExtensionRecord::new("XR_EXT_b", 2),
        ]);
        let names = catalog
            .records()
            .iter()
            .map(|record| record.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["XR_EXT_b", "XR_EXT_a"]);
        assert!(!catalog.contains("XR_EXT_c"));
    }
}
