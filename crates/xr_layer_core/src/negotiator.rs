//! Computes the extension set forwarded down the chain.

use crate::catalog::ExtensionCatalog;
use crate::error::{LayerError, LayerResult};
use log::info;

/// Ordered extension names to request downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiatedExtensionSet {
    /// Application-requested names that survived the blocklist, original order.
    pub requested: Vec<String>,
    /// Implicit names confirmed available, configured order.
    pub granted_implicit: Vec<String>,
}

impl NegotiatedExtensionSet {
    /// Final forwarded list: filtered request followed by implicit grants.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.requested
            .iter()
            .chain(self.granted_implicit.iter())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.requested.len() + self.granted_implicit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Filters the application request and checks every implicit extension.
///
/// `catalog` is only consulted when `implicit` is non-empty; passing `None`
/// with a non-empty implicit list fails as if nothing were available.
pub fn negotiate(
    implicit: &[String],
    requested: &[String],
    blocked: &[String],
    catalog: Option<&ExtensionCatalog>,
) -> LayerResult<NegotiatedExtensionSet> {
    let mut granted_implicit = Vec::with_capacity(implicit.len());
    for name in implicit {
        if !catalog.is_some_and(|catalog| catalog.contains(name)) {
            info!(
                "event=implicit_extension_missing module=negotiator status=error extension={}",
                name
            );
            return Err(LayerError::ExtensionNotPresent(name.clone()));
        }
        granted_implicit.push(name.clone());
    }

    let mut kept = Vec::with_capacity(requested.len());
    for name in requested {
        if blocked.iter().any(|value| value == name) {
            info!(
                "event=extension_blocked module=negotiator status=ok extension={}",
                name
            );
        } else {
            info!(
                "event=extension_requested module=negotiator status=ok extension={}",
                name
            );
            kept.push(name.clone());
        }
    }
    for name in &granted_implicit {
        info!(
            "event=extension_granted module=negotiator status=ok extension={}",
            name
        );
    }

    Ok(NegotiatedExtensionSet {
        requested: kept,
        granted_implicit,
    })
}

#[cfg(test)]
mod tests {
    use super::negotiate;
    use crate::catalog::{ExtensionCatalog, ExtensionRecord, VersionPolicy};
    use crate::error::LayerError;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn catalog(values: &[&str]) -> ExtensionCatalog {
        let mut catalog = ExtensionCatalog::new(VersionPolicy::FirstSeen);
        catalog.extend(values.iter().map(|value| ExtensionRecord::new(*value, 1)));
        catalog
    }

    #[test]
    fn blocked_entries_are_dropped_in_order() {
        let set = negotiate(&[], &names(&["A", "B", "C"]), &names(&["B"]), None)
            .expect("no implicit extensions means no failure");
        assert_eq!(set.requested, names(&["A", "C"]));
        assert!(set.granted_implicit.is_empty());
    }

    #[test]
    fn implicit_extensions_follow_requested_ones() {
        let available = catalog(&["XR_EXT_x", "XR_EXT_y"]);
        let set = negotiate(
            &names(&["XR_EXT_y", "XR_EXT_x"]),
            &names(&["XR_KHR_a"]),
            &[],
            Some(&available),
        )
        .expect("all implicit extensions are available");
        assert_eq!(
            set.names().collect::<Vec<_>>(),
            vec!["XR_KHR_a", "XR_EXT_y", "XR_EXT_x"]
        );
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn missing_implicit_extension_aborts() {
        let available = catalog(&["XR_EXT_x"]);
        let err = negotiate(
            &names(&["XR_EXT_x", "XR_EXT_missing"]),
            &names(&["XR_KHR_a"]),
            &[],
            Some(&available),
        )
        .expect_err("a missing implicit extension is a hard stop");
        assert_eq!(
            err,
            LayerError::ExtensionNotPresent("XR_EXT_missing".to_string())
        );
    }

    #[test]
    fn implicit_without_catalog_fails() {
        let err = negotiate(&names(&["XR_EXT_x"]), &[], &[], None)
            .expect_err("nothing is available without a catalog");
        assert!(matches!(err, LayerError::ExtensionNotPresent(_)));
    }
}
