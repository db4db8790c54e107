//! Static layer configuration and validation.
//!
//! # Responsibility
//! - Describe the layer identity and its extension policy lists.
//! - Reject declarations the loader ABI cannot carry.
//!
//! # Invariants
//! - A validated config only holds names that fit their fixed C fields.
//! - Names never contain interior NUL bytes (guaranteed by the name patterns).

use crate::abi::{
    XR_MAX_API_LAYER_DESCRIPTION_SIZE, XR_MAX_API_LAYER_NAME_SIZE, XR_MAX_EXTENSION_NAME_SIZE,
};
use crate::catalog::{ExtensionRecord, VersionPolicy};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

static LAYER_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^XR_APILAYER_[A-Z0-9]+_[A-Za-z0-9_]+$").expect("layer name pattern is valid")
});
static EXTENSION_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^XR_[A-Z0-9]+_[A-Za-z0-9_]+$").expect("extension name pattern is valid")
});

/// Declarative layer configuration, supplied at build or load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerConfig {
    /// Layer name as registered with the loader, e.g. `XR_APILAYER_NOVENDOR_template`.
    pub layer_name: String,
    pub description: String,
    pub layer_version: u32,
    /// Extensions this layer always requests downstream; each must be available.
    #[serde(default)]
    pub implicit_extensions: Vec<String>,
    /// Application-requested extensions silently dropped before forwarding.
    #[serde(default)]
    pub blocked_extensions: Vec<String>,
    /// Extensions this layer itself reports to the loader.
    #[serde(default)]
    pub advertised_extensions: Vec<ExtensionRecord>,
    #[serde(default)]
    pub version_policy: VersionPolicy,
}

impl LayerConfig {
    /// Minimal config with empty extension lists.
    pub fn new(layer_name: impl Into<String>, description: impl Into<String>, version: u32) -> Self {
        Self {
            layer_name: layer_name.into(),
            description: description.into(),
            layer_version: version,
            implicit_extensions: Vec::new(),
            blocked_extensions: Vec::new(),
            advertised_extensions: Vec::new(),
            version_policy: VersionPolicy::default(),
        }
    }

    /// Parses and validates a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates declaration-level invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.layer_name.len() >= XR_MAX_API_LAYER_NAME_SIZE
            || !LAYER_NAME_PATTERN.is_match(&self.layer_name)
        {
            return Err(ConfigError::InvalidLayerName(self.layer_name.clone()));
        }
        if self.description.len() >= XR_MAX_API_LAYER_DESCRIPTION_SIZE
            || self.description.contains('\0')
        {
            return Err(ConfigError::InvalidDescription);
        }

        validate_names("implicit_extensions", self.implicit_extensions.iter())?;
        validate_names("blocked_extensions", self.blocked_extensions.iter())?;
        validate_names(
            "advertised_extensions",
            self.advertised_extensions.iter().map(|record| &record.name),
        )?;
        Ok(())
    }
}

fn validate_names<'a>(
    list: &'static str,
    names: impl Iterator<Item = &'a String>,
) -> Result<(), ConfigError> {
    let mut dedup = BTreeSet::<&str>::new();
    for name in names {
        if !is_valid_extension_name(name) {
            return Err(ConfigError::InvalidExtensionName {
                list,
                name: name.clone(),
            });
        }
        if !dedup.insert(name.as_str()) {
            return Err(ConfigError::DuplicateExtension {
                list,
                name: name.clone(),
            });
        }
    }
    Ok(())
}

/// Returns whether `name` is a well-formed extension name that fits the ABI field.
pub fn is_valid_extension_name(name: &str) -> bool {
    name.len() < XR_MAX_EXTENSION_NAME_SIZE && EXTENSION_NAME_PATTERN.is_match(name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    InvalidLayerName(String),
    InvalidDescription,
    InvalidExtensionName { list: &'static str, name: String },
    DuplicateExtension { list: &'static str, name: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "config parse failed: {message}"),
            Self::InvalidLayerName(value) => write!(f, "invalid layer name: {value}"),
            Self::InvalidDescription => write!(
                f,
                "description must be shorter than {XR_MAX_API_LAYER_DESCRIPTION_SIZE} bytes"
            ),
            Self::InvalidExtensionName { list, name } => {
                write!(f, "invalid extension name in {list}: {name}")
            }
            Self::DuplicateExtension { list, name } => {
                write!(f, "duplicate extension in {list}: {name}")
            }
        }
    }
}

impl Error for ConfigError {}
