//! Transformation options.
//!
//! Options are plain serde data, so a service can keep named option sets in
//! its configuration files and load them with [`TransformOptions::from_bytes`].

use crate::class::ClassId;
use crate::metadata::TypeRef;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Class-wide default for properties without Expose/Exclude records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    /// Every own key is included unless excluded.
    ExposeAll,
    /// Only exposed properties are included.
    ExcludeAll,
}

/// Property types for one class, used when the class has no Type records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetMap {
    pub target: ClassId,
    #[serde(default)]
    pub properties: IndexMap<String, TypeRef>,
}

impl TargetMap {
    pub fn new(target: impl Into<ClassId>) -> Self {
        Self {
            target: target.into(),
            properties: IndexMap::new(),
        }
    }

    pub fn property(mut self, name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        self.properties.insert(name.into(), ty.into());
        self
    }
}

/// Options of one transformation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformOptions {
    /// Fallback strategy for classes that declare none.
    pub strategy: Option<Strategy>,
    /// Active groups. Empty means only ungrouped properties are included.
    pub groups: Vec<String>,
    pub version: Option<f64>,
    /// Key prefixes dropped under the expose-all strategy.
    pub exclude_prefixes: Vec<String>,
    pub ignore_decorators: bool,
    pub enable_circular_check: bool,
    /// Use class type hints to coerce values in plain→class.
    pub enable_implicit_conversion: bool,
    /// Keep only exposed properties.
    pub exclude_extraneous_values: bool,
    /// Keep destination defaults when the source value is unset.
    pub expose_default_values: bool,
    /// Assign `Undefined` results instead of skipping them.
    pub expose_unset_fields: bool,
    pub target_maps: Vec<TargetMap>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            strategy: None,
            groups: Vec::new(),
            version: None,
            exclude_prefixes: Vec::new(),
            ignore_decorators: false,
            enable_circular_check: false,
            enable_implicit_conversion: false,
            exclude_extraneous_values: false,
            expose_default_values: false,
            expose_unset_fields: true,
            target_maps: Vec::new(),
        }
    }
}

impl TransformOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn groups<S: Into<String>>(mut self, groups: impl IntoIterator<Item = S>) -> Self {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn version(mut self, version: f64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn exclude_prefixes<S: Into<String>>(
        mut self,
        prefixes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.exclude_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn ignore_decorators(mut self, enabled: bool) -> Self {
        self.ignore_decorators = enabled;
        self
    }

    pub fn enable_circular_check(mut self, enabled: bool) -> Self {
        self.enable_circular_check = enabled;
        self
    }

    pub fn enable_implicit_conversion(mut self, enabled: bool) -> Self {
        self.enable_implicit_conversion = enabled;
        self
    }

    pub fn exclude_extraneous_values(mut self, enabled: bool) -> Self {
        self.exclude_extraneous_values = enabled;
        self
    }

    pub fn expose_default_values(mut self, enabled: bool) -> Self {
        self.expose_default_values = enabled;
        self
    }

    pub fn expose_unset_fields(mut self, enabled: bool) -> Self {
        self.expose_unset_fields = enabled;
        self
    }

    pub fn target_map(mut self, map: TargetMap) -> Self {
        self.target_maps.push(map);
        self
    }

    /// Whether `[since, until)` contains the configured version. Always true
    /// when no version is configured.
    pub(crate) fn version_allows(&self, since: Option<f64>, until: Option<f64>) -> bool {
        let Some(version) = self.version else {
            return true;
        };
        since.is_none_or(|since| version >= since) && until.is_none_or(|until| version < until)
    }

    /// Whether a record tagged with `groups` is active. Ungrouped records
    /// always are; grouped ones only when a configured group overlaps.
    pub(crate) fn groups_allow(&self, groups: &[String]) -> bool {
        groups.is_empty() || self.groups.iter().any(|group| groups.contains(group))
    }

    /// Type declared for `property` of `target` in the target maps.
    pub(crate) fn target_map_type(&self, target: &ClassId, property: &str) -> Option<&TypeRef> {
        self.target_maps
            .iter()
            .filter(|map| &map.target == target)
            .filter_map(|map| map.properties.get(property))
            .last()
    }

    /// Parse options from bytes, detecting the format from the path
    /// extension (JSON when unknown).
    pub fn from_bytes(data: &[u8], path: Option<&str>) -> Result<Self, OptionsError> {
        let format = path
            .and_then(|p| p.rsplit_once('.'))
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_else(|| "json".to_string());

        Self::from_bytes_format(data, &format)
    }

    /// Parse options from bytes with explicit format.
    pub fn from_bytes_format(data: &[u8], format: &str) -> Result<Self, OptionsError> {
        match format {
            "json" => serde_json::from_slice(data).map_err(|e| OptionsError::Parse(e.to_string())),
            "yaml" | "yml" => {
                serde_yaml::from_slice(data).map_err(|e| OptionsError::Parse(e.to_string()))
            }
            "toml" => {
                let s = std::str::from_utf8(data)
                    .map_err(|e| OptionsError::Parse(format!("Invalid UTF-8: {}", e)))?;
                toml::from_str(s).map_err(|e| OptionsError::Parse(e.to_string()))
            }
            _ => Err(OptionsError::UnsupportedFormat(format.to_string())),
        }
    }

    /// Serialize options to bytes.
    pub fn to_bytes(&self, format: &str) -> Result<Vec<u8>, OptionsError> {
        match format {
            "json" => {
                serde_json::to_vec_pretty(self).map_err(|e| OptionsError::Parse(e.to_string()))
            }
            "yaml" | "yml" => serde_yaml::to_string(self)
                .map(|s| s.into_bytes())
                .map_err(|e| OptionsError::Parse(e.to_string())),
            "toml" => toml::to_string_pretty(self)
                .map(|s| s.into_bytes())
                .map_err(|e| OptionsError::Parse(e.to_string())),
            _ => Err(OptionsError::UnsupportedFormat(format.to_string())),
        }
    }
}

/// Errors related to loading options.
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("failed to parse transform options: {0}")]
    Parse(String),

    #[error("unsupported options format: {0}")]
    UnsupportedFormat(String),
}
