use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result};
use crate::record::FieldDef;
use crate::tag::{self, TagSpec};

/// Which keys a record field is published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    NamesOnly,
    #[default]
    TagsOnly,
    NamesAndTags,
    NamesIfNoTag,
}

/// Per-call field resolution policy for the mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Replace records implementing a value producer by the produced value.
    pub evaluate_methods: bool,
    /// Keep shared pointers as-is instead of resolving them to their pointee.
    pub keep_pointers: bool,
    pub mode: ResolutionMode,
    /// Treat every field as if tagged `omitempty`.
    pub omit_empty: bool,
    /// Tag namespaces in lookup order.
    pub tags: Vec<String>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            evaluate_methods: false,
            keep_pointers: true,
            mode: ResolutionMode::TagsOnly,
            omit_empty: false,
            tags: vec!["db".to_string(), "json".to_string()],
        }
    }
}

impl MapperConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ConvertError::ArgumentInvalid {
            caller: "MapperConfig::from_json",
            reason: e.to_string(),
        })
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_mode(mut self, mode: ResolutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_evaluate_methods(mut self, evaluate: bool) -> Self {
        self.evaluate_methods = evaluate;
        self
    }

    pub fn with_keep_pointers(mut self, keep: bool) -> Self {
        self.keep_pointers = keep;
        self
    }

    pub fn with_omit_empty(mut self, omit: bool) -> Self {
        self.omit_empty = omit;
        self
    }

    /// Parsed tags of `field` in namespace order; excluded tags are dropped.
    pub(crate) fn tag_specs(&self, field: &FieldDef) -> Vec<TagSpec<'static>> {
        if self.mode == ResolutionMode::NamesOnly {
            return Vec::new();
        }
        self.tags
            .iter()
            .filter_map(|namespace| field.tag(namespace))
            .filter_map(tag::parse)
            .collect()
    }
}
