//! Project context - the durable, user-visible state of one session.
//!
//! The caller owns persistence: a context arrives with every interaction
//! and leaves with every response. Maps are ordered so the serialized form
//! is byte-stable across calls.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::Origin;

/// Untagged facts as emitted by the language model: device → property → value.
pub type DeviceFacts = BTreeMap<String, BTreeMap<String, Value>>;

/// A device property value together with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedValue {
    pub value: Value,
    pub origin: Origin,
}

impl TaggedValue {
    /// Creates a tagged value.
    pub fn new(value: impl Into<Value>, origin: Origin) -> Self {
        Self {
            value: value.into(),
            origin,
        }
    }
}

/// Structured device constants plus the free-text requirements narrative.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectContext {
    /// Device name → property name → tagged value.
    #[serde(default)]
    pub device_constants: BTreeMap<String, BTreeMap<String, TaggedValue>>,

    /// Markdown narrative summarizing requirements and decisions.
    #[serde(default)]
    pub information: String,
}

impl ProjectContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the narrative (builder style).
    pub fn with_information(mut self, information: impl Into<String>) -> Self {
        self.information = information.into();
        self
    }

    /// Adds a device constant (builder style), replacing any existing value.
    pub fn with_constant(
        mut self,
        device: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<Value>,
        origin: Origin,
    ) -> Self {
        self.device_constants
            .entry(device.into())
            .or_default()
            .insert(property.into(), TaggedValue::new(value, origin));
        self
    }

    /// True when nothing has been captured yet.
    pub fn is_empty(&self) -> bool {
        self.device_constants.is_empty() && self.information.trim().is_empty()
    }

    /// Looks up one device property.
    pub fn get(&self, device: &str, property: &str) -> Option<&TaggedValue> {
        self.device_constants.get(device)?.get(property)
    }

    /// Number of devices with at least one constant.
    pub fn device_count(&self) -> usize {
        self.device_constants.len()
    }

    /// Total number of device properties across all devices.
    pub fn fact_count(&self) -> usize {
        self.device_constants.values().map(BTreeMap::len).sum()
    }

    /// Length of the narrative in characters.
    pub fn information_len(&self) -> usize {
        self.information.chars().count()
    }
}
