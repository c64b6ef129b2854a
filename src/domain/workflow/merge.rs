//! Context merge engine.
//!
//! Reconciles the structured `device_constants` layer deterministically:
//! - absent facts are inserted with their origin
//! - equal facts are kept (a user restatement upgrades provenance)
//! - conflicting facts resolve by origin precedence, user input first
//!
//! Nothing is ever deleted. The narrative `information` field is
//! regenerated by the model; the merger only appends contradiction notes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DeviceFacts, LmContract, Origin, ProjectContext, TaggedValue};

/// What happened to one device property during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Updated,
    /// Same value, now confirmed by the user.
    ProvenanceUpgraded,
    /// A document disagreed with a user-stated value, which was retained.
    KeptUserValue,
    /// Two documents disagreed; the later one won.
    Contradiction,
}

/// Human-readable delta entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextChange {
    pub device: String,
    pub property: String,
    pub kind: ChangeKind,
    pub summary: String,
}

/// Result of a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub context: ProjectContext,
    pub changed: bool,
    pub changes: Vec<ContextChange>,
}

/// Deterministic merger for extracted facts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextMerger;

impl ContextMerger {
    pub fn new() -> Self {
        Self
    }

    /// Merges facts from a single origin into a copy of `previous`.
    pub fn merge(
        &self,
        previous: &ProjectContext,
        facts: &DeviceFacts,
        origin: &Origin,
    ) -> MergeOutcome {
        let mut context = previous.clone();
        let mut changes = Vec::new();
        for (device, properties) in facts {
            for (property, value) in properties {
                if let Some(change) = apply_fact(&mut context, device, property, value, origin) {
                    changes.push(change);
                }
            }
        }
        let changed = context != *previous;
        MergeOutcome {
            context,
            changed,
            changes,
        }
    }

    /// Applies a validated model response to the previous context.
    ///
    /// The narrative is replaced by the model's regenerated one (kept as-is
    /// when the model returned none), then document facts are merged in
    /// response order, then user facts, so user input always lands last.
    pub fn merge_contract(&self, previous: &ProjectContext, contract: &LmContract) -> MergeOutcome {
        let mut context = previous.clone();
        if !contract.information.trim().is_empty() {
            context.information = contract.information.clone();
        }

        let mut changes = Vec::new();
        for file in &contract.file_facts {
            let origin = Origin::file(file.document_id.clone());
            let outcome = self.merge(&context, &file.devices, &origin);
            context = outcome.context;
            changes.extend(outcome.changes);
        }

        let outcome = self.merge(&context, &contract.user_facts, &Origin::UserMessage);
        context = outcome.context;
        changes.extend(outcome.changes);

        let changed = context != *previous;
        MergeOutcome {
            context,
            changed,
            changes,
        }
    }
}

fn apply_fact(
    context: &mut ProjectContext,
    device: &str,
    property: &str,
    value: &Value,
    origin: &Origin,
) -> Option<ContextChange> {
    let properties = context.device_constants.entry(device.to_string()).or_default();

    let Some(existing) = properties.get_mut(property) else {
        properties.insert(property.to_string(), TaggedValue::new(value.clone(), origin.clone()));
        return Some(change(
            device,
            property,
            ChangeKind::Added,
            format!("{}.{} = {} ({})", device, property, render(value), origin),
        ));
    };

    if existing.value == *value {
        if origin.is_user() && !existing.origin.is_user() {
            let summary = format!(
                "{}.{} confirmed by user (was {})",
                device, property, existing.origin
            );
            existing.origin = Origin::UserMessage;
            return Some(change(device, property, ChangeKind::ProvenanceUpgraded, summary));
        }
        return None;
    }

    if origin.is_user() || existing.origin == *origin {
        let summary = format!(
            "{}.{}: {} -> {} ({})",
            device,
            property,
            render(&existing.value),
            render(value),
            origin
        );
        *existing = TaggedValue::new(value.clone(), origin.clone());
        tracing::debug!(device, property, origin = %origin, "Device constant updated");
        return Some(change(device, property, ChangeKind::Updated, summary));
    }

    if existing.origin.is_user() {
        tracing::debug!(
            device,
            property,
            rejected_origin = %origin,
            "Document value conflicts with user-stated value; keeping user value"
        );
        return Some(change(
            device,
            property,
            ChangeKind::KeptUserValue,
            format!(
                "{}.{}: kept user value {} over {} from {}",
                device,
                property,
                render(&existing.value),
                render(value),
                origin
            ),
        ));
    }

    let note = format!(
        "Note: conflicting values for {}.{}: {} from {}, {} from {}; using {}.",
        device,
        property,
        render(&existing.value),
        existing.origin,
        render(value),
        origin,
        origin
    );
    tracing::warn!(device, property, previous_origin = %existing.origin, origin = %origin, "Contradicting document values");
    *existing = TaggedValue::new(value.clone(), origin.clone());
    append_note(&mut context.information, &note);
    Some(change(device, property, ChangeKind::Contradiction, note))
}

fn append_note(information: &mut String, note: &str) {
    if information.contains(note) {
        return;
    }
    if !information.is_empty() {
        information.push_str("\n\n");
    }
    information.push_str("> ");
    information.push_str(note);
}

fn change(device: &str, property: &str, kind: ChangeKind, summary: String) -> ContextChange {
    ContextChange {
        device: device.to_string(),
        property: property.to_string(),
        kind,
        summary,
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        other => other.to_string(),
    }
}
