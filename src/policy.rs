//! Decides whether an issue may be moved and which labels it contributes
//!
//! Pure functions over a [`TicketSnapshot`]; no I/O happens here.

use crate::config::YouTrackConfig;
use crate::youtrack::{CustomField, TicketSnapshot};

/// The static rules, with trigger and label-field names already lowercased
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    pub column_field: String,
    pub triggers: Vec<String>,
    pub label_fields: Vec<String>,
    pub label_prefix: String,
}

impl Policy {
    /// Build from a resolved config; its lists are normalized already
    pub fn from_config(config: &YouTrackConfig) -> Self {
        Self {
            column_field: config.column_field.clone(),
            triggers: config.column_triggers.clone(),
            label_fields: config.label_fields.clone(),
            label_prefix: config.label_prefix.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionDecision {
    pub should_transition: bool,
    /// The workflow-state field, when the issue has one
    pub state_field: Option<CustomField>,
    /// Labels in label-field order, without duplicates; empty unless triggered
    pub labels: Vec<String>,
}

impl TransitionDecision {
    /// Display name of the state the issue is currently in
    pub fn current_state(&self) -> Option<&str> {
        self.state_field.as_ref().and_then(CustomField::value_name)
    }
}

/// `<prefix><name>/<value>`; name and value are the lowercased snapshot keys
pub fn label_for(prefix: &str, name: &str, value: &str) -> String {
    format!("{}{}/{}", prefix, name, value)
}

pub fn decide(snapshot: &TicketSnapshot, policy: &Policy) -> TransitionDecision {
    let Some(state) = snapshot.field(&policy.column_field) else {
        return TransitionDecision::default();
    };

    let triggered = state
        .value_key
        .as_ref()
        .is_some_and(|value| policy.triggers.contains(value));

    if !triggered {
        return TransitionDecision {
            should_transition: false,
            state_field: Some(state.field.clone()),
            labels: Vec::new(),
        };
    }

    let mut labels: Vec<String> = Vec::new();
    for key in &policy.label_fields {
        let Some(field) = snapshot.field_by_key(key) else {
            continue;
        };
        let Some(value) = &field.value_key else {
            continue;
        };

        let label = label_for(&policy.label_prefix, &field.key, value);
        if !labels.contains(&label) {
            labels.push(label);
        }
    }

    TransitionDecision {
        should_transition: true,
        state_field: Some(state.field.clone()),
        labels,
    }
}
