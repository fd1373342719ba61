//! Detected controls: the input produced by the platform's type detector

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Metadata of one backing state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateMeta {
    /// Lower bound of numeric values
    #[serde(default)]
    pub min: Option<f64>,
    /// Upper bound of numeric values
    #[serde(default)]
    pub max: Option<f64>,
    /// Value type (`boolean`, `number`, `string`)
    #[serde(default, rename = "type")]
    pub value_type: Option<String>,
    /// Unit (`%`, `°C`, `mired`, `K`)
    #[serde(default)]
    pub unit: Option<String>,
    /// Custom display name
    #[serde(default)]
    pub name: Option<String>,
    /// Enumerated values: backing value → label
    #[serde(default)]
    pub states: Option<BTreeMap<String, String>>,
}

/// One role of a detected control bound to a backing state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedState {
    /// Role (e.g. `set`, `actual`, `on_set`, `dimmer`, `mode`)
    pub name: String,
    /// Backing state identifier; absent when the role was not found
    #[serde(default)]
    pub id: Option<String>,
    /// State metadata
    #[serde(default)]
    pub common: StateMeta,
}

/// A device pattern found in the platform's object graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedControl {
    /// Pattern type (e.g. `light`, `dimmer`, `thermostat`)
    #[serde(rename = "type")]
    pub kind: String,
    /// Roles and their states
    #[serde(default)]
    pub states: Vec<DetectedState>,
    /// Platform object the control was detected on
    #[serde(default)]
    pub object_id: Option<String>,
    /// Custom friendly name
    #[serde(default)]
    pub name: Option<String>,
    /// Room the control belongs to
    #[serde(default)]
    pub room: Option<String>,
    /// Function the control belongs to
    #[serde(default)]
    pub function: Option<String>,
    /// Additional groups
    #[serde(default)]
    pub groups: Vec<String>,
    /// Toggle on/off semantics for the resulting endpoint
    #[serde(default)]
    pub toggle: bool,
}

impl DetectedControl {
    /// Create a control of the given pattern with no states
    #[must_use]
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            states: Vec::new(),
            object_id: None,
            name: None,
            room: None,
            function: None,
            groups: Vec::new(),
            toggle: false,
        }
    }

    /// Add a role bound to a state
    #[must_use]
    pub fn with_state(self, role: &str, id: &str) -> Self {
        self.with_state_meta(role, id, StateMeta::default())
    }

    /// Add a role bound to a state with metadata
    #[must_use]
    pub fn with_state_meta(mut self, role: &str, id: &str, common: StateMeta) -> Self {
        self.states.push(DetectedState {
            name: role.to_string(),
            id: Some(id.to_string()),
            common,
        });
        self
    }

    /// Set the custom name
    #[must_use]
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Set room and function
    #[must_use]
    pub fn in_room(mut self, room: &str, function: &str) -> Self {
        self.room = Some(room.to_string());
        self.function = Some(function.to_string());
        self
    }

    /// Enable toggle semantics
    #[must_use]
    pub const fn toggled(mut self) -> Self {
        self.toggle = true;
        self
    }

    /// Look up a role, case-insensitively
    #[must_use]
    pub fn state(&self, role: &str) -> Option<&DetectedState> {
        self.states
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(role) && s.id.is_some())
    }

    /// Name used when nothing else is configured
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.states.iter().find_map(|s| s.common.name.clone()))
            .or_else(|| self.object_id.clone())
            .unwrap_or_else(|| self.kind.clone())
    }
}

/// Read a JSON array of detected controls
///
/// # Errors
///
/// Returns error if the file cannot be read or is not a control list
pub fn read_controls(path: &Path) -> Result<Vec<DetectedControl>> {
    let content = std::fs::read_to_string(path)?;
    let controls: Vec<DetectedControl> = serde_json::from_str(&content)?;
    tracing::debug!(path = %path.display(), controls = controls.len(), "loaded controls");
    Ok(controls)
}
