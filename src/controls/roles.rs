//! Role lookup over a detected control

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::platform::{DetectedControl, StateMeta};
use crate::properties::{Backing, ModeMapping};
use crate::{Error, Result};

/// Resolves the roles of one detected control into backing identifiers
pub struct Roles<'a> {
    control: &'a DetectedControl,
}

impl<'a> Roles<'a> {
    pub const fn new(control: &'a DetectedControl) -> Self {
        Self { control }
    }

    /// Backing id of a role, if present
    pub fn id(&self, role: &str) -> Option<&'a str> {
        self.control.state(role).and_then(|s| s.id.as_deref())
    }

    /// Backing id of a mandatory role
    pub fn require(&self, role: &str) -> Result<&'a str> {
        self.id(role).ok_or_else(|| Error::MissingState {
            control: self.control.display_name(),
            role: role.to_string(),
        })
    }

    pub fn meta(&self, role: &str) -> Option<&'a StateMeta> {
        self.control.state(role).map(|s| &s.common)
    }

    /// `[min, max]` of a numeric role, falling back to `default`
    pub fn range(&self, role: &str, default: (f64, f64)) -> (f64, f64) {
        let meta = self.meta(role);
        let min = meta.and_then(|m| m.min).unwrap_or(default.0);
        let max = meta.and_then(|m| m.max).unwrap_or(default.1);
        if min < max { (min, max) } else { default }
    }

    pub fn unit(&self, role: &str) -> Option<&'a str> {
        self.meta(role).and_then(|m| m.unit.as_deref())
    }

    /// Backing written through `set_role`, read through `get_role` when present
    pub fn backing(&self, set_role: &str, get_role: &str) -> Result<Backing> {
        let set_id = self.require(set_role)?;
        Ok(Backing::split(set_id, self.id(get_role)))
    }

    /// Like [`Self::backing`], but `None` when `set_role` is absent
    pub fn optional_backing(&self, set_role: &str, get_role: &str) -> Option<Backing> {
        self.id(set_role)
            .map(|set_id| Backing::split(set_id, self.id(get_role)))
    }

    /// Backing read and written through one mandatory role
    pub fn state(&self, role: &str) -> Result<Backing> {
        Ok(Backing::state(self.require(role)?))
    }

    /// Enumerated values of a role: backing value and label
    pub fn enumerated(&self, role: &str) -> Vec<(Value, String)> {
        self.meta(role)
            .and_then(|m| m.states.as_ref())
            .map(|states: &BTreeMap<String, String>| {
                states
                    .iter()
                    .map(|(raw, label)| (parse_backing(raw), label.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Mode mappings `"{prefix}.{Label}"` for every enumerated value of a role
    pub fn prefixed_modes(&self, role: &str, prefix: &str) -> Vec<ModeMapping> {
        self.enumerated(role)
            .into_iter()
            .filter_map(|(backing, label)| {
                let name: String = label.chars().filter(char::is_ascii_alphanumeric).collect();
                (!name.is_empty()).then(|| ModeMapping {
                    alexa: format!("{prefix}.{name}"),
                    backing,
                    label,
                })
            })
            .collect()
    }
}

/// Enumerated keys are strings; numeric ones are written back as numbers
fn parse_backing(raw: &str) -> Value {
    raw.parse::<i64>()
        .map(|n| json!(n))
        .or_else(|_| raw.parse::<f64>().map(|f| json!(f)))
        .unwrap_or_else(|_| json!(raw))
}
