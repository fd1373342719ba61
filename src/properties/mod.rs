//! Properties: one controllable or reportable value of a capability
//!
//! A [`Property`] is a data record (kind, backing identifiers, cached value)
//! plus a [`Conversion`] strategy. The kind registry in [`kind`] replaces any
//! runtime inspection of type names.

pub mod color;
pub mod conversion;
pub mod kind;

use serde_json::{Value, json};

pub use color::{ColorEncoding, Hsb};
pub use conversion::{Conversion, ModeMapping, step_color_temperature};
pub use kind::{DirectiveKind, PropertyKind, ReportShape};

use crate::platform::StateStore;
use crate::protocol::{Directive, ReportedProperty};
use crate::{Error, Result};

/// Cached backing value of a property
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CachedValue {
    /// Never read nor written
    #[default]
    Unknown,
    /// Known, but the backing state may have moved since
    Stale(Value),
    /// Read or written by this process and not invalidated since
    Fresh(Value),
}

impl CachedValue {
    /// The cached value, stale or fresh
    #[must_use]
    pub const fn value(&self) -> Option<&Value> {
        match self {
            Self::Unknown => None,
            Self::Stale(v) | Self::Fresh(v) => Some(v),
        }
    }

    /// Whether the value can be used without reading the store
    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }
}

/// Where the property value lives in the backing state graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backing {
    /// One state written, one (possibly the same) state read
    Single {
        /// State written on set
        set_id: String,
        /// State read on report
        get_id: String,
    },
    /// Several states forming one value object, keyed by component name
    Components(Vec<(String, String)>),
}

impl Backing {
    /// Same state for reading and writing
    #[must_use]
    pub fn state(id: &str) -> Self {
        Self::Single {
            set_id: id.to_string(),
            get_id: id.to_string(),
        }
    }

    /// Distinct states for writing and reading
    #[must_use]
    pub fn split(set_id: &str, get_id: Option<&str>) -> Self {
        Self::Single {
            set_id: set_id.to_string(),
            get_id: get_id.unwrap_or(set_id).to_string(),
        }
    }

    /// Whether the given state backs this value
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        match self {
            Self::Single { set_id, get_id } => set_id == id || get_id == id,
            Self::Components(parts) => parts.iter().any(|(_, state)| state == id),
        }
    }

    /// States read when reporting
    #[must_use]
    pub fn read_ids(&self) -> Vec<&str> {
        match self {
            Self::Single { get_id, .. } => vec![get_id.as_str()],
            Self::Components(parts) => parts.iter().map(|(_, id)| id.as_str()).collect(),
        }
    }
}

/// One controllable or reportable scalar
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    kind: PropertyKind,
    namespace: &'static str,
    instance: Option<String>,
    backing: Backing,
    conversion: Conversion,
    range: Option<(f64, f64)>,
    cached: CachedValue,
}

impl Property {
    /// Create a property; namespace and instance are assigned by its capability
    #[must_use]
    pub fn new(kind: PropertyKind, backing: Backing, conversion: Conversion) -> Self {
        Self {
            kind,
            namespace: "",
            instance: None,
            backing,
            conversion,
            range: None,
            cached: CachedValue::Unknown,
        }
    }

    /// Clamp numeric backing values into `[min, max]`
    #[must_use]
    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        if let (Some(min), Some(max)) = (min, max) {
            if min <= max {
                self.range = Some((min, max));
            }
        }
        self
    }

    pub(crate) fn attach(&mut self, namespace: &'static str, instance: Option<&str>) {
        self.namespace = namespace;
        self.instance = instance.map(str::to_string);
    }

    /// Property kind
    #[must_use]
    pub const fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Protocol property name
    #[must_use]
    pub const fn property_name(&self) -> &'static str {
        self.kind.name()
    }

    /// Namespace of the owning capability
    #[must_use]
    pub const fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// Instance of the owning capability
    #[must_use]
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    /// Backing state layout
    #[must_use]
    pub const fn backing(&self) -> &Backing {
        &self.backing
    }

    /// Primary state written on set
    #[must_use]
    pub fn set_id(&self) -> &str {
        match &self.backing {
            Backing::Single { set_id, .. } => set_id,
            Backing::Components(parts) => parts.first().map_or("", |(_, id)| id.as_str()),
        }
    }

    /// Primary state read on report
    #[must_use]
    pub fn get_id(&self) -> &str {
        match &self.backing {
            Backing::Single { get_id, .. } => get_id,
            Backing::Components(parts) => parts.first().map_or("", |(_, id)| id.as_str()),
        }
    }

    /// Conversion strategy
    #[must_use]
    pub const fn conversion(&self) -> &Conversion {
        &self.conversion
    }

    /// Enumerated values of mode-like properties
    #[must_use]
    pub fn supported_modes(&self) -> &[ModeMapping] {
        self.conversion.modes()
    }

    /// Cached backing value
    #[must_use]
    pub const fn cached(&self) -> &CachedValue {
        &self.cached
    }

    /// Cached backing value, if any
    #[must_use]
    pub const fn current_value(&self) -> Option<&Value> {
        self.cached.value()
    }

    /// Record a backing value as fresh
    pub fn cache(&mut self, value: Value) {
        self.cached = CachedValue::Fresh(value);
    }

    /// Mark the cached value as possibly outdated
    pub fn invalidate(&mut self) {
        self.cached = match std::mem::take(&mut self.cached) {
            CachedValue::Fresh(v) | CachedValue::Stale(v) => CachedValue::Stale(v),
            CachedValue::Unknown => CachedValue::Unknown,
        };
    }

    /// Whether the directive addresses this property
    #[must_use]
    pub fn matches(&self, directive: &Directive) -> bool {
        self.matches_capability(directive) && self.directive(directive).is_some()
    }

    /// Capability-level part of the match: namespace and instance
    #[must_use]
    pub fn matches_capability(&self, directive: &Directive) -> bool {
        directive.header.namespace == self.namespace
            && (self.instance.is_none() || directive.header.instance == self.instance)
    }

    /// Handling strategy for the directive
    #[must_use]
    pub fn directive(&self, directive: &Directive) -> Option<DirectiveKind> {
        self.kind.directive_kind(&directive.header.name)
    }

    /// Whether extracting the directive value needs the current value
    #[must_use]
    pub fn needs_current(&self, directive: &Directive) -> bool {
        self.kind == PropertyKind::ColorTemperatureInKelvin
            && directive.header.name != "SetColorTemperature"
    }

    /// Extract the absolute assistant value carried by a directive
    ///
    /// # Errors
    ///
    /// Returns error if the payload lacks the expected field
    pub fn alexa_directive_value(&self, directive: &Directive) -> Result<Value> {
        let name = directive.header.name.as_str();
        match self.kind {
            PropertyKind::PowerState => Ok(json!(if name == "TurnOn" { "ON" } else { "OFF" })),
            PropertyKind::LockState => Ok(json!(if name == "Lock" { "LOCKED" } else { "UNLOCKED" })),
            PropertyKind::Activation => Ok(json!(true)),
            PropertyKind::ColorTemperatureInKelvin if self.needs_current(directive) => {
                let current = self
                    .current_value()
                    .ok_or_else(|| Error::Conversion("color temperature unknown".to_string()))?;
                let kelvin = conversion::as_f64(&self.alexa_value(current)?)?;
                let increase = name == "IncreaseColorTemperature";
                Ok(conversion::number(step_color_temperature(kelvin, increase)))
            }
            PropertyKind::TargetSetpoint => {
                let setpoint = self.payload(directive, "targetSetpoint")?;
                Ok(conversion::number(temperature_in_celsius(setpoint, false)?))
            }
            PropertyKind::ThermostatMode => {
                let mode = self.payload(directive, "thermostatMode")?;
                Ok(mode.get("value").unwrap_or(mode).clone())
            }
            kind => {
                let field = kind.value_field().ok_or_else(|| {
                    Error::InvalidDirective(format!("{} carries no value", kind.name()))
                })?;
                Ok(self.payload(directive, field)?.clone())
            }
        }
    }

    /// Extract the signed delta of an adjust directive, in assistant units
    ///
    /// # Errors
    ///
    /// Returns error if the payload lacks the delta field
    pub fn delta_value(&self, directive: &Directive) -> Result<f64> {
        let field = self.kind.delta_field().ok_or_else(|| {
            Error::InvalidDirective(format!("{} cannot be adjusted", self.kind.name()))
        })?;
        let delta = self.payload(directive, field)?;
        if self.kind == PropertyKind::TargetSetpoint {
            temperature_in_celsius(delta, true)
        } else {
            conversion::as_f64(delta)
        }
    }

    fn payload<'d>(&self, directive: &'d Directive, field: &str) -> Result<&'d Value> {
        directive.payload_field(field).ok_or_else(|| {
            Error::InvalidDirective(format!(
                "{}.{} without `{field}`",
                directive.header.namespace, directive.header.name
            ))
        })
    }

    /// Convert an assistant value into a backing value
    ///
    /// # Errors
    ///
    /// Returns error if the conversion rejects the value
    pub fn value(&self, assistant: &Value) -> Result<Value> {
        let backing = self.conversion.to_backing(assistant)?;
        Ok(match (self.range, backing.as_f64()) {
            (Some((min, max)), Some(raw)) if raw < min || raw > max => {
                conversion::number(raw.clamp(min, max))
            }
            _ => backing,
        })
    }

    /// Convert a backing value into an assistant value
    ///
    /// # Errors
    ///
    /// Returns error if the conversion rejects the value
    pub fn alexa_value(&self, backing: &Value) -> Result<Value> {
        self.conversion.to_assistant(backing)
    }

    /// Wrap an assistant value in its reporting shape
    #[must_use]
    pub fn report_value(&self, assistant: Value) -> Value {
        match self.kind.report_shape() {
            ReportShape::Plain => assistant,
            ReportShape::Temperature => json!({"value": assistant, "scale": "CELSIUS"}),
            ReportShape::Wrapped => json!({"value": assistant}),
        }
    }

    /// Build the reported entry for an assistant value
    #[must_use]
    pub fn reported(&self, assistant: Value) -> ReportedProperty {
        ReportedProperty {
            namespace: self.namespace.to_string(),
            name: self.kind.name().to_string(),
            instance: self.instance.clone(),
            value: self.report_value(assistant),
        }
    }

    /// Read the backing value from the store and cache it
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or a state holds no value
    pub async fn read(&mut self, store: &dyn StateStore) -> Result<Value> {
        let value = match &self.backing {
            Backing::Single { get_id, .. } => store
                .get_state(get_id)
                .await?
                .ok_or_else(|| Error::Store(format!("state `{get_id}` has no value")))?,
            Backing::Components(parts) => {
                let mut object = serde_json::Map::new();
                for (component, id) in parts {
                    if let Some(value) = store.get_state(id).await? {
                        object.insert(component.clone(), value);
                    }
                }
                if object.is_empty() {
                    return Err(Error::Store(format!(
                        "no state of `{}` has a value",
                        self.get_id()
                    )));
                }
                Value::Object(object)
            }
        };

        self.cache(value.clone());
        Ok(value)
    }

    /// Write a backing value to the store and cache it
    ///
    /// # Errors
    ///
    /// Returns error if the store rejects the write
    pub async fn write(&mut self, store: &dyn StateStore, value: &Value) -> Result<()> {
        for (id, part) in self.written_states(value) {
            store.set_state(&id, part).await?;
        }

        self.cache(value.clone());
        Ok(())
    }

    /// States a write of `value` touches, with the part each one receives
    ///
    /// Components missing from the value are left alone.
    #[must_use]
    pub fn written_states(&self, value: &Value) -> Vec<(String, Value)> {
        match &self.backing {
            Backing::Single { set_id, .. } => vec![(set_id.clone(), value.clone())],
            Backing::Components(parts) => parts
                .iter()
                .filter_map(|(component, id)| Some((id.clone(), value.get(component)?.clone())))
                .collect(),
        }
    }

    /// A backing state took a new value, or an unknown one
    ///
    /// A property reading exactly that state caches the value; any other
    /// property backed by it is invalidated. Returns whether the state backs
    /// this property at all.
    pub fn state_updated(&mut self, id: &str, value: Option<&Value>) -> bool {
        if !self.backing.contains(id) {
            return false;
        }
        let reads = matches!(&self.backing, Backing::Single { get_id, .. } if get_id == id);
        match value {
            Some(value) if reads => self.cache(value.clone()),
            _ => self.invalidate(),
        }
        true
    }

    /// Cached value if fresh, otherwise read; falls back to a stale value
    /// when the read fails
    ///
    /// # Errors
    ///
    /// Returns error if nothing usable is known
    pub async fn retrieve(&mut self, store: &dyn StateStore) -> Result<Value> {
        if let CachedValue::Fresh(value) = &self.cached {
            return Ok(value.clone());
        }

        match self.read(store).await {
            Ok(value) => Ok(value),
            Err(e) => match &self.cached {
                CachedValue::Stale(value) => {
                    tracing::debug!(
                        state = self.get_id(),
                        error = %e,
                        "using stale value after failed read"
                    );
                    Ok(value.clone())
                }
                _ => Err(e),
            },
        }
    }

    /// Retrieve and render this property for a state report
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be read or converted
    pub async fn report(&mut self, store: &dyn StateStore) -> Result<ReportedProperty> {
        let backing = self.retrieve(store).await?;
        let assistant = self.alexa_value(&backing)?;
        Ok(self.reported(assistant))
    }
}

/// Read `{value, scale}` (or a bare number) as Celsius
fn temperature_in_celsius(value: &Value, delta: bool) -> Result<f64> {
    let raw = conversion::as_f64(value.get("value").unwrap_or(value))?;
    let scale = value.get("scale").and_then(Value::as_str).unwrap_or("CELSIUS");
    let celsius = match (scale, delta) {
        ("FAHRENHEIT", false) => (raw - 32.0) * 5.0 / 9.0,
        ("FAHRENHEIT", true) => raw * 5.0 / 9.0,
        ("KELVIN", false) => raw - 273.15,
        _ => raw,
    };
    Ok((celsius * 10.0).round() / 10.0)
}
