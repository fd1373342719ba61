//! Controls: one physical device pattern bound to its backing states
//!
//! A [`Control`] owns *supported* capabilities (advertised in discovery) and
//! *enforced* capabilities (accepted for group commands but never advertised).
//! Directives are routed through a table built once at construction:
//! `(namespace, directive name, instance)` → properties.

mod actuators;
mod climate;
mod kind;
mod lights;
mod media;
mod roles;
mod sensors;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{Value, json};

pub use kind::ControlKind;

use crate::capabilities::{Capability, CapabilityKind};
use crate::platform::{DetectedControl, StateStore};
use crate::properties::conversion::{self, as_f64};
use crate::properties::{Backing, Conversion, DirectiveKind, Property, PropertyKind};
use crate::protocol::{Directive, ReportedProperty};
use crate::response::DirectiveError;
use crate::Result;

use roles::Roles;

/// Remembered last non-zero level of a state also used as derived power
#[derive(Debug, Clone, PartialEq)]
struct LevelMemory {
    state: String,
    off: f64,
    last: Option<Value>,
}

impl LevelMemory {
    fn new(state: &str, off: f64) -> Self {
        Self {
            state: state.to_string(),
            off,
            last: None,
        }
    }

    fn observe(&mut self, id: &str, value: &Value) {
        if id == self.state && as_f64(value).is_ok_and(|level| level > self.off) {
            self.last = Some(value.clone());
        }
    }
}

/// Capabilities and metadata produced by a pattern builder
#[derive(Debug)]
struct Blueprint {
    supported: Vec<Capability>,
    enforced: Vec<Capability>,
    categories: Vec<&'static str>,
    level: Option<LevelMemory>,
}

impl Blueprint {
    fn new(kind: ControlKind) -> Self {
        Self {
            supported: Vec::new(),
            enforced: Vec::new(),
            categories: vec![kind.category()],
            level: None,
        }
    }

    fn support(mut self, capability: Capability) -> Self {
        self.supported.push(capability);
        self
    }

    fn support_opt(self, capability: Option<Capability>) -> Self {
        match capability {
            Some(capability) => self.support(capability),
            None => self,
        }
    }

    fn enforce(mut self, capability: Capability) -> Self {
        self.enforced.push(capability);
        self
    }

    fn category(mut self, category: &'static str) -> Self {
        if !self.categories.contains(&category) {
            self.categories.push(category);
        }
        self
    }

    fn remember_level(mut self, state: &str, off: f64) -> Self {
        self.level = Some(LevelMemory::new(state, off));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Route {
    enforced: bool,
    capability: usize,
    property: usize,
    strategy: DirectiveKind,
}

type RouteKey = (String, String, Option<String>);

/// One device pattern bound to backing states
pub struct Control {
    kind: ControlKind,
    name: String,
    states: BTreeMap<String, String>,
    supported: Vec<Capability>,
    enforced: Vec<Capability>,
    categories: Vec<&'static str>,
    routes: HashMap<RouteKey, Vec<Route>>,
    level: Option<LevelMemory>,
    store: Arc<dyn StateStore>,
}

impl Control {
    /// Build a control from a detected pattern
    ///
    /// # Errors
    ///
    /// Returns error if the pattern is unknown or a mandatory role is missing
    pub fn from_detected(detected: &DetectedControl, store: Arc<dyn StateStore>) -> Result<Self> {
        let kind: ControlKind = detected.kind.parse()?;
        let roles = Roles::new(detected);

        let blueprint = match kind {
            ControlKind::Light | ControlKind::Socket => lights::switch(&roles, kind)?,
            ControlKind::Dimmer => lights::dimmer(&roles)?,
            ControlKind::Ct => lights::ct(&roles)?,
            ControlKind::Hue => lights::hue(&roles)?,
            ControlKind::Rgb => lights::rgb(&roles)?,
            ControlKind::RgbSingle | ControlKind::RgbwSingle => lights::rgb_single(&roles, kind)?,
            ControlKind::Blind | ControlKind::Slider => actuators::level(&roles, kind)?,
            ControlKind::Lock => actuators::lock(&roles)?,
            ControlKind::Gate => actuators::gate(&roles)?,
            ControlKind::Button => actuators::button(&roles)?,
            ControlKind::VacuumCleaner => actuators::vacuum_cleaner(&roles)?,
            ControlKind::Thermostat => climate::thermostat(&roles)?,
            ControlKind::AirCondition => climate::air_condition(&roles)?,
            ControlKind::Temperature => climate::temperature(&roles)?,
            ControlKind::Motion => sensors::motion(&roles)?,
            ControlKind::Door | ControlKind::Window => sensors::contact(&roles, kind)?,
            ControlKind::Volume | ControlKind::VolumeGroup => media::speaker(&roles, kind)?,
        };

        let blueprint = blueprint.support_opt(sensors::health(&roles));

        let states = detected
            .states
            .iter()
            .filter_map(|s| Some((s.name.to_ascii_lowercase(), s.id.clone()?)))
            .collect();

        Ok(Self::assemble(kind, detected.display_name(), states, blueprint, store))
    }

    fn assemble(
        kind: ControlKind,
        name: String,
        states: BTreeMap<String, String>,
        blueprint: Blueprint,
        store: Arc<dyn StateStore>,
    ) -> Self {
        let mut routes: HashMap<RouteKey, Vec<Route>> = HashMap::new();

        let sets = [(false, &blueprint.supported), (true, &blueprint.enforced)];
        for (enforced, capabilities) in sets {
            for (ci, capability) in capabilities.iter().enumerate() {
                for (pi, property) in capability.properties().iter().enumerate() {
                    for (directive, strategy) in property.kind().directives() {
                        let key = (
                            capability.namespace().to_string(),
                            (*directive).to_string(),
                            capability.instance().map(str::to_string),
                        );
                        routes.entry(key).or_default().push(Route {
                            enforced,
                            capability: ci,
                            property: pi,
                            strategy: *strategy,
                        });
                    }
                }
            }
        }

        Self {
            kind,
            name,
            states,
            supported: blueprint.supported,
            enforced: blueprint.enforced,
            categories: blueprint.categories,
            routes,
            level: blueprint.level,
            store,
        }
    }

    /// Device pattern
    #[must_use]
    pub const fn kind(&self) -> ControlKind {
        self.kind
    }

    /// Name used in logs
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Role → backing state of the detected pattern
    #[must_use]
    pub const fn states(&self) -> &BTreeMap<String, String> {
        &self.states
    }

    /// Advertised capabilities
    #[must_use]
    pub fn supported(&self) -> &[Capability] {
        &self.supported
    }

    /// Accepted but not advertised capabilities
    #[must_use]
    pub fn enforced(&self) -> &[Capability] {
        &self.enforced
    }

    /// Display categories
    #[must_use]
    pub fn categories(&self) -> &[&'static str] {
        &self.categories
    }

    /// Every backing state read or written by this control
    #[must_use]
    pub fn state_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .supported
            .iter()
            .chain(&self.enforced)
            .flat_map(Capability::properties)
            .flat_map(|p| {
                let mut ids: Vec<String> = p.backing().read_ids().into_iter().map(str::to_string).collect();
                ids.push(p.set_id().to_string());
                ids
            })
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    fn lookup(&self, directive: &Directive) -> Vec<Route> {
        let header = &directive.header;
        let mut found: Vec<Route> = self
            .routes
            .get(&(header.namespace.clone(), header.name.clone(), header.instance.clone()))
            .cloned()
            .unwrap_or_default();

        if header.instance.is_some() {
            if let Some(routes) = self
                .routes
                .get(&(header.namespace.clone(), header.name.clone(), None))
            {
                found.extend(routes);
            }
        }

        found
    }

    /// Whether an advertised capability handles the directive
    #[must_use]
    pub fn supports(&self, directive: &Directive) -> bool {
        self.lookup(directive).iter().any(|r| !r.enforced)
    }

    /// Whether an enforced capability accepts the directive
    #[must_use]
    pub fn can_handle(&self, directive: &Directive) -> bool {
        self.lookup(directive).iter().any(|r| r.enforced)
    }

    fn property_mut(&mut self, route: Route) -> &mut Property {
        let capabilities = if route.enforced {
            &mut self.enforced
        } else {
            &mut self.supported
        };
        &mut capabilities[route.capability].properties_mut()[route.property]
    }

    /// Apply a directive to the backing states
    ///
    /// Matched properties are processed one after another. The first
    /// reported property is the response value, the others join its context.
    ///
    /// # Errors
    ///
    /// Returns [`DirectiveError::NotSupportedByControl`] if nothing matches or
    /// an enforced capability matched, and
    /// [`DirectiveError::EndpointUnreachable`] if a value could not be
    /// extracted, converted or written
    pub async fn handle(&mut self, directive: &Directive) -> std::result::Result<Vec<ReportedProperty>, DirectiveError> {
        let mut routes = self.lookup(directive);
        if routes.is_empty() {
            return Err(DirectiveError::NotSupportedByControl);
        }
        routes.sort_by_key(|r| r.strategy == DirectiveKind::Echo);

        let mut reported = Vec::new();
        let mut enforced = false;

        for route in routes {
            enforced |= route.enforced;
            let outcome = match route.strategy {
                DirectiveKind::Set => self.set_value(route, directive).await,
                DirectiveKind::Adjust => self.adjust_value(route, directive).await.map(Some),
                DirectiveKind::Echo => {
                    let store = Arc::clone(&self.store);
                    let echoed = self.property_mut(route).report(store.as_ref()).await;
                    match echoed {
                        Ok(property) => Ok(Some(property)),
                        Err(e) => {
                            tracing::debug!(control = %self.name, error = %e, "skipping echoed property");
                            Ok(None)
                        }
                    }
                }
            };

            match outcome {
                Ok(property) => reported.extend(property),
                Err(e) => {
                    tracing::warn!(
                        control = %self.name,
                        directive = %directive.header.name,
                        error = %e,
                        "directive failed"
                    );
                    return Err(DirectiveError::EndpointUnreachable(e.to_string()));
                }
            }
        }

        if enforced {
            tracing::debug!(
                control = %self.name,
                directive = %directive.header.name,
                "handled through enforced capability"
            );
            return Err(DirectiveError::NotSupportedByControl);
        }

        Ok(reported)
    }

    async fn set_value(&mut self, route: Route, directive: &Directive) -> Result<Option<ReportedProperty>> {
        let store = Arc::clone(&self.store);
        let remembered = self.level.as_ref().and_then(|l| l.last.clone());
        let property = self.property_mut(route);

        if property.needs_current(directive) {
            property.retrieve(store.as_ref()).await?;
        }

        let mut assistant = property.alexa_directive_value(directive)?;

        if property.kind() == PropertyKind::PowerState {
            if let Some(current) = directive.current_value(property.namespace(), property.property_name()) {
                let next = if current == "ON" { "OFF" } else { "ON" };
                tracing::debug!(from = %current, to = next, "toggling power state");
                assistant = json!(next);
            }
        }

        let mut backing = property.value(&assistant)?;
        if matches!(property.conversion(), Conversion::LevelPower { .. }) && assistant == "ON" {
            if let Some(last) = remembered {
                backing = last;
            }
        }

        property.write(store.as_ref(), &backing).await?;

        let reported = if property.kind().is_reportable() {
            Some(property.reported(property.alexa_value(&backing)?))
        } else {
            None
        };

        let written = property.written_states(&backing);
        self.synchronize(route, &written);
        Ok(reported)
    }

    async fn adjust_value(&mut self, route: Route, directive: &Directive) -> Result<ReportedProperty> {
        let store = Arc::clone(&self.store);
        let property = self.property_mut(route);

        let delta = property.delta_value(directive)?;
        let current = property.retrieve(store.as_ref()).await?;
        let current = as_f64(&property.alexa_value(&current)?)?;

        let target = conversion::number((current + delta).clamp(0.0, 100.0));
        let backing = property.value(&target)?;
        property.write(store.as_ref(), &backing).await?;

        let reported = property.reported(property.alexa_value(&backing)?);
        let written = property.written_states(&backing);
        self.synchronize(route, &written);
        Ok(reported)
    }

    /// Propagate the states written through `route` to every other property
    /// backed by one of them
    fn synchronize(&mut self, route: Route, written: &[(String, Value)]) {
        let sets = [(false, &mut self.supported), (true, &mut self.enforced)];
        for (enforced, capabilities) in sets {
            for (ci, capability) in capabilities.iter_mut().enumerate() {
                for (pi, property) in capability.properties_mut().iter_mut().enumerate() {
                    if (enforced, ci, pi) == (route.enforced, route.capability, route.property) {
                        continue;
                    }
                    for (id, value) in written {
                        property.state_updated(id, Some(value));
                    }
                }
            }
        }

        if let Some(level) = &mut self.level {
            for (id, value) in written {
                level.observe(id, value);
            }
        }
    }

    fn properties_mut(&mut self) -> impl Iterator<Item = &mut Property> {
        self.supported
            .iter_mut()
            .chain(self.enforced.iter_mut())
            .flat_map(|c| c.properties_mut().iter_mut())
    }

    /// A backing state changed outside of the bridge
    ///
    /// Properties reading the state take the new value, or forget their
    /// cached one when no value is given. Returns whether any property is
    /// backed by the state.
    pub fn state_changed(&mut self, id: &str, value: Option<&Value>) -> bool {
        let mut affected = false;
        for property in self.properties_mut() {
            affected |= property.state_updated(id, value);
        }
        if let (Some(level), Some(value)) = (&mut self.level, value) {
            level.observe(id, value);
        }
        affected
    }

    /// Current values of every advertised property
    ///
    /// Properties that cannot be read are logged and left out.
    pub async fn report_state(&mut self) -> Vec<ReportedProperty> {
        let store = Arc::clone(&self.store);
        let mut reported = Vec::new();
        let mut observed = Vec::new();

        for capability in &mut self.supported {
            for property in capability.properties_mut() {
                if !property.kind().is_reportable() {
                    continue;
                }
                match property.report(store.as_ref()).await {
                    Ok(entry) => {
                        if let Some(value) = property.current_value() {
                            observed.push((property.get_id().to_string(), value.clone()));
                        }
                        reported.push(entry);
                    }
                    Err(e) => tracing::warn!(
                        control = %self.name,
                        property = property.property_name(),
                        error = %e,
                        "failed to report property"
                    ),
                }
            }
        }

        if let Some(level) = &mut self.level {
            for (id, value) in &observed {
                level.observe(id, value);
            }
        }

        reported
    }
}

impl std::fmt::Debug for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Control")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("states", &self.states)
            .field("supported", &self.supported)
            .field("enforced", &self.enforced)
            .finish_non_exhaustive()
    }
}

/// `Alexa.PowerController` over a boolean state
fn power_switch(backing: Backing) -> Capability {
    Capability::new(
        CapabilityKind::PowerController,
        vec![Property::new(PropertyKind::PowerState, backing, Conversion::power())],
    )
}

/// `Alexa.PowerController` derived from a numeric level: off at `min`, on at `max`
fn power_from_level(backing: Backing, (min, max): (f64, f64)) -> Capability {
    Capability::new(
        CapabilityKind::PowerController,
        vec![Property::new(
            PropertyKind::PowerState,
            backing,
            Conversion::LevelPower { off: min, on: max },
        )],
    )
}

/// Single-property capability over a percentage-scaled level
fn percent_capability(
    kind: CapabilityKind,
    property: PropertyKind,
    backing: Backing,
    (min, max): (f64, f64),
) -> Capability {
    Capability::new(
        kind,
        vec![Property::new(property, backing, Conversion::Percent { min, max }).with_range(Some(min), Some(max))],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{MemoryStateStore, StateMeta};

    fn dimmer(store: &Arc<MemoryStateStore>) -> Control {
        let detected = DetectedControl::new("dimmer").named("Lamp").with_state_meta(
            "set",
            "lamp.level",
            StateMeta {
                min: Some(0.0),
                max: Some(100.0),
                ..StateMeta::default()
            },
        );
        Control::from_detected(&detected, store.clone()).unwrap()
    }

    fn directive(namespace: &str, name: &str, payload: Value) -> Directive {
        Directive::new(namespace, name, Some("Lamp"), payload)
    }

    #[tokio::test]
    async fn adjust_is_clamped() {
        let store = Arc::new(MemoryStateStore::new());
        store.insert("lamp.level", json!(90));
        let mut control = dimmer(&store);

        let up = directive("Alexa.BrightnessController", "AdjustBrightness", json!({"brightnessDelta": 50}));
        let reported = control.handle(&up).await.unwrap();
        assert_eq!(reported[0].value, json!(100));
        assert_eq!(store.value("lamp.level"), Some(json!(100)));

        let down = directive("Alexa.BrightnessController", "AdjustBrightness", json!({"brightnessDelta": -250}));
        let reported = control.handle(&down).await.unwrap();
        assert_eq!(reported[0].value, json!(0));
        assert_eq!(store.value("lamp.level"), Some(json!(0)));
    }

    #[tokio::test]
    async fn dimmer_restores_last_level_on_turn_on() {
        let store = Arc::new(MemoryStateStore::new());
        let mut control = dimmer(&store);

        let on = directive("Alexa.PowerController", "TurnOn", json!({}));
        let reported = control.handle(&on).await.unwrap();
        assert_eq!(reported[0].value, json!("ON"));
        assert_eq!(store.value("lamp.level"), Some(json!(100)));

        let set = directive("Alexa.BrightnessController", "SetBrightness", json!({"brightness": 40}));
        control.handle(&set).await.unwrap();

        let off = directive("Alexa.PowerController", "TurnOff", json!({}));
        control.handle(&off).await.unwrap();
        assert_eq!(store.value("lamp.level"), Some(json!(0)));

        control.handle(&on).await.unwrap();
        assert_eq!(store.value("lamp.level"), Some(json!(40)));
    }

    #[tokio::test]
    async fn write_failure_is_unreachable() {
        let store = Arc::new(MemoryStateStore::new());
        store.fail_writes(true);
        let mut control = dimmer(&store);

        let on = directive("Alexa.PowerController", "TurnOn", json!({}));
        assert!(matches!(
            control.handle(&on).await,
            Err(DirectiveError::EndpointUnreachable(_))
        ));
    }

    #[tokio::test]
    async fn unknown_directive_is_not_supported() {
        let store = Arc::new(MemoryStateStore::new());
        let mut control = dimmer(&store);

        let lock = directive("Alexa.LockController", "Lock", json!({}));
        assert!(!control.supports(&lock));
        assert_eq!(control.handle(&lock).await, Err(DirectiveError::NotSupportedByControl));
    }

    #[tokio::test]
    async fn toggle_flips_echoed_power_state() {
        let store = Arc::new(MemoryStateStore::new());
        let detected = DetectedControl::new("light").with_state("set", "lamp.on");
        let mut control = Control::from_detected(&detected, store.clone()).unwrap();

        let mut on = directive("Alexa.PowerController", "TurnOn", json!({}));
        on.current_state = Some(vec![ReportedProperty {
            namespace: "Alexa.PowerController".to_string(),
            name: "powerState".to_string(),
            instance: None,
            value: json!("ON"),
        }]);

        let reported = control.handle(&on).await.unwrap();
        assert_eq!(reported[0].value, json!("OFF"));
        assert_eq!(store.value("lamp.on"), Some(json!(false)));
    }

    #[tokio::test]
    async fn report_skips_failing_properties() {
        let store = Arc::new(MemoryStateStore::new());
        store.insert("lamp.level", json!(50));
        let mut control = dimmer(&store);

        let reported = control.report_state().await;
        let names: Vec<&str> = reported.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["brightness", "powerState"]);

        let mut fresh = dimmer(&store);
        store.fail_reads(true);
        assert!(fresh.report_state().await.is_empty());
    }

    #[tokio::test]
    async fn external_changes_refresh_the_cache() {
        let store = Arc::new(MemoryStateStore::new());
        store.insert("lamp.level", json!(50));
        let mut control = dimmer(&store);
        control.report_state().await;

        store.insert("lamp.level", json!(0));
        assert!(control.state_changed("lamp.level", Some(&json!(0))));
        assert!(!control.state_changed("other", None));

        let reported = control.report_state().await;
        assert_eq!(reported[0].value, json!(0));
        assert_eq!(reported[1].value, json!("OFF"));
    }
}
