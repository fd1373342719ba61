//! Value conversion between assistant semantics and backing values

use serde_json::{Value, json};

use super::color::ColorEncoding;
use crate::{Error, Result};

/// Discrete color temperatures used for stepped increase/decrease
pub const COLOR_TEMPERATURE_TABLE: [f64; 5] = [2200.0, 2700.0, 4000.0, 5500.0, 7000.0];

/// One enumerated value: the assistant-facing name and the backing value
#[derive(Debug, Clone, PartialEq)]
pub struct ModeMapping {
    /// Assistant value (e.g. `HEAT`, `AirCondition.Mode.Cool`)
    pub alexa: String,
    /// Backing value written to the state
    pub backing: Value,
    /// Human readable label used in discovery resources
    pub label: String,
}

/// Bidirectional conversion strategy of a property
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    /// Same value on both sides
    Identity,
    /// Assistant `0..=100`, backing linear in `[min, max]`
    Percent {
        /// Backing value of 0 %
        min: f64,
        /// Backing value of 100 %
        max: f64,
    },
    /// Backing boolean shown as two labels
    Binary {
        /// Label of the truthy backing value
        on: &'static str,
        /// Label of the falsy backing value
        off: &'static str,
        /// Backing `true` means `off`
        inverted: bool,
    },
    /// Numeric level shown as `ON`/`OFF`; anything above `off` is on
    LevelPower {
        /// Backing level meaning off
        off: f64,
        /// Backing level written for `ON` when nothing better is known
        on: f64,
    },
    /// Assistant Kelvin, backing Kelvin or mireds
    Kelvin {
        /// Backing state is in mireds
        mireds: bool,
    },
    /// Assistant color object
    Color(ColorEncoding),
    /// Enumerated values
    Modes(Vec<ModeMapping>),
    /// Constant written on activation
    Trigger(Value),
}

impl Conversion {
    /// `ON`/`OFF` over a boolean state
    #[must_use]
    pub const fn power() -> Self {
        Self::Binary {
            on: "ON",
            off: "OFF",
            inverted: false,
        }
    }

    /// `LOCKED`/`UNLOCKED` over a boolean state where `true` opens the lock
    #[must_use]
    pub const fn lock() -> Self {
        Self::Binary {
            on: "LOCKED",
            off: "UNLOCKED",
            inverted: true,
        }
    }

    /// `DETECTED`/`NOT_DETECTED` over a boolean state
    #[must_use]
    pub const fn detection() -> Self {
        Self::Binary {
            on: "DETECTED",
            off: "NOT_DETECTED",
            inverted: false,
        }
    }

    /// `UNREACHABLE`/`OK` over a boolean unreach flag
    #[must_use]
    pub const fn connectivity() -> Self {
        Self::Binary {
            on: "UNREACHABLE",
            off: "OK",
            inverted: false,
        }
    }

    /// Convert an assistant value to its backing value
    ///
    /// # Errors
    ///
    /// Returns error if the value does not fit the conversion
    pub fn to_backing(&self, assistant: &Value) -> Result<Value> {
        match self {
            Self::Identity => Ok(assistant.clone()),
            Self::Percent { min, max } => {
                let percent = as_f64(assistant)?.clamp(0.0, 100.0);
                let raw = min + percent * (max - min) / 100.0;
                Ok(if min.fract() == 0.0 && max.fract() == 0.0 {
                    number(raw.round())
                } else {
                    number(raw)
                })
            }
            Self::Binary { on, off, inverted } => {
                let label = as_label(assistant)?;
                if label == *on {
                    Ok(json!(!inverted))
                } else if label == *off {
                    Ok(json!(*inverted))
                } else {
                    Err(Error::Conversion(format!("unexpected value `{label}`")))
                }
            }
            Self::LevelPower { off, on } => match as_label(assistant)? {
                "ON" => Ok(number(*on)),
                "OFF" => Ok(number(*off)),
                other => Err(Error::Conversion(format!("unexpected power state `{other}`"))),
            },
            Self::Kelvin { mireds } => {
                let kelvin = as_f64(assistant)?;
                if kelvin <= 0.0 {
                    return Err(Error::Conversion(format!("invalid color temperature {kelvin}")));
                }
                Ok(if *mireds {
                    number((1_000_000.0 / kelvin).round())
                } else {
                    number(kelvin.round())
                })
            }
            Self::Color(encoding) => encoding.to_backing(assistant),
            Self::Modes(modes) => {
                let label = as_label(assistant)?;
                modes
                    .iter()
                    .find(|m| m.alexa == label)
                    .map(|m| m.backing.clone())
                    .ok_or_else(|| Error::Conversion(format!("unsupported mode `{label}`")))
            }
            Self::Trigger(value) => Ok(value.clone()),
        }
    }

    /// Convert a backing value to its assistant value
    ///
    /// # Errors
    ///
    /// Returns error if the backing value cannot be interpreted
    pub fn to_assistant(&self, backing: &Value) -> Result<Value> {
        match self {
            Self::Identity | Self::Trigger(_) => Ok(backing.clone()),
            Self::Percent { min, max } => {
                let raw = as_f64(backing)?;
                let span = max - min;
                let percent = if span == 0.0 {
                    0.0
                } else {
                    ((raw - min) * 100.0 / span).clamp(0.0, 100.0)
                };
                Ok(number(percent.round()))
            }
            Self::Binary { on, off, inverted } => {
                Ok(json!(if is_truthy(backing) != *inverted { on } else { off }))
            }
            Self::LevelPower { off, .. } => {
                Ok(json!(if as_f64(backing)? > *off { "ON" } else { "OFF" }))
            }
            Self::Kelvin { mireds } => {
                let raw = as_f64(backing)?;
                if *mireds {
                    if raw <= 0.0 {
                        return Err(Error::Conversion(format!("invalid mired value {raw}")));
                    }
                    Ok(number((1_000_000.0 / raw).round()))
                } else {
                    Ok(number(raw.round()))
                }
            }
            Self::Color(encoding) => encoding.to_assistant(backing),
            Self::Modes(modes) => modes
                .iter()
                .find(|m| loosely_equal(&m.backing, backing))
                .map(|m| json!(m.alexa))
                .ok_or_else(|| Error::Conversion(format!("unknown mode value {backing}"))),
        }
    }

    /// Enumerated values, if any
    #[must_use]
    pub fn modes(&self) -> &[ModeMapping] {
        match self {
            Self::Modes(modes) => modes,
            _ => &[],
        }
    }
}

/// Step through [`COLOR_TEMPERATURE_TABLE`] from the entry nearest to `current`
#[must_use]
pub fn step_color_temperature(current: f64, increase: bool) -> f64 {
    let nearest = COLOR_TEMPERATURE_TABLE
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (*a - current)
                .abs()
                .partial_cmp(&(*b - current).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map_or(0, |(i, _)| i);

    let next = if increase {
        (nearest + 1).min(COLOR_TEMPERATURE_TABLE.len() - 1)
    } else {
        nearest.saturating_sub(1)
    };

    COLOR_TEMPERATURE_TABLE[next]
}

/// Read a number out of a JSON value, accepting numeric strings and booleans
///
/// # Errors
///
/// Returns error for anything that is not number-like
pub fn as_f64(value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::Conversion(format!("number out of range: {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| Error::Conversion(format!("not a number: `{s}`"))),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(Error::Conversion(format!("not a number: {other}"))),
    }
}

/// Truthiness of a backing value
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "on" | "1" | "yes"
        ),
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

/// Render a float as a JSON number, integral values without fraction
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

/// Compare backing values, treating `1`, `1.0` and `"1"` as equal
#[must_use]
pub fn loosely_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (as_f64(a), as_f64(b)) {
        (Ok(x), Ok(y)) if !a.is_boolean() && !b.is_boolean() => (x - y).abs() < f64::EPSILON,
        _ => match (a.as_str(), b.as_str()) {
            (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
            _ => false,
        },
    }
}

fn as_label(value: &Value) -> Result<&str> {
    value
        .as_str()
        .ok_or_else(|| Error::Conversion(format!("expected string value, got {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_maps_onto_backing_range() {
        let conversion = Conversion::Percent {
            min: 0.0,
            max: 255.0,
        };
        assert_eq!(conversion.to_backing(&json!(50)).unwrap(), json!(128));
        assert_eq!(conversion.to_assistant(&json!(255)).unwrap(), json!(100));
        assert_eq!(conversion.to_backing(&json!(150)).unwrap(), json!(255));
    }

    #[test]
    fn binary_labels_respect_inversion() {
        let lock = Conversion::lock();
        assert_eq!(lock.to_backing(&json!("LOCKED")).unwrap(), json!(false));
        assert_eq!(lock.to_assistant(&json!(true)).unwrap(), json!("UNLOCKED"));
        assert!(lock.to_backing(&json!("JAMMED")).is_err());

        let power = Conversion::power();
        assert_eq!(power.to_assistant(&json!("on")).unwrap(), json!("ON"));
        assert_eq!(power.to_assistant(&json!(0)).unwrap(), json!("OFF"));

        let detection = Conversion::detection();
        assert_eq!(detection.to_assistant(&json!(true)).unwrap(), json!("DETECTED"));
        assert_eq!(detection.to_assistant(&json!(false)).unwrap(), json!("NOT_DETECTED"));
    }

    #[test]
    fn kelvin_to_mireds() {
        let conversion = Conversion::Kelvin { mireds: true };
        assert_eq!(conversion.to_backing(&json!(2700)).unwrap(), json!(370));
        assert_eq!(conversion.to_assistant(&json!(370)).unwrap(), json!(2703));
        assert!(conversion.to_backing(&json!(0)).is_err());
    }

    #[test]
    fn modes_match_loosely() {
        let conversion = Conversion::Modes(vec![
            ModeMapping {
                alexa: "HEAT".to_string(),
                backing: json!(1),
                label: "Heat".to_string(),
            },
            ModeMapping {
                alexa: "COOL".to_string(),
                backing: json!(2),
                label: "Cool".to_string(),
            },
        ]);
        assert_eq!(conversion.to_backing(&json!("COOL")).unwrap(), json!(2));
        assert_eq!(conversion.to_assistant(&json!("1")).unwrap(), json!("HEAT"));
        assert!(conversion.to_assistant(&json!(7)).is_err());
    }

    #[test]
    fn color_temperature_steps_from_nearest_entry() {
        assert!((step_color_temperature(2650.0, true) - 4000.0).abs() < f64::EPSILON);
        assert!((step_color_temperature(2650.0, false) - 2200.0).abs() < f64::EPSILON);
        assert!((step_color_temperature(9000.0, true) - 7000.0).abs() < f64::EPSILON);
        assert!((step_color_temperature(1000.0, false) - 2200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn truthiness() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("ON")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&Value::Null));
    }
}
