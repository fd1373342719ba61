//! Color math: HSB triples, RGB(W) packing and hex encoding

use serde_json::{Value, json};

use crate::{Error, Result};

/// Color as the assistant sees it: hue in degrees, saturation and brightness in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsb {
    /// Hue, `[0, 360)`
    pub hue: f64,
    /// Saturation, `[0, 1]`
    pub saturation: f64,
    /// Brightness, `[0, 1]`
    pub brightness: f64,
}

impl Hsb {
    /// Parse `{hue, saturation, brightness}`
    ///
    /// # Errors
    ///
    /// Returns error if a component is missing or not a number
    pub fn from_value(value: &Value) -> Result<Self> {
        let component = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_f64)
                .ok_or_else(|| Error::Conversion(format!("color component `{name}` missing")))
        };

        Ok(Self {
            hue: component("hue")?.rem_euclid(360.0),
            saturation: component("saturation")?.clamp(0.0, 1.0),
            brightness: component("brightness")?.clamp(0.0, 1.0),
        })
    }

    /// Render as `{hue, saturation, brightness}`
    #[must_use]
    pub fn to_value(self) -> Value {
        json!({
            "hue": round_to(self.hue, 1),
            "saturation": round_to(self.saturation, 4),
            "brightness": round_to(self.brightness, 4),
        })
    }

    /// Convert to 8-bit RGB
    #[must_use]
    pub fn to_rgb(self) -> [u8; 3] {
        let chroma = self.brightness * self.saturation;
        let sector = self.hue / 60.0;
        let x = chroma * (1.0 - (sector.rem_euclid(2.0) - 1.0).abs());
        let m = self.brightness - chroma;

        let (r, g, b) = match sector {
            s if s < 1.0 => (chroma, x, 0.0),
            s if s < 2.0 => (x, chroma, 0.0),
            s if s < 3.0 => (0.0, chroma, x),
            s if s < 4.0 => (0.0, x, chroma),
            s if s < 5.0 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };

        [to_byte(r + m), to_byte(g + m), to_byte(b + m)]
    }

    /// Convert from 8-bit RGB
    #[must_use]
    pub fn from_rgb([r, g, b]: [u8; 3]) -> Self {
        let r = f64::from(r) / 255.0;
        let g = f64::from(g) / 255.0;
        let b = f64::from(b) / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let hue = if delta == 0.0 {
            0.0
        } else if (max - r).abs() < f64::EPSILON {
            60.0 * ((g - b) / delta).rem_euclid(6.0)
        } else if (max - g).abs() < f64::EPSILON {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };

        Self {
            hue: hue.rem_euclid(360.0),
            saturation: if max == 0.0 { 0.0 } else { delta / max },
            brightness: max,
        }
    }
}

/// How a color is stored in the backing state graph
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorEncoding {
    /// One string state, `#rrggbb` or `#rrggbbww`
    Hex {
        /// Whether a white channel is packed after blue
        white: bool,
    },
    /// Separate hue / saturation / brightness states
    Hsb {
        /// Backing value of full saturation
        saturation_max: f64,
        /// Backing value of full brightness
        brightness_max: f64,
    },
    /// Separate red / green / blue (/ white) states
    Rgb {
        /// Backing value of a full channel
        max: f64,
        /// Whether a white channel state exists
        white: bool,
    },
}

impl ColorEncoding {
    /// Convert an assistant color into the backing representation
    ///
    /// # Errors
    ///
    /// Returns error if the assistant value is not a color object
    pub fn to_backing(self, assistant: &Value) -> Result<Value> {
        let hsb = Hsb::from_value(assistant)?;

        Ok(match self {
            Self::Hex { white } => {
                let rgb = hsb.to_rgb();
                if white {
                    json!(format_hex(&extract_white(rgb)))
                } else {
                    json!(format_hex(&rgb))
                }
            }
            Self::Hsb {
                saturation_max,
                brightness_max,
            } => json!({
                "hue": round_to(hsb.hue, 0),
                "saturation": round_to(hsb.saturation * saturation_max, 0),
                "brightness": round_to(hsb.brightness * brightness_max, 0),
            }),
            Self::Rgb { max, white } => {
                let scale = |channel: u8| round_to(f64::from(channel) * max / 255.0, 0);
                if white {
                    let [r, g, b, w] = extract_white(hsb.to_rgb());
                    json!({"red": scale(r), "green": scale(g), "blue": scale(b), "white": scale(w)})
                } else {
                    let [r, g, b] = hsb.to_rgb();
                    json!({"red": scale(r), "green": scale(g), "blue": scale(b)})
                }
            }
        })
    }

    /// Convert a backing color into the assistant representation
    ///
    /// # Errors
    ///
    /// Returns error if the backing value cannot be decoded
    pub fn to_assistant(self, backing: &Value) -> Result<Value> {
        let hsb = match self {
            Self::Hex { .. } => {
                let text = backing
                    .as_str()
                    .ok_or_else(|| Error::Conversion(format!("expected hex color, got {backing}")))?;
                let bytes = parse_hex(text)?;
                Hsb::from_rgb(merge_white(&bytes))
            }
            Self::Hsb {
                saturation_max,
                brightness_max,
            } => {
                let component = |name: &str, max: f64| {
                    backing
                        .get(name)
                        .and_then(Value::as_f64)
                        .map_or(1.0, |v| if max > 0.0 { v / max } else { 0.0 })
                };
                Hsb {
                    hue: backing
                        .get("hue")
                        .and_then(Value::as_f64)
                        .ok_or_else(|| Error::Conversion("hue state has no value".to_string()))?
                        .rem_euclid(360.0),
                    saturation: component("saturation", saturation_max).clamp(0.0, 1.0),
                    brightness: component("brightness", brightness_max).clamp(0.0, 1.0),
                }
            }
            Self::Rgb { max, .. } => {
                let channel = |name: &str| -> Result<u8> {
                    let raw = backing
                        .get(name)
                        .and_then(Value::as_f64)
                        .ok_or_else(|| Error::Conversion(format!("{name} state has no value")))?;
                    Ok(to_byte(if max > 0.0 { raw / max } else { 0.0 }))
                };
                let white = backing
                    .get("white")
                    .and_then(Value::as_f64)
                    .map_or(0, |w| to_byte(if max > 0.0 { w / max } else { 0.0 }));
                Hsb::from_rgb(merge_white(&[
                    channel("red")?,
                    channel("green")?,
                    channel("blue")?,
                    white,
                ]))
            }
        };

        Ok(hsb.to_value())
    }
}

/// Parse `#rrggbb` / `#rrggbbww` (the `#` is optional)
///
/// # Errors
///
/// Returns error if the string is not 6 or 8 hex digits
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits = text.trim().trim_start_matches('#');
    if digits.len() != 6 && digits.len() != 8 {
        return Err(Error::Conversion(format!("invalid hex color `{text}`")));
    }
    hex::decode(digits).map_err(|e| Error::Conversion(format!("invalid hex color `{text}`: {e}")))
}

/// Format channels as lower-case `#rrggbb[ww]`
#[must_use]
pub fn format_hex(channels: &[u8]) -> String {
    format!("#{}", hex::encode(channels))
}

/// Move the common part of the three channels into a white channel
#[must_use]
pub fn extract_white([r, g, b]: [u8; 3]) -> [u8; 4] {
    let w = r.min(g).min(b);
    [r - w, g - w, b - w, w]
}

/// Fold an optional white channel back into RGB
#[must_use]
pub fn merge_white(channels: &[u8]) -> [u8; 3] {
    let w = channels.get(3).copied().unwrap_or(0);
    let channel = |i: usize| channels.get(i).copied().unwrap_or(0).saturating_add(w);
    [channel(0), channel(1), channel(2)]
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_byte(unit: f64) -> u8 {
    (unit.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
