// 🎨 Color Scale - Diverging, symmetric, frozen
//
// Domain is [-max, max] with max = max(|min(sample)|, |max(sample)|), floored at
// a minimum spread. It is fitted ONCE from the full anomaly sample and never
// refitted while the cursor moves: the same delta must paint the same color on
// every frame of the timeline.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Default floor for the domain half-width, in °C
pub const DEFAULT_MIN_SPREAD: f64 = 0.5;

// ============================================================================
// COLOR
// ============================================================================

/// 24-bit RGB color; serializes as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const COLD: Color = Color::rgb(0x45, 0x7b, 0x9d);
    pub const HOT: Color = Color::rgb(0xe6, 0x39, 0x46);
    pub const NEUTRAL: Color = Color::rgb(0xf1, 0xfa, 0xee);
    pub const NO_DATA: Color = Color::rgb(0xcc, 0xcc, 0xcc);
    pub const STROKE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const STROKE_SELECTED: Color = Color::rgb(0x1d, 0x35, 0x57);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Linear interpolation in RGB space, `t` clamped to [0, 1]
    pub fn lerp(self, other: Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("Invalid color: {}", s));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| format!("Invalid color: {}", s))
        };
        Ok(Color {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// COLOR SCALE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegendStop {
    pub value: f64,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    max: f64,
    cold: Color,
    neutral: Color,
    hot: Color,
    no_data: Color,
}

impl ColorScale {
    /// Fit the domain from a sample of deltas, floored at `DEFAULT_MIN_SPREAD`
    pub fn build(sample: &[f64]) -> Self {
        Self::with_min_spread(sample, DEFAULT_MIN_SPREAD)
    }

    /// Fit the domain with an explicit floor; non-finite samples are ignored
    pub fn with_min_spread(sample: &[f64], min_spread: f64) -> Self {
        let (lo, hi) = sample
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0_f64, 0.0_f64), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        let max = lo.abs().max(hi.abs()).max(min_spread.abs());

        ColorScale {
            max,
            cold: Color::COLD,
            neutral: Color::NEUTRAL,
            hot: Color::HOT,
            no_data: Color::NO_DATA,
        }
    }

    /// `[-max, max]`
    pub fn domain(&self) -> [f64; 2] {
        [-self.max, self.max]
    }

    /// Map a delta to its color; values beyond the domain clamp to the extremes
    pub fn color(&self, delta: f64) -> Color {
        if !delta.is_finite() {
            return self.no_data;
        }
        let t = (delta / self.max).clamp(-1.0, 1.0);
        if t < 0.0 {
            self.neutral.lerp(self.cold, -t)
        } else {
            self.neutral.lerp(self.hot, t)
        }
    }

    /// Color for an optional delta; `None` gets the neutral no-data color
    pub fn color_or_no_data(&self, delta: Option<f64>) -> Color {
        delta.map_or(self.no_data, |d| self.color(d))
    }

    pub fn no_data_color(&self) -> Color {
        self.no_data
    }

    /// Evenly spaced stops from cold to hot, for building a legend
    pub fn legend(&self, steps: usize) -> Vec<LegendStop> {
        let steps = steps.max(2);
        (0..steps)
            .map(|i| {
                let value = -self.max + 2.0 * self.max * i as f64 / (steps - 1) as f64;
                LegendStop {
                    value,
                    color: self.color(value),
                }
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_is_symmetric() {
        let scale = ColorScale::build(&[-0.8, 0.3, 2.4, 1.1]);
        let [lo, hi] = scale.domain();

        assert_eq!(hi, 2.4);
        assert_eq!(hi, -lo);

        let cold_heavy = ColorScale::build(&[-3.0, 0.2]);
        assert_eq!(cold_heavy.domain(), [-3.0, 3.0]);
    }

    #[test]
    fn test_domain_floor() {
        let scale = ColorScale::build(&[0.1, -0.2]);
        assert_eq!(scale.domain(), [-0.5, 0.5]);

        let empty = ColorScale::with_min_spread(&[], 1.0);
        assert_eq!(empty.domain(), [-1.0, 1.0]);
    }

    #[test]
    fn test_non_finite_samples_ignored() {
        let scale = ColorScale::build(&[f64::NAN, f64::INFINITY, 1.2]);
        assert_eq!(scale.domain(), [-1.2, 1.2]);
    }

    #[test]
    fn test_diverging_extremes() {
        let scale = ColorScale::build(&[-2.0, 2.0]);

        assert_eq!(scale.color(0.0), Color::NEUTRAL);
        assert_eq!(scale.color(2.0), Color::HOT);
        assert_eq!(scale.color(-2.0), Color::COLD);

        // Clamped beyond the domain
        assert_eq!(scale.color(10.0), Color::HOT);
        assert_eq!(scale.color(-10.0), Color::COLD);
    }

    #[test]
    fn test_warm_values_lean_red() {
        let scale = ColorScale::build(&[-2.0, 2.0]);
        let warm = scale.color(1.0);
        let cold = scale.color(-1.0);

        assert!(warm.r > warm.b);
        assert!(cold.b > cold.r);
    }

    #[test]
    fn test_no_data_color() {
        let scale = ColorScale::build(&[1.0]);

        assert_eq!(scale.color_or_no_data(None), Color::NO_DATA);
        assert_eq!(scale.color(f64::NAN), Color::NO_DATA);
        assert_eq!(scale.color_or_no_data(Some(0.0)), Color::NEUTRAL);
    }

    #[test]
    fn test_legend_spans_domain() {
        let scale = ColorScale::build(&[-1.0, 1.0]);
        let legend = scale.legend(5);

        assert_eq!(legend.len(), 5);
        assert_eq!(legend[0].value, -1.0);
        assert_eq!(legend[2].value, 0.0);
        assert_eq!(legend[4].value, 1.0);
        assert_eq!(legend[0].color, Color::COLD);
        assert_eq!(legend[4].color, Color::HOT);
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(Color::HOT.to_hex(), "#e63946");
        assert_eq!("#457b9d".parse::<Color>().unwrap(), Color::COLD);
        assert!("#zzzzzz".parse::<Color>().is_err());
        assert!("#fff".parse::<Color>().is_err());

        let json = serde_json::to_string(&Color::NO_DATA).unwrap();
        assert_eq!(json, "\"#cccccc\"");
    }
}
