//! Category classification for UV, air quality, visibility, moon phase and
//! alert severity.

use breezy_core::UnitSystem;
use serde::Serialize;

/// Gauge fill for `value` against `max`, clamped to 0..=100.
pub fn gauge_percent(value: f64, max: f64) -> f64 {
    if max <= 0.0 {
        return 0.0;
    }
    (value / max * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UvLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
    Extreme,
}

impl UvLevel {
    pub fn from_index(uv: f64) -> Self {
        if uv <= 2.0 {
            Self::Low
        } else if uv <= 5.0 {
            Self::Moderate
        } else if uv <= 7.0 {
            Self::High
        } else if uv <= 10.0 {
            Self::VeryHigh
        } else {
            Self::Extreme
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::VeryHigh => "Very High",
            Self::Extreme => "Extreme",
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            Self::Low => "No protection needed. You can safely stay outside.",
            Self::Moderate => "Seek shade during midday hours. Wear sun protection.",
            Self::High => {
                "Reduce time in the sun between 10 a.m. and 4 p.m. Cover up, wear a hat and sunglasses."
            }
            Self::VeryHigh => "Take extra precautions. Unprotected skin can burn quickly.",
            Self::Extreme => "Take all precautions. Unprotected skin can burn in minutes.",
        }
    }

    /// Gauge tops out at UV 11.
    pub fn gauge(uv: f64) -> f64 {
        gauge_percent(uv, 11.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AirQualityLevel {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AirQualityLevel {
    /// Classify a US AQI value.
    pub fn from_aqi(aqi: u32) -> Self {
        match aqi {
            0..=50 => Self::Good,
            51..=100 => Self::Moderate,
            101..=150 => Self::UnhealthyForSensitiveGroups,
            151..=200 => Self::Unhealthy,
            201..=300 => Self::VeryUnhealthy,
            _ => Self::Hazardous,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            Self::Unhealthy => "Unhealthy",
            Self::VeryUnhealthy => "Very Unhealthy",
            Self::Hazardous => "Hazardous",
        }
    }

    /// Gauge tops out at AQI 300.
    pub fn gauge(aqi: u32) -> f64 {
        gauge_percent(f64::from(aqi), 300.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityLevel {
    Excellent,
    Good,
    Moderate,
    Poor,
    VeryPoor,
}

impl VisibilityLevel {
    /// `visibility` is in km for metric and miles for imperial.
    pub fn classify(visibility: f64, units: UnitSystem) -> Self {
        let thresholds = match units {
            UnitSystem::Metric => [10.0, 5.0, 2.0, 1.0],
            UnitSystem::Imperial => [6.0, 3.0, 1.0, 0.5],
        };

        if visibility >= thresholds[0] {
            Self::Excellent
        } else if visibility >= thresholds[1] {
            Self::Good
        } else if visibility >= thresholds[2] {
            Self::Moderate
        } else if visibility >= thresholds[3] {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
        }
    }

    /// Gauge tops out at 20 km or 12 miles.
    pub fn gauge(visibility: f64, units: UnitSystem) -> f64 {
        let max = match units {
            UnitSystem::Metric => 20.0,
            UnitSystem::Imperial => 12.0,
        };
        gauge_percent(visibility, max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoonPhase {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl MoonPhase {
    /// Parse the provider's phase name, ignoring case and surrounding spaces.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "new moon" => Some(Self::NewMoon),
            "waxing crescent" => Some(Self::WaxingCrescent),
            "first quarter" => Some(Self::FirstQuarter),
            "waxing gibbous" => Some(Self::WaxingGibbous),
            "full moon" => Some(Self::FullMoon),
            "waning gibbous" => Some(Self::WaningGibbous),
            "last quarter" | "third quarter" => Some(Self::LastQuarter),
            "waning crescent" => Some(Self::WaningCrescent),
            _ => None,
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Self::NewMoon => "🌑",
            Self::WaxingCrescent => "🌒",
            Self::FirstQuarter => "🌓",
            Self::WaxingGibbous => "🌔",
            Self::FullMoon => "🌕",
            Self::WaningGibbous => "🌖",
            Self::LastQuarter => "🌗",
            Self::WaningCrescent => "🌘",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::NewMoon => {
                "The moon is not visible from Earth as it is located between the Earth and Sun."
            }
            Self::WaxingCrescent => {
                "A small part of the moon becomes visible as it starts to move away from the Sun."
            }
            Self::FirstQuarter => {
                "Half of the moon is visible as it continues to move away from the Sun."
            }
            Self::WaxingGibbous => {
                "More than half of the moon becomes visible as it approaches full moon."
            }
            Self::FullMoon => {
                "The entire face of the moon is visible from Earth, appearing as a complete circle."
            }
            Self::WaningGibbous => {
                "The visible part of the moon starts to decrease after the full moon."
            }
            Self::LastQuarter => "Half of the moon is visible as it continues to decrease.",
            Self::WaningCrescent => {
                "A small crescent of the moon is visible as it approaches the new moon phase."
            }
        }
    }
}

/// Glyph and description for a raw phase name; unknown names get the full
/// moon glyph and a placeholder text.
pub fn moon_phase_display(name: &str) -> (&'static str, &'static str) {
    match MoonPhase::parse(name) {
        Some(phase) => (phase.glyph(), phase.description()),
        None => ("🌕", "Moon phase information not available."),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Other,
    Minor,
    Moderate,
    Severe,
}

impl AlertSeverity {
    /// "Extreme" counts as severe.
    pub fn parse(severity: &str) -> Self {
        match severity.trim().to_ascii_lowercase().as_str() {
            "severe" | "extreme" => Self::Severe,
            "moderate" => Self::Moderate,
            "minor" => Self::Minor,
            _ => Self::Other,
        }
    }
}
