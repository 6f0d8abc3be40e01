//! Unit-specific views over a forecast.
//!
//! The provider already sends every quantity in both systems, so a view only
//! selects fields. Switching systems re-derives the view from the same
//! `WeatherData`; nothing is refetched.

use breezy_core::UnitSystem;
use serde::Serialize;

use crate::readings::{UvLevel, VisibilityLevel};
use crate::types::{Current, ForecastDay, Hour, WeatherData};

/// Unit labels for one system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnitLabels {
    pub temperature: &'static str,
    pub speed: &'static str,
    pub distance: &'static str,
    pub pressure: &'static str,
    pub precipitation: &'static str,
}

pub fn labels(units: UnitSystem) -> UnitLabels {
    match units {
        UnitSystem::Metric => UnitLabels {
            temperature: "°C",
            speed: "km/h",
            distance: "km",
            pressure: "mb",
            precipitation: "mm",
        },
        UnitSystem::Imperial => UnitLabels {
            temperature: "°F",
            speed: "mph",
            distance: "miles",
            pressure: "in",
            precipitation: "in",
        },
    }
}

fn pick(units: UnitSystem, metric: f64, imperial: f64) -> f64 {
    match units {
        UnitSystem::Metric => metric,
        UnitSystem::Imperial => imperial,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentView {
    pub temperature: f64,
    pub feels_like: f64,
    pub wind_speed: f64,
    pub wind_gust: f64,
    pub wind_dir: String,
    pub visibility: f64,
    pub visibility_level: VisibilityLevel,
    pub pressure: f64,
    pub precipitation: f64,
    pub humidity: u8,
    pub uv: f64,
    pub uv_level: UvLevel,
    pub condition: String,
    pub icon: &'static str,
}

impl CurrentView {
    pub fn derive(current: &Current, units: UnitSystem) -> Self {
        let visibility = pick(units, current.vis_km, current.vis_miles);
        Self {
            temperature: pick(units, current.temp_c, current.temp_f),
            feels_like: pick(units, current.feelslike_c, current.feelslike_f),
            wind_speed: pick(units, current.wind_kph, current.wind_mph),
            wind_gust: pick(units, current.gust_kph, current.gust_mph),
            wind_dir: current.wind_dir.clone(),
            visibility,
            visibility_level: VisibilityLevel::classify(visibility, units),
            pressure: pick(units, current.pressure_mb, current.pressure_in),
            precipitation: pick(units, current.precip_mm, current.precip_in),
            humidity: current.humidity,
            uv: current.uv,
            uv_level: UvLevel::from_index(current.uv),
            condition: current.condition.text.clone(),
            icon: current.condition.category().icon_name(current.is_day()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayView {
    pub date: chrono::NaiveDate,
    pub high: f64,
    pub low: f64,
    pub max_wind: f64,
    pub precipitation: f64,
    pub visibility: f64,
    pub chance_of_rain: u8,
    pub chance_of_snow: u8,
    pub condition: String,
    pub icon: &'static str,
    pub sunrise: String,
    pub sunset: String,
}

impl DayView {
    pub fn derive(day: &ForecastDay, units: UnitSystem) -> Self {
        let d = &day.day;
        Self {
            date: day.date,
            high: pick(units, d.maxtemp_c, d.maxtemp_f),
            low: pick(units, d.mintemp_c, d.mintemp_f),
            max_wind: pick(units, d.maxwind_kph, d.maxwind_mph),
            precipitation: pick(units, d.totalprecip_mm, d.totalprecip_in),
            visibility: pick(units, d.avgvis_km, d.avgvis_miles),
            chance_of_rain: d.daily_chance_of_rain,
            chance_of_snow: d.daily_chance_of_snow,
            condition: d.condition.text.clone(),
            icon: d.condition.category().icon_name(true),
            sunrise: day.astro.sunrise.clone(),
            sunset: day.astro.sunset.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourView {
    pub time: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub wind_speed: f64,
    pub precipitation: f64,
    pub visibility: f64,
    pub chance_of_rain: u8,
    pub icon: &'static str,
}

impl HourView {
    pub fn derive(hour: &Hour, units: UnitSystem) -> Self {
        Self {
            time: hour.time.clone(),
            temperature: pick(units, hour.temp_c, hour.temp_f),
            feels_like: pick(units, hour.feelslike_c, hour.feelslike_f),
            wind_speed: pick(units, hour.wind_kph, hour.wind_mph),
            precipitation: pick(units, hour.precip_mm, hour.precip_in),
            visibility: pick(units, hour.vis_km, hour.vis_miles),
            chance_of_rain: hour.chance_of_rain,
            icon: hour.condition.category().icon_name(hour.is_day != 0),
        }
    }
}

/// Everything a dashboard shows, in one unit system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherView {
    pub units: UnitSystem,
    pub labels: UnitLabels,
    pub place: String,
    pub local_time: String,
    pub current: CurrentView,
    pub days: Vec<DayView>,
    /// Hours of the location's current day.
    pub hours: Vec<HourView>,
}

impl WeatherView {
    pub fn derive(data: &WeatherData, units: UnitSystem) -> Self {
        Self {
            units,
            labels: labels(units),
            place: data.location.display_name(),
            local_time: data.location.localtime.clone(),
            current: CurrentView::derive(&data.current, units),
            days: data
                .forecast
                .forecastday
                .iter()
                .map(|d| DayView::derive(d, units))
                .collect(),
            hours: data
                .today()
                .map(|d| d.hour.iter().map(|h| HourView::derive(h, units)).collect())
                .unwrap_or_default(),
        }
    }
}
