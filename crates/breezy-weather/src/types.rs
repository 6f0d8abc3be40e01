//! Forecast payload as served by the provider's `forecast.json` endpoint.
//!
//! Field names follow the wire format so the value can be deserialized
//! wholesale. Everything the provider may omit is `#[serde(default)]`.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Complete forecast response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    pub location: Location,
    pub current: Current,
    #[serde(default)]
    pub forecast: Forecast,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Alerts>,
}

impl WeatherData {
    /// Forecast day matching the location's local date, falling back to the first day.
    pub fn today(&self) -> Option<&ForecastDay> {
        let local_date = self
            .location
            .localtime
            .split_whitespace()
            .next()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

        local_date
            .and_then(|date| self.forecast.forecastday.iter().find(|d| d.date == date))
            .or_else(|| self.forecast.forecastday.first())
    }

    /// Active alerts, empty when none were requested or issued.
    pub fn alert_list(&self) -> &[Alert] {
        self.alerts.as_ref().map(|a| a.alert.as_slice()).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub tz_id: String,
    #[serde(default)]
    pub localtime_epoch: i64,
    #[serde(default)]
    pub localtime: String,
}

impl Location {
    /// "Name, Region, Country" without empty or repeated parts.
    pub fn display_name(&self) -> String {
        let mut parts: Vec<&str> = vec![self.name.as_str()];
        for part in [self.region.as_str(), self.country.as_str()] {
            if !part.is_empty() && !parts.contains(&part) {
                parts.push(part);
            }
        }
        parts.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub code: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Current {
    #[serde(default)]
    pub last_updated: String,
    pub temp_c: f64,
    pub temp_f: f64,
    #[serde(default = "default_is_day")]
    pub is_day: u8,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub wind_mph: f64,
    #[serde(default)]
    pub wind_kph: f64,
    #[serde(default)]
    pub wind_degree: f64,
    #[serde(default)]
    pub wind_dir: String,
    #[serde(default)]
    pub pressure_mb: f64,
    #[serde(default)]
    pub pressure_in: f64,
    #[serde(default)]
    pub precip_mm: f64,
    #[serde(default)]
    pub precip_in: f64,
    #[serde(default)]
    pub humidity: u8,
    #[serde(default)]
    pub cloud: u8,
    #[serde(default)]
    pub feelslike_c: f64,
    #[serde(default)]
    pub feelslike_f: f64,
    #[serde(default)]
    pub vis_km: f64,
    #[serde(default)]
    pub vis_miles: f64,
    #[serde(default)]
    pub uv: f64,
    #[serde(default)]
    pub gust_mph: f64,
    #[serde(default)]
    pub gust_kph: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_quality: Option<AirQuality>,
}

fn default_is_day() -> u8 {
    1
}

impl Current {
    pub fn is_day(&self) -> bool {
        self.is_day != 0
    }
}

/// Pollutant concentrations in μg/m³ plus the provider's category indices.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AirQuality {
    #[serde(default)]
    pub co: f64,
    #[serde(default)]
    pub no2: f64,
    #[serde(default)]
    pub o3: f64,
    #[serde(default)]
    pub so2: f64,
    #[serde(default)]
    pub pm2_5: f64,
    #[serde(default)]
    pub pm10: f64,
    #[serde(rename = "us-epa-index", default)]
    pub us_epa_index: u8,
    #[serde(rename = "gb-defra-index", default)]
    pub gb_defra_index: u8,
}

// PM2.5 (μg/m³, truncated to 0.1) → AQI breakpoints.
const PM25_BREAKPOINTS: [(f64, f64, u32, u32); 7] = [
    (0.0, 12.0, 0, 50),
    (12.1, 35.4, 51, 100),
    (35.5, 55.4, 101, 150),
    (55.5, 150.4, 151, 200),
    (150.5, 250.4, 201, 300),
    (250.5, 350.4, 301, 400),
    (350.5, 500.4, 401, 500),
];

impl AirQuality {
    /// US AQI derived from the PM2.5 concentration (linear interpolation
    /// between EPA breakpoints, capped at 500).
    pub fn us_aqi(&self) -> u32 {
        let c = (self.pm2_5.max(0.0) * 10.0).floor() / 10.0;
        for (c_lo, c_hi, i_lo, i_hi) in PM25_BREAKPOINTS {
            if c <= c_hi {
                let c = c.max(c_lo);
                let aqi = (f64::from(i_hi - i_lo) / (c_hi - c_lo)) * (c - c_lo) + f64::from(i_lo);
                return aqi.round() as u32;
            }
        }
        500
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Forecast {
    #[serde(default)]
    pub forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    #[serde(default)]
    pub date_epoch: i64,
    pub day: Day,
    #[serde(default)]
    pub astro: Astro,
    #[serde(default)]
    pub hour: Vec<Hour>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    pub maxtemp_c: f64,
    pub maxtemp_f: f64,
    pub mintemp_c: f64,
    pub mintemp_f: f64,
    #[serde(default)]
    pub avgtemp_c: f64,
    #[serde(default)]
    pub avgtemp_f: f64,
    #[serde(default)]
    pub maxwind_mph: f64,
    #[serde(default)]
    pub maxwind_kph: f64,
    #[serde(default)]
    pub totalprecip_mm: f64,
    #[serde(default)]
    pub totalprecip_in: f64,
    #[serde(default)]
    pub avgvis_km: f64,
    #[serde(default)]
    pub avgvis_miles: f64,
    #[serde(default)]
    pub avghumidity: f64,
    #[serde(default)]
    pub daily_will_it_rain: u8,
    #[serde(default)]
    pub daily_chance_of_rain: u8,
    #[serde(default)]
    pub daily_will_it_snow: u8,
    #[serde(default)]
    pub daily_chance_of_snow: u8,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub uv: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Astro {
    #[serde(default)]
    pub sunrise: String,
    #[serde(default)]
    pub sunset: String,
    #[serde(default)]
    pub moonrise: String,
    #[serde(default)]
    pub moonset: String,
    #[serde(default)]
    pub moon_phase: String,
    /// Percent; older API versions send it as a string.
    #[serde(default, deserialize_with = "number_or_string")]
    pub moon_illumination: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hour {
    #[serde(default)]
    pub time_epoch: i64,
    pub time: String,
    pub temp_c: f64,
    pub temp_f: f64,
    #[serde(default = "default_is_day")]
    pub is_day: u8,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub wind_mph: f64,
    #[serde(default)]
    pub wind_kph: f64,
    #[serde(default)]
    pub precip_mm: f64,
    #[serde(default)]
    pub precip_in: f64,
    #[serde(default)]
    pub humidity: u8,
    #[serde(default)]
    pub feelslike_c: f64,
    #[serde(default)]
    pub feelslike_f: f64,
    #[serde(default)]
    pub chance_of_rain: u8,
    #[serde(default)]
    pub chance_of_snow: u8,
    #[serde(default)]
    pub vis_km: f64,
    #[serde(default)]
    pub vis_miles: f64,
    #[serde(default)]
    pub uv: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Alerts {
    #[serde(default)]
    pub alert: Vec<Alert>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub urgency: String,
    #[serde(default)]
    pub areas: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub effective: String,
    #[serde(default)]
    pub expires: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub instruction: String,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: Option<ApiErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub code: Option<i64>,
    pub message: Option<String>,
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Weather condition categories mapped from provider condition codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    #[default]
    PartlyCloudy,
    Cloudy,
    Fog,
    Rain,
    Thunderstorm,
    Snow,
    Hail,
}

impl WeatherCondition {
    /// Map a provider condition code. Unknown codes count as partly cloudy.
    pub fn from_code(code: i32) -> Self {
        match code {
            1000 => Self::Clear,
            1003 => Self::PartlyCloudy,
            1006 | 1009 => Self::Cloudy,
            1030 | 1135 | 1147 => Self::Fog,
            1063 | 1180 | 1183 | 1186 | 1189 | 1192 | 1195 => Self::Rain,
            1087 | 1273 | 1276 => Self::Thunderstorm,
            1066 | 1114 | 1210 | 1213 | 1216 | 1219 | 1222 | 1225 => Self::Snow,
            1069 | 1072 | 1168 | 1171 | 1198 | 1201 => Self::Hail,
            _ => Self::PartlyCloudy,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Rain => "Rain",
            Self::Thunderstorm => "Thunderstorm",
            Self::Snow => "Snow",
            Self::Hail => "Sleet",
        }
    }

    /// Icon name, day/night aware where the icon set distinguishes them.
    pub fn icon_name(&self, is_day: bool) -> &'static str {
        match (self, is_day) {
            (Self::Clear, true) => "sun",
            (Self::Clear, false) => "moon",
            (Self::PartlyCloudy, true) => "cloud-sun",
            (Self::PartlyCloudy, false) => "cloud-moon",
            (Self::Cloudy, _) => "cloud",
            (Self::Fog, _) => "cloud-fog",
            (Self::Rain, true) => "cloud-sun-rain",
            (Self::Rain, false) => "cloud-moon-rain",
            (Self::Thunderstorm, _) => "cloud-lightning",
            (Self::Snow, _) => "cloud-snow",
            (Self::Hail, _) => "cloud-hail",
        }
    }
}

impl Condition {
    pub fn category(&self) -> WeatherCondition {
        WeatherCondition::from_code(self.code)
    }
}

/// Device location errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Non-success response; `message` is the provider's own text.
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Location error: {0}")]
    Location(#[from] LocationError),
}

impl From<WeatherError> for breezy_core::AppError {
    fn from(err: WeatherError) -> Self {
        use breezy_core::error::{NetworkError, ReqwestErrorExt, WeatherError as CoreWeatherError};

        match err {
            WeatherError::Network(e) => Self::Network(e.into_network_error()),
            WeatherError::Api { status, code, message } => match code {
                Some(1006) => Self::Weather(CoreWeatherError::LocationNotFound(message)),
                Some(1002) | Some(2006) | Some(2008) => Self::Weather(CoreWeatherError::InvalidApiKey),
                Some(2007) => Self::Weather(CoreWeatherError::QuotaExceeded),
                _ if status >= 500 => Self::Weather(CoreWeatherError::ServiceUnavailable),
                _ => Self::Weather(CoreWeatherError::ApiError(message)),
            },
            WeatherError::Parse(msg) => Self::Network(NetworkError::InvalidResponse(msg)),
            WeatherError::Location(e) => {
                Self::Weather(CoreWeatherError::LocationUnavailable(e.to_string()))
            }
        }
    }
}
