// src/weather.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{config::Config, error::AppError};

/// Fallback coordinates when the client sends none (Lagos, Nigeria).
pub const DEFAULT_LAT: f64 = 6.5244;
pub const DEFAULT_LON: f64 = 3.3792;

/// Current conditions, already converted for display (metric, rounded).
#[derive(Debug, Clone, Serialize)]
pub struct CurrentWeather {
    pub temperature: i64,
    pub condition: String,
    pub humidity: i64,
    /// km/h, converted from the API's m/s.
    pub wind_speed: i64,
    pub location: String,
    pub country: Option<String>,
    pub description: String,
    pub feels_like: i64,
    pub pressure: i64,
}

/// One forecast day: the first 3-hourly entry of that calendar day.
#[derive(Debug, Clone, Serialize)]
pub struct DailyForecast {
    /// Unix timestamp in milliseconds.
    pub date: i64,
    pub temperature: i64,
    pub condition: String,
    pub humidity: i64,
}

/// Outbound weather integration seam. Trait object so tests can stub it.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, lat: f64, lon: f64) -> Result<CurrentWeather, AppError>;
    async fn forecast(&self, lat: f64, lon: f64) -> Result<Vec<DailyForecast>, AppError>;
}

/// Maps OpenWeather condition groups onto the app's fixed vocabulary.
pub fn map_condition(condition: &str) -> &'static str {
    match condition {
        "Clear" => "sunny",
        "Clouds" => "cloudy",
        "Rain" | "Drizzle" => "rainy",
        "Thunderstorm" => "stormy",
        "Snow" => "snowy",
        "Mist" | "Fog" | "Haze" => "foggy",
        _ => "sunny",
    }
}

// Subset of the OpenWeather payloads this service reads.

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: Option<f64>,
    humidity: i64,
    pressure: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwCondition {
    main: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    weather: Vec<OwCondition>,
    wind: OwWind,
    name: String,
    sys: OwSys,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwCondition>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

/// Buckets 3-hourly forecast entries to the first entry of each calendar
/// day (UTC), capped at 7 days.
fn bucket_daily(list: &[OwForecastEntry]) -> Vec<DailyForecast> {
    let mut days: Vec<DailyForecast> = Vec::new();
    let mut last_day: Option<chrono::NaiveDate> = None;

    for entry in list {
        let Some(ts) = chrono::DateTime::from_timestamp(entry.dt, 0) else {
            continue;
        };
        let day = ts.date_naive();
        if last_day == Some(day) {
            continue;
        }
        last_day = Some(day);

        let condition = entry
            .weather
            .first()
            .map(|w| map_condition(&w.main))
            .unwrap_or("sunny");

        days.push(DailyForecast {
            date: entry.dt * 1000,
            temperature: entry.main.temp.round() as i64,
            condition: condition.to_string(),
            humidity: entry.main.humidity,
        });

        if days.len() == 7 {
            break;
        }
    }

    days
}

/// OpenWeather REST client.
pub struct OpenWeatherClient {
    http: reqwest::Client,
    base: Url,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let base = Url::parse(&config.weather_base_url)
            .map_err(|e| AppError::InternalServerError(format!("Bad weather base URL: {}", e)))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base,
            api_key: config.weather_api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str, lat: f64, lon: f64) -> Result<Url, AppError> {
        if self.api_key.is_empty() {
            return Err(AppError::Upstream(
                "Weather API key is not configured".to_string(),
            ));
        }

        let mut url = self
            .base
            .join(path)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        url.query_pairs_mut()
            .append_pair("lat", &lat.to_string())
            .append_pair("lon", &lon.to_string())
            .append_pair("appid", &self.api_key)
            .append_pair("units", "metric");

        Ok(url)
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Weather API unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Weather API error: {}",
                response.status().as_u16()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Upstream(format!("Weather API returned bad payload: {}", e)))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, lat: f64, lon: f64) -> Result<CurrentWeather, AppError> {
        let url = self.endpoint("weather", lat, lon)?;
        let data: OwCurrentResponse = self.fetch(url).await?;

        let condition = data
            .weather
            .first()
            .map(|w| map_condition(&w.main))
            .unwrap_or("sunny");
        let description = data
            .weather
            .first()
            .and_then(|w| w.description.clone())
            .unwrap_or_default();

        Ok(CurrentWeather {
            temperature: data.main.temp.round() as i64,
            condition: condition.to_string(),
            humidity: data.main.humidity,
            wind_speed: (data.wind.speed * 3.6).round() as i64,
            location: data.name,
            country: data.sys.country,
            description,
            feels_like: data.main.feels_like.unwrap_or(data.main.temp).round() as i64,
            pressure: data.main.pressure.unwrap_or(0),
        })
    }

    async fn forecast(&self, lat: f64, lon: f64) -> Result<Vec<DailyForecast>, AppError> {
        let url = self.endpoint("forecast", lat, lon)?;
        let data: OwForecastResponse = self.fetch(url).await?;
        Ok(bucket_daily(&data.list))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(dt: i64, temp: f64, main: &str, humidity: i64) -> OwForecastEntry {
        OwForecastEntry {
            dt,
            main: OwMain {
                temp,
                feels_like: None,
                humidity,
                pressure: None,
            },
            weather: vec![OwCondition {
                main: main.to_string(),
                description: None,
            }],
        }
    }

    #[test]
    fn condition_map_matches_vocabulary() {
        assert_eq!(map_condition("Clear"), "sunny");
        assert_eq!(map_condition("Clouds"), "cloudy");
        assert_eq!(map_condition("Rain"), "rainy");
        assert_eq!(map_condition("Drizzle"), "rainy");
        assert_eq!(map_condition("Thunderstorm"), "stormy");
        assert_eq!(map_condition("Snow"), "snowy");
        assert_eq!(map_condition("Mist"), "foggy");
        assert_eq!(map_condition("Tornado"), "sunny");
    }

    #[test]
    fn bucket_keeps_first_entry_per_day() {
        const DAY: i64 = 86_400;
        // Three entries on day one, two on day two.
        let list = vec![
            entry(DAY, 20.4, "Clear", 50),
            entry(DAY + 3 * 3600, 24.0, "Rain", 60),
            entry(DAY + 6 * 3600, 25.0, "Rain", 65),
            entry(2 * DAY, 18.6, "Clouds", 70),
            entry(2 * DAY + 3 * 3600, 21.0, "Clear", 55),
        ];

        let days = bucket_daily(&list);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, DAY * 1000);
        assert_eq!(days[0].temperature, 20);
        assert_eq!(days[0].condition, "sunny");
        assert_eq!(days[1].condition, "cloudy");
        assert_eq!(days[1].humidity, 70);
    }

    #[test]
    fn bucket_caps_at_seven_days() {
        const DAY: i64 = 86_400;
        let list: Vec<_> = (1..=10).map(|d| entry(d * DAY, 20.0, "Clear", 40)).collect();
        assert_eq!(bucket_daily(&list).len(), 7);
    }
}
