// src/handlers/weather.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    weather::{DEFAULT_LAT, DEFAULT_LON, WeatherProvider},
};

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl WeatherQuery {
    fn coords(&self) -> (f64, f64) {
        (
            self.lat.unwrap_or(DEFAULT_LAT),
            self.lon.unwrap_or(DEFAULT_LON),
        )
    }
}

/// Current conditions for the given (or fallback) coordinates.
pub async fn current(
    State(weather): State<Arc<dyn WeatherProvider>>,
    Query(params): Query<WeatherQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (lat, lon) = params.coords();
    let report = weather.current(lat, lon).await?;
    Ok(Json(report))
}

/// Seven-day forecast, one entry per calendar day.
pub async fn forecast(
    State(weather): State<Arc<dyn WeatherProvider>>,
    Query(params): Query<WeatherQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (lat, lon) = params.coords();
    let days = weather.forecast(lat, lon).await?;
    Ok(Json(days))
}
