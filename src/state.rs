use std::sync::Arc;

use crate::config::Config;
use crate::weather::WeatherProvider;
use axum::extract::FromRef;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub weather: Arc<dyn WeatherProvider>,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn WeatherProvider> {
    fn from_ref(state: &AppState) -> Self {
        state.weather.clone()
    }
}
