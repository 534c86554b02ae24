// tests/common/mod.rs

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use farm_assist_backend::{
    config::Config,
    error::AppError,
    routes,
    state::AppState,
    weather::{CurrentWeather, DailyForecast, WeatherProvider},
};
use sqlx::{Executor, PgPool, postgres::PgPoolOptions};
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub pool: PgPool,
    pub upload_dir: PathBuf,
}

/// Canned weather data so tests never leave the machine.
struct StubWeather;

#[async_trait::async_trait]
impl WeatherProvider for StubWeather {
    async fn current(&self, _lat: f64, _lon: f64) -> Result<CurrentWeather, AppError> {
        Ok(CurrentWeather {
            temperature: 28,
            condition: "sunny".to_string(),
            humidity: 60,
            wind_speed: 11,
            location: "Lagos".to_string(),
            country: Some("NG".to_string()),
            description: "clear sky".to_string(),
            feels_like: 30,
            pressure: 1012,
        })
    }

    async fn forecast(&self, _lat: f64, _lon: f64) -> Result<Vec<DailyForecast>, AppError> {
        Ok(vec![DailyForecast {
            date: 86_400_000,
            temperature: 27,
            condition: "rainy".to_string(),
            humidity: 70,
        }])
    }
}

/// Spawns the app on a random port against a fresh, uuid-named database so
/// count assertions always start from a clean slate.
pub async fn spawn_app() -> TestApp {
    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let admin_pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&base_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    let db_name = format!("farm_assist_test_{}", Uuid::new_v4().simple());
    admin_pool
        .execute(format!(r#"CREATE DATABASE "{}""#, db_name).as_str())
        .await
        .expect("Failed to create test database");

    let mut db_url = url::Url::parse(&base_url).expect("DATABASE_URL must be a valid URL");
    db_url.set_path(&db_name);

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(db_url.as_str())
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let upload_dir = std::env::temp_dir().join(format!("farm-assist-uploads-{}", Uuid::new_v4()));

    let config = Config {
        database_url: db_url.to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        upload_dir: upload_dir.clone(),
        weather_api_key: String::new(),
        weather_base_url: "https://api.openweathermap.org/data/2.5/".to_string(),
        admin_email: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
        weather: Arc::new(StubWeather),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        address,
        pool,
        upload_dir,
    }
}

pub struct AuthUser {
    pub token: String,
    pub id: i64,
    pub email: String,
}

/// Registers a fresh user with the given role and logs them in.
#[allow(dead_code)]
pub async fn register_and_login(
    client: &reqwest::Client,
    address: &str,
    role: &str,
) -> AuthUser {
    let email = format!("u-{}@example.com", Uuid::new_v4().simple());
    let password = "password123";

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Test User",
            "email": email,
            "password": password,
            "role": role,
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);

    let login = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");

    AuthUser {
        token: login["token"].as_str().expect("Token not found").to_string(),
        id: login["user"]["id"].as_i64().expect("User id not found"),
        email,
    }
}
