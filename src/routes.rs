// src/routes.rs

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    routing::{get, patch, post, put},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{
        auth, dashboard, expert_support, farming_calendar, news, pest_alerts, users, weather,
    },
    state::AppState,
    utils::{jwt::auth_middleware, upload::MAX_IMAGE_BYTES},
};

/// Multipart bodies carry the image plus the text fields.
const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 1024 * 1024;

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, news, calendar, alerts, expert support,
///   dashboard, weather).
/// * Applies global middleware (Trace, CORS) and serves `/uploads`.
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // Argon2 hashing makes credential endpoints expensive; keep a lid on them.
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(5)
            .burst_size(20)
            .finish()
            .unwrap(),
    );

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(GovernorLayer::new(governor_conf));

    let user_routes = Router::new()
        .route("/profile", put(users::update_profile))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // News has no auth in the original; the routes stay public.
    let news_routes = Router::new()
        .route("/", get(news::list_news).post(news::create_news))
        .route(
            "/{id}",
            get(news::get_news)
                .put(news::update_news)
                .delete(news::delete_news),
        )
        .route("/{id}/comments", post(news::create_comment))
        .route("/{id}/like", put(news::like_news))
        .route("/{id}/comments/{comment_id}/like", put(news::like_comment))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT));

    let calendar_routes = Router::new()
        .route(
            "/",
            get(farming_calendar::list_tasks).post(farming_calendar::create_task),
        )
        .route("/upcoming", get(farming_calendar::upcoming_tasks))
        .route("/stats", get(farming_calendar::task_stats))
        .route(
            "/{id}",
            put(farming_calendar::update_task).delete(farming_calendar::delete_task),
        )
        .route("/{id}/toggle", patch(farming_calendar::toggle_task))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Reads are public, writes authenticate via the Claims extractor.
    let alert_routes = Router::new()
        .route(
            "/",
            get(pest_alerts::list_alerts).post(pest_alerts::create_alert),
        )
        .route(
            "/{id}",
            get(pest_alerts::get_alert)
                .put(pest_alerts::update_alert)
                .delete(pest_alerts::delete_alert),
        )
        .route("/{id}/comments", post(pest_alerts::create_comment))
        .route("/{id}/status", patch(pest_alerts::update_status))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT));

    let question_routes = Router::new()
        .route(
            "/questions",
            get(expert_support::list_questions).post(expert_support::create_question),
        )
        .route("/my-questions", get(expert_support::my_questions))
        .route(
            "/questions/{id}",
            get(expert_support::get_question)
                .put(expert_support::update_question)
                .delete(expert_support::delete_question),
        )
        .route("/questions/{id}/answer", put(expert_support::answer_question))
        .route("/questions/{id}/status", patch(expert_support::update_status))
        .route(
            "/questions/{id}/comments",
            post(expert_support::create_comment),
        )
        .route(
            "/questions/{id}/comments/{comment_id}",
            put(expert_support::update_comment).delete(expert_support::delete_comment),
        )
        .route(
            "/questions/{id}/like",
            post(expert_support::toggle_question_like),
        )
        .route(
            "/questions/{id}/comments/{comment_id}/like",
            post(expert_support::toggle_comment_like),
        )
        .route("/expert-stats", get(expert_support::expert_stats));

    let dashboard_routes = Router::new().route("/stats", get(dashboard::stats));

    let weather_routes = Router::new()
        .route("/current", get(weather::current))
        .route("/forecast", get(weather::forecast));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/news", news_routes)
        .nest("/api/farming-calendar", calendar_routes)
        .nest("/api/pest-alerts", alert_routes)
        .nest("/api/expert-support", question_routes)
        .nest("/api/dashboard", dashboard_routes)
        .nest("/api/weather", weather_routes)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
