// WeatherMaster API v0.1
use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod db;
mod errors;
mod helpers;
mod routes;
mod services;

use config::AppConfig;
use routes::weather::AppState;
use services::openweather::OwmClient;

/// Maximum number of connections in the database pool.
const DB_POOL_MAX_CONNECTIONS: u32 = 5;
/// Minimum number of connections kept alive in the database pool.
const DB_POOL_MIN_CONNECTIONS: u32 = 2;

/// WeatherMaster API — OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "WeatherMaster API",
        version = "0.1.0",
        description = "Weather information API with database-backed caching. \
            Serves current conditions and 5-day forecasts for a named city, \
            fetching from OpenWeatherMap on cache miss and answering from \
            cached rows within a configurable freshness window.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Weather", description = "Current weather and forecast retrieval"),
    ),
    paths(
        routes::health::health_check,
        routes::weather::get_current_weather,
        routes::weather::get_weather_forecast,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::weather::WeatherObservation,
            routes::weather::DailySummary,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weathermaster_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // Set up database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(DB_POOL_MAX_CONNECTIONS)
        .min_connections(DB_POOL_MIN_CONNECTIONS)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Create OpenWeatherMap client
    let owm_client = OwmClient::new(&config.openweather_base_url, &config.openweather_api_key);

    // Build shared application state
    let app_state = AppState {
        pool: pool.clone(),
        owm_client,
        cache_ttl_minutes: config.cache_ttl_minutes,
    };

    tracing::info!(
        "Cache freshness window: {} minutes",
        config.cache_ttl_minutes
    );

    // CORS — read-only API, restrict methods to GET
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    // Build router
    // Weather routes use AppState; the health check uses the PgPool directly.
    let weather_routes = Router::new()
        .route(
            "/api/v1/weather/current/:city",
            get(routes::weather::get_current_weather),
        )
        .route(
            "/api/v1/weather/forecast/:city",
            get(routes::weather::get_weather_forecast),
        )
        .with_state(app_state);

    let health_routes = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .with_state(pool);

    let app = Router::new()
        .merge(health_routes)
        .merge(weather_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
