//! Weather HTTP endpoints.
//!
//! - GET /api/v1/weather/current/:city
//! - GET /api/v1/weather/forecast/:city
//!
//! Handlers delegate resolution to the weather service and only do field
//! projection here: cached rows and freshly fetched data format into the
//! same response shapes.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::models::WeatherRecord;
use crate::errors::{AppError, ErrorResponse};
use crate::helpers::dec_to_f64;
use crate::services::openweather::{CurrentConditions, OwmClient};
use crate::services::weather::{
    resolve_current, resolve_forecast, CurrentWeatherResult, DailyAggregate, ForecastResult,
};

/// Shared application state for weather endpoints.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) pool: sqlx::PgPool,
    pub(crate) owm_client: OwmClient,
    /// Freshness window for cached rows, in minutes.
    pub(crate) cache_ttl_minutes: i64,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Current weather observation for a city.
#[derive(Debug, Serialize, ToSchema)]
pub struct WeatherObservation {
    /// City name (provider's canonical name)
    pub city: String,
    /// ISO country code
    pub country: String,
    /// Air temperature in Celsius
    pub temperature: f64,
    /// Feels-like temperature in Celsius
    pub feels_like: f64,
    /// Minimum temperature currently observed in the area, Celsius
    pub temperature_min: f64,
    /// Maximum temperature currently observed in the area, Celsius
    pub temperature_max: f64,
    /// Atmospheric pressure in hPa
    pub pressure: f64,
    /// Relative humidity percentage
    pub humidity: f64,
    /// Visibility in metres
    pub visibility: f64,
    /// Wind speed in metres per second
    pub wind_speed: f64,
    /// Wind direction in degrees (0 = north, 90 = east)
    pub wind_deg: f64,
    /// Cloud cover percentage
    pub cloudiness: f64,
    /// Short weather category (e.g. "Clouds")
    pub condition: String,
    /// Free-text description (e.g. "broken clouds")
    pub description: String,
    /// Sunrise time (ISO 8601). Null when unknown.
    pub sunrise: Option<String>,
    /// Sunset time (ISO 8601). Null when unknown.
    pub sunset: Option<String>,
    /// When this observation was fetched from the provider (ISO 8601)
    pub timestamp: String,
}

impl WeatherObservation {
    /// Project a cached observation row.
    pub fn from_record(record: &WeatherRecord) -> Self {
        Self {
            city: record.city.clone(),
            country: record.country.clone().unwrap_or_default(),
            temperature: dec_to_f64(record.temperature),
            feels_like: dec_to_f64(record.feels_like),
            temperature_min: dec_to_f64(record.temperature_min),
            temperature_max: dec_to_f64(record.temperature_max),
            pressure: dec_to_f64(record.pressure),
            humidity: dec_to_f64(record.humidity),
            visibility: dec_to_f64(record.visibility),
            wind_speed: dec_to_f64(record.wind_speed),
            wind_deg: dec_to_f64(record.wind_deg),
            cloudiness: dec_to_f64(record.cloudiness),
            condition: record.condition.clone(),
            description: record.description.clone(),
            sunrise: record.sunrise.map(|dt| dt.to_rfc3339()),
            sunset: record.sunset.map(|dt| dt.to_rfc3339()),
            timestamp: record.timestamp.to_rfc3339(),
        }
    }

    /// Project freshly fetched conditions (the cache write may have failed;
    /// the response doesn't depend on it).
    pub fn from_fetched(conditions: &CurrentConditions, fetched_at: DateTime<Utc>) -> Self {
        Self {
            city: conditions.city.clone(),
            country: conditions.country.clone(),
            temperature: dec_to_f64(conditions.temperature),
            feels_like: dec_to_f64(conditions.feels_like),
            temperature_min: dec_to_f64(conditions.temperature_min),
            temperature_max: dec_to_f64(conditions.temperature_max),
            pressure: dec_to_f64(conditions.pressure),
            humidity: dec_to_f64(conditions.humidity),
            visibility: dec_to_f64(conditions.visibility),
            wind_speed: dec_to_f64(conditions.wind_speed),
            wind_deg: dec_to_f64(conditions.wind_deg),
            cloudiness: dec_to_f64(conditions.cloudiness),
            condition: conditions.condition.clone(),
            description: conditions.description.clone(),
            sunrise: Some(conditions.sunrise.to_rfc3339()),
            sunset: Some(conditions.sunset.to_rfc3339()),
            timestamp: fetched_at.to_rfc3339(),
        }
    }
}

/// One day of the 5-day forecast.
#[derive(Debug, Serialize, ToSchema)]
pub struct DailySummary {
    /// The summarized calendar day
    pub date: NaiveDate,
    /// Minimum temperature across the day's samples, Celsius
    pub temperature_min: f64,
    /// Maximum temperature across the day's samples, Celsius
    pub temperature_max: f64,
    /// Most frequent weather category among the day's samples
    pub condition: String,
    /// Most frequent description among the day's samples
    pub description: String,
}

impl DailySummary {
    /// Project a cached forecast-day row.
    pub fn from_record(record: &WeatherRecord) -> Self {
        Self {
            // forecast rows always carry a forecast_date; fall back to the
            // fetch day rather than invent one
            date: record
                .forecast_date
                .unwrap_or_else(|| record.timestamp.date_naive()),
            temperature_min: dec_to_f64(record.temperature_min),
            temperature_max: dec_to_f64(record.temperature_max),
            condition: record.condition.clone(),
            description: record.description.clone(),
        }
    }

    /// Project a freshly computed daily aggregate.
    pub fn from_aggregate(day: &DailyAggregate) -> Self {
        Self {
            date: day.date,
            temperature_min: dec_to_f64(day.temperature_min),
            temperature_max: dec_to_f64(day.temperature_max),
            condition: day.condition.clone(),
            description: day.description.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn validated_city(city: &str) -> Result<&str, AppError> {
    let city = city.trim();
    if city.is_empty() {
        return Err(AppError::BadRequest("city must not be blank".to_string()));
    }
    Ok(city)
}

/// Get current weather for a city.
///
/// Serves a cached observation when one exists within the freshness
/// window, otherwise fetches live data from the provider and caches it.
#[utoipa::path(
    get,
    path = "/api/v1/weather/current/{city}",
    tag = "Weather",
    params(
        ("city" = String, Path, description = "City name"),
    ),
    responses(
        (status = 200, description = "Current weather for the city", body = WeatherObservation),
        (status = 400, description = "Blank city name", body = ErrorResponse),
        (status = 502, description = "Weather provider unreachable or returned malformed data", body = ErrorResponse),
    )
)]
pub async fn get_current_weather(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<WeatherObservation>, AppError> {
    let city = validated_city(&city)?;

    let result =
        resolve_current(&state.pool, &state.owm_client, state.cache_ttl_minutes, city).await?;

    let observation = match result {
        CurrentWeatherResult::Cached(record) => WeatherObservation::from_record(&record),
        CurrentWeatherResult::Fetched {
            conditions,
            fetched_at,
        } => WeatherObservation::from_fetched(&conditions, fetched_at),
    };

    Ok(Json(observation))
}

/// Get the 5-day forecast for a city.
///
/// Serves cached daily summaries when fresh ones exist, otherwise fetches
/// the provider's 3-hourly samples, aggregates them per calendar day,
/// caches the result and returns it.
#[utoipa::path(
    get,
    path = "/api/v1/weather/forecast/{city}",
    tag = "Weather",
    params(
        ("city" = String, Path, description = "City name"),
    ),
    responses(
        (status = 200, description = "Daily forecast summaries, one per day", body = [DailySummary]),
        (status = 400, description = "Blank city name", body = ErrorResponse),
        (status = 502, description = "Weather provider unreachable or returned malformed data", body = ErrorResponse),
    )
)]
pub async fn get_weather_forecast(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<Vec<DailySummary>>, AppError> {
    let city = validated_city(&city)?;

    let result =
        resolve_forecast(&state.pool, &state.owm_client, state.cache_ttl_minutes, city).await?;

    let summaries = match result {
        ForecastResult::Cached(records) => {
            records.iter().map(DailySummary::from_record).collect()
        }
        ForecastResult::Fetched(days) => days.iter().map(DailySummary::from_aggregate).collect(),
    };

    Ok(Json(summaries))
}
