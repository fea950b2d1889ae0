use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// A cached weather record for a city.
///
/// One table holds both kinds of rows, distinguished by `is_forecast`:
/// - `is_forecast = false`: a point-in-time observation; `timestamp` is the
///   fetch time, `sunrise`/`sunset` are set, `forecast_date` is NULL.
/// - `is_forecast = true`: one aggregated day's summary; `forecast_date` is
///   the summarized day, `timestamp` is when the aggregation was cached.
///
/// Rows are append-only. Cache lookups select the most recent qualifying
/// row(s) by `timestamp`; expiry is logical, never a delete.
#[derive(Debug, Clone, FromRow)]
#[allow(dead_code)] // All fields populated by FromRow; some accessed only via route serialization
pub struct WeatherRecord {
    pub id: Uuid,
    pub city: String,
    /// ISO country code from the provider; NULL for forecast rows.
    pub country: Option<String>,

    // Measurements (metric units)
    pub temperature: Decimal,
    pub feels_like: Decimal,
    pub temperature_min: Decimal,
    pub temperature_max: Decimal,
    pub pressure: Decimal,
    pub humidity: Decimal,
    pub visibility: Decimal,
    pub wind_speed: Decimal,
    pub wind_deg: Decimal,
    pub cloudiness: Decimal,

    /// Short category string, e.g. "Clouds".
    pub condition: String,
    /// Free-text description, e.g. "scattered clouds".
    pub description: String,

    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,

    pub timestamp: DateTime<Utc>,

    pub is_forecast: bool,
    pub forecast_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
