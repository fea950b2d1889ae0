//! Cache Store queries for `weather_records`.
//!
//! All queries are runtime-checked (`query_as`/`query`), no compile-time
//! macros. Lookups filter by case-insensitive city substring and a
//! freshness threshold computed by the caller; inserts are append-only.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::WeatherRecord;

/// Parameters for inserting a current-weather observation row.
pub struct InsertObservationParams {
    pub city: String,
    pub country: String,
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
    pub condition: String,
    pub description: String,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

/// One aggregated forecast day to persist.
pub struct InsertForecastDay {
    pub forecast_date: NaiveDate,
    pub temperature_min: Decimal,
    pub temperature_max: Decimal,
    pub condition: String,
    pub description: String,
}

/// Find the freshest cached current-weather row for a city.
///
/// The stored city must contain the query string, case-insensitively
/// (`ILIKE '%city%'` — substring match, so "Lon" matches a cached
/// "London" row). Only rows with `timestamp >= threshold` qualify; the
/// most recent one wins.
pub async fn find_current(
    pool: &PgPool,
    city: &str,
    threshold: DateTime<Utc>,
) -> Result<Option<WeatherRecord>, sqlx::Error> {
    sqlx::query_as::<_, WeatherRecord>(
        "SELECT id, city, country, temperature, feels_like, temperature_min, temperature_max,
                pressure, humidity, visibility, wind_speed, wind_deg, cloudiness,
                condition, description, sunrise, sunset, \"timestamp\", is_forecast,
                forecast_date, created_at, updated_at
         FROM weather_records
         WHERE is_forecast = FALSE
           AND city ILIKE '%' || $1 || '%'
           AND \"timestamp\" >= $2
         ORDER BY \"timestamp\" DESC
         LIMIT 1",
    )
    .bind(city)
    .bind(threshold)
    .fetch_optional(pool)
    .await
}

/// Find all fresh cached forecast-day rows for a city, ordered by the
/// summarized day (not by fetch time).
pub async fn find_forecast(
    pool: &PgPool,
    city: &str,
    threshold: DateTime<Utc>,
) -> Result<Vec<WeatherRecord>, sqlx::Error> {
    sqlx::query_as::<_, WeatherRecord>(
        "SELECT id, city, country, temperature, feels_like, temperature_min, temperature_max,
                pressure, humidity, visibility, wind_speed, wind_deg, cloudiness,
                condition, description, sunrise, sunset, \"timestamp\", is_forecast,
                forecast_date, created_at, updated_at
         FROM weather_records
         WHERE is_forecast = TRUE
           AND city ILIKE '%' || $1 || '%'
           AND \"timestamp\" >= $2
         ORDER BY forecast_date ASC",
    )
    .bind(city)
    .bind(threshold)
    .fetch_all(pool)
    .await
}

/// Insert one current-weather observation row (append-only).
pub async fn insert_observation(
    pool: &PgPool,
    params: InsertObservationParams,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO weather_records (
            id, city, country,
            temperature, feels_like, temperature_min, temperature_max,
            pressure, humidity, visibility, wind_speed, wind_deg, cloudiness,
            condition, description, sunrise, sunset, \"timestamp\",
            is_forecast, forecast_date
        ) VALUES (
            $1, $2, $3,
            $4, $5, $6, $7,
            $8, $9, $10, $11, $12, $13,
            $14, $15, $16, $17, $18,
            FALSE, NULL
        )",
    )
    .bind(Uuid::new_v4())
    .bind(&params.city)
    .bind(&params.country)
    .bind(params.temperature)
    .bind(params.feels_like)
    .bind(params.temperature_min)
    .bind(params.temperature_max)
    .bind(params.pressure)
    .bind(params.humidity)
    .bind(params.visibility)
    .bind(params.wind_speed)
    .bind(params.wind_deg)
    .bind(params.cloudiness)
    .bind(&params.condition)
    .bind(&params.description)
    .bind(params.sunrise)
    .bind(params.sunset)
    .bind(params.timestamp)
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert one row per aggregated forecast day, all within a single
/// transaction so a batch either lands completely or not at all.
///
/// `city` is the literal query string, not the provider's canonical name.
/// Measurement fields the aggregation doesn't produce are filled the way
/// the record schema expects: temperature and feels_like get the midpoint
/// of the day's min/max, the rest are 0, country is NULL.
pub async fn insert_forecast_days(
    pool: &PgPool,
    city: &str,
    fetched_at: DateTime<Utc>,
    days: &[InsertForecastDay],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for day in days {
        let midpoint = (day.temperature_min + day.temperature_max) / Decimal::TWO;

        sqlx::query(
            "INSERT INTO weather_records (
                id, city, country,
                temperature, feels_like, temperature_min, temperature_max,
                pressure, humidity, visibility, wind_speed, wind_deg, cloudiness,
                condition, description, sunrise, sunset, \"timestamp\",
                is_forecast, forecast_date
            ) VALUES (
                $1, $2, NULL,
                $3, $3, $4, $5,
                0, 0, 0, 0, 0, 0,
                $6, $7, NULL, NULL, $8,
                TRUE, $9
            )",
        )
        .bind(Uuid::new_v4())
        .bind(city)
        .bind(midpoint)
        .bind(day.temperature_min)
        .bind(day.temperature_max)
        .bind(&day.condition)
        .bind(&day.description)
        .bind(fetched_at)
        .bind(day.forecast_date)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}
