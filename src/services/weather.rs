//! Weather resolution service.
//!
//! Cache-then-fetch orchestration: a request resolves to a fresh-enough
//! cached record when one exists, otherwise to an upstream fetch whose
//! result is persisted and returned. Caching is an optimization, not a
//! correctness requirement — a failed cache write degrades to
//! "always fetch live", it never fails the read path.
//!
//! Also home of the daily aggregation that folds 3-hourly forecast
//! samples into per-day summaries.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::db::models::WeatherRecord;
use crate::db::queries::{self, InsertForecastDay, InsertObservationParams};
use crate::errors::AppError;
use crate::services::openweather::{CurrentConditions, ForecastSample, OwmClient};

/// Number of daily summaries returned and persisted per forecast fetch.
const FORECAST_DAYS: usize = 5;

/// Outcome of a current-weather resolution. The route layer formats both
/// variants into the same response shape.
pub enum CurrentWeatherResult {
    /// A fresh-enough cached row.
    Cached(WeatherRecord),
    /// Freshly fetched conditions; returned even when the cache write failed.
    Fetched {
        conditions: CurrentConditions,
        fetched_at: DateTime<Utc>,
    },
}

/// Outcome of a forecast resolution.
pub enum ForecastResult {
    /// Fresh-enough cached day rows, ordered by forecast date.
    Cached(Vec<WeatherRecord>),
    /// Freshly aggregated days, in provider encounter order.
    Fetched(Vec<DailyAggregate>),
}

/// One calendar day's summary of forecast samples.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub temperature_min: Decimal,
    pub temperature_max: Decimal,
    pub condition: String,
    pub description: String,
}

/// Oldest `timestamp` a cached row may carry and still count as fresh.
fn cache_threshold(cache_ttl_minutes: i64) -> DateTime<Utc> {
    Utc::now() - Duration::minutes(cache_ttl_minutes)
}

/// Resolve current weather for a city: cached row if fresh enough,
/// otherwise fetch from the provider, persist, and return the fetched data.
pub async fn resolve_current(
    pool: &PgPool,
    client: &OwmClient,
    cache_ttl_minutes: i64,
    city: &str,
) -> Result<CurrentWeatherResult, AppError> {
    let threshold = cache_threshold(cache_ttl_minutes);

    if let Some(record) = queries::find_current(pool, city, threshold).await? {
        tracing::debug!("Current weather cache hit for '{}'", city);
        return Ok(CurrentWeatherResult::Cached(record));
    }

    tracing::debug!("Current weather cache miss for '{}', fetching upstream", city);
    let conditions = client.fetch_current(city).await?;
    let fetched_at = Utc::now();

    cache_observation(pool, &conditions, fetched_at).await;

    Ok(CurrentWeatherResult::Fetched {
        conditions,
        fetched_at,
    })
}

/// Resolve the 5-day forecast for a city: cached day rows if fresh enough,
/// otherwise fetch samples, aggregate per calendar day, persist, return.
pub async fn resolve_forecast(
    pool: &PgPool,
    client: &OwmClient,
    cache_ttl_minutes: i64,
    city: &str,
) -> Result<ForecastResult, AppError> {
    let threshold = cache_threshold(cache_ttl_minutes);

    let cached = queries::find_forecast(pool, city, threshold).await?;
    if !cached.is_empty() {
        tracing::debug!("Forecast cache hit for '{}' ({} days)", city, cached.len());
        return Ok(ForecastResult::Cached(cached));
    }

    tracing::debug!("Forecast cache miss for '{}', fetching upstream", city);
    let samples = client.fetch_forecast(city).await?;
    let days = aggregate_daily(&samples);
    let fetched_at = Utc::now();

    cache_forecast(pool, city, fetched_at, &days).await;

    Ok(ForecastResult::Fetched(days))
}

/// Persist a fetched observation. Errors are logged and swallowed — the
/// caller already holds the data to return.
async fn cache_observation(pool: &PgPool, conditions: &CurrentConditions, fetched_at: DateTime<Utc>) {
    let params = InsertObservationParams {
        city: conditions.city.clone(),
        country: conditions.country.clone(),
        temperature: conditions.temperature,
        feels_like: conditions.feels_like,
        temperature_min: conditions.temperature_min,
        temperature_max: conditions.temperature_max,
        pressure: conditions.pressure,
        humidity: conditions.humidity,
        visibility: conditions.visibility,
        wind_speed: conditions.wind_speed,
        wind_deg: conditions.wind_deg,
        cloudiness: conditions.cloudiness,
        condition: conditions.condition.clone(),
        description: conditions.description.clone(),
        sunrise: conditions.sunrise,
        sunset: conditions.sunset,
        timestamp: fetched_at,
    };

    if let Err(e) = queries::insert_observation(pool, params).await {
        tracing::error!("Failed to cache weather for '{}': {}", conditions.city, e);
    }
}

/// Persist aggregated forecast days under the literal query string.
/// Same swallow-on-failure policy as [`cache_observation`].
async fn cache_forecast(
    pool: &PgPool,
    city: &str,
    fetched_at: DateTime<Utc>,
    days: &[DailyAggregate],
) {
    let rows: Vec<InsertForecastDay> = days
        .iter()
        .map(|day| InsertForecastDay {
            forecast_date: day.date,
            temperature_min: day.temperature_min,
            temperature_max: day.temperature_max,
            condition: day.condition.clone(),
            description: day.description.clone(),
        })
        .collect();

    if let Err(e) = queries::insert_forecast_days(pool, city, fetched_at, &rows).await {
        tracing::error!("Failed to cache forecast for '{}': {}", city, e);
    }
}

/// Fold timestamped samples into daily summaries.
///
/// Samples are grouped by calendar date in encounter order, and only the
/// first [`FORECAST_DAYS`] groups are kept — deliberately NOT sorted by
/// date. The provider returns samples chronologically, so in practice this
/// yields the next 5 days including a possibly-partial current day; if it
/// ever returned out-of-order samples, the encounter order is preserved.
///
/// Per group: min/max temperature, plus the most frequent condition and
/// description (computed independently — they may come from different
/// samples).
pub fn aggregate_daily(samples: &[ForecastSample]) -> Vec<DailyAggregate> {
    struct DayGroup<'a> {
        date: NaiveDate,
        temps: Vec<Decimal>,
        conditions: Vec<&'a str>,
        descriptions: Vec<&'a str>,
    }

    let mut groups: Vec<DayGroup> = Vec::new();
    for sample in samples {
        match groups.iter_mut().find(|g| g.date == sample.date) {
            Some(group) => {
                group.temps.push(sample.temperature);
                group.conditions.push(&sample.condition);
                group.descriptions.push(&sample.description);
            }
            None => groups.push(DayGroup {
                date: sample.date,
                temps: vec![sample.temperature],
                conditions: vec![&sample.condition],
                descriptions: vec![&sample.description],
            }),
        }
    }

    groups.truncate(FORECAST_DAYS);

    groups
        .into_iter()
        .map(|group| DailyAggregate {
            date: group.date,
            temperature_min: group.temps.iter().copied().min().unwrap_or_default(),
            temperature_max: group.temps.iter().copied().max().unwrap_or_default(),
            condition: most_common(&group.conditions).to_string(),
            description: most_common(&group.descriptions).to_string(),
        })
        .collect()
}

/// The most frequent value in an ordered sequence.
///
/// Deterministic frequency count: the first value to reach the maximum
/// count wins, so ties go to the earliest-encountered value.
fn most_common<'a>(values: &[&'a str]) -> &'a str {
    let mut best = "";
    let mut best_count = 0;
    for &v in values {
        let count = values.iter().filter(|&&x| x == v).count();
        if count > best_count {
            best = v;
            best_count = count;
        }
    }
    best
}
