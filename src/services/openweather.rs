//! OpenWeatherMap client.
//!
//! Fetches current conditions and the 5-day/3-hour forecast, metric units.
//! See: https://openweathermap.org/api
//!
//! Responses are deserialized into typed structs and mapped to internal
//! shapes here, converting measurement values to 1dp `Decimal` at parse
//! time. Required provider fields are non-`Option` (a missing field is a
//! format error); `visibility`, `wind` and `clouds` default to 0.

use chrono::{DateTime, Local, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::AppError;
use crate::helpers::f64_to_decimal_1dp;

/// Upstream request timeout in seconds. Timeouts surface as transport
/// errors; there are no retries.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Client for the OpenWeatherMap data API.
#[derive(Debug, Clone)]
pub struct OwmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Current conditions for a city, mapped from the provider response.
#[derive(Debug, Clone)]
pub struct CurrentConditions {
    /// Canonical city name as reported by the provider.
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
}

/// One timestamped forecast sample (typically 3-hour granularity).
///
/// `date` is the calendar day the sample falls on, derived from the
/// sample's epoch timestamp in local time — the grouping key for daily
/// aggregation.
#[derive(Debug, Clone)]
pub struct ForecastSample {
    pub date: NaiveDate,
    pub temperature: Decimal,
    pub condition: String,
    pub description: String,
}

// --- OpenWeatherMap JSON response types ---

#[derive(Debug, Deserialize)]
struct OwmCurrentResponse {
    name: String,
    sys: OwmSys,
    main: OwmMain,
    visibility: Option<f64>,
    wind: Option<OwmWind>,
    clouds: Option<OwmClouds>,
    weather: Vec<OwmWeatherItem>,
}

#[derive(Debug, Deserialize)]
struct OwmSys {
    country: String,
    /// Epoch seconds.
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    pressure: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: Option<f64>,
    deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmClouds {
    all: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmWeatherItem {
    /// Short category, e.g. "Clouds".
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmForecastResponse {
    list: Vec<OwmForecastItem>,
}

#[derive(Debug, Deserialize)]
struct OwmForecastItem {
    /// Epoch seconds of the sample.
    dt: i64,
    main: OwmForecastMain,
    weather: Vec<OwmWeatherItem>,
}

#[derive(Debug, Deserialize)]
struct OwmForecastMain {
    temp: f64,
}

fn epoch_to_utc(secs: i64) -> Result<DateTime<Utc>, AppError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        AppError::ResponseFormatError(format!("epoch timestamp {} out of range", secs))
    })
}

fn epoch_to_local_date(secs: i64) -> Result<NaiveDate, AppError> {
    Ok(epoch_to_utc(secs)?.with_timezone(&Local).date_naive())
}

impl OwmClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        city: &str,
    ) -> Result<T, AppError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("OpenWeatherMap request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "OpenWeatherMap returned HTTP {}",
                response.status()
            )));
        }

        response.json::<T>().await.map_err(|e| {
            AppError::ResponseFormatError(format!("OpenWeatherMap response error: {}", e))
        })
    }

    /// Fetch current weather for a city from the `/weather` endpoint.
    pub async fn fetch_current(&self, city: &str) -> Result<CurrentConditions, AppError> {
        let body: OwmCurrentResponse = self.get_json("weather", city).await?;

        let weather = body.weather.first().ok_or_else(|| {
            AppError::ResponseFormatError("no weather condition in response".to_string())
        })?;

        let wind = body.wind.as_ref();

        Ok(CurrentConditions {
            city: body.name,
            country: body.sys.country,
            temperature: f64_to_decimal_1dp(body.main.temp),
            feels_like: f64_to_decimal_1dp(body.main.feels_like),
            temperature_min: f64_to_decimal_1dp(body.main.temp_min),
            temperature_max: f64_to_decimal_1dp(body.main.temp_max),
            pressure: f64_to_decimal_1dp(body.main.pressure),
            humidity: f64_to_decimal_1dp(body.main.humidity),
            visibility: f64_to_decimal_1dp(body.visibility.unwrap_or(0.0)),
            wind_speed: f64_to_decimal_1dp(wind.and_then(|w| w.speed).unwrap_or(0.0)),
            wind_deg: f64_to_decimal_1dp(wind.and_then(|w| w.deg).unwrap_or(0.0)),
            cloudiness: f64_to_decimal_1dp(
                body.clouds.as_ref().and_then(|c| c.all).unwrap_or(0.0),
            ),
            condition: weather.main.clone(),
            description: weather.description.clone(),
            sunrise: epoch_to_utc(body.sys.sunrise)?,
            sunset: epoch_to_utc(body.sys.sunset)?,
        })
    }

    /// Fetch the 5-day/3-hour forecast for a city from the `/forecast`
    /// endpoint, in the order the provider returned the samples.
    ///
    /// An empty sample list is not an error; the caller decides what an
    /// empty forecast means.
    pub async fn fetch_forecast(&self, city: &str) -> Result<Vec<ForecastSample>, AppError> {
        let body: OwmForecastResponse = self.get_json("forecast", city).await?;

        let mut samples = Vec::with_capacity(body.list.len());
        for item in &body.list {
            let weather = item.weather.first().ok_or_else(|| {
                AppError::ResponseFormatError("no weather condition in forecast sample".to_string())
            })?;

            samples.push(ForecastSample {
                date: epoch_to_local_date(item.dt)?,
                temperature: f64_to_decimal_1dp(item.main.temp),
                condition: weather.main.clone(),
                description: weather.description.clone(),
            });
        }

        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::str::FromStr;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn current_body() -> serde_json::Value {
        json!({
            "name": "London",
            "sys": { "country": "GB", "sunrise": 1717216200, "sunset": 1717275600 },
            "main": {
                "temp": 18.62,
                "feels_like": 18.1,
                "temp_min": 16.4,
                "temp_max": 20.9,
                "pressure": 1012,
                "humidity": 68
            },
            "visibility": 10000,
            "wind": { "speed": 4.1, "deg": 250 },
            "clouds": { "all": 75 },
            "weather": [ { "main": "Clouds", "description": "broken clouds" } ]
        })
    }

    fn mock_client(server: &MockServer) -> OwmClient {
        OwmClient::new(&server.uri(), "test-key")
    }

    #[tokio::test]
    async fn test_fetch_current_maps_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "London"))
            .and(query_param("appid", "test-key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let conditions = client.fetch_current("London").await.unwrap();

        assert_eq!(conditions.city, "London");
        assert_eq!(conditions.country, "GB");
        assert_eq!(conditions.temperature, Decimal::from_str("18.6").unwrap());
        assert_eq!(conditions.feels_like, Decimal::from_str("18.1").unwrap());
        assert_eq!(
            conditions.temperature_min,
            Decimal::from_str("16.4").unwrap()
        );
        assert_eq!(
            conditions.temperature_max,
            Decimal::from_str("20.9").unwrap()
        );
        assert_eq!(conditions.pressure, Decimal::from_str("1012.0").unwrap());
        assert_eq!(conditions.humidity, Decimal::from_str("68.0").unwrap());
        assert_eq!(conditions.visibility, Decimal::from_str("10000.0").unwrap());
        assert_eq!(conditions.wind_speed, Decimal::from_str("4.1").unwrap());
        assert_eq!(conditions.wind_deg, Decimal::from_str("250.0").unwrap());
        assert_eq!(conditions.cloudiness, Decimal::from_str("75.0").unwrap());
        assert_eq!(conditions.condition, "Clouds");
        assert_eq!(conditions.description, "broken clouds");
        assert_eq!(conditions.sunrise.timestamp(), 1717216200);
        assert_eq!(conditions.sunset.timestamp(), 1717275600);
    }

    #[tokio::test]
    async fn test_fetch_current_defaults_absent_optionals_to_zero() {
        let mut body = current_body();
        body.as_object_mut().unwrap().remove("visibility");
        body.as_object_mut().unwrap().remove("wind");
        body.as_object_mut().unwrap().remove("clouds");

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let conditions = client.fetch_current("London").await.unwrap();

        assert_eq!(conditions.visibility, Decimal::ZERO);
        assert_eq!(conditions.wind_speed, Decimal::ZERO);
        assert_eq!(conditions.wind_deg, Decimal::ZERO);
        assert_eq!(conditions.cloudiness, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_fetch_current_missing_required_field_is_format_error() {
        let mut body = current_body();
        body.as_object_mut().unwrap().remove("main");

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let err = client.fetch_current("London").await.unwrap_err();
        assert!(matches!(err, AppError::ResponseFormatError(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_fetch_current_empty_weather_array_is_format_error() {
        let mut body = current_body();
        body["weather"] = json!([]);

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let err = client.fetch_current("London").await.unwrap_err();
        assert!(matches!(err, AppError::ResponseFormatError(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_fetch_current_non_success_status_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({ "message": "boom" })),
            )
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let err = client.fetch_current("London").await.unwrap_err();
        assert!(matches!(err, AppError::ExternalServiceError(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_fetch_current_unknown_city_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({ "cod": "404", "message": "city not found" })),
            )
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let err = client.fetch_current("Atlantis").await.unwrap_err();
        assert!(matches!(err, AppError::ExternalServiceError(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_fetch_forecast_maps_samples_in_provider_order() {
        // Build dt values from local datetimes so the derived calendar
        // dates are stable regardless of the machine's timezone.
        let day1 = Local.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let day1_later = Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let day2 = Local.with_ymd_and_hms(2024, 6, 2, 9, 0, 0).unwrap();

        let body = json!({
            "list": [
                {
                    "dt": day1.timestamp(),
                    "main": { "temp": 18.0 },
                    "weather": [ { "main": "Clear", "description": "clear sky" } ]
                },
                {
                    "dt": day1_later.timestamp(),
                    "main": { "temp": 21.4 },
                    "weather": [ { "main": "Clouds", "description": "few clouds" } ]
                },
                {
                    "dt": day2.timestamp(),
                    "main": { "temp": 17.2 },
                    "weather": [ { "main": "Rain", "description": "light rain" } ]
                }
            ]
        });

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("q", "London"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let samples = client.fetch_forecast("London").await.unwrap();

        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].date, day1.date_naive());
        assert_eq!(samples[0].temperature, Decimal::from_str("18.0").unwrap());
        assert_eq!(samples[0].condition, "Clear");
        assert_eq!(samples[1].date, day1.date_naive());
        assert_eq!(samples[2].date, day2.date_naive());
        assert_eq!(samples[2].description, "light rain");
    }

    #[tokio::test]
    async fn test_fetch_forecast_empty_list_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "list": [] })))
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let samples = client.fetch_forecast("London").await.unwrap();
        assert!(samples.is_empty());
    }
}
