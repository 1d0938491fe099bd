use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::{Config, DEFAULT_BASE_URL},
    error::WeatherError,
    model::{UnitSystem, WeatherQuery, WeatherResult},
    transport::{HttpReply, HttpTransport, ReqwestTransport},
};

use super::WeatherProvider;

const CURRENT_WEATHER_PATH: &str = "/data/2.5/weather";

/// Provider-side error code OpenWeather reports when its own setup is broken.
const PROVIDER_MISCONFIGURED_COD: i64 = 500_000;

/// Client for OpenWeatherMap's current-weather endpoint.
#[derive(Clone)]
pub struct OpenWeatherProvider<T = ReqwestTransport> {
    api_key: Option<String>,
    base_url: String,
    transport: T,
}

impl OpenWeatherProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_transport(api_key, ReqwestTransport::new())
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::with_timeout(config.timeout())?;
        Ok(Self::with_transport(config.api_key().map(str::to_owned), transport)
            .with_base_url(config.base_url()))
    }
}

impl<T: HttpTransport> OpenWeatherProvider<T> {
    pub fn with_transport(api_key: Option<String>, transport: T) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            transport,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}{CURRENT_WEATHER_PATH}", self.base_url)
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

impl<T> fmt::Debug for OpenWeatherProvider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T: HttpTransport> WeatherProvider for OpenWeatherProvider<T> {
    #[instrument(skip(self, query), fields(query = %query))]
    async fn current(
        &self,
        query: &WeatherQuery,
        units: UnitSystem,
    ) -> Result<WeatherResult, WeatherError> {
        let Some(api_key) = self.api_key() else {
            debug!("no API key configured, skipping request");
            return Err(WeatherError::MissingCredential);
        };

        let params = request_params(api_key, query, units);
        let reply = self.transport.get(&self.endpoint(), &params).await?;

        if !reply.is_success() {
            let err = classify_failure(&reply);
            warn!(status = reply.status, error = %err, "OpenWeather request failed");
            return Err(err);
        }

        let result = parse_current(&reply.body, units, Utc::now())?;
        info!(
            location = %result.location,
            temperature = result.temperature,
            code = ?result.condition_code,
            "fetched current weather"
        );

        Ok(result)
    }
}

fn request_params(api_key: &str, query: &WeatherQuery, units: UnitSystem) -> Vec<(String, String)> {
    let mut params = match query {
        WeatherQuery::City { name } => vec![("q".to_string(), name.clone())],
        WeatherQuery::Coordinates { lat, lon } => vec![
            ("lat".to_string(), lat.to_string()),
            ("lon".to_string(), lon.to_string()),
        ],
    };
    params.push(("appid".to_string(), api_key.to_string()));
    params.push(("units".to_string(), units.as_str().to_string()));
    params
}

#[derive(Debug, Default, Deserialize)]
struct OwErrorBody {
    cod: Option<Value>,
    message: Option<String>,
}

impl OwErrorBody {
    fn code(&self) -> Option<i64> {
        match self.cod.as_ref()? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

fn classify_failure(reply: &HttpReply) -> WeatherError {
    match reply.status {
        401 => WeatherError::Unauthorized,
        404 => WeatherError::NotFound,
        429 => WeatherError::RateLimited,
        status => {
            let body: OwErrorBody = serde_json::from_str(&reply.body).unwrap_or_default();

            if body.code() == Some(PROVIDER_MISCONFIGURED_COD) {
                return WeatherError::ProviderMisconfigured;
            }

            let message = body
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| format!("HTTP {status} {}", reply.reason).trim_end().to_string());

            WeatherError::Unknown(message)
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: Option<i32>,
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: Option<String>,
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwClouds {
    all: u8,
}

/// Body of a successful current-weather reply. `main` and `weather` are
/// optional here so their absence can be reported as a malformed reply rather
/// than a parse error.
#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    sys: Option<OwSys>,
    main: Option<OwMain>,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: Option<OwWind>,
    visibility: Option<u32>,
    clouds: Option<OwClouds>,
}

fn parse_current(
    body: &str,
    units: UnitSystem,
    captured_at: DateTime<Utc>,
) -> Result<WeatherResult, WeatherError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body).map_err(|e| {
        debug!(error = %e, "failed to parse OpenWeather current JSON");
        WeatherError::MalformedResponse
    })?;

    let (Some(main), Some(condition)) = (parsed.main, parsed.weather.into_iter().next()) else {
        debug!("OpenWeather reply lacks `main` or `weather`");
        return Err(WeatherError::MalformedResponse);
    };

    let sys = parsed.sys;
    let country = sys.as_ref().and_then(|s| s.country.clone()).filter(|c| !c.is_empty());
    let sunrise = sys.as_ref().and_then(|s| s.sunrise).and_then(unix_to_utc);
    let sunset = sys.as_ref().and_then(|s| s.sunset).and_then(unix_to_utc);

    Ok(WeatherResult {
        location: parsed.name,
        country,
        condition_code: condition.id,
        condition: condition.main,
        description: condition.description,
        temperature: main.temp,
        feels_like: main.feels_like,
        humidity_pct: main.humidity,
        wind_speed: parsed.wind.map(|w| w.speed).unwrap_or_default(),
        pressure_hpa: main.pressure,
        visibility_m: parsed.visibility,
        sunrise,
        sunset,
        cloudiness_pct: parsed.clouds.map(|c| c.all),
        units,
        captured_at,
    })
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, transport::MockHttpTransport};
    use serde_json::json;

    fn reply(status: u16, reason: &str, body: &str) -> HttpReply {
        HttpReply {
            status,
            reason: reason.to_string(),
            body: body.to_string(),
        }
    }

    fn sample_body() -> String {
        json!({
            "name": "Kyiv",
            "sys": { "country": "UA", "sunrise": 1_700_000_000, "sunset": 1_700_030_000 },
            "main": { "temp": 21.5, "feels_like": 20.9, "humidity": 40, "pressure": 1012 },
            "weather": [{ "id": 800, "main": "Clear", "description": "clear sky" }],
            "wind": { "speed": 3.6 },
            "visibility": 10000,
            "clouds": { "all": 0 }
        })
        .to_string()
    }

    fn provider_returning(reply: HttpReply) -> OpenWeatherProvider<MockHttpTransport> {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .times(1)
            .returning(move |_, _| Ok(reply.clone()));
        OpenWeatherProvider::with_transport(Some("KEY".into()), transport)
    }

    async fn current_error(reply: HttpReply) -> WeatherError {
        provider_returning(reply)
            .current(&WeatherQuery::city("Kyiv"), UnitSystem::Metric)
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn missing_api_key_never_touches_transport() {
        for key in [None, Some(String::new()), Some("  ".to_string())] {
            let mut transport = MockHttpTransport::new();
            transport.expect_get().times(0);

            let provider = OpenWeatherProvider::with_transport(key, transport);
            let err = provider
                .current(&WeatherQuery::city("Kyiv"), UnitSystem::Metric)
                .await
                .unwrap_err();

            assert_eq!(err, WeatherError::MissingCredential);
        }
    }

    #[tokio::test]
    async fn city_request_carries_name_key_and_units() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .withf(|url, params| {
                let has = |k: &str, v: &str| params.iter().any(|(pk, pv)| pk == k && pv == v);
                url.to_string() == "http://localhost:9999/data/2.5/weather"
                    && has("q", "São Paulo")
                    && has("appid", "KEY")
                    && has("units", "imperial")
                    && !params.iter().any(|(k, _)| k == "lat")
            })
            .times(1)
            .returning(|_, _| Ok(reply(200, "OK", &sample_body())));

        let provider = OpenWeatherProvider::with_transport(Some("KEY".into()), transport)
            .with_base_url("http://localhost:9999/");

        let result = provider
            .current(&WeatherQuery::city("São Paulo"), UnitSystem::Imperial)
            .await
            .unwrap();

        assert_eq!(result.units, UnitSystem::Imperial);
    }

    #[tokio::test]
    async fn coordinate_request_uses_lat_lon() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .withf(|_, params| {
                let has = |k: &str, v: &str| params.iter().any(|(pk, pv)| pk == k && pv == v);
                has("lat", "50.45") && has("lon", "30.52") && !params.iter().any(|(k, _)| k == "q")
            })
            .times(1)
            .returning(|_, _| Ok(reply(200, "OK", &sample_body())));

        let provider = OpenWeatherProvider::with_transport(Some("KEY".into()), transport);
        let result = provider
            .current(&WeatherQuery::coordinates(50.45, 30.52), UnitSystem::Metric)
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn success_is_normalized() {
        let result = provider_returning(reply(200, "OK", &sample_body()))
            .current(&WeatherQuery::city("Kyiv"), UnitSystem::Metric)
            .await
            .unwrap();

        assert_eq!(result.location, "Kyiv");
        assert_eq!(result.country.as_deref(), Some("UA"));
        assert_eq!(result.condition_code, Some(800));
        assert_eq!(result.description, "clear sky");
        assert_eq!(result.temperature, 21.5);
        assert_eq!(result.humidity_pct, 40);
        assert_eq!(result.pressure_hpa, 1012.0);
        assert_eq!(result.visibility_m, Some(10_000));
        assert_eq!(result.cloudiness_pct, Some(0));
        assert_eq!(result.sunrise.map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[tokio::test]
    async fn status_codes_are_classified() {
        assert_eq!(current_error(reply(401, "Unauthorized", "{}")).await, WeatherError::Unauthorized);
        assert_eq!(
            current_error(reply(404, "Not Found", r#"{"cod":"404","message":"city not found"}"#)).await,
            WeatherError::NotFound
        );
        assert_eq!(
            current_error(reply(429, "Too Many Requests", "")).await,
            WeatherError::RateLimited
        );
    }

    #[tokio::test]
    async fn provider_code_500000_is_misconfiguration() {
        let numeric = reply(500, "Internal Server Error", r#"{"cod":500000,"message":"x"}"#);
        assert_eq!(current_error(numeric).await, WeatherError::ProviderMisconfigured);

        let stringly = reply(400, "Bad Request", r#"{"cod":"500000"}"#);
        assert_eq!(current_error(stringly).await, WeatherError::ProviderMisconfigured);
    }

    #[tokio::test]
    async fn other_failures_carry_provider_message_or_status() {
        let with_message = reply(400, "Bad Request", r#"{"cod":"400","message":"wrong latitude"}"#);
        assert_eq!(
            current_error(with_message).await,
            WeatherError::Unknown("wrong latitude".into())
        );

        let unparseable = reply(503, "Service Unavailable", "<html>down</html>");
        assert_eq!(
            current_error(unparseable).await,
            WeatherError::Unknown("HTTP 503 Service Unavailable".into())
        );
    }

    #[tokio::test]
    async fn success_without_main_or_conditions_is_malformed() {
        let no_main = json!({ "name": "Kyiv", "weather": [{ "id": 800 }] }).to_string();
        assert_eq!(current_error(reply(200, "OK", &no_main)).await, WeatherError::MalformedResponse);

        let no_conditions = json!({
            "name": "Kyiv",
            "main": { "temp": 1.0, "feels_like": 1.0, "humidity": 1, "pressure": 1000 },
            "weather": []
        })
        .to_string();
        assert_eq!(
            current_error(reply(200, "OK", &no_conditions)).await,
            WeatherError::MalformedResponse
        );

        assert_eq!(
            current_error(reply(200, "OK", "not json")).await.kind(),
            ErrorKind::MalformedResponse
        );
    }

    #[tokio::test]
    async fn transport_errors_pass_through() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .returning(|_, _| Err(WeatherError::Unknown("connection refused".into())));

        let provider = OpenWeatherProvider::with_transport(Some("KEY".into()), transport);
        let err = provider
            .current(&WeatherQuery::city("Kyiv"), UnitSystem::Metric)
            .await
            .unwrap_err();

        assert_eq!(err, WeatherError::Unknown("connection refused".into()));
    }

    #[test]
    fn optional_sections_may_be_absent() {
        let body = json!({
            "name": "Nowhere",
            "main": { "temp": -3.0, "feels_like": -8.0, "humidity": 90, "pressure": 990 },
            "weather": [{ "main": "Snow", "description": "light snow" }]
        })
        .to_string();

        let result = parse_current(&body, UnitSystem::Metric, Utc::now()).unwrap();

        assert_eq!(result.condition_code, None);
        assert_eq!(result.country, None);
        assert_eq!(result.wind_speed, 0.0);
        assert_eq!(result.visibility_m, None);
        assert_eq!(result.sunrise, None);
        assert_eq!(result.cloudiness_pct, None);
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let provider = OpenWeatherProvider::new(Some("SECRET".into()));
        let rendered = format!("{provider:?}");

        assert!(!rendered.contains("SECRET"));
        assert!(rendered.contains("<redacted>"));
    }
}
