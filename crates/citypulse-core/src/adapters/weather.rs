use std::sync::Arc;

use serde::Deserialize;
use urlencoding::encode;

use crate::config::CityPulseConfig;
use crate::domain::{CityName, UtcDateTime, WeatherReading};
use crate::error::FetchError;
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider_policy::ProviderPolicy;
use crate::retry::{Backoff, RetryClient};
use crate::throttling::RateGate;

/// Current-conditions adapter. Weather is mandatory, so there is no fallback.
#[derive(Clone)]
pub struct WeatherAdapter {
    client: RetryClient,
    base_url: String,
    api_key: String,
    policy: ProviderPolicy,
}

impl WeatherAdapter {
    pub fn new(http: Arc<dyn HttpClient>, config: &CityPulseConfig) -> Self {
        let policy = config.weather_policy.clone();
        Self {
            client: RetryClient::new(http).with_rate_gate(RateGate::from_policy(&policy)),
            base_url: config.weather_base_url.trim_end_matches('/').to_owned(),
            api_key: config.weather_api_key.clone().unwrap_or_default(),
            policy,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.client = self.client.with_backoff(backoff);
        self
    }

    pub fn endpoint(&self, city: &CityName) -> String {
        format!(
            "{}/weather?q={}&appid={}&units=metric",
            self.base_url,
            encode(city.as_str()),
            encode(&self.api_key)
        )
    }

    pub async fn fetch(&self, city: &CityName) -> Result<WeatherReading, FetchError> {
        let payload: OwmCurrentResponse = self
            .client
            .get_json(HttpRequest::get(self.endpoint(city)), &self.policy)
            .await?;

        Ok(payload.into_reading())
    }
}

#[derive(Debug, Deserialize)]
struct OwmCurrentResponse {
    main: OwmMain,
    #[serde(default)]
    wind: OwmWind,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    #[serde(default)]
    sys: OwmSys,
    dt: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwmWind {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    description: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OwmSys {
    country: Option<String>,
}

impl OwmCurrentResponse {
    fn into_reading(self) -> WeatherReading {
        let condition = self.weather.into_iter().next();
        let (description, icon) = match condition {
            Some(condition) => (condition.description, condition.icon),
            None => (None, None),
        };

        WeatherReading {
            temperature_c: self.main.temp,
            feels_like_c: self.main.feels_like.unwrap_or(self.main.temp),
            condition: description.unwrap_or_else(|| String::from("unknown")),
            icon,
            humidity_pct: self.main.humidity.unwrap_or(0.0).clamp(0.0, 100.0).round() as u8,
            wind_speed_ms: self.wind.speed.unwrap_or(0.0).max(0.0),
            pressure_hpa: self.main.pressure.unwrap_or(0.0),
            country: self.sys.country,
            observed_at: self
                .dt
                .and_then(|seconds| UtcDateTime::from_unix_seconds(seconds).ok()),
        }
    }
}
