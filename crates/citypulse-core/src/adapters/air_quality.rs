use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;
use urlencoding::encode;

use crate::config::CityPulseConfig;
use crate::derive::aqi_status;
use crate::domain::{AirQualityReading, CityName, Coordinates, GeoLocation, Pollutant, SourceReport};
use crate::error::FetchError;
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider_policy::ProviderPolicy;
use crate::retry::{Backoff, RetryClient};
use crate::throttling::RateGate;
use crate::SourceId;

const CURRENT_FIELDS: &str =
    "us_aqi,pm10,pm2_5,carbon_monoxide,nitrogen_dioxide,sulphur_dioxide,ozone,dust";
const CONCENTRATION_UNITS: &str = "μg/m³";

/// Two-step adapter: geocode the city, then read pollutants at that point.
#[derive(Clone)]
pub struct AirQualityAdapter {
    client: RetryClient,
    geocoding_url: String,
    air_quality_url: String,
    country: String,
    policy: ProviderPolicy,
}

impl AirQualityAdapter {
    pub fn new(http: Arc<dyn HttpClient>, config: &CityPulseConfig) -> Self {
        let policy = config.air_quality_policy.clone();
        Self {
            client: RetryClient::new(http).with_rate_gate(RateGate::from_policy(&policy)),
            geocoding_url: config.geocoding_url.clone(),
            air_quality_url: config.air_quality_url.clone(),
            country: config.geocode_country.clone(),
            policy,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.client = self.client.with_backoff(backoff);
        self
    }

    /// Resolves the city to a single location; zero matches is `NotFound`.
    pub async fn geocode(&self, city: &CityName) -> Result<GeoLocation, FetchError> {
        let query = if self.country.is_empty() {
            city.as_str().to_owned()
        } else {
            format!("{}, {}", city, self.country)
        };
        let url = format!(
            "{}?name={}&count=1&language=en&format=json",
            self.geocoding_url,
            encode(&query)
        );

        let payload: GeocodingResponse = self
            .client
            .get_json(HttpRequest::get(url), &self.policy)
            .await?;

        let hit = payload
            .results
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::not_found(format!("city \"{city}\" not found")))?;

        Ok(GeoLocation {
            name: hit.name.unwrap_or_else(|| city.as_str().to_owned()),
            country: hit.country,
            admin1: hit.admin1.filter(|admin1| !admin1.trim().is_empty()),
            coordinates: Coordinates::new(hit.latitude, hit.longitude),
        })
    }

    /// Current AQI and pollutant concentrations; null readings are dropped.
    pub async fn current(&self, at: Coordinates) -> Result<(u32, Vec<Pollutant>), FetchError> {
        let url = format!(
            "{}?latitude={}&longitude={}&current={}&timezone=auto",
            self.air_quality_url, at.lat, at.lon, CURRENT_FIELDS
        );

        let payload: AirQualityResponse = self
            .client
            .get_json(HttpRequest::get(url), &self.policy)
            .await?;
        let current = payload
            .current
            .ok_or_else(|| FetchError::unknown("no air quality data available"))?;

        let aqi = current.us_aqi.map_or(0, |aqi| aqi.max(0.0).round() as u32);
        let pollutants = [
            ("PM2.5", current.pm2_5),
            ("PM10", current.pm10),
            ("O3", current.ozone),
            ("NO2", current.nitrogen_dioxide),
            ("SO2", current.sulphur_dioxide),
            ("CO", current.carbon_monoxide),
            ("Dust", current.dust),
        ]
        .into_iter()
        .filter_map(|(code, value)| {
            value.map(|value| Pollutant {
                code: code.to_owned(),
                value,
                units: CONCENTRATION_UNITS.to_owned(),
            })
        })
        .collect();

        Ok((aqi, pollutants))
    }

    pub async fn fetch(&self, city: &CityName) -> Result<AirQualityReading, FetchError> {
        let location = self.geocode(city).await?;
        let (aqi, pollutants) = self.current(location.coordinates).await?;

        let concentration = |code: &str| {
            pollutants
                .iter()
                .find(|pollutant| pollutant.code == code)
                .map_or(0.0, |pollutant| pollutant.value)
        };

        Ok(AirQualityReading {
            aqi,
            status: aqi_status(aqi),
            pm25: concentration("PM2.5"),
            pm10: concentration("PM10"),
            source_region: location.admin1.clone(),
            pollutants,
            location: Some(location),
            estimated: false,
        })
    }

    /// Never fails: any error is logged and replaced with the fixed fallback.
    pub async fn fetch_or_fallback(&self, city: &CityName) -> (AirQualityReading, SourceReport) {
        match self.fetch(city).await {
            Ok(reading) => (reading, SourceReport::live(SourceId::AirQuality)),
            Err(error) => {
                warn!(%city, code = error.code(), %error, "air quality unavailable, using fallback");
                (
                    AirQualityReading::fallback(),
                    SourceReport::estimated(SourceId::AirQuality, error.code()),
                )
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingHit>,
}

#[derive(Debug, Deserialize)]
struct GeocodingHit {
    latitude: f64,
    longitude: f64,
    name: Option<String>,
    country: Option<String>,
    admin1: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AirQualityResponse {
    current: Option<CurrentAirQuality>,
}

#[derive(Debug, Deserialize)]
struct CurrentAirQuality {
    us_aqi: Option<f64>,
    pm2_5: Option<f64>,
    pm10: Option<f64>,
    ozone: Option<f64>,
    nitrogen_dioxide: Option<f64>,
    sulphur_dioxide: Option<f64>,
    carbon_monoxide: Option<f64>,
    dust: Option<f64>,
}
