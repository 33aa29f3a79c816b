use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::provider_policy::ProviderPolicy;

pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const DEFAULT_AIR_QUALITY_URL: &str = "https://air-quality-api.open-meteo.com/v1/air-quality";
pub const DEFAULT_TRAFFIC_BASE_URL: &str = "https://api.tomtom.com/traffic/services/4";
pub const DEFAULT_TRAFFIC_INCIDENTS_URL: &str =
    "https://api.tomtom.com/traffic/services/5/incidentDetails";
pub const DEFAULT_ENERGY_BASE_URL: &str = "https://cea.nic.in/api";
pub const DEFAULT_GEOCODE_COUNTRY: &str = "India";

/// Endpoints, credentials and per-provider policies for one aggregator.
///
/// # Environment Variables
///
/// | Setting | Primary Env Var | Fallback Env Var |
/// |---------|-----------------|------------------|
/// | Weather key | `CITYPULSE_WEATHER_API_KEY` | `VITE_WEATHER_API_KEY` |
/// | Weather base URL | `CITYPULSE_WEATHER_API_BASE_URL` | `VITE_WEATHER_API_BASE_URL` |
/// | Traffic key | `CITYPULSE_TRAFFIC_API_KEY` | `VITE_TRAFFIC_API_KEY` |
/// | Traffic base URL | `CITYPULSE_TRAFFIC_API_BASE_URL` | `VITE_TRAFFIC_API_BASE_URL` |
/// | Incidents URL | `CITYPULSE_TRAFFIC_INCIDENTS_URL` | - |
/// | Geocoding URL | `CITYPULSE_GEOCODING_URL` | - |
/// | Air quality URL | `CITYPULSE_AIR_QUALITY_URL` | - |
/// | Energy base URL | `CITYPULSE_ENERGY_API_BASE_URL` | - |
/// | Energy fast fail | `CITYPULSE_ENERGY_FAST_FAIL` | - |
/// | Geocoding country | `CITYPULSE_DEFAULT_COUNTRY` | - |
/// | Catalog file | `CITYPULSE_CATALOG` | - |
/// | Timeouts (ms) | `CITYPULSE_{WEATHER,AIR_QUALITY,TRAFFIC,ENERGY}_TIMEOUT_MS` | - |
#[derive(Debug, Clone, PartialEq)]
pub struct CityPulseConfig {
    pub weather_base_url: String,
    pub weather_api_key: Option<String>,
    pub geocoding_url: String,
    pub air_quality_url: String,
    pub geocode_country: String,
    pub traffic_base_url: String,
    pub traffic_incidents_url: String,
    pub traffic_api_key: Option<String>,
    pub energy_base_url: String,
    /// Skip the regional energy endpoints and estimate locally.
    pub energy_fast_fail: bool,
    pub catalog_path: Option<PathBuf>,
    pub weather_policy: ProviderPolicy,
    pub air_quality_policy: ProviderPolicy,
    pub traffic_flow_policy: ProviderPolicy,
    pub traffic_incidents_policy: ProviderPolicy,
    pub energy_policy: ProviderPolicy,
}

impl Default for CityPulseConfig {
    fn default() -> Self {
        Self {
            weather_base_url: DEFAULT_WEATHER_BASE_URL.to_owned(),
            weather_api_key: None,
            geocoding_url: DEFAULT_GEOCODING_URL.to_owned(),
            air_quality_url: DEFAULT_AIR_QUALITY_URL.to_owned(),
            geocode_country: DEFAULT_GEOCODE_COUNTRY.to_owned(),
            traffic_base_url: DEFAULT_TRAFFIC_BASE_URL.to_owned(),
            traffic_incidents_url: DEFAULT_TRAFFIC_INCIDENTS_URL.to_owned(),
            traffic_api_key: None,
            energy_base_url: DEFAULT_ENERGY_BASE_URL.to_owned(),
            energy_fast_fail: true,
            catalog_path: None,
            weather_policy: ProviderPolicy::weather_default(),
            air_quality_policy: ProviderPolicy::air_quality_default(),
            traffic_flow_policy: ProviderPolicy::traffic_flow_default(),
            traffic_incidents_policy: ProviderPolicy::traffic_incidents_default(),
            energy_policy: ProviderPolicy::energy_default(),
        }
    }
}

impl CityPulseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from any key/value source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let get_either = |primary: &str, fallback: &str| get(primary).or_else(|| get(fallback));

        let mut config = Self::default();

        if let Some(value) = get_either("CITYPULSE_WEATHER_API_BASE_URL", "VITE_WEATHER_API_BASE_URL")
        {
            config.weather_base_url = value;
        }
        config.weather_api_key = get_either("CITYPULSE_WEATHER_API_KEY", "VITE_WEATHER_API_KEY");

        if let Some(value) = get_either("CITYPULSE_TRAFFIC_API_BASE_URL", "VITE_TRAFFIC_API_BASE_URL")
        {
            config.traffic_base_url = value;
        }
        config.traffic_api_key = get_either("CITYPULSE_TRAFFIC_API_KEY", "VITE_TRAFFIC_API_KEY");

        if let Some(value) = get("CITYPULSE_TRAFFIC_INCIDENTS_URL") {
            config.traffic_incidents_url = value;
        }
        if let Some(value) = get("CITYPULSE_GEOCODING_URL") {
            config.geocoding_url = value;
        }
        if let Some(value) = get("CITYPULSE_AIR_QUALITY_URL") {
            config.air_quality_url = value;
        }
        if let Some(value) = get("CITYPULSE_ENERGY_API_BASE_URL") {
            config.energy_base_url = value;
        }
        if let Some(value) = get("CITYPULSE_DEFAULT_COUNTRY") {
            config.geocode_country = value.trim().to_owned();
        }
        if let Some(value) = get("CITYPULSE_CATALOG") {
            config.catalog_path = Some(PathBuf::from(value));
        }
        if let Some(value) = get("CITYPULSE_ENERGY_FAST_FAIL") {
            config.energy_fast_fail = parse_bool("CITYPULSE_ENERGY_FAST_FAIL", &value)?;
        }

        if let Some(timeout) = read_timeout(&get, "CITYPULSE_WEATHER_TIMEOUT_MS")? {
            config.weather_policy = config.weather_policy.with_timeout(timeout);
        }
        if let Some(timeout) = read_timeout(&get, "CITYPULSE_AIR_QUALITY_TIMEOUT_MS")? {
            config.air_quality_policy = config.air_quality_policy.with_timeout(timeout);
        }
        if let Some(timeout) = read_timeout(&get, "CITYPULSE_TRAFFIC_TIMEOUT_MS")? {
            config.traffic_flow_policy = config.traffic_flow_policy.with_timeout(timeout);
            config.traffic_incidents_policy = config.traffic_incidents_policy.with_timeout(timeout);
        }
        if let Some(timeout) = read_timeout(&get, "CITYPULSE_ENERGY_TIMEOUT_MS")? {
            config.energy_policy = config.energy_policy.with_timeout(timeout);
        }

        Ok(config)
    }

    pub fn with_weather_api_key(mut self, key: impl Into<String>) -> Self {
        self.weather_api_key = Some(key.into());
        self
    }

    pub fn with_traffic_api_key(mut self, key: impl Into<String>) -> Self {
        self.traffic_api_key = Some(key.into());
        self
    }

    pub fn with_energy_fast_fail(mut self, fast_fail: bool) -> Self {
        self.energy_fast_fail = fast_fail;
        self
    }

    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }
}

fn read_timeout<G>(get: &G, name: &str) -> Result<Option<Duration>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidNumber {
                    name: name.to_owned(),
                    value,
                })
        })
        .transpose()
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            name: name.to_owned(),
            value: value.to_owned(),
        }),
    }
}
