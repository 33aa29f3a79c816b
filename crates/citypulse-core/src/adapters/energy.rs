use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};
use urlencoding::encode;

use crate::catalog::CityCatalog;
use crate::circuit_breaker::CircuitBreaker;
use crate::config::CityPulseConfig;
use crate::derive::{city_consumption_gwh, peak_mw, renewable_pct, usage_mw};
use crate::domain::{EnergyReading, SourceReport};
use crate::error::{FetchError, FetchErrorKind};
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider_policy::ProviderPolicy;
use crate::retry::{Backoff, RetryClient};
use crate::throttling::RateGate;
use crate::SourceId;

/// Load reported when neither a city population nor a regional total is known.
pub const FALLBACK_USAGE_MW: u32 = 1200;

pub const LIVE_DATA_SOURCE: &str = "CEA API";
pub const ESTIMATED_DATA_SOURCE: &str = "Estimated based on state averages";

const SALES_PATH: &str = "/electrical-energy-sales";
const PER_CAPITA_PATH: &str = "/per-capita-consumption";

/// Regional energy lookups. Never fails: anything missing is estimated.
///
/// As with traffic, a tripped breaker is shared by every later search for 60s.
#[derive(Clone)]
pub struct EnergyAdapter {
    catalog: Arc<CityCatalog>,
    client: RetryClient,
    circuit_breaker: Arc<CircuitBreaker>,
    base_url: String,
    fast_fail: bool,
    policy: ProviderPolicy,
}

/// What the two regional endpoints returned, if anything.
#[derive(Debug, Clone, Default, PartialEq)]
struct RegionalFigures {
    sales_total_gwh: Option<f64>,
    per_capita_kwh: Option<f64>,
    failure: Option<&'static str>,
}

impl EnergyAdapter {
    pub fn new(
        http: Arc<dyn HttpClient>,
        config: &CityPulseConfig,
        catalog: Arc<CityCatalog>,
    ) -> Self {
        let policy = config.energy_policy.clone();
        Self {
            catalog,
            client: RetryClient::new(http).with_rate_gate(RateGate::from_policy(&policy)),
            circuit_breaker: Arc::new(CircuitBreaker::default()),
            base_url: config.energy_base_url.trim_end_matches('/').to_owned(),
            fast_fail: config.energy_fast_fail,
            policy,
        }
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.client = self.client.with_backoff(backoff);
        self
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// Average and peak load for `city`, keyed regionally by `region`.
    ///
    /// `renewable_jitter` (0..15) spreads the estimated renewable share.
    pub async fn fetch(
        &self,
        city: &str,
        region: &str,
        renewable_jitter: u8,
    ) -> (EnergyReading, SourceReport) {
        let figures = self.regional_figures(region).await;

        let per_capita = figures
            .per_capita_kwh
            .unwrap_or_else(|| self.catalog.per_capita_kwh(region));
        let city_consumption = self
            .catalog
            .population_thousands(city)
            .map(|population| city_consumption_gwh(per_capita, population));

        let usage = city_consumption
            .or(figures.sales_total_gwh)
            .map_or(FALLBACK_USAGE_MW, usage_mw);

        let estimated = figures.failure.is_some() || figures.per_capita_kwh.is_none();
        let reading = EnergyReading {
            usage_mw: usage,
            renewable_pct: renewable_pct(renewable_jitter),
            peak_mw: peak_mw(usage),
            region: region.to_owned(),
            per_capita_kwh: Some(per_capita),
            city_consumption_gwh: city_consumption,
            data_source: if estimated {
                ESTIMATED_DATA_SOURCE
            } else {
                LIVE_DATA_SOURCE
            }
            .to_owned(),
            estimated,
        };

        let report = match figures.failure {
            Some(reason) => SourceReport::estimated(SourceId::Energy, reason),
            None if estimated => SourceReport::estimated(SourceId::Energy, "incomplete_payload"),
            None => SourceReport::live(SourceId::Energy),
        };

        (reading, report)
    }

    async fn regional_figures(&self, region: &str) -> RegionalFigures {
        if self.fast_fail {
            debug!(region, "energy fast fail enabled, estimating locally");
            return RegionalFigures {
                failure: Some("fast_fail"),
                ..RegionalFigures::default()
            };
        }
        if !self.circuit_breaker.allow_request() {
            return RegionalFigures {
                failure: Some("circuit_open"),
                ..RegionalFigures::default()
            };
        }

        let (sales, per_capita) = tokio::join!(
            self.get::<SalesPayload>(SALES_PATH, region),
            self.get::<PerCapitaPayload>(PER_CAPITA_PATH, region),
        );

        let mut figures = RegionalFigures::default();
        match sales {
            Ok(payload) => figures.sales_total_gwh = payload.total,
            Err(error) => figures.failure = Some(error.code()),
        }
        match per_capita {
            Ok(payload) => figures.per_capita_kwh = payload.value.filter(|value| *value > 0.0),
            Err(error) => figures.failure = figures.failure.or(Some(error.code())),
        }
        figures
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        region: &str,
    ) -> Result<T, FetchError> {
        let url = format!("{}{}?state={}", self.base_url, path, encode(region));
        let result = self
            .client
            .get_json::<T>(HttpRequest::get(url), &self.policy)
            .await;

        match &result {
            Ok(_) => self.circuit_breaker.record_success(),
            Err(error) => {
                warn!(region, path, code = error.code(), %error, "energy endpoint unavailable, estimating");
                if error.kind() == FetchErrorKind::Blocked {
                    self.circuit_breaker.trip();
                } else {
                    self.circuit_breaker.record_failure();
                }
            }
        }
        result
    }
}

#[derive(Debug, Deserialize)]
struct SalesPayload {
    #[serde(alias = "totalSales", alias = "energySales", alias = "value")]
    total: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PerCapitaPayload {
    #[serde(alias = "consumption", alias = "kwh")]
    value: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitState;
    use crate::domain::SourceStatus;
    use crate::http_client::HttpError;
    use crate::testing::RoutedHttpClient;

    fn adapter(http: Arc<RoutedHttpClient>, fast_fail: bool) -> EnergyAdapter {
        let config = CityPulseConfig {
            energy_base_url: String::from("https://energy.test/api"),
            ..CityPulseConfig::default()
        }
        .with_energy_fast_fail(fast_fail);
        EnergyAdapter::new(http, &config, Arc::new(CityCatalog::default()))
    }

    #[tokio::test]
    async fn fast_fail_estimates_without_network() {
        let http = RoutedHttpClient::new().shared();

        let (reading, report) = adapter(http.clone(), true)
            .fetch("Mumbai", "Maharashtra", 5)
            .await;

        assert_eq!(reading.usage_mw, 1709);
        assert_eq!(reading.peak_mw, 2051);
        assert_eq!(reading.renewable_pct, 40);
        assert_eq!(reading.per_capita_kwh, Some(1200.0));
        assert_eq!(reading.data_source, ESTIMATED_DATA_SOURCE);
        assert!(reading.estimated);
        assert_eq!(report.reason.as_deref(), Some("fast_fail"));
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn unknown_city_and_region_use_fixed_usage() {
        let http = RoutedHttpClient::new().shared();

        let (reading, _) = adapter(http, true)
            .fetch("UnknownVille", "UnknownVille", 0)
            .await;

        assert_eq!(reading.usage_mw, FALLBACK_USAGE_MW);
        assert_eq!(reading.peak_mw, 1440);
        assert_eq!(reading.per_capita_kwh, Some(1000.0));
        assert_eq!(reading.city_consumption_gwh, None);
    }

    #[tokio::test]
    async fn live_figures_drive_usage() {
        let http = RoutedHttpClient::new()
            .json("electrical-energy-sales", r#"{"state": "Delhi", "totalSales": 30000}"#)
            .json("per-capita-consumption", r#"{"value": 1600, "unit": "kWh"}"#)
            .shared();

        let (reading, report) = adapter(http.clone(), false)
            .fetch("Delhi", "Delhi", 0)
            .await;

        assert_eq!(reading.per_capita_kwh, Some(1600.0));
        assert_eq!(reading.usage_mw, usage_mw(city_consumption_gwh(1600.0, 11_034.0)));
        assert_eq!(reading.data_source, LIVE_DATA_SOURCE);
        assert!(report.is_live());
        assert!(http.requests()[0].contains("?state=Delhi"));
    }

    #[tokio::test]
    async fn sales_total_is_used_when_population_is_unknown() {
        let http = RoutedHttpClient::new()
            .json("electrical-energy-sales", r#"{"total": 10000}"#)
            .json("per-capita-consumption", r#"{"kwh": 900}"#)
            .shared();

        let (reading, _) = adapter(http, false).fetch("Shillong", "Meghalaya", 0).await;

        assert_eq!(reading.usage_mw, 1142);
        assert_eq!(reading.city_consumption_gwh, None);
    }

    #[tokio::test]
    async fn blocked_endpoints_fall_back_and_open_circuit() {
        let http = RoutedHttpClient::new()
            .route("energy.test", Err(HttpError::blocked("cors")))
            .shared();
        let adapter = adapter(http.clone(), false);

        let (reading, report) = adapter.fetch("Pune", "Maharashtra", 0).await;

        assert!(reading.estimated);
        assert_eq!(reading.per_capita_kwh, Some(1200.0));
        assert_eq!(report.status, SourceStatus::Estimated);
        assert_eq!(report.reason.as_deref(), Some("fetch.blocked"));
        assert_eq!(adapter.circuit_breaker().state(), CircuitState::Open);

        let calls = http.requests().len();
        let (_, again) = adapter.fetch("Pune", "Maharashtra", 0).await;
        assert_eq!(again.reason.as_deref(), Some("circuit_open"));
        assert_eq!(http.requests().len(), calls);
    }
}
