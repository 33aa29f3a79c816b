//! Fan-out of one city query to every provider adapter.
//!
//! | Step | Sources | Failure policy |
//! |------|---------|----------------|
//! | 1 | weather, air quality, traffic flow, traffic incidents (concurrent) | settle all |
//! | 2 | weather | fatal, the only one |
//! | 3 | air quality, then energy keyed by the resolved region | fixed fallback |
//! | 4 | traffic flow and incidents | city pattern, then default |
//! | 5 | waste | never fails |

use std::sync::{Arc, Mutex, PoisonError};

use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::adapters::{
    AirQualityAdapter, EnergyAdapter, TrafficAdapter, WasteAdapter, WasteNoise, WeatherAdapter,
    DEFAULT_INCIDENTS,
};
use crate::catalog::CityCatalog;
use crate::clock::{Clock, SystemClock};
use crate::config::CityPulseConfig;
use crate::domain::{
    AirQualityReading, CityName, CitySnapshot, EnergyReading, SnapshotParts, SourceReport,
};
use crate::error::{AggregationError, CatalogError};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::retry::Backoff;
use crate::{SourceId, UtcDateTime};

/// Reason attached to `AggregationError::Failed` when the mandatory source is down.
pub const WEATHER_UNAVAILABLE: &str = "weather unavailable";

/// Random inputs for one aggregation, drawn once per search.
#[derive(Debug, Clone, Copy)]
struct SearchNoise {
    renewable_jitter: u8,
    waste: WasteNoise,
}

/// Builds one [`CitySnapshot`] per city query.
pub struct Aggregator {
    catalog: Arc<CityCatalog>,
    weather: WeatherAdapter,
    air_quality: AirQualityAdapter,
    traffic: TrafficAdapter,
    energy: EnergyAdapter,
    waste: WasteAdapter,
    clock: Arc<dyn Clock>,
    rng: Mutex<fastrand::Rng>,
}

/// Builder for [`Aggregator`].
///
/// Everything not set explicitly comes from the configuration: the catalog is
/// loaded from `catalog_path` when present and the built-in tables are used
/// otherwise.
///
/// # Example
///
/// ```rust,ignore
/// use citypulse_core::{AggregatorBuilder, CityPulseConfig};
///
/// let aggregator = AggregatorBuilder::new(CityPulseConfig::from_env()?)
///     .with_seed(7)
///     .build()?;
/// let snapshot = aggregator.aggregate("Mumbai").await?;
/// ```
pub struct AggregatorBuilder {
    config: CityPulseConfig,
    http: Option<Arc<dyn HttpClient>>,
    catalog: Option<Arc<CityCatalog>>,
    clock: Option<Arc<dyn Clock>>,
    seed: Option<u64>,
    backoff: Option<Backoff>,
}

impl AggregatorBuilder {
    pub fn new(config: CityPulseConfig) -> Self {
        Self {
            config,
            http: None,
            catalog: None,
            clock: None,
            seed: None,
            backoff: None,
        }
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_catalog(mut self, catalog: CityCatalog) -> Self {
        self.catalog = Some(Arc::new(catalog));
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Makes the estimated figures reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = Some(backoff);
        self
    }

    pub fn build(self) -> Result<Aggregator, CatalogError> {
        let catalog = match (self.catalog, &self.config.catalog_path) {
            (Some(catalog), _) => catalog,
            (None, Some(path)) => Arc::new(CityCatalog::load(path)?),
            (None, None) => Arc::new(CityCatalog::default()),
        };
        let http = self
            .http
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::default()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let backoff = self.backoff.unwrap_or_default();
        let config = &self.config;

        Ok(Aggregator {
            weather: WeatherAdapter::new(Arc::clone(&http), config).with_backoff(backoff),
            air_quality: AirQualityAdapter::new(Arc::clone(&http), config).with_backoff(backoff),
            traffic: TrafficAdapter::new(Arc::clone(&http), config, Arc::clone(&catalog))
                .with_backoff(backoff),
            energy: EnergyAdapter::new(http, config, Arc::clone(&catalog)).with_backoff(backoff),
            waste: WasteAdapter::new(Arc::clone(&catalog), Arc::clone(&clock)),
            catalog,
            clock,
            rng: Mutex::new(self.seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed)),
        })
    }
}

impl Aggregator {
    pub fn builder(config: CityPulseConfig) -> AggregatorBuilder {
        AggregatorBuilder::new(config)
    }

    pub fn catalog(&self) -> &CityCatalog {
        &self.catalog
    }

    /// Validates the free-text query, then aggregates it.
    pub async fn aggregate(&self, city: &str) -> Result<CitySnapshot, AggregationError> {
        let city = CityName::parse(city)?;
        self.aggregate_city(&city).await
    }

    /// Settles every source and fails only when weather does.
    #[instrument(skip_all, fields(city = %city))]
    pub async fn aggregate_city(&self, city: &CityName) -> Result<CitySnapshot, AggregationError> {
        let started = Instant::now();
        let noise = self.draw_noise();

        let (weather, (air_quality, energy), flow, incidents) = tokio::join!(
            self.weather.fetch(city),
            self.air_quality_then_energy(city, noise.renewable_jitter),
            self.traffic.fetch_flow(city),
            self.traffic.fetch_incidents(city),
        );

        let weather = match weather {
            Ok(reading) => reading,
            Err(cause) => {
                warn!(code = cause.code(), error = %cause, "weather unavailable, aborting aggregation");
                return Err(AggregationError::Failed {
                    city: city.to_string(),
                    reason: String::from(WEATHER_UNAVAILABLE),
                    cause,
                });
            }
        };
        let (air_quality, air_quality_report) = air_quality;
        let (energy, energy_report) = energy;

        let (flow, flow_report) = match flow {
            Ok(flow) => (flow, SourceReport::live(SourceId::TrafficFlow)),
            Err(error) => {
                warn!(code = error.code(), %error, "traffic flow unavailable, using city pattern");
                (
                    self.traffic.fallback_flow(city),
                    SourceReport::estimated(SourceId::TrafficFlow, error.code()),
                )
            }
        };

        let (incidents_count, incidents_report) = match incidents {
            Ok(count) => (count, SourceReport::live(SourceId::TrafficIncidents)),
            Err(error) => {
                warn!(code = error.code(), %error, "traffic incidents unavailable, using pattern count");
                // Pattern counts only accompany a fallback flow; a live flow gets the default.
                let count = flow.pattern_incidents.unwrap_or(DEFAULT_INCIDENTS);
                (
                    count,
                    SourceReport::estimated(SourceId::TrafficIncidents, error.code()),
                )
            }
        };

        let mut traffic = flow.into_reading(incidents_count);
        traffic.estimated |= !incidents_report.is_live();

        let (waste, waste_report) = self.waste.fetch(city.as_str(), noise.waste);

        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let snapshot = CitySnapshot::new(
            city.as_str(),
            UtcDateTime::from(self.clock.now()),
            latency_ms,
            SnapshotParts {
                weather,
                air_quality,
                traffic,
                energy,
                waste,
                sources: vec![
                    SourceReport::live(SourceId::Weather),
                    air_quality_report,
                    flow_report,
                    incidents_report,
                    energy_report,
                    waste_report,
                ],
            },
        );

        let estimated = snapshot
            .sources()
            .iter()
            .filter(|report| !report.is_live())
            .count();
        info!(
            search_id = %snapshot.search_id(),
            latency_ms,
            estimated_sources = estimated,
            "aggregation complete"
        );
        Ok(snapshot)
    }

    /// Energy is keyed by the region, which may come from the geocoder.
    async fn air_quality_then_energy(
        &self,
        city: &CityName,
        renewable_jitter: u8,
    ) -> (
        (AirQualityReading, SourceReport),
        (EnergyReading, SourceReport),
    ) {
        let (air_quality, air_quality_report) = self.air_quality.fetch_or_fallback(city).await;
        let region = self.resolve_region(city, air_quality.source_region.as_deref());
        let energy = self
            .energy
            .fetch(city.as_str(), &region, renewable_jitter)
            .await;
        ((air_quality, air_quality_report), energy)
    }

    /// Catalog table first, then the geocoder's region hint, then the city itself.
    pub fn resolve_region(&self, city: &CityName, hint: Option<&str>) -> String {
        self.catalog
            .region(city.as_str())
            .or(hint)
            .unwrap_or(city.as_str())
            .to_owned()
    }

    fn draw_noise(&self) -> SearchNoise {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        SearchNoise {
            renewable_jitter: rng.u8(0..15),
            waste: WasteNoise {
                recycling_jitter: rng.u8(0..10),
                bin_fill: rng.f64(),
            },
        }
    }
}
