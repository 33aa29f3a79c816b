//! # CityPulse Core
//!
//! Aggregation core for the CityPulse city dashboard.
//!
//! ## Overview
//!
//! One city query fans out to several independent, unreliable providers and
//! comes back as a single immutable [`CitySnapshot`]:
//!
//! - **Weather** is mandatory; its failure fails the whole aggregation
//! - **Air quality** geocodes the city, then reads pollutants at that point
//! - **Traffic** reads flow and incidents for cities in the catalog
//! - **Energy** estimates load from regional per-capita consumption
//! - **Waste** is computed locally from population and time of day
//!
//! Every source except weather substitutes a deterministic fallback when it
//! fails, and the snapshot records which sources were live.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | One adapter per provider |
//! | [`aggregator`] | Settle-all fan-out and snapshot assembly |
//! | [`catalog`] | Injectable lookup tables (coordinates, populations, regions) |
//! | [`circuit_breaker`] | Skips providers known to be unreachable |
//! | [`clock`] | Wall-clock seam for time-of-day estimates |
//! | [`config`] | Endpoints, keys and policies from the environment |
//! | [`derive`] | Pure numeric derivations |
//! | [`domain`] | Readings, snapshot and validated city name |
//! | [`error`] | Error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`provider_policy`] | Attempts, timeouts and quotas per provider |
//! | [`retry`] | Timeout and backoff contract for every request |
//! | [`session`] | Last-search-wins holder for the visible snapshot |
//! | [`source`] | Source identifiers |
//! | [`throttling`] | Outgoing rate limiting |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use citypulse_core::{Aggregator, CityPulseConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let aggregator = Aggregator::builder(CityPulseConfig::from_env()?).build()?;
//!     let snapshot = aggregator.aggregate("Mumbai").await?;
//!
//!     println!(
//!         "{}: {:.1}°C, AQI {}, congestion {}%",
//!         snapshot.city_name(),
//!         snapshot.weather().temperature_c,
//!         snapshot.air_quality().aqi,
//!         snapshot.traffic().congestion_level_pct,
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / Session  │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Aggregator    │────▶│  City Catalog    │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Provider        │────▶│ Circuit Breaker  │
//! │ Adapters        │     └──────────────────┘
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Retry Client    │────▶│ HTTP Client      │
//! │ (+ rate gate)   │     │ (reqwest)        │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use citypulse_core::{AggregationError, FetchErrorKind};
//!
//! fn describe(error: &AggregationError) -> String {
//!     match error {
//!         AggregationError::Failed { cause, .. } if cause.kind() == FetchErrorKind::Timeout => {
//!             String::from("weather provider timed out")
//!         }
//!         AggregationError::Failed { city, .. } => format!("no data for {city}"),
//!         AggregationError::InvalidCity(reason) => reason.to_string(),
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - API keys come from the environment only and are redacted from logged URLs
//! - City names are validated before any request is made

pub mod adapters;
pub mod aggregator;
pub mod catalog;
pub mod circuit_breaker;
pub mod clock;
pub mod config;
pub mod derive;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod provider_policy;
pub mod retry;
pub mod session;
pub mod source;
pub mod throttling;

#[cfg(test)]
mod testing;

// Adapters
pub use adapters::{
    next_collection_label, AirQualityAdapter, EnergyAdapter, TrafficAdapter, TrafficFlow,
    WasteAdapter, WasteNoise, WeatherAdapter, DEFAULT_INCIDENTS, FALLBACK_USAGE_MW,
};

// Aggregation
pub use aggregator::{Aggregator, AggregatorBuilder, WEATHER_UNAVAILABLE};
pub use session::{SearchOutcome, SearchSession, SearchTicket};

// Catalog and configuration
pub use catalog::{CityCatalog, CityEntry, TrafficPattern, WasteProfile};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::CityPulseConfig;

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

// Domain models
pub use domain::{
    AirQualityReading, AqiStatus, CityName, CitySnapshot, Coordinates, EnergyReading,
    GeoLocation, Pollutant, SnapshotParts, SourceReport, SourceStatus, TrafficReading,
    UtcDateTime, WasteBreakdown, WasteReading, WeatherReading,
};

// Error types
pub use error::{
    AggregationError, CatalogError, ConfigError, FetchError, FetchErrorKind, ValidationError,
};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpRequest, HttpResponse, ReqwestHttpClient,
};

// Policies, retry and throttling
pub use provider_policy::ProviderPolicy;
pub use retry::{Backoff, RetryClient};
pub use source::SourceId;
pub use throttling::RateGate;
