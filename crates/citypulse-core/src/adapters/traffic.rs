use std::sync::Arc;

use serde::Deserialize;
use urlencoding::encode;

use crate::catalog::CityCatalog;
use crate::circuit_breaker::CircuitBreaker;
use crate::config::CityPulseConfig;
use crate::derive::{congestion_pct, delay_minutes, travel_time_secs, UNKNOWN_CONGESTION_PCT};
use crate::domain::{CityName, Coordinates, TrafficReading};
use crate::error::{FetchError, FetchErrorKind};
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider_policy::ProviderPolicy;
use crate::retry::{Backoff, RetryClient};
use crate::throttling::RateGate;

const FLOW_ZOOM: u8 = 10;
const INCIDENT_BBOX_DEGREES: f64 = 0.1;
const DISPLAY_SPEED_KMH: f64 = 30.0;
const DISPLAY_FREE_FLOW_KMH: f64 = 55.0;

/// Incident count used when neither live data nor a fallback pattern applies.
pub const DEFAULT_INCIDENTS: u32 = 5;

/// Flow measurement for one city, live or synthesized from a pattern.
///
/// Speeds the provider did not report (or reported as zero) are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficFlow {
    pub current_speed_kmh: Option<f64>,
    pub free_flow_speed_kmh: Option<f64>,
    pub current_travel_time_s: Option<f64>,
    pub free_flow_travel_time_s: Option<f64>,
    pub confidence: f64,
    pub road_closure: bool,
    pub coordinates: Option<Coordinates>,
    /// Canned incident count carried by fallback patterns.
    pub pattern_incidents: Option<u32>,
    pub estimated: bool,
}

impl TrafficFlow {
    /// Congestion is 50 unless both speeds are known.
    pub fn into_reading(self, incidents_count: u32) -> TrafficReading {
        let congestion = match (self.current_speed_kmh, self.free_flow_speed_kmh) {
            (Some(current), Some(free_flow)) => congestion_pct(current, free_flow),
            _ => UNKNOWN_CONGESTION_PCT,
        };

        TrafficReading {
            congestion_level_pct: congestion,
            avg_speed_kmh: self.current_speed_kmh.unwrap_or(DISPLAY_SPEED_KMH),
            free_flow_speed_kmh: self.free_flow_speed_kmh.unwrap_or(DISPLAY_FREE_FLOW_KMH),
            incidents_count,
            delay_minutes: delay_minutes(
                self.current_travel_time_s.unwrap_or(0.0),
                self.free_flow_travel_time_s.unwrap_or(0.0),
            ),
            confidence: self.confidence,
            road_closure: self.road_closure,
            estimated: self.estimated,
        }
    }
}

/// Live flow and incident lookups against a coordinate table, with
/// pattern-based fallbacks.
///
/// The circuit breaker lives as long as the adapter: once a blocked request
/// trips it, every search skips the provider for 60s.
#[derive(Clone)]
pub struct TrafficAdapter {
    catalog: Arc<CityCatalog>,
    flow_client: RetryClient,
    incidents_client: RetryClient,
    circuit_breaker: Arc<CircuitBreaker>,
    base_url: String,
    incidents_url: String,
    api_key: String,
    flow_policy: ProviderPolicy,
    incidents_policy: ProviderPolicy,
}

impl TrafficAdapter {
    pub fn new(
        http: Arc<dyn HttpClient>,
        config: &CityPulseConfig,
        catalog: Arc<CityCatalog>,
    ) -> Self {
        let flow_policy = config.traffic_flow_policy.clone();
        let incidents_policy = config.traffic_incidents_policy.clone();
        Self {
            catalog,
            flow_client: RetryClient::new(Arc::clone(&http))
                .with_rate_gate(RateGate::from_policy(&flow_policy)),
            incidents_client: RetryClient::new(http)
                .with_rate_gate(RateGate::from_policy(&incidents_policy)),
            circuit_breaker: Arc::new(CircuitBreaker::default()),
            base_url: config.traffic_base_url.trim_end_matches('/').to_owned(),
            incidents_url: config.traffic_incidents_url.clone(),
            api_key: config.traffic_api_key.clone().unwrap_or_default(),
            flow_policy,
            incidents_policy,
        }
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.flow_client = self.flow_client.with_backoff(backoff);
        self.incidents_client = self.incidents_client.with_backoff(backoff);
        self
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    pub fn available_cities(&self) -> Vec<&str> {
        self.catalog.available_cities()
    }

    fn locate(&self, city: &CityName) -> Result<Coordinates, FetchError> {
        self.catalog.coordinates(city.as_str()).ok_or_else(|| {
            FetchError::not_found(format!(
                "traffic data not available for {city}; try one of: {}",
                self.available_cities().join(", ")
            ))
        })
    }

    fn guard(&self) -> Result<(), FetchError> {
        if self.circuit_breaker.allow_request() {
            Ok(())
        } else {
            Err(FetchError::blocked(
                "traffic circuit breaker is open; skipping upstream call",
            ))
        }
    }

    fn record<T>(&self, result: &Result<T, FetchError>) {
        match result {
            Ok(_) => self.circuit_breaker.record_success(),
            Err(error) if error.kind() == FetchErrorKind::Blocked => self.circuit_breaker.trip(),
            Err(_) => self.circuit_breaker.record_failure(),
        }
    }

    pub async fn fetch_flow(&self, city: &CityName) -> Result<TrafficFlow, FetchError> {
        let at = self.locate(city)?;
        self.guard()?;

        let url = format!(
            "{}/flowSegmentData/absolute/{}/json?point={},{}&key={}",
            self.base_url,
            FLOW_ZOOM,
            at.lat,
            at.lon,
            encode(&self.api_key)
        );
        let result = self
            .flow_client
            .get_json::<FlowResponse>(HttpRequest::get(url), &self.flow_policy)
            .await;
        self.record(&result);

        let segment = result?.flow_segment_data.unwrap_or_default();
        let known = |value: Option<f64>| value.filter(|value| *value > 0.0);

        Ok(TrafficFlow {
            current_speed_kmh: known(segment.current_speed),
            free_flow_speed_kmh: known(segment.free_flow_speed),
            current_travel_time_s: known(segment.current_travel_time),
            free_flow_travel_time_s: known(segment.free_flow_travel_time),
            confidence: segment.confidence.unwrap_or(0.0),
            road_closure: segment.road_closure.unwrap_or(false),
            coordinates: Some(at),
            pattern_incidents: None,
            estimated: false,
        })
    }

    /// Number of incidents inside a small box around the city point.
    pub async fn fetch_incidents(&self, city: &CityName) -> Result<u32, FetchError> {
        let at = self.locate(city)?;
        self.guard()?;

        let url = format!(
            "{}?bbox={:.4},{:.4},{:.4},{:.4}&key={}",
            self.incidents_url,
            at.lon - INCIDENT_BBOX_DEGREES,
            at.lat - INCIDENT_BBOX_DEGREES,
            at.lon + INCIDENT_BBOX_DEGREES,
            at.lat + INCIDENT_BBOX_DEGREES,
            encode(&self.api_key)
        );
        let result = self
            .incidents_client
            .get_json::<IncidentsResponse>(HttpRequest::get(url), &self.incidents_policy)
            .await;
        self.record(&result);

        Ok(u32::try_from(result?.incidents.len()).unwrap_or(u32::MAX))
    }

    /// Flow synthesized from the city's typical pattern (or the default one).
    pub fn fallback_flow(&self, city: &CityName) -> TrafficFlow {
        let pattern = self.catalog.traffic_pattern_or_default(city.as_str());
        TrafficFlow {
            current_speed_kmh: Some(pattern.avg_speed_kmh),
            free_flow_speed_kmh: Some(pattern.free_flow_speed_kmh),
            current_travel_time_s: Some(travel_time_secs(pattern.avg_speed_kmh)),
            free_flow_travel_time_s: Some(travel_time_secs(pattern.free_flow_speed_kmh)),
            confidence: 0.0,
            road_closure: false,
            coordinates: self.catalog.coordinates(city.as_str()),
            pattern_incidents: Some(pattern.incidents),
            estimated: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FlowResponse {
    #[serde(rename = "flowSegmentData")]
    flow_segment_data: Option<FlowSegment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowSegment {
    current_speed: Option<f64>,
    free_flow_speed: Option<f64>,
    current_travel_time: Option<f64>,
    free_flow_travel_time: Option<f64>,
    confidence: Option<f64>,
    road_closure: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct IncidentsResponse {
    #[serde(default)]
    incidents: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitState;
    use crate::http_client::HttpError;
    use crate::testing::RoutedHttpClient;

    fn adapter(http: Arc<RoutedHttpClient>) -> TrafficAdapter {
        let config = CityPulseConfig {
            traffic_base_url: String::from("https://traffic.test/4"),
            traffic_incidents_url: String::from("https://traffic.test/5/incidentDetails"),
            ..CityPulseConfig::default()
        }
        .with_traffic_api_key("tt");
        TrafficAdapter::new(http, &config, Arc::new(CityCatalog::default()))
    }

    fn city(name: &str) -> CityName {
        CityName::parse(name).expect("valid city")
    }

    #[tokio::test]
    async fn reads_live_flow_segment() {
        let http = RoutedHttpClient::new()
            .json(
                "flowSegmentData",
                r#"{"flowSegmentData": {
                    "currentSpeed": 21, "freeFlowSpeed": 42,
                    "currentTravelTime": 540, "freeFlowTravelTime": 270,
                    "confidence": 0.93, "roadClosure": false
                }}"#,
            )
            .shared();
        let adapter = adapter(http.clone());

        let flow = adapter.fetch_flow(&city("mumbai")).await.expect("live flow");
        let reading = flow.into_reading(3);

        assert_eq!(reading.congestion_level_pct, 50);
        assert_eq!(reading.avg_speed_kmh, 21.0);
        assert_eq!(reading.delay_minutes, 5);
        assert_eq!(reading.confidence, 0.93);
        assert!(!reading.estimated);
        assert_eq!(
            http.requests()[0],
            "https://traffic.test/4/flowSegmentData/absolute/10/json?point=19.076,72.8777&key=tt"
        );
    }

    #[tokio::test]
    async fn missing_live_speeds_show_display_defaults() {
        let http = RoutedHttpClient::new()
            .json("flowSegmentData", r#"{"flowSegmentData": {"currentSpeed": 0}}"#)
            .shared();

        let reading = adapter(http)
            .fetch_flow(&city("Delhi"))
            .await
            .expect("live flow")
            .into_reading(0);

        assert_eq!(reading.congestion_level_pct, 50);
        assert_eq!(reading.avg_speed_kmh, 30.0);
        assert_eq!(reading.free_flow_speed_kmh, 55.0);
        assert_eq!(reading.delay_minutes, 0);
    }

    #[tokio::test]
    async fn unknown_city_is_not_found_without_network() {
        let http = RoutedHttpClient::new().shared();
        let adapter = adapter(http.clone());

        let error = adapter
            .fetch_flow(&city("UnknownVille"))
            .await
            .expect_err("not in table");

        assert_eq!(error.kind(), FetchErrorKind::NotFound);
        assert!(error.message().contains("Mumbai"));
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn counts_incidents_in_bbox() {
        let http = RoutedHttpClient::new()
            .json("incidentDetails", r#"{"incidents": [{"id": 1}, {"id": 2}]}"#)
            .shared();

        let count = adapter(http.clone())
            .fetch_incidents(&city("London"))
            .await
            .expect("incidents");

        assert_eq!(count, 2);
        assert!(http.requests()[0].contains("bbox=-0.2278,51.4074,-0.0278,51.6074"));
    }

    #[tokio::test]
    async fn blocked_call_opens_circuit_for_later_calls() {
        let http = RoutedHttpClient::new()
            .route("traffic.test", Err(HttpError::blocked("policy")))
            .shared();
        let adapter = adapter(http.clone());

        let first = adapter.fetch_flow(&city("Pune")).await.expect_err("blocked");
        assert_eq!(first.kind(), FetchErrorKind::Blocked);
        assert_eq!(adapter.circuit_breaker().state(), CircuitState::Open);

        let second = adapter
            .fetch_incidents(&city("Pune"))
            .await
            .expect_err("circuit open");
        assert_eq!(second.kind(), FetchErrorKind::Blocked);
        assert_eq!(http.requests().len(), 1);
    }

    #[test]
    fn fallback_uses_city_pattern() {
        let adapter = adapter(RoutedHttpClient::new().shared());

        let flow = adapter.fallback_flow(&city("Mumbai"));
        assert_eq!(flow.pattern_incidents, Some(8));
        assert_eq!(flow.current_travel_time_s, Some(2400.0));

        let reading = flow.into_reading(8);
        assert_eq!(reading.congestion_level_pct, 50);
        assert_eq!(reading.avg_speed_kmh, 25.0);
        assert_eq!(reading.free_flow_speed_kmh, 50.0);
        assert_eq!(reading.delay_minutes, 20);
        assert!(reading.estimated);
    }

    #[test]
    fn fallback_for_unknown_city_uses_default_pattern() {
        let adapter = adapter(RoutedHttpClient::new().shared());

        let flow = adapter.fallback_flow(&city("UnknownVille"));
        assert_eq!(flow.pattern_incidents, Some(DEFAULT_INCIDENTS));
        assert_eq!(flow.coordinates, None);
        assert_eq!(flow.into_reading(5).congestion_level_pct, 45);
    }
}
