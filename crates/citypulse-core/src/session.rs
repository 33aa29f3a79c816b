use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::aggregator::Aggregator;
use crate::domain::CitySnapshot;
use crate::error::AggregationError;

/// Proof that a search was started; only the most recent ticket may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket {
    generation: u64,
}

impl SearchTicket {
    pub const fn generation(self) -> u64 {
        self.generation
    }
}

/// Result of a search that ran to completion.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Committed(Arc<CitySnapshot>),
    /// A newer search or a clear happened while this one was in flight.
    Superseded,
}

#[derive(Debug, Default)]
struct SessionState {
    generation: u64,
    latest: Option<Arc<CitySnapshot>>,
}

/// Last-search-wins holder for the visible snapshot.
///
/// Starting a search or clearing bumps a generation counter; results carrying
/// an older generation are dropped on commit.
#[derive(Debug, Default)]
pub struct SearchSession {
    state: Mutex<SessionState>,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a search. The previous snapshot stops being visible.
    pub fn begin(&self) -> SearchTicket {
        let mut state = self.lock();
        state.generation += 1;
        state.latest = None;
        SearchTicket {
            generation: state.generation,
        }
    }

    pub fn is_current(&self, ticket: SearchTicket) -> bool {
        self.lock().generation == ticket.generation
    }

    /// Stores the snapshot if `ticket` is still the latest search.
    pub fn commit(&self, ticket: SearchTicket, snapshot: CitySnapshot) -> Option<Arc<CitySnapshot>> {
        let mut state = self.lock();
        if state.generation != ticket.generation {
            debug!(
                ticket = ticket.generation,
                current = state.generation,
                "dropping superseded snapshot"
            );
            return None;
        }
        let snapshot = Arc::new(snapshot);
        state.latest = Some(Arc::clone(&snapshot));
        Some(snapshot)
    }

    /// Invalidates in-flight searches and hides the current snapshot.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.latest = None;
    }

    pub fn latest(&self) -> Option<Arc<CitySnapshot>> {
        self.lock().latest.clone()
    }

    /// Runs one aggregation under a fresh ticket.
    ///
    /// Errors from a search that was superseded meanwhile are swallowed, since
    /// nobody is waiting for them anymore.
    pub async fn search(
        &self,
        aggregator: &Aggregator,
        city: &str,
    ) -> Result<SearchOutcome, AggregationError> {
        let ticket = self.begin();
        let result = aggregator.aggregate(city).await;

        if !self.is_current(ticket) {
            return Ok(SearchOutcome::Superseded);
        }
        let snapshot = result?;
        Ok(self
            .commit(ticket, snapshot)
            .map_or(SearchOutcome::Superseded, SearchOutcome::Committed))
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        AirQualityReading, EnergyReading, SnapshotParts, TrafficReading, UtcDateTime,
        WasteBreakdown, WasteReading, WeatherReading,
    };

    fn snapshot(city: &str) -> CitySnapshot {
        CitySnapshot::new(
            city,
            UtcDateTime::from_unix_seconds(1_709_600_000).expect("valid timestamp"),
            12,
            SnapshotParts {
                weather: WeatherReading {
                    temperature_c: 21.0,
                    feels_like_c: 21.0,
                    condition: String::from("clear sky"),
                    icon: None,
                    humidity_pct: 40,
                    wind_speed_ms: 1.0,
                    pressure_hpa: 1012.0,
                    country: None,
                    observed_at: None,
                },
                air_quality: AirQualityReading::fallback(),
                traffic: TrafficReading {
                    congestion_level_pct: 45,
                    avg_speed_kmh: 30.0,
                    free_flow_speed_kmh: 55.0,
                    incidents_count: 5,
                    delay_minutes: 0,
                    confidence: 0.0,
                    road_closure: false,
                    estimated: true,
                },
                energy: EnergyReading {
                    usage_mw: 1200,
                    renewable_pct: 35,
                    peak_mw: 1440,
                    region: city.to_owned(),
                    per_capita_kwh: Some(1000.0),
                    city_consumption_gwh: None,
                    data_source: String::from("Estimated based on state averages"),
                    estimated: true,
                },
                waste: WasteReading {
                    collected_tons: 0,
                    recycled_tons: 0,
                    recycled_pct: 25,
                    next_collection_label: String::from("Wed, 6:00 AM"),
                    bin_fill_level_pct: 20,
                    daily_target_tons: 5000,
                    collection_progress_pct: 0,
                    collection_status: String::from("Night collection completed"),
                    breakdown: WasteBreakdown {
                        organic: 0,
                        plastic: 0,
                        paper: 0,
                        metal: 0,
                        glass: 0,
                        other: 0,
                    },
                    estimated: true,
                },
                sources: Vec::new(),
            },
        )
    }

    #[test]
    fn newer_search_wins() {
        let session = SearchSession::new();
        let first = session.begin();
        let second = session.begin();

        assert!(session.commit(first, snapshot("Delhi")).is_none());
        assert!(session.latest().is_none());

        let committed = session.commit(second, snapshot("Pune")).expect("current ticket");
        assert_eq!(committed.city_name(), "Pune");
        assert_eq!(session.latest().map(|s| s.search_id()), Some(committed.search_id()));
    }

    #[test]
    fn clear_invalidates_in_flight_search() {
        let session = SearchSession::new();
        let ticket = session.begin();
        session.clear();

        assert!(!session.is_current(ticket));
        assert!(session.commit(ticket, snapshot("Delhi")).is_none());
        assert!(session.latest().is_none());
    }

    #[test]
    fn begin_hides_previous_snapshot() {
        let session = SearchSession::new();
        let ticket = session.begin();
        session.commit(ticket, snapshot("Delhi"));
        assert!(session.latest().is_some());

        let next = session.begin();
        assert!(session.latest().is_none());
        assert_eq!(next.generation(), ticket.generation() + 1);
    }
}
