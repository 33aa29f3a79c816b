use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{SourceId, UtcDateTime};

/// Point on the map in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Air quality band derived from the US AQI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AqiStatus {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::UnhealthySensitive => "Unhealthy for Sensitive Groups",
            Self::Unhealthy => "Unhealthy",
            Self::VeryUnhealthy => "Very Unhealthy",
            Self::Hazardous => "Hazardous",
        }
    }
}

/// Current conditions from the weather provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub condition: String,
    pub icon: Option<String>,
    pub humidity_pct: u8,
    pub wind_speed_ms: f64,
    pub pressure_hpa: f64,
    pub country: Option<String>,
    pub observed_at: Option<UtcDateTime>,
}

/// One pollutant concentration as reported by the air-quality provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pollutant {
    pub code: String,
    pub value: f64,
    pub units: String,
}

/// Geocoder match used to locate the air-quality sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub name: String,
    pub country: Option<String>,
    pub admin1: Option<String>,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityReading {
    pub aqi: u32,
    pub status: AqiStatus,
    pub pm25: f64,
    pub pm10: f64,
    /// Administrative region reported by the geocoder, used to key energy lookups.
    pub source_region: Option<String>,
    pub pollutants: Vec<Pollutant>,
    pub location: Option<GeoLocation>,
    pub estimated: bool,
}

impl AirQualityReading {
    /// Fixed substitute used whenever geocoding or the pollutant fetch fails.
    pub fn fallback() -> Self {
        Self {
            aqi: 50,
            status: AqiStatus::Moderate,
            pm25: 20.0,
            pm10: 30.0,
            source_region: None,
            pollutants: Vec::new(),
            location: None,
            estimated: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficReading {
    pub congestion_level_pct: u8,
    pub avg_speed_kmh: f64,
    pub free_flow_speed_kmh: f64,
    pub incidents_count: u32,
    pub delay_minutes: u32,
    pub confidence: f64,
    pub road_closure: bool,
    pub estimated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyReading {
    pub usage_mw: u32,
    pub renewable_pct: u8,
    pub peak_mw: u32,
    pub region: String,
    pub per_capita_kwh: Option<f64>,
    pub city_consumption_gwh: Option<f64>,
    pub data_source: String,
    pub estimated: bool,
}

/// Collected tons split by waste stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasteBreakdown {
    pub organic: u32,
    pub plastic: u32,
    pub paper: u32,
    pub metal: u32,
    pub glass: u32,
    pub other: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteReading {
    pub collected_tons: u32,
    pub recycled_tons: u32,
    pub recycled_pct: u8,
    pub next_collection_label: String,
    pub bin_fill_level_pct: u8,
    pub daily_target_tons: u32,
    pub collection_progress_pct: u8,
    pub collection_status: String,
    pub breakdown: WasteBreakdown,
    pub estimated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Live,
    Estimated,
}

/// How one source contributed to a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: SourceId,
    pub status: SourceStatus,
    /// Stable error code or short explanation when the source was estimated.
    pub reason: Option<String>,
}

impl SourceReport {
    pub fn live(source: SourceId) -> Self {
        Self {
            source,
            status: SourceStatus::Live,
            reason: None,
        }
    }

    pub fn estimated(source: SourceId, reason: impl Into<String>) -> Self {
        Self {
            source,
            status: SourceStatus::Estimated,
            reason: Some(reason.into()),
        }
    }

    pub fn is_live(&self) -> bool {
        self.status == SourceStatus::Live
    }
}

/// Complete aggregated result for one city query.
///
/// Fields are only reachable through getters; a new search always produces a
/// new snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySnapshot {
    search_id: Uuid,
    city_name: String,
    generated_at: UtcDateTime,
    latency_ms: u64,
    weather: WeatherReading,
    air_quality: AirQualityReading,
    traffic: TrafficReading,
    energy: EnergyReading,
    waste: WasteReading,
    sources: Vec<SourceReport>,
}

/// Per-source readings gathered by the aggregator before assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotParts {
    pub weather: WeatherReading,
    pub air_quality: AirQualityReading,
    pub traffic: TrafficReading,
    pub energy: EnergyReading,
    pub waste: WasteReading,
    pub sources: Vec<SourceReport>,
}

impl CitySnapshot {
    pub fn new(
        city_name: impl Into<String>,
        generated_at: UtcDateTime,
        latency_ms: u64,
        parts: SnapshotParts,
    ) -> Self {
        Self {
            search_id: Uuid::new_v4(),
            city_name: city_name.into(),
            generated_at,
            latency_ms,
            weather: parts.weather,
            air_quality: parts.air_quality,
            traffic: parts.traffic,
            energy: parts.energy,
            waste: parts.waste,
            sources: parts.sources,
        }
    }

    pub fn search_id(&self) -> Uuid {
        self.search_id
    }

    pub fn city_name(&self) -> &str {
        &self.city_name
    }

    pub fn generated_at(&self) -> UtcDateTime {
        self.generated_at
    }

    pub fn latency_ms(&self) -> u64 {
        self.latency_ms
    }

    pub fn weather(&self) -> &WeatherReading {
        &self.weather
    }

    pub fn air_quality(&self) -> &AirQualityReading {
        &self.air_quality
    }

    pub fn traffic(&self) -> &TrafficReading {
        &self.traffic
    }

    pub fn energy(&self) -> &EnergyReading {
        &self.energy
    }

    pub fn waste(&self) -> &WasteReading {
        &self.waste
    }

    pub fn sources(&self) -> &[SourceReport] {
        &self.sources
    }

    pub fn source(&self, source: SourceId) -> Option<&SourceReport> {
        self.sources.iter().find(|report| report.source == source)
    }
}
