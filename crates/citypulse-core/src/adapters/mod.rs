mod air_quality;
mod energy;
mod traffic;
mod waste;
mod weather;

pub use air_quality::AirQualityAdapter;
pub use energy::{EnergyAdapter, ESTIMATED_DATA_SOURCE, FALLBACK_USAGE_MW, LIVE_DATA_SOURCE};
pub use traffic::{TrafficAdapter, TrafficFlow, DEFAULT_INCIDENTS};
pub use waste::{next_collection_label, WasteAdapter, WasteNoise};
pub use weather::WeatherAdapter;
