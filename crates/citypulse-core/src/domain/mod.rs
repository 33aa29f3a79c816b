//! # Domain Models
//!
//! Canonical readings and the snapshot assembled from them.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CityName`] | Validated free-text city query |
//! | [`WeatherReading`] | Current conditions (mandatory source) |
//! | [`AirQualityReading`] | AQI, status band and pollutants |
//! | [`TrafficReading`] | Congestion, speeds, incidents, delay |
//! | [`EnergyReading`] | Average and peak load in MW |
//! | [`WasteReading`] | Collection progress and recycling figures |
//! | [`CitySnapshot`] | Immutable aggregate of all of the above |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Readings that were synthesized locally instead of fetched carry
//! `estimated = true`, and every snapshot lists a [`SourceReport`] per source.

mod city;
mod models;
mod timestamp;

pub use city::CityName;
pub use models::{
    AirQualityReading, AqiStatus, CitySnapshot, Coordinates, EnergyReading, GeoLocation,
    Pollutant, SnapshotParts, SourceReport, SourceStatus, TrafficReading, WasteBreakdown,
    WasteReading, WeatherReading,
};
pub use timestamp::UtcDateTime;
