//! Pure numeric transforms used to fill derived snapshot fields.
//!
//! Nothing here performs I/O or keeps state; randomness is always passed in
//! by the caller so results are reproducible.

use time::Weekday;

use crate::domain::{AqiStatus, WasteBreakdown};

/// Average MW drawn by one GWh consumed per year (1e6 kWh / 8760 h).
pub const GWH_PER_YEAR_TO_MW: f64 = 0.11416;

/// Congestion reported when the free-flow speed is unknown.
pub const UNKNOWN_CONGESTION_PCT: u8 = 50;

pub const PEAK_LOAD_FACTOR: f64 = 1.2;

pub const WEEKEND_WASTE_MULTIPLIER: f64 = 1.15;

pub fn aqi_status(aqi: u32) -> AqiStatus {
    match aqi {
        0..=50 => AqiStatus::Good,
        51..=100 => AqiStatus::Moderate,
        101..=150 => AqiStatus::UnhealthySensitive,
        151..=200 => AqiStatus::Unhealthy,
        201..=300 => AqiStatus::VeryUnhealthy,
        _ => AqiStatus::Hazardous,
    }
}

/// `round(clamp(0, 100, (1 - current / free_flow) * 100))`, or 50 when the
/// free-flow speed is not positive.
pub fn congestion_pct(current_speed: f64, free_flow_speed: f64) -> u8 {
    if free_flow_speed.is_nan() || free_flow_speed <= 0.0 || !current_speed.is_finite() {
        return UNKNOWN_CONGESTION_PCT;
    }

    let raw = (1.0 - current_speed / free_flow_speed) * 100.0;
    raw.clamp(0.0, 100.0).round() as u8
}

pub fn gwh_per_year_to_mw(gwh_per_year: f64) -> f64 {
    gwh_per_year * GWH_PER_YEAR_TO_MW
}

/// Annual city consumption in GWh from a per-capita figure and a population
/// given in thousands.
pub fn city_consumption_gwh(per_capita_kwh: f64, population_thousands: f64) -> f64 {
    per_capita_kwh * population_thousands / 1000.0
}

pub fn usage_mw(gwh_per_year: f64) -> u32 {
    round_non_negative(gwh_per_year_to_mw(gwh_per_year))
}

pub fn peak_mw(usage_mw: u32) -> u32 {
    round_non_negative(f64::from(usage_mw) * PEAK_LOAD_FACTOR)
}

/// Renewable share when no live figure exists; `jitter` is expected in `0..15`.
pub fn renewable_pct(jitter: u8) -> u8 {
    35 + jitter.min(14)
}

/// Approximate seconds to cover one kilometre at `speed_kmh`.
pub fn travel_time_secs(speed_kmh: f64) -> f64 {
    if speed_kmh > 0.0 {
        (1000.0 / speed_kmh * 60.0).round()
    } else {
        0.0
    }
}

/// Minutes lost versus free flow, never negative; 0 unless both times are known.
pub fn delay_minutes(current_travel_time: f64, free_flow_travel_time: f64) -> u32 {
    if current_travel_time > 0.0 && free_flow_travel_time > 0.0 {
        round_non_negative((current_travel_time - free_flow_travel_time) / 60.0)
    } else {
        0
    }
}

/// Quarter of the day the collection schedule is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionPhase {
    Night,
    Morning,
    Afternoon,
    Evening,
}

impl CollectionPhase {
    pub fn from_hour(hour: u8) -> Self {
        match hour {
            0..=5 => Self::Night,
            6..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            _ => Self::Evening,
        }
    }

    const fn start_hour(self) -> u8 {
        match self {
            Self::Night => 0,
            Self::Morning => 6,
            Self::Afternoon => 12,
            Self::Evening => 18,
        }
    }

    pub const fn status(self) -> &'static str {
        match self {
            Self::Night => "Night collection completed",
            Self::Morning => "Morning collection in progress",
            Self::Afternoon => "Afternoon collection active",
            Self::Evening => "Peak waste generation time",
        }
    }
}

fn band_fraction(hour: u8) -> f64 {
    let phase = CollectionPhase::from_hour(hour);
    f64::from(hour.min(23) - phase.start_hour()) / 6.0
}

/// Share of the daily target collected by `hour` (0.0 to 1.0).
pub fn collection_progress(hour: u8) -> f64 {
    let fraction = band_fraction(hour);
    match CollectionPhase::from_hour(hour) {
        CollectionPhase::Night => 0.95 + fraction * 0.05,
        CollectionPhase::Morning => 0.25 + fraction * 0.25,
        CollectionPhase::Afternoon => 0.50 + fraction * 0.25,
        CollectionPhase::Evening => 0.75 + fraction * 0.20,
    }
}

/// Bin fill percentage; `noise` in `[0, 1)` only affects night and evening.
pub fn bin_fill_level(hour: u8, noise: f64) -> u8 {
    let fraction = band_fraction(hour);
    let noise = noise.clamp(0.0, 1.0);
    let level = match CollectionPhase::from_hour(hour) {
        CollectionPhase::Night => 20.0 + noise * 15.0,
        CollectionPhase::Morning => 35.0 + fraction * 30.0,
        CollectionPhase::Afternoon => 65.0 + fraction * 20.0,
        CollectionPhase::Evening => 85.0 + noise * 10.0,
    };
    level.clamp(0.0, 100.0).round() as u8
}

pub fn weekend_multiplier(weekday: Weekday) -> f64 {
    match weekday {
        Weekday::Saturday | Weekday::Sunday => WEEKEND_WASTE_MULTIPLIER,
        _ => 1.0,
    }
}

/// Tons generated per day by `population_millions` people at `kg_per_person`.
pub fn daily_waste_tons(population_millions: f64, kg_per_person: f64) -> f64 {
    population_millions * kg_per_person * 1000.0
}

/// Recycling rate in percent; cities above 1 kg/person/day recycle more.
/// `jitter` is expected in `0..10`.
pub fn recycling_rate(kg_per_person: f64, jitter: u8) -> u8 {
    let base = if kg_per_person > 1.0 { 35 } else { 25 };
    base + jitter.min(9)
}

pub fn waste_breakdown(collected_tons: u32) -> WasteBreakdown {
    let share = |pct: f64| round_non_negative(f64::from(collected_tons) * pct);
    WasteBreakdown {
        organic: share(0.45),
        plastic: share(0.20),
        paper: share(0.15),
        metal: share(0.10),
        glass: share(0.05),
        other: share(0.05),
    }
}

pub(crate) fn round_non_negative(value: f64) -> u32 {
    if value.is_finite() {
        value.round().clamp(0.0, f64::from(u32::MAX)) as u32
    } else {
        0
    }
}
