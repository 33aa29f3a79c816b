use std::sync::Arc;

use time::{OffsetDateTime, Weekday};
use tracing::debug;

use crate::catalog::CityCatalog;
use crate::clock::Clock;
use crate::derive::{
    bin_fill_level, collection_progress, daily_waste_tons, recycling_rate, round_non_negative,
    waste_breakdown, weekend_multiplier, CollectionPhase,
};
use crate::domain::{SourceReport, WasteReading};
use crate::SourceId;

/// Random inputs for one waste estimate, drawn by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WasteNoise {
    /// Added to the base recycling rate, expected in `0..10`.
    pub recycling_jitter: u8,
    /// Spread of night and evening bin fill, expected in `[0, 1)`.
    pub bin_fill: f64,
}

/// Collection and recycling estimate from population, per-person rate and
/// time of day. No network involved.
#[derive(Clone)]
pub struct WasteAdapter {
    catalog: Arc<CityCatalog>,
    clock: Arc<dyn Clock>,
}

impl WasteAdapter {
    pub fn new(catalog: Arc<CityCatalog>, clock: Arc<dyn Clock>) -> Self {
        Self { catalog, clock }
    }

    /// Always succeeds; cities outside the table use the default profile and
    /// are reported as estimated.
    pub fn fetch(&self, city: &str, noise: WasteNoise) -> (WasteReading, SourceReport) {
        let reading = self.reading_at(city, self.clock.now(), noise);
        let report = if reading.estimated {
            debug!(city, "no waste profile for city, using default profile");
            SourceReport::estimated(SourceId::Waste, "unknown_city")
        } else {
            SourceReport::live(SourceId::Waste)
        };
        (reading, report)
    }

    pub fn reading_at(&self, city: &str, now: OffsetDateTime, noise: WasteNoise) -> WasteReading {
        let known = self.catalog.waste_profile(city);
        let profile = known.unwrap_or(self.catalog.default_waste_profile);

        let hour = now.hour();
        let phase = CollectionPhase::from_hour(hour);
        let multiplier = weekend_multiplier(now.weekday());
        let daily = daily_waste_tons(profile.population_millions, profile.kg_per_person);
        let progress = collection_progress(hour);

        let collected = round_non_negative(daily * progress * multiplier);
        let recycled_pct = recycling_rate(profile.kg_per_person, noise.recycling_jitter);
        let recycled = round_non_negative(f64::from(collected) * f64::from(recycled_pct) / 100.0);

        WasteReading {
            collected_tons: collected,
            recycled_tons: recycled,
            recycled_pct,
            next_collection_label: next_collection_label(now),
            bin_fill_level_pct: bin_fill_level(hour, noise.bin_fill),
            daily_target_tons: round_non_negative(daily * multiplier),
            collection_progress_pct: (progress * 100.0).round().clamp(0.0, 100.0) as u8,
            collection_status: phase.status().to_owned(),
            breakdown: waste_breakdown(collected),
            estimated: known.is_none(),
        }
    }
}

/// Next pickup: 06:00 today before dawn, 18:00 during the day, 06:00
/// tomorrow from the evening on. Formatted like `Tue, 6:00 AM`.
pub fn next_collection_label(now: OffsetDateTime) -> String {
    let hour = now.hour();
    let (weekday, pickup_hour) = if hour >= 18 {
        (now.weekday().next(), 6)
    } else if hour < 6 {
        (now.weekday(), 6)
    } else {
        (now.weekday(), 18)
    };

    let (display_hour, period) = match pickup_hour {
        0 => (12, "AM"),
        h @ 1..=11 => (h, "AM"),
        12 => (12, "PM"),
        h => (h - 12, "PM"),
    };
    format!("{}, {display_hour}:00 {period}", short_weekday(weekday))
}

fn short_weekday(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Monday => "Mon",
        Weekday::Tuesday => "Tue",
        Weekday::Wednesday => "Wed",
        Weekday::Thursday => "Thu",
        Weekday::Friday => "Fri",
        Weekday::Saturday => "Sat",
        Weekday::Sunday => "Sun",
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::clock::FixedClock;
    use crate::domain::SourceStatus;

    const QUIET: WasteNoise = WasteNoise {
        recycling_jitter: 0,
        bin_fill: 0.0,
    };

    fn adapter_at(now: OffsetDateTime) -> WasteAdapter {
        WasteAdapter::new(Arc::new(CityCatalog::default()), Arc::new(FixedClock(now)))
    }

    #[test]
    fn weekday_morning_in_mumbai() {
        // Tuesday 09:00
        let now = datetime!(2024-03-05 09:00 +05:30);
        let (reading, report) = adapter_at(now).fetch("Mumbai", QUIET);

        assert_eq!(reading.daily_target_tons, 10_200);
        assert_eq!(reading.collected_tons, 3_825);
        assert_eq!(reading.collection_progress_pct, 38);
        assert_eq!(reading.bin_fill_level_pct, 50);
        assert_eq!(reading.recycled_pct, 25);
        assert_eq!(reading.recycled_tons, 956);
        assert_eq!(reading.collection_status, "Morning collection in progress");
        assert_eq!(reading.next_collection_label, "Tue, 6:00 PM");
        assert_eq!(reading.breakdown.organic, 1_721);
        assert!(!reading.estimated);
        assert!(report.is_live());
    }

    #[test]
    fn weekend_evening_adds_fifteen_percent() {
        // Saturday 21:00
        let now = datetime!(2024-03-09 21:00 UTC);
        let adapter = adapter_at(now);
        let reading = adapter.reading_at(
            "London",
            now,
            WasteNoise {
                recycling_jitter: 3,
                bin_fill: 0.5,
            },
        );

        assert_eq!(reading.daily_target_tons, 12_420);
        assert_eq!(reading.collected_tons, 10_557);
        assert_eq!(reading.recycled_pct, 38);
        assert_eq!(reading.bin_fill_level_pct, 90);
        assert_eq!(reading.next_collection_label, "Sun, 6:00 AM");
    }

    #[test]
    fn unknown_city_uses_default_profile() {
        let now = datetime!(2024-03-06 03:00 UTC);
        let (reading, report) = adapter_at(now).fetch("UnknownVille", QUIET);

        assert_eq!(reading.daily_target_tons, 5_000);
        assert_eq!(reading.collection_status, "Night collection completed");
        assert_eq!(reading.next_collection_label, "Wed, 6:00 AM");
        assert!(reading.estimated);
        assert_eq!(report.status, SourceStatus::Estimated);
        assert!(reading.bin_fill_level_pct <= 100);
        assert!(reading.collection_progress_pct <= 100);
    }
}
