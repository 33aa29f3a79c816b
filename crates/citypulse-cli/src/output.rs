use std::fmt::Write as _;

use citypulse_core::{CityEntry, CitySnapshot, SourceStatus};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn render_snapshot(
    snapshot: &CitySnapshot,
    format: OutputFormat,
    pretty: bool,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => to_json(snapshot, pretty),
        OutputFormat::Table => Ok(snapshot_table(snapshot)),
    }
}

pub fn render_cities(
    entries: &[CityEntry],
    format: OutputFormat,
    pretty: bool,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => to_json(entries, pretty),
        OutputFormat::Table => Ok(cities_table(entries)),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String, CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(payload)
}

fn estimated_tag(estimated: bool) -> &'static str {
    if estimated {
        " [estimated]"
    } else {
        ""
    }
}

fn snapshot_table(snapshot: &CitySnapshot) -> String {
    let weather = snapshot.weather();
    let air = snapshot.air_quality();
    let traffic = snapshot.traffic();
    let energy = snapshot.energy();
    let waste = snapshot.waste();

    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "city        : {}", snapshot.city_name());
    let _ = writeln!(out, "search_id   : {}", snapshot.search_id());
    let _ = writeln!(out, "generated_at: {}", snapshot.generated_at());
    let _ = writeln!(out, "latency_ms  : {}", snapshot.latency_ms());
    let _ = writeln!(
        out,
        "weather     : {:.1}°C (feels {:.1}°C), {}, humidity {}%, wind {:.1} m/s, {:.0} hPa",
        weather.temperature_c,
        weather.feels_like_c,
        weather.condition,
        weather.humidity_pct,
        weather.wind_speed_ms,
        weather.pressure_hpa
    );
    let _ = writeln!(
        out,
        "air_quality : AQI {} ({}), PM2.5 {:.1}, PM10 {:.1}{}",
        air.aqi,
        air.status.label(),
        air.pm25,
        air.pm10,
        estimated_tag(air.estimated)
    );
    let _ = writeln!(
        out,
        "traffic     : congestion {}%, {:.0}/{:.0} km/h, {} incidents, delay {} min{}",
        traffic.congestion_level_pct,
        traffic.avg_speed_kmh,
        traffic.free_flow_speed_kmh,
        traffic.incidents_count,
        traffic.delay_minutes,
        estimated_tag(traffic.estimated)
    );
    let _ = writeln!(
        out,
        "energy      : {} MW (peak {} MW), renewable {}%, region {}{}",
        energy.usage_mw,
        energy.peak_mw,
        energy.renewable_pct,
        energy.region,
        estimated_tag(energy.estimated)
    );
    let _ = writeln!(
        out,
        "waste       : {}/{} t collected ({}%), recycled {}%, bins {}%, next {}{}",
        waste.collected_tons,
        waste.daily_target_tons,
        waste.collection_progress_pct,
        waste.recycled_pct,
        waste.bin_fill_level_pct,
        waste.next_collection_label,
        estimated_tag(waste.estimated)
    );

    out.push_str("sources:\n");
    for report in snapshot.sources() {
        let _ = match (report.status, report.reason.as_deref()) {
            (SourceStatus::Live, _) => writeln!(out, "  - {}: live", report.source),
            (SourceStatus::Estimated, Some(reason)) => {
                writeln!(out, "  - {}: estimated ({reason})", report.source)
            }
            (SourceStatus::Estimated, None) => writeln!(out, "  - {}: estimated", report.source),
        };
    }
    out
}

fn cities_table(entries: &[CityEntry]) -> String {
    let mut out = format!(
        "{:<16} {:<20} {:>12} {:>8}\n",
        "city", "region", "population_k", "traffic"
    );
    for entry in entries {
        let _ = writeln!(
            out,
            "{:<16} {:<20} {:>12} {:>8}",
            entry.name,
            entry.region.as_deref().unwrap_or("-"),
            entry
                .population_thousands
                .map_or_else(|| String::from("-"), |population| format!("{population:.0}")),
            if entry.coordinates.is_some() { "yes" } else { "no" }
        );
    }
    out
}
